//! Submission flows: stage, compile, execute (and check), release.

mod debugging;
mod testing;

use std::sync::Arc;

use crate::core::{
    artifacts::{ArtifactStore, StagingError},
    checker::{Checker, CheckerError},
    domain::{Artifact, CheckerDefinition, ExecutionOutcome},
    sanitize::Sanitizer,
    traits::{
        compiler::{CompileError, Compiler},
        runner::{RunError, Runner},
    },
};

/// Failures that abort a whole submission instead of landing in its result.
#[derive(Debug, thiserror::Error)]
pub enum SubmissionError {
    #[error(transparent)]
    Staging(#[from] StagingError),
    #[error("{msg}: {details}")]
    CompilerFault { msg: String, details: String },
    #[error(transparent)]
    Checker(#[from] CheckerError),
}

#[derive(Clone, Debug)]
pub struct Pipeline {
    store: ArtifactStore,
    compiler: Arc<dyn Compiler>,
    runner: Arc<dyn Runner>,
    checker: Checker,
    sanitizer: Sanitizer,
}

impl Pipeline {
    pub fn new(
        store: ArtifactStore,
        compiler: Arc<dyn Compiler>,
        runner: Arc<dyn Runner>,
        checker: Checker,
        sanitizer: Sanitizer,
    ) -> Self {
        Pipeline {
            store,
            compiler,
            runner,
            checker,
            sanitizer,
        }
    }

    /// Returns the user-facing compile error, if any.
    async fn compile(&self, artifact: &Artifact) -> Result<Option<String>, SubmissionError> {
        tracing::debug!("Start compiling");
        let compilation_result = self.compiler.compile(artifact).await;
        tracing::debug!("Compilation result: {:?}", compilation_result);

        match compilation_result {
            Ok(()) => Ok(None),
            Err(e @ (CompileError::TimedOut | CompileError::Diagnostic { .. })) => {
                Ok(Some(e.to_string()))
            }
            Err(CompileError::Tool { msg, details }) => {
                tracing::error!("Compiler fault: {}: {}", msg, details);
                Err(SubmissionError::CompilerFault { msg, details })
            }
        }
    }

    async fn execute(&self, artifact: &Artifact, stdin: &str) -> ExecutionOutcome {
        match self.runner.run(artifact, stdin).await {
            Ok(outcome) => outcome,
            Err(RunError::TimedOut) => ExecutionOutcome::failed(RunError::TimedOut.to_string()),
            Err(RunError::Launch { msg }) => {
                tracing::warn!("Failed to run artifact {}: {}", artifact.id, msg);
                ExecutionOutcome {
                    result: None,
                    error: self.sanitizer.clean_error(&msg),
                }
            }
        }
    }

    /// Evaluates the predicate on the blocking pool; a runaway predicate may
    /// hold its thread until the checker deadline.
    async fn check(
        &self,
        definition: &CheckerDefinition,
        expected: &str,
        actual: Option<&str>,
    ) -> Result<bool, SubmissionError> {
        let checker = self.checker;
        let definition = definition.clone();
        let expected = expected.to_string();
        let actual = actual.map(str::to_string);

        let passed = tokio::task::spawn_blocking(move || {
            checker.evaluate(&definition, &expected, actual.as_deref())
        })
        .await
        .map_err(|e| CheckerError::Runtime {
            details: e.to_string(),
        })??;
        Ok(passed)
    }
}

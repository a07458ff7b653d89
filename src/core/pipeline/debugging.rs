use crate::core::{
    artifacts::StagedArtifact,
    domain::{Artifact, DebugRequest, DebugResult},
    pipeline::{Pipeline, SubmissionError},
};

impl Pipeline {
    /// Compiles the code and runs it once against the optional input.
    #[tracing::instrument(skip(self, request))]
    pub async fn debug(&self, request: DebugRequest) -> Result<DebugResult, SubmissionError> {
        let artifact = StagedArtifact::new(&self.store, self.store.stage(&request.code).await?);

        let result = self
            .debug_artifact(&artifact, request.input.as_deref().unwrap_or_default())
            .await;

        artifact.release().await;
        tracing::info!(failed = result.is_err(), "Debug run finished");
        result
    }

    async fn debug_artifact(
        &self,
        artifact: &Artifact,
        input: &str,
    ) -> Result<DebugResult, SubmissionError> {
        if let Some(error) = self.compile(artifact).await? {
            return Ok(DebugResult {
                result: None,
                error: Some(error),
            });
        }

        Ok(self.execute(artifact, input).await.into())
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use crate::constants::{COMPILER_FAULT_MSG, TIMEOUT_MSG};
    use crate::core::{
        domain::{Artifact, DebugRequest, DebugResult, ExecutionOutcome},
        pipeline::{
            SubmissionError,
            test_support::{leftovers, pipeline, sandbox_dir},
        },
        traits::{
            compiler::{CompileError, MockCompiler},
            runner::{MockRunner, RunError, Runner},
        },
    };

    /// Runner whose program never finishes within a test.
    #[derive(Debug)]
    struct StalledRunner;

    #[async_trait::async_trait]
    impl Runner for StalledRunner {
        async fn run(&self, _: &Artifact, _: &str) -> Result<ExecutionOutcome, RunError> {
            tokio::time::sleep(Duration::from_secs(30)).await;
            Ok(ExecutionOutcome::default())
        }
    }

    fn request(input: Option<&str>) -> DebugRequest {
        DebugRequest {
            code: "begin end.".to_string(),
            input: input.map(str::to_string),
        }
    }

    #[tokio::test]
    async fn test_debug_success() {
        let dir = sandbox_dir();
        let mut compiler = MockCompiler::new();
        compiler.expect_compile().times(1).returning(|_| Ok(()));
        let mut runner = MockRunner::new();
        runner
            .expect_run()
            .withf(|_, stdin| stdin == "9.08")
            .times(1)
            .returning(|_, _| {
                Ok(ExecutionOutcome {
                    result: Some("0.08".to_string()),
                    error: None,
                })
            });

        let result = pipeline(&dir, compiler, runner)
            .debug(request(Some("9.08")))
            .await
            .unwrap();

        assert_eq!(
            result,
            DebugResult {
                result: Some("0.08".to_string()),
                error: None,
            }
        );
        assert_eq!(leftovers(&dir), 0);
    }

    #[tokio::test]
    async fn test_debug_without_input_sends_empty_stdin() {
        let dir = sandbox_dir();
        let mut compiler = MockCompiler::new();
        compiler.expect_compile().returning(|_| Ok(()));
        let mut runner = MockRunner::new();
        runner
            .expect_run()
            .withf(|_, stdin| stdin.is_empty())
            .times(1)
            .returning(|_, _| Ok(ExecutionOutcome::default()));

        let result = pipeline(&dir, compiler, runner)
            .debug(request(None))
            .await
            .unwrap();

        assert_eq!(result, DebugResult::default());
    }

    #[tokio::test]
    async fn test_debug_compile_error_skips_execution() {
        let dir = sandbox_dir();
        let mut compiler = MockCompiler::new();
        compiler.expect_compile().returning(|_| {
            Err(CompileError::Diagnostic {
                msg: "some error".to_string(),
            })
        });
        let mut runner = MockRunner::new();
        runner.expect_run().never();

        let result = pipeline(&dir, compiler, runner)
            .debug(request(Some("1")))
            .await
            .unwrap();

        assert_eq!(
            result,
            DebugResult {
                result: None,
                error: Some("some error".to_string()),
            }
        );
        assert_eq!(leftovers(&dir), 0);
    }

    #[tokio::test]
    async fn test_debug_compile_timeout() {
        let dir = sandbox_dir();
        let mut compiler = MockCompiler::new();
        compiler
            .expect_compile()
            .returning(|_| Err(CompileError::TimedOut));
        let mut runner = MockRunner::new();
        runner.expect_run().never();

        let result = pipeline(&dir, compiler, runner)
            .debug(request(None))
            .await
            .unwrap();

        assert_eq!(result.error.as_deref(), Some(TIMEOUT_MSG));
    }

    #[tokio::test]
    async fn test_debug_compiler_fault_is_escalated_and_released() {
        let dir = sandbox_dir();
        let mut compiler = MockCompiler::new();
        compiler.expect_compile().returning(|_| {
            Err(CompileError::Tool {
                msg: COMPILER_FAULT_MSG.to_string(),
                details: "No such file or directory (os error 2)".to_string(),
            })
        });
        let mut runner = MockRunner::new();
        runner.expect_run().never();

        let result = pipeline(&dir, compiler, runner).debug(request(None)).await;

        assert!(matches!(
            result,
            Err(SubmissionError::CompilerFault { ref msg, ref details })
                if msg == COMPILER_FAULT_MSG && details.contains("os error 2")
        ));
        assert_eq!(leftovers(&dir), 0);
    }

    #[tokio::test]
    async fn test_debug_run_errors_are_folded_into_result() {
        let cases = [
            (RunError::TimedOut, Some(TIMEOUT_MSG.to_string())),
            (
                RunError::Launch {
                    msg: "Permission denied (os error 13)".to_string(),
                },
                Some("Permission denied (os error 13)".to_string()),
            ),
        ];

        for (run_error, expected_error) in cases {
            let dir = sandbox_dir();
            let mut compiler = MockCompiler::new();
            compiler.expect_compile().returning(|_| Ok(()));
            let mut runner = MockRunner::new();
            runner.expect_run().return_const(Err(run_error));

            let result = pipeline(&dir, compiler, runner)
                .debug(request(None))
                .await
                .unwrap();

            assert_eq!(
                result,
                DebugResult {
                    result: None,
                    error: expected_error,
                }
            );
        }
    }

    #[tokio::test]
    async fn test_cancelled_debug_releases_artifact() {
        let dir = sandbox_dir();
        let mut compiler = MockCompiler::new();
        compiler.expect_compile().times(1).returning(|artifact| {
            assert!(artifact.source_path.exists());
            Ok(())
        });
        let pipeline = pipeline(&dir, compiler, StalledRunner);

        let result =
            tokio::time::timeout(Duration::from_millis(200), pipeline.debug(request(None))).await;

        assert!(result.is_err());
        assert_eq!(leftovers(&dir), 0);
    }
}

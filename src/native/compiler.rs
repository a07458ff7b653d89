use std::time::Duration;

use tokio::process::Command;

use crate::config::{Config, Toolchain};
use crate::constants::COMPILER_FAULT_MSG;
use crate::core::{
    domain::Artifact,
    sanitize::Sanitizer,
    traits::compiler::{CompileError, Compiler},
};
use crate::native::process::{Finished, run_with_timeout};

/// Runs the external toolchain as `compiler_path [compiler_args...] <source>`.
#[derive(Clone, Debug)]
pub struct NativeCompiler {
    toolchain: Toolchain,
    timeout: Duration,
    sanitizer: Sanitizer,
}

impl NativeCompiler {
    pub fn new(toolchain: Toolchain, timeout: Duration, sanitizer: Sanitizer) -> Self {
        NativeCompiler {
            toolchain,
            timeout,
            sanitizer,
        }
    }

    pub fn from_config(config: &Config, sanitizer: Sanitizer) -> Self {
        Self::new(config.toolchain.clone(), config.timeout, sanitizer)
    }
}

#[async_trait::async_trait]
impl Compiler for NativeCompiler {
    #[tracing::instrument(skip(self, artifact), fields(artifact = %artifact.id))]
    async fn compile(&self, artifact: &Artifact) -> Result<(), CompileError> {
        let mut cmd = Command::new(&self.toolchain.compiler_path);
        cmd.args(&self.toolchain.compiler_args)
            .arg(&artifact.source_path);

        let finished = run_with_timeout(cmd, None, self.timeout)
            .await
            .map_err(|e| CompileError::Tool {
                msg: COMPILER_FAULT_MSG.to_string(),
                details: e.to_string(),
            })?;

        let captured = match finished {
            Finished::Completed(captured) => captured,
            Finished::TimedOut => return Err(CompileError::TimedOut),
        };
        tracing::debug!("Compiler output: {:?}", captured);

        // Some toolchains report errors on stdout.
        let diagnostic = if !captured.stdout.is_empty()
            && captured.stdout != self.toolchain.success_marker
        {
            captured.stdout
        } else {
            captured.stderr
        };

        match self.sanitizer.clean_error(&diagnostic) {
            Some(msg) => Err(CompileError::Diagnostic { msg }),
            None => Ok(()),
        }
    }
}

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use tokio::process::Command;

use crate::config::{Config, SandboxIdentity};
use crate::constants::CORRUPTED_OUTPUT_MSG;
use crate::core::{
    domain::{Artifact, ExecutionOutcome},
    sanitize::Sanitizer,
    traits::{
        privileges::PrivilegeDropper,
        runner::{RunError, Runner},
    },
};
use crate::native::process::{Captured, Finished, run_with_timeout};

/// Stdout produced when the runtime reads past the end of its input.
const CORRUPTED_STDOUT: &str = "\u{ffff}";

#[derive(Clone, Debug)]
pub struct NativeRunner {
    runner_path: Option<PathBuf>,
    timeout: Duration,
    identity: SandboxIdentity,
    dropper: Arc<dyn PrivilegeDropper>,
    sanitizer: Sanitizer,
}

impl NativeRunner {
    pub fn new(
        runner_path: Option<PathBuf>,
        timeout: Duration,
        identity: SandboxIdentity,
        dropper: Arc<dyn PrivilegeDropper>,
        sanitizer: Sanitizer,
    ) -> Self {
        NativeRunner {
            runner_path,
            timeout,
            identity,
            dropper,
            sanitizer,
        }
    }

    pub fn from_config(
        config: &Config,
        dropper: Arc<dyn PrivilegeDropper>,
        sanitizer: Sanitizer,
    ) -> Self {
        Self::new(
            config.toolchain.runner_path.clone(),
            config.timeout,
            config.identity,
            dropper,
            sanitizer,
        )
    }

    fn command(&self, artifact: &Artifact) -> Command {
        let mut cmd = match &self.runner_path {
            Some(launcher) => {
                let mut cmd = Command::new(launcher);
                cmd.arg(&artifact.binary_path);
                cmd
            }
            None => Command::new(&artifact.binary_path),
        };

        let dropper = self.dropper.clone();
        let identity = self.identity;
        // SAFETY: the hook runs between fork and exec and only issues the
        // set*id syscalls performed by the dropper.
        unsafe {
            cmd.pre_exec(move || dropper.drop_privileges(identity));
        }
        cmd
    }

    fn outcome(&self, captured: Captured) -> ExecutionOutcome {
        if captured.stdout == CORRUPTED_STDOUT {
            return ExecutionOutcome::failed(CORRUPTED_OUTPUT_MSG);
        }

        ExecutionOutcome {
            result: self.sanitizer.clean_result(&captured.stdout),
            error: self.sanitizer.clean_error(&captured.stderr),
        }
    }
}

#[async_trait::async_trait]
impl Runner for NativeRunner {
    #[tracing::instrument(skip(self, artifact, stdin), fields(artifact = %artifact.id))]
    async fn run(&self, artifact: &Artifact, stdin: &str) -> Result<ExecutionOutcome, RunError> {
        let finished = run_with_timeout(self.command(artifact), Some(stdin), self.timeout)
            .await
            .map_err(|e| RunError::Launch { msg: e.to_string() })?;

        match finished {
            Finished::Completed(captured) => {
                tracing::debug!("Program output: {:?}", captured);
                Ok(self.outcome(captured))
            }
            Finished::TimedOut => Err(RunError::TimedOut),
        }
    }
}

#[cfg(test)]
mod tests {
    use std::io;
    use std::path::Path;

    use nix::errno::Errno;
    use nix::unistd::{getegid, geteuid};
    use tokio::fs;
    use uuid::Uuid;

    use super::*;
    use crate::native::privileges::SetuidDropper;

    #[derive(Debug)]
    struct DenyingDropper;

    impl PrivilegeDropper for DenyingDropper {
        fn drop_privileges(&self, _identity: SandboxIdentity) -> io::Result<()> {
            Err(Errno::EPERM.into())
        }
    }

    fn current_identity() -> SandboxIdentity {
        SandboxIdentity {
            uid: geteuid().as_raw(),
            gid: getegid().as_raw(),
        }
    }

    async fn shell_artifact(dir: &Path, program: &str) -> Artifact {
        fs::create_dir_all(dir).await.unwrap();
        let id = Uuid::new_v4();
        let artifact = Artifact {
            id,
            source_path: dir.join(format!("{}.pas", id)),
            binary_path: dir.join(format!("{}.exe", id)),
        };
        fs::write(&artifact.binary_path, program).await.unwrap();
        artifact
    }

    fn runner(timeout: Duration, dropper: Arc<dyn PrivilegeDropper>) -> NativeRunner {
        NativeRunner::new(
            Some(PathBuf::from("/bin/sh")),
            timeout,
            current_identity(),
            dropper,
            Sanitizer::new("pas").unwrap(),
        )
    }

    async fn run_program(
        program: &str,
        stdin: &str,
        timeout: Duration,
    ) -> Result<ExecutionOutcome, RunError> {
        let dir = PathBuf::from(format!("/tmp/coderunner_{}", Uuid::new_v4()));
        let artifact = shell_artifact(&dir, program).await;

        let result = runner(timeout, Arc::new(SetuidDropper))
            .run(&artifact, stdin)
            .await;

        let _ = fs::remove_dir_all(&dir).await;
        result
    }

    #[tokio::test]
    async fn test_run_integer_division() {
        let program = "read n\nread k\necho $((k / n))\necho $((k % n))\n";

        let outcome = run_program(program, "6\n50", Duration::from_secs(5)).await;

        assert_eq!(
            outcome,
            Ok(ExecutionOutcome {
                result: Some("8\n2".to_string()),
                error: None,
            })
        );
    }

    #[tokio::test]
    async fn test_run_empty_output() {
        let outcome = run_program("exit 0", "", Duration::from_secs(5)).await;

        assert_eq!(outcome, Ok(ExecutionOutcome::default()));
    }

    #[tokio::test]
    async fn test_run_exit_status_is_ignored() {
        let outcome = run_program("echo partial\nexit 3", "", Duration::from_secs(5)).await;

        assert_eq!(outcome.unwrap().result.as_deref(), Some("partial"));
    }

    #[tokio::test]
    async fn test_run_stderr_becomes_error() {
        let outcome = run_program(
            "echo 42\necho \"Unhandled Exception in /tmp/x/abc.pas\" >&2",
            "",
            Duration::from_secs(5),
        )
        .await
        .unwrap();

        assert_eq!(outcome.result.as_deref(), Some("42"));
        assert_eq!(outcome.error.as_deref(), Some("Unhandled Exception in main.pas"));
    }

    #[tokio::test]
    async fn test_run_corrupted_output() {
        let outcome = run_program(
            "printf '\\357\\277\\277'\necho noise >&2",
            "",
            Duration::from_secs(5),
        )
        .await;

        assert_eq!(outcome, Ok(ExecutionOutcome::failed(CORRUPTED_OUTPUT_MSG)));
    }

    #[tokio::test]
    async fn test_run_killed_in_stderr_prose() {
        let outcome = run_program(
            "echo 5\necho 'Monster Killed by player' >&2",
            "",
            Duration::from_secs(5),
        )
        .await;

        assert_eq!(
            outcome,
            Ok(ExecutionOutcome {
                result: Some("5".to_string()),
                error: Some("Monster Killed by player".to_string()),
            })
        );
    }

    #[tokio::test]
    async fn test_run_undecodable_output_is_a_launch_error() {
        let outcome = run_program("printf '\\377\\376ok'", "", Duration::from_secs(5)).await;

        assert!(matches!(outcome, Err(RunError::Launch { .. })), "{:?}", outcome);
    }

    #[tokio::test]
    async fn test_run_timeout() {
        let outcome = run_program("while :; do :; done", "", Duration::from_secs(1)).await;

        assert_eq!(outcome, Err(RunError::TimedOut));
    }

    #[tokio::test]
    async fn test_run_failed_privilege_drop_aborts_launch() {
        let dir = PathBuf::from(format!("/tmp/coderunner_{}", Uuid::new_v4()));
        let marker = dir.join("ran");
        let artifact = shell_artifact(&dir, &format!("touch {}", marker.display())).await;

        let result = runner(Duration::from_secs(5), Arc::new(DenyingDropper))
            .run(&artifact, "")
            .await;

        assert!(matches!(result, Err(RunError::Launch { .. })));
        assert!(!marker.exists());
        let _ = fs::remove_dir_all(&dir).await;
    }

    #[tokio::test]
    async fn test_run_missing_binary_without_launcher() {
        let runner = NativeRunner::new(
            None,
            Duration::from_secs(1),
            current_identity(),
            Arc::new(SetuidDropper),
            Sanitizer::new("pas").unwrap(),
        );
        let id = Uuid::new_v4();
        let artifact = Artifact {
            id,
            source_path: PathBuf::from(format!("/tmp/{}.pas", id)),
            binary_path: PathBuf::from(format!("/tmp/{}.exe", id)),
        };

        let result = runner.run(&artifact, "").await;

        assert!(matches!(result, Err(RunError::Launch { .. })));
    }
}

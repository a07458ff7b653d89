use crate::constants::TIMEOUT_MSG;
use crate::core::domain::{Artifact, ExecutionOutcome};

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RunError {
    #[error("{}", TIMEOUT_MSG)]
    TimedOut,
    #[error("{msg}")]
    Launch { msg: String },
}

#[mockall::automock]
#[async_trait::async_trait]
pub trait Runner: std::fmt::Debug + Send + Sync {
    /// Runs the compiled artifact, feeding `stdin` and closing it. The
    /// returned outcome is already sanitized.
    async fn run(&self, artifact: &Artifact, stdin: &str) -> Result<ExecutionOutcome, RunError>;
}

use crate::constants::TIMEOUT_MSG;
use crate::core::domain::Artifact;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CompileError {
    #[error("{}", TIMEOUT_MSG)]
    TimedOut,
    /// Sanitized toolchain diagnostic; user-facing.
    #[error("{msg}")]
    Diagnostic { msg: String },
    /// The toolchain could not be launched or talked to.
    #[error("{msg}: {details}")]
    Tool { msg: String, details: String },
}

#[mockall::automock]
#[async_trait::async_trait]
pub trait Compiler: std::fmt::Debug + Send + Sync {
    /// Builds `artifact.binary_path` from `artifact.source_path`.
    async fn compile(&self, artifact: &Artifact) -> Result<(), CompileError>;
}

use std::path::PathBuf;

use crate::core::domain::{ExecutionRequest, ExecutionResult};

/// Runs submitted source code to completion or timeout.
///
/// A failing user program is reported through `ExecutionResult`, never as an
/// `Err`. Errors are reserved for requests that cannot be run at all.
#[mockall::automock]
#[async_trait::async_trait]
pub trait Executor: std::fmt::Debug + Send + Sync {
    async fn execute(&self, request: &ExecutionRequest) -> Result<ExecutionResult, ExecuteError>;
}

#[derive(Debug, thiserror::Error)]
pub enum ExecuteError {
    #[error("Language {0} is not supported")]
    UnsupportedLanguage(String),
    #[error("Failed to create workspace {}: {source}", path.display())]
    Workspace {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

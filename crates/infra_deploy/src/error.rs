//! Error types for deployment.

use thiserror::Error;

use infra_stack::StackError;

/// Result type alias for deployment operations.
pub type DeployResult<T> = Result<T, DeployError>;

/// Errors that can occur while deploying or tearing down a stack.
#[derive(Error, Debug)]
pub enum DeployError {
    #[error("Deployment engine not available: {0}")]
    EngineUnavailable(String),

    #[error("Command `{command}` failed with exit code {exit_code}: {stderr}")]
    CommandFailed {
        command: String,
        exit_code: i32,
        stderr: String,
    },

    #[error("Deployment failed: {0}")]
    DeploymentFailed(String),

    #[error("Stack not found: {0}")]
    StackNotFound(String),

    #[error("Synthesis error: {0}")]
    Synthesis(#[from] StackError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

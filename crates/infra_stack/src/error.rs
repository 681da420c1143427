//! Error types for stack composition.

use thiserror::Error;

/// Result type alias for stack operations.
pub type StackResult<T> = Result<T, StackError>;

/// Errors that can occur while composing or synthesizing a stack.
#[derive(Error, Debug)]
pub enum StackError {
    #[error("Invalid logical id: {0}")]
    InvalidLogicalId(String),

    #[error("Duplicate logical id: {0}")]
    DuplicateLogicalId(String),

    #[error("Resource {resource} references undeclared {target}")]
    DanglingReference { resource: String, target: String },

    #[error("Resource not found: {0}")]
    ResourceNotFound(String),

    #[error("Duplicate output: {0}")]
    DuplicateOutput(String),

    #[error("Dependency cycle detected among: {0}")]
    DependencyCycle(String),

    #[error("Invalid CIDR block: {0}")]
    InvalidCidr(String),

    #[error("CIDR block {cidr} has no room for another /{mask} subnet")]
    CidrExhausted { cidr: String, mask: u8 },

    #[error("Invalid stack configuration: {0}")]
    InvalidConfig(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

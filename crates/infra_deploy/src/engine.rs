//! Deployment engine trait and types.

use std::path::PathBuf;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::DeployResult;

/// Capabilities the stack needs because it creates named IAM resources.
pub const IAM_CAPABILITIES: [&str; 2] = ["CAPABILITY_IAM", "CAPABILITY_NAMED_IAM"];

/// A synthesized template ready to be applied.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeployRequest {
    pub stack_name: String,
    pub template_path: PathBuf,
    pub capabilities: Vec<String>,
}

impl DeployRequest {
    pub fn new(stack_name: impl Into<String>, template_path: impl Into<PathBuf>) -> Self {
        Self {
            stack_name: stack_name.into(),
            template_path: template_path.into(),
            capabilities: IAM_CAPABILITIES.iter().map(|c| c.to_string()).collect(),
        }
    }
}

/// One published output of a deployed stack.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StackOutput {
    #[serde(rename = "OutputKey")]
    pub key: String,
    #[serde(rename = "OutputValue")]
    pub value: String,
    #[serde(rename = "Description", default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

impl StackOutput {
    pub fn new(key: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            value: value.into(),
            description: None,
        }
    }
}

/// Engine that turns a template into running infrastructure.
///
/// Every operation either completes or fails as a whole; partial results
/// are never reported as success.
#[async_trait]
pub trait DeployEngine: Send + Sync {
    /// Short engine name for logs.
    fn name(&self) -> &str;

    /// Check whether the engine can be used from this machine.
    async fn is_available(&self) -> DeployResult<bool>;

    /// Create or update the stack from the request's template.
    async fn deploy(&self, request: &DeployRequest) -> DeployResult<()>;

    /// Delete the stack and wait until it is gone.
    async fn destroy(&self, stack_name: &str) -> DeployResult<()>;

    /// Outputs of a deployed stack.
    async fn describe_outputs(&self, stack_name: &str) -> DeployResult<Vec<StackOutput>>;
}

//! Container image registry.

use serde_json::json;

use crate::error::StackResult;
use crate::resource::{LogicalId, RemovalPolicy, Resource};
use crate::stack::Stack;
use crate::token::Token;

#[derive(Debug, Clone)]
pub struct RepositoryHandle {
    pub id: LogicalId,
}

impl RepositoryHandle {
    pub fn uri(&self) -> Token {
        self.id.att("RepositoryUri")
    }

    pub fn arn(&self) -> Token {
        self.id.att("Arn")
    }

    /// Image reference `<uri>:<tag>`.
    pub fn image(&self, tag: &str) -> Token {
        Token::concat(vec![self.uri(), Token::lit(format!(":{}", tag))])
    }
}

/// Declare an image repository that scans on push and is emptied and
/// removed with the stack.
pub fn create_repository(stack: &mut Stack, name: &str) -> StackResult<RepositoryHandle> {
    let id = stack.add(
        name,
        Resource::new("AWS::ECR::Repository")
            .prop("EmptyOnDelete", true)
            .prop("ImageScanningConfiguration", json!({ "ScanOnPush": true }))
            .prop("ImageTagMutability", "MUTABLE")
            .removal_policy(RemovalPolicy::Destroy),
    )?;
    Ok(RepositoryHandle { id })
}

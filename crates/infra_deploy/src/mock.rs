//! Mock deployment engine for testing.
//!
//! Captures every call and keeps an in-memory set of deployed stacks, so the
//! deployment flow can be tested without a cloud account.

use std::collections::HashSet;
use std::path::PathBuf;
use std::sync::Arc;

use async_trait::async_trait;
use parking_lot::RwLock;

use crate::engine::{DeployEngine, DeployRequest, StackOutput};
use crate::error::{DeployError, DeployResult};

/// Captured call information for verification.
#[derive(Debug, Clone)]
pub struct CapturedCall {
    pub method: String,
    pub stack_name: Option<String>,
    pub template_path: Option<PathBuf>,
    /// Whether the template file existed when `deploy` was called.
    pub template_present: bool,
}

impl CapturedCall {
    fn new(method: &str, stack_name: Option<&str>) -> Self {
        Self {
            method: method.to_string(),
            stack_name: stack_name.map(str::to_string),
            template_path: None,
            template_present: false,
        }
    }
}

#[derive(Clone)]
pub struct MockEngine {
    available: Arc<RwLock<bool>>,
    outputs: Arc<RwLock<Vec<StackOutput>>>,
    deployed: Arc<RwLock<HashSet<String>>>,
    captured_calls: Arc<RwLock<Vec<CapturedCall>>>,
    /// Method to fail, with the message to fail with. `None` fails every
    /// method.
    simulate_failure: Arc<RwLock<Option<(Option<String>, String)>>>,
}

impl Default for MockEngine {
    fn default() -> Self {
        Self::new()
    }
}

impl MockEngine {
    pub fn new() -> Self {
        Self {
            available: Arc::new(RwLock::new(true)),
            outputs: Arc::new(RwLock::new(Vec::new())),
            deployed: Arc::new(RwLock::new(HashSet::new())),
            captured_calls: Arc::new(RwLock::new(Vec::new())),
            simulate_failure: Arc::new(RwLock::new(None)),
        }
    }

    pub fn set_available(self, available: bool) -> Self {
        *self.available.write() = available;
        self
    }

    /// Outputs reported for every deployed stack.
    pub fn with_outputs(self, outputs: Vec<StackOutput>) -> Self {
        *self.outputs.write() = outputs;
        self
    }

    /// Pretend a stack is already deployed.
    pub fn with_deployed(self, stack_name: impl Into<String>) -> Self {
        self.deployed.write().insert(stack_name.into());
        self
    }

    /// Fail every engine operation.
    pub fn simulate_failure(self, message: impl Into<String>) -> Self {
        *self.simulate_failure.write() = Some((None, message.into()));
        self
    }

    /// Fail only the named operation.
    pub fn fail_on(self, method: impl Into<String>, message: impl Into<String>) -> Self {
        *self.simulate_failure.write() = Some((Some(method.into()), message.into()));
        self
    }

    pub fn get_calls(&self) -> Vec<CapturedCall> {
        self.captured_calls.read().clone()
    }

    pub fn was_called(&self, method: &str) -> bool {
        self.captured_calls.read().iter().any(|c| c.method == method)
    }

    pub fn get_method_calls(&self, method: &str) -> Vec<CapturedCall> {
        self.captured_calls
            .read()
            .iter()
            .filter(|c| c.method == method)
            .cloned()
            .collect()
    }

    pub fn is_deployed(&self, stack_name: &str) -> bool {
        self.deployed.read().contains(stack_name)
    }

    fn record_call(&self, call: CapturedCall) {
        self.captured_calls.write().push(call);
    }

    fn check_failure(&self, method: &str) -> DeployResult<()> {
        if let Some((target, message)) = self.simulate_failure.read().clone() {
            if target.as_deref().map_or(true, |t| t == method) {
                return Err(DeployError::CommandFailed {
                    command: format!("mock {}", method),
                    exit_code: 1,
                    stderr: message,
                });
            }
        }
        Ok(())
    }
}

#[async_trait]
impl DeployEngine for MockEngine {
    fn name(&self) -> &str {
        "mock"
    }

    async fn is_available(&self) -> DeployResult<bool> {
        self.record_call(CapturedCall::new("is_available", None));
        Ok(*self.available.read())
    }

    async fn deploy(&self, request: &DeployRequest) -> DeployResult<()> {
        let mut call = CapturedCall::new("deploy", Some(&request.stack_name));
        call.template_present = request.template_path.exists();
        call.template_path = Some(request.template_path.clone());
        self.record_call(call);

        self.check_failure("deploy")?;
        self.deployed.write().insert(request.stack_name.clone());
        Ok(())
    }

    async fn destroy(&self, stack_name: &str) -> DeployResult<()> {
        self.record_call(CapturedCall::new("destroy", Some(stack_name)));
        self.check_failure("destroy")?;
        if !self.deployed.write().remove(stack_name) {
            return Err(DeployError::StackNotFound(stack_name.to_string()));
        }
        Ok(())
    }

    async fn describe_outputs(&self, stack_name: &str) -> DeployResult<Vec<StackOutput>> {
        self.record_call(CapturedCall::new("describe_outputs", Some(stack_name)));
        self.check_failure("describe_outputs")?;
        if !self.is_deployed(stack_name) {
            return Err(DeployError::StackNotFound(stack_name.to_string()));
        }
        Ok(self.outputs.read().clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_mock_tracks_deployed_stacks() {
        let engine = MockEngine::new().with_outputs(vec![StackOutput::new("DatabaseName", "appdb")]);

        engine.deploy(&DeployRequest::new("s", "/tmp/s.template.json")).await.unwrap();
        assert!(engine.is_deployed("s"));
        assert_eq!(engine.describe_outputs("s").await.unwrap()[0].value, "appdb");

        engine.destroy("s").await.unwrap();
        assert!(!engine.is_deployed("s"));
        assert!(matches!(
            engine.describe_outputs("s").await,
            Err(DeployError::StackNotFound(_))
        ));
    }

    #[tokio::test]
    async fn test_mock_targeted_failure() {
        let engine = MockEngine::new().fail_on("describe_outputs", "throttled");

        engine.deploy(&DeployRequest::new("s", "/tmp/s.template.json")).await.unwrap();
        let err = engine.describe_outputs("s").await.unwrap_err();
        assert!(err.to_string().contains("throttled"));
    }

    #[tokio::test]
    async fn test_mock_captures_calls() {
        let engine = MockEngine::new().simulate_failure("boom");
        let _ = engine.deploy(&DeployRequest::new("s", "/tmp/missing.json")).await;

        let calls = engine.get_method_calls("deploy");
        assert_eq!(calls.len(), 1);
        assert_eq!(calls[0].stack_name.as_deref(), Some("s"));
        assert!(!calls[0].template_present);
        assert!(!engine.is_deployed("s"));
    }
}

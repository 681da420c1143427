//! End-to-end deployment: synthesize, apply, read back outputs.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{error, info};
use uuid::Uuid;

use infra_stack::{assemble, StackConfig, StackError, TemplateFormat};

use crate::engine::{DeployEngine, DeployRequest, StackOutput};
use crate::error::{DeployError, DeployResult};

/// Record of one successful deployment.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeploymentReport {
    pub deployment_id: Uuid,
    pub stack_name: String,
    pub engine: String,
    /// Where the template was written, when it was kept.
    pub template_path: Option<PathBuf>,
    pub resource_count: usize,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    pub outputs: Vec<StackOutput>,
}

impl DeploymentReport {
    pub fn output(&self, key: &str) -> Option<&str> {
        self.outputs
            .iter()
            .find(|o| o.key == key)
            .map(|o| o.value.as_str())
    }

    pub fn duration_ms(&self) -> i64 {
        (self.finished_at - self.started_at).num_milliseconds()
    }
}

/// Failing to write the template is a file system problem, not a
/// synthesis one.
fn write_error(e: StackError) -> DeployError {
    match e {
        StackError::Io(e) => DeployError::Io(e),
        other => DeployError::Synthesis(other),
    }
}

/// Drives a [`DeployEngine`] through a full deployment.
pub struct Deployer {
    engine: Arc<dyn DeployEngine>,
    workdir: Option<PathBuf>,
    format: TemplateFormat,
}

impl Deployer {
    pub fn new(engine: Arc<dyn DeployEngine>) -> Self {
        Self {
            engine,
            workdir: None,
            format: TemplateFormat::Json,
        }
    }

    /// Keep the synthesized template in `dir` instead of a temporary
    /// directory.
    pub fn with_workdir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.workdir = Some(dir.into());
        self
    }

    pub fn with_format(mut self, format: TemplateFormat) -> Self {
        self.format = format;
        self
    }

    async fn ensure_engine(&self) -> DeployResult<()> {
        if !self.engine.is_available().await? {
            return Err(DeployError::EngineUnavailable(format!(
                "{} engine is not available",
                self.engine.name()
            )));
        }
        Ok(())
    }

    /// Assemble, synthesize and deploy the stack described by `config`.
    /// Any failure fails the whole deployment.
    pub async fn deploy(&self, config: &StackConfig) -> DeployResult<DeploymentReport> {
        let deployment_id = Uuid::new_v4();
        let started_at = Utc::now();
        info!("Starting deployment {} of {}", deployment_id, config.stack_name);

        self.ensure_engine().await?;

        let assembly = assemble(config)?;
        let template = assembly.stack.synth()?;

        // Held until the engine is done with the template.
        let scratch;
        let dir: &Path = match &self.workdir {
            Some(dir) => dir,
            None => {
                scratch = tempfile::tempdir()?;
                scratch.path()
            }
        };
        let template_path = template
            .write_to(dir, assembly.stack.name(), self.format)
            .map_err(write_error)?;

        let request = DeployRequest::new(assembly.stack.name(), template_path.clone());
        let outputs = match self.apply(&request).await {
            Ok(outputs) => outputs,
            Err(e) => {
                error!("Deployment {} failed: {}", deployment_id, e);
                return Err(DeployError::DeploymentFailed(format!("{}: {}", request.stack_name, e)));
            }
        };

        let report = DeploymentReport {
            deployment_id,
            stack_name: request.stack_name.clone(),
            engine: self.engine.name().to_string(),
            template_path: self.workdir.as_ref().map(|_| template_path),
            resource_count: template.resources.len(),
            started_at,
            finished_at: Utc::now(),
            outputs,
        };
        info!(
            "Deployment {} of {} finished in {}ms with {} outputs",
            report.deployment_id,
            report.stack_name,
            report.duration_ms(),
            report.outputs.len()
        );
        Ok(report)
    }

    async fn apply(&self, request: &DeployRequest) -> DeployResult<Vec<StackOutput>> {
        self.engine.deploy(request).await?;
        self.engine.describe_outputs(&request.stack_name).await
    }

    /// Tear the whole stack down.
    pub async fn destroy(&self, stack_name: &str) -> DeployResult<()> {
        self.ensure_engine().await?;
        info!("Destroying stack {}", stack_name);
        self.engine.destroy(stack_name).await
    }

    pub async fn outputs(&self, stack_name: &str) -> DeployResult<Vec<StackOutput>> {
        self.ensure_engine().await?;
        self.engine.describe_outputs(stack_name).await
    }
}

//! Deployment through the AWS command line interface.

use std::process::Stdio;

use async_trait::async_trait;
use serde::Deserialize;
use tokio::process::Command;
use tracing::{debug, info, warn};

use crate::engine::{DeployEngine, DeployRequest, StackOutput};
use crate::error::{DeployError, DeployResult};

/// Options for the CLI engine.
#[derive(Debug, Clone)]
pub struct AwsCliOptions {
    /// Executable to invoke.
    pub binary: String,
    /// Region passed to every command; the CLI default when unset.
    pub region: Option<String>,
    /// Named credentials profile.
    pub profile: Option<String>,
    /// Log commands instead of running them.
    pub dry_run: bool,
}

impl Default for AwsCliOptions {
    fn default() -> Self {
        Self {
            binary: "aws".to_string(),
            region: None,
            profile: None,
            dry_run: false,
        }
    }
}

impl AwsCliOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_region(mut self, region: Option<String>) -> Self {
        self.region = region;
        self
    }

    pub fn with_profile(mut self, profile: impl Into<String>) -> Self {
        self.profile = Some(profile.into());
        self
    }

    pub fn dry_run(mut self) -> Self {
        self.dry_run = true;
        self
    }
}

/// Captured result of one CLI invocation.
#[derive(Debug, Clone)]
pub struct CommandOutput {
    pub exit_code: i32,
    pub stdout: String,
    pub stderr: String,
}

/// Engine that shells out to `aws cloudformation`.
pub struct AwsCliEngine {
    options: AwsCliOptions,
}

impl AwsCliEngine {
    pub fn new(options: AwsCliOptions) -> Self {
        Self { options }
    }

    pub fn is_dry_run(&self) -> bool {
        self.options.dry_run
    }

    /// Arguments for `aws cloudformation deploy`.
    pub fn deploy_args(&self, request: &DeployRequest) -> Vec<String> {
        let mut args = vec![
            "cloudformation".to_string(),
            "deploy".to_string(),
            "--template-file".to_string(),
            request.template_path.to_string_lossy().to_string(),
            "--stack-name".to_string(),
            request.stack_name.clone(),
        ];
        if !request.capabilities.is_empty() {
            args.push("--capabilities".to_string());
            args.extend(request.capabilities.iter().cloned());
        }
        args.push("--no-fail-on-empty-changeset".to_string());
        self.push_common(&mut args);
        args
    }

    pub fn delete_args(&self, stack_name: &str) -> Vec<String> {
        let mut args = vec![
            "cloudformation".to_string(),
            "delete-stack".to_string(),
            "--stack-name".to_string(),
            stack_name.to_string(),
        ];
        self.push_common(&mut args);
        args
    }

    pub fn wait_delete_args(&self, stack_name: &str) -> Vec<String> {
        let mut args = vec![
            "cloudformation".to_string(),
            "wait".to_string(),
            "stack-delete-complete".to_string(),
            "--stack-name".to_string(),
            stack_name.to_string(),
        ];
        self.push_common(&mut args);
        args
    }

    pub fn describe_args(&self, stack_name: &str) -> Vec<String> {
        let mut args = vec![
            "cloudformation".to_string(),
            "describe-stacks".to_string(),
            "--stack-name".to_string(),
            stack_name.to_string(),
            "--output".to_string(),
            "json".to_string(),
        ];
        self.push_common(&mut args);
        args
    }

    fn push_common(&self, args: &mut Vec<String>) {
        if let Some(region) = &self.options.region {
            args.push("--region".to_string());
            args.push(region.clone());
        }
        if let Some(profile) = &self.options.profile {
            args.push("--profile".to_string());
            args.push(profile.clone());
        }
    }

    fn format_command(&self, args: &[String]) -> String {
        let mut cmd = self.options.binary.clone();
        for arg in args {
            if arg.contains(' ') {
                cmd.push_str(&format!(" '{}'", arg));
            } else {
                cmd.push_str(&format!(" {}", arg));
            }
        }
        cmd
    }

    async fn run(&self, args: &[String]) -> DeployResult<CommandOutput> {
        let command = self.format_command(args);
        if self.options.dry_run {
            info!("[dry-run] {}", command);
            return Ok(CommandOutput {
                exit_code: 0,
                stdout: String::new(),
                stderr: String::new(),
            });
        }

        debug!("Executing: {}", command);
        let output = Command::new(&self.options.binary)
            .args(args)
            .stdin(Stdio::null())
            .output()
            .await
            .map_err(|e| DeployError::EngineUnavailable(format!("failed to spawn {}: {}", self.options.binary, e)))?;

        let result = CommandOutput {
            // Killed by a signal when there is no code.
            exit_code: output.status.code().unwrap_or(-1),
            stdout: String::from_utf8_lossy(&output.stdout).to_string(),
            stderr: String::from_utf8_lossy(&output.stderr).to_string(),
        };

        if result.exit_code != 0 {
            warn!("{} exited with {}", command, result.exit_code);
            return Err(DeployError::CommandFailed {
                command,
                exit_code: result.exit_code,
                stderr: result.stderr.trim().to_string(),
            });
        }
        Ok(result)
    }
}

#[derive(Debug, Deserialize)]
struct DescribeStacks {
    #[serde(rename = "Stacks", default)]
    stacks: Vec<DescribedStack>,
}

#[derive(Debug, Deserialize)]
struct DescribedStack {
    #[serde(rename = "Outputs", default)]
    outputs: Vec<StackOutput>,
}

/// Parse `describe-stacks` JSON into the outputs of the first stack.
pub fn parse_outputs(stack_name: &str, json: &str) -> DeployResult<Vec<StackOutput>> {
    let described: DescribeStacks = serde_json::from_str(json)?;
    described
        .stacks
        .into_iter()
        .next()
        .map(|s| s.outputs)
        .ok_or_else(|| DeployError::StackNotFound(stack_name.to_string()))
}

#[async_trait]
impl DeployEngine for AwsCliEngine {
    fn name(&self) -> &str {
        "aws-cli"
    }

    async fn is_available(&self) -> DeployResult<bool> {
        if self.options.dry_run {
            return Ok(true);
        }
        let status = Command::new(&self.options.binary)
            .arg("--version")
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .status()
            .await;
        Ok(status.map(|s| s.success()).unwrap_or(false))
    }

    async fn deploy(&self, request: &DeployRequest) -> DeployResult<()> {
        info!("Deploying stack {} from {:?}", request.stack_name, request.template_path);
        self.run(&self.deploy_args(request)).await?;
        info!("Stack {} deployed", request.stack_name);
        Ok(())
    }

    async fn destroy(&self, stack_name: &str) -> DeployResult<()> {
        info!("Deleting stack {}", stack_name);
        self.run(&self.delete_args(stack_name)).await?;
        self.run(&self.wait_delete_args(stack_name)).await?;
        info!("Stack {} deleted", stack_name);
        Ok(())
    }

    async fn describe_outputs(&self, stack_name: &str) -> DeployResult<Vec<StackOutput>> {
        let output = self.run(&self.describe_args(stack_name)).await?;
        if self.options.dry_run {
            return Ok(Vec::new());
        }
        parse_outputs(stack_name, &output.stdout)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_deploy_args() {
        let engine = AwsCliEngine::new(AwsCliOptions::new().with_region(Some("sa-east-1".to_string())));
        let request = DeployRequest::new("CdkInfraTestStack", "/tmp/out/CdkInfraTestStack.template.json");
        let args = engine.deploy_args(&request);

        assert_eq!(&args[..2], &["cloudformation", "deploy"]);
        assert!(args.windows(2).any(|w| w == ["--stack-name", "CdkInfraTestStack"]));
        assert!(args.windows(3).any(|w| w == ["--capabilities", "CAPABILITY_IAM", "CAPABILITY_NAMED_IAM"]));
        assert!(args.contains(&"--no-fail-on-empty-changeset".to_string()));
        assert_eq!(&args[args.len() - 2..], &["--region", "sa-east-1"]);
    }

    #[test]
    fn test_args_without_region_or_profile() {
        let engine = AwsCliEngine::new(AwsCliOptions::new());
        let args = engine.delete_args("s");
        assert_eq!(args, vec!["cloudformation", "delete-stack", "--stack-name", "s"]);
    }

    #[test]
    fn test_parse_outputs() {
        let json = r#"{
            "Stacks": [{
                "StackName": "CdkInfraTestStack",
                "Outputs": [
                    { "OutputKey": "DatabaseName", "OutputValue": "appdb", "Description": "Database name" },
                    { "OutputKey": "PuppetBucketName", "OutputValue": "puppet-bucket" }
                ]
            }]
        }"#;
        let outputs = parse_outputs("CdkInfraTestStack", json).unwrap();
        assert_eq!(outputs.len(), 2);
        assert_eq!(outputs[0].value, "appdb");
        assert_eq!(outputs[0].description.as_deref(), Some("Database name"));
        assert_eq!(outputs[1].description, None);
    }

    #[test]
    fn test_parse_outputs_missing_stack() {
        let err = parse_outputs("gone", r#"{ "Stacks": [] }"#).unwrap_err();
        assert!(matches!(err, DeployError::StackNotFound(_)));
    }

    #[tokio::test]
    async fn test_dry_run_runs_nothing() {
        let engine = AwsCliEngine::new(AwsCliOptions::new().dry_run());
        assert!(engine.is_available().await.unwrap());

        let request = DeployRequest::new("s", "/nonexistent/s.template.json");
        engine.deploy(&request).await.unwrap();
        engine.destroy("s").await.unwrap();
        assert!(engine.describe_outputs("s").await.unwrap().is_empty());
    }
}

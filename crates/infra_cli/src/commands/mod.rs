//! CLI command definitions.
//!
//! Each subcommand maps to one step of the stack lifecycle: synthesize,
//! inspect, deploy, tear down, or run the service the stack hosts.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use tracing::debug;

use infra_stack::{StackConfig, TemplateFormat};

pub mod deploy;
pub mod destroy;
pub mod outputs;
pub mod plan;
pub mod serve;
pub mod synth;
pub mod verify;

/// infra - devopstest stack tooling
#[derive(Parser)]
#[command(name = "infra")]
#[command(version, about = "infra - synthesize, verify and deploy the devopstest stack")]
#[command(long_about = r#"
infra composes the devopstest cloud stack (network, VPN, bastion, Aurora
PostgreSQL, registry, Fargate service and load balancer) into a
CloudFormation template and drives its lifecycle.

WORKFLOWS:
  synth     → Write the synthesized template
  plan      → Show resource creation waves
  verify    → Run structural checks on the template
  deploy    → Synthesize and deploy the stack
  destroy   → Delete the deployed stack
  outputs   → Print the deployed stack's outputs
  serve     → Run the items HTTP service

EXIT CODES:
  0 - Success
  1 - General error
  2 - Invalid arguments
  3 - Verification failure
  4 - Synthesis error
  5 - Deployment error
"#)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Enable verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Suppress non-essential output
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Log line format
    #[arg(long, global = true, value_enum, default_value_t = LogFormat::Text)]
    pub log_format: LogFormat,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum LogFormat {
    Text,
    Json,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Synthesize the stack template
    Synth(synth::SynthArgs),

    /// Show the order resources are created in
    Plan(plan::PlanArgs),

    /// Run structural checks on the synthesized template
    Verify(verify::VerifyArgs),

    /// Synthesize and deploy the stack
    Deploy(deploy::DeployArgs),

    /// Delete the deployed stack
    Destroy(destroy::DestroyArgs),

    /// Print the deployed stack's outputs
    Outputs(outputs::OutputsArgs),

    /// Run the items HTTP service
    Serve(serve::ServeArgs),
}

/// Errors raised by the CLI itself rather than the libraries.
#[derive(Debug, thiserror::Error)]
pub enum CliError {
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    #[error("Verification failed: {0} check(s) failed")]
    VerificationFailed(usize),
}

/// Load the stack configuration, falling back to the defaults.
pub fn load_config(path: Option<&Path>) -> Result<StackConfig> {
    match path {
        Some(path) => {
            debug!("Loading stack configuration from {}", path.display());
            let config = StackConfig::from_file(path)
                .with_context(|| format!("Failed to load configuration from {}", path.display()))?;
            Ok(config)
        }
        None => Ok(StackConfig::default()),
    }
}

pub fn parse_format(format: &str) -> Result<TemplateFormat> {
    TemplateFormat::from_str(format).ok_or_else(|| {
        CliError::InvalidArgument(format!("unknown template format '{}', expected json or yaml", format)).into()
    })
}

/// Shared `--config` argument.
#[derive(clap::Args, Debug, Clone)]
pub struct ConfigArg {
    /// Stack configuration file (YAML)
    #[arg(short, long, env = "INFRA_CONFIG")]
    pub config: Option<PathBuf>,
}

impl ConfigArg {
    pub fn load(&self) -> Result<StackConfig> {
        load_config(self.config.as_deref())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cli_parses_subcommands() {
        let cli = Cli::try_parse_from(["infra", "synth", "--format", "yaml", "-o", "out"]).unwrap();
        match cli.command {
            Commands::Synth(args) => {
                assert_eq!(args.format, "yaml");
                assert_eq!(args.output, Some(PathBuf::from("out")));
            }
            _ => panic!("expected synth"),
        }

        let cli = Cli::try_parse_from(["infra", "-v", "serve", "--memory"]).unwrap();
        assert!(cli.verbose);
        assert!(matches!(cli.command, Commands::Serve(_)));
    }

    #[test]
    fn test_parse_format() {
        assert_eq!(parse_format("json").unwrap(), TemplateFormat::Json);
        let err = parse_format("xml").unwrap_err();
        assert!(matches!(
            err.downcast_ref::<CliError>(),
            Some(CliError::InvalidArgument(_))
        ));
    }

    #[test]
    fn test_load_config_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("stack.yaml");
        let mut config = StackConfig::default();
        config.stack_name = "EdgeStack".to_string();
        config.to_file(&path).unwrap();

        assert_eq!(load_config(Some(&path)).unwrap().stack_name, "EdgeStack");
        assert_eq!(load_config(None).unwrap().stack_name, StackConfig::default().stack_name);
        assert!(load_config(Some(&dir.path().join("missing.yaml"))).is_err());
    }
}

//! Outputs command - Print the deployed stack's outputs.

use std::sync::Arc;

use anyhow::Result;
use clap::Args;

use infra_deploy::{AwsCliEngine, AwsCliOptions, Deployer};

use super::ConfigArg;

#[derive(Args)]
pub struct OutputsArgs {
    #[command(flatten)]
    pub config: ConfigArg,

    /// Stack to describe; defaults to the configured stack name
    #[arg(short, long)]
    pub stack_name: Option<String>,

    /// Print the outputs as JSON
    #[arg(long)]
    pub json: bool,

    /// Named credentials profile
    #[arg(long, env = "AWS_PROFILE")]
    pub profile: Option<String>,
}

pub async fn execute(args: OutputsArgs) -> Result<()> {
    let config = args.config.load()?;
    let stack_name = args.stack_name.unwrap_or(config.stack_name);

    let mut options = AwsCliOptions::new().with_region(config.region);
    if let Some(profile) = args.profile {
        options = options.with_profile(profile);
    }

    let outputs = Deployer::new(Arc::new(AwsCliEngine::new(options)))
        .outputs(&stack_name)
        .await?;

    if args.json {
        println!("{}", serde_json::to_string_pretty(&outputs)?);
        return Ok(());
    }

    println!("📋 Outputs of {}:", stack_name);
    for output in &outputs {
        match &output.description {
            Some(description) => println!("   {} = {}  ({})", output.key, output.value, description),
            None => println!("   {} = {}", output.key, output.value),
        }
    }
    Ok(())
}

//! Destroy command - Delete the deployed stack.

use std::sync::Arc;

use anyhow::Result;
use clap::Args;

use infra_deploy::{AwsCliEngine, AwsCliOptions, Deployer};

use super::ConfigArg;

#[derive(Args)]
pub struct DestroyArgs {
    #[command(flatten)]
    pub config: ConfigArg,

    /// Stack to delete; defaults to the configured stack name
    #[arg(short, long)]
    pub stack_name: Option<String>,

    /// Print the engine commands without running them
    #[arg(long)]
    pub dry_run: bool,

    /// Named credentials profile
    #[arg(long, env = "AWS_PROFILE")]
    pub profile: Option<String>,
}

pub async fn execute(args: DestroyArgs) -> Result<()> {
    let config = args.config.load()?;
    let stack_name = args.stack_name.unwrap_or(config.stack_name);

    let mut options = AwsCliOptions::new().with_region(config.region);
    if let Some(profile) = args.profile {
        options = options.with_profile(profile);
    }
    if args.dry_run {
        options = options.dry_run();
    }

    println!("🗑️  Destroying {}...", stack_name);
    Deployer::new(Arc::new(AwsCliEngine::new(options)))
        .destroy(&stack_name)
        .await?;
    println!("✅ Stack {} deleted", stack_name);

    Ok(())
}

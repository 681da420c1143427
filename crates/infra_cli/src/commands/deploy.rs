//! Deploy command - Synthesize and deploy the stack.

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Result;
use clap::Args;

use infra_deploy::{AwsCliEngine, AwsCliOptions, Deployer};

use super::{parse_format, ConfigArg};

#[derive(Args)]
pub struct DeployArgs {
    #[command(flatten)]
    pub config: ConfigArg,

    /// Print the engine commands without running them
    #[arg(long)]
    pub dry_run: bool,

    /// Keep the synthesized template in this directory
    #[arg(short, long)]
    pub workdir: Option<PathBuf>,

    /// Template format handed to the engine (json or yaml)
    #[arg(short, long, default_value = "json")]
    pub format: String,

    /// Named credentials profile
    #[arg(long, env = "AWS_PROFILE")]
    pub profile: Option<String>,
}

pub async fn execute(args: DeployArgs) -> Result<()> {
    let format = parse_format(&args.format)?;
    let config = args.config.load()?;

    let mut options = AwsCliOptions::new().with_region(config.region.clone());
    if let Some(profile) = args.profile {
        options = options.with_profile(profile);
    }
    if args.dry_run {
        options = options.dry_run();
    }

    let mut deployer = Deployer::new(Arc::new(AwsCliEngine::new(options))).with_format(format);
    if let Some(workdir) = args.workdir {
        deployer = deployer.with_workdir(workdir);
    }

    println!("🚀 Deploying {}...", config.stack_name);
    let report = deployer.deploy(&config).await?;

    println!(
        "✅ Deployed {} ({} resources) in {}ms",
        report.stack_name,
        report.resource_count,
        report.duration_ms()
    );
    if let Some(path) = &report.template_path {
        println!("   Template: {}", path.display());
    }
    for output in &report.outputs {
        println!("   {} = {}", output.key, output.value);
    }

    Ok(())
}

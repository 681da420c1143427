//! Verify command - Run structural checks on the synthesized template.

use std::path::PathBuf;

use anyhow::Result;
use clap::Args;
use tracing::info;

use infra_stack::{assemble, StructuralChecks, Template};

use super::{CliError, ConfigArg};

#[derive(Args)]
pub struct VerifyArgs {
    #[command(flatten)]
    pub config: ConfigArg,

    /// Check an existing template file instead of synthesizing one
    #[arg(short, long)]
    pub template: Option<PathBuf>,

    /// Print the report as JSON
    #[arg(long)]
    pub json: bool,
}

pub async fn execute(args: VerifyArgs) -> Result<()> {
    let config = args.config.load()?;
    let assembly = assemble(&config)?;

    let template = match &args.template {
        Some(path) => {
            info!("Verifying template {}", path.display());
            Template::from_file(path)?
        }
        None => assembly.stack.synth()?,
    };

    let peers = assembly
        .database
        .authorized_groups()
        .iter()
        .map(|id| id.as_str().to_string())
        .collect();
    let report = StructuralChecks::new()
        .with_availability_zones(config.network.max_azs)
        .with_nat_gateways(config.network.nat_gateways)
        .with_database_peers(peers)
        .run(&template);

    if args.json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        println!("🔍 Verifying {}...", assembly.stack.name());
        for check in &report.checks {
            let mark = if check.passed { "✅" } else { "❌" };
            println!("   {} {}: {}", mark, check.name, check.message);
        }
    }

    if !report.passed {
        return Err(CliError::VerificationFailed(report.failures().count()).into());
    }

    if !args.json {
        println!("\n✅ All checks passed");
    }
    Ok(())
}

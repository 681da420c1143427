//! Plan command - Show resource creation waves.

use anyhow::Result;
use clap::Args;

use infra_stack::{assemble, DependencyGraph};

use super::ConfigArg;

#[derive(Args)]
pub struct PlanArgs {
    #[command(flatten)]
    pub config: ConfigArg,

    /// Show each resource's direct dependencies
    #[arg(long)]
    pub dependencies: bool,
}

pub async fn execute(args: PlanArgs) -> Result<()> {
    let config = args.config.load()?;
    let assembly = assemble(&config)?;
    let template = assembly.stack.synth()?;

    let graph = DependencyGraph::from_template(&template)?;
    let waves = graph.creation_waves()?;

    println!("📦 {} ({} resources)", assembly.stack.name(), graph.len());
    for (index, wave) in waves.iter().enumerate() {
        println!("\nWave {} ({} resources):", index + 1, wave.len());
        for id in wave {
            let type_name = template.resource_type(id).unwrap_or("?");
            match graph.dependencies_of(id) {
                Some(deps) if args.dependencies && !deps.is_empty() => {
                    let deps: Vec<&str> = deps.iter().map(String::as_str).collect();
                    println!("   {} [{}] <- {}", id, type_name, deps.join(", "));
                }
                _ => println!("   {} [{}]", id, type_name),
            }
        }
    }

    Ok(())
}

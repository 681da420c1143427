//! Synth command - Write the synthesized template.

use std::path::PathBuf;

use anyhow::Result;
use clap::Args;
use tracing::info;

use infra_stack::{assemble, DependencyGraph};

use super::{parse_format, ConfigArg};

#[derive(Args)]
pub struct SynthArgs {
    #[command(flatten)]
    pub config: ConfigArg,

    /// Directory to write the template into; prints to stdout when omitted
    #[arg(short, long)]
    pub output: Option<PathBuf>,

    /// Template format (json or yaml)
    #[arg(short, long, default_value = "json")]
    pub format: String,
}

pub async fn execute(args: SynthArgs) -> Result<()> {
    let format = parse_format(&args.format)?;
    let config = args.config.load()?;
    info!("Synthesizing stack {}", config.stack_name);

    let assembly = assemble(&config)?;
    let template = assembly.stack.synth()?;
    // A template the engine would reject is not worth writing.
    DependencyGraph::from_template(&template)?.creation_waves()?;

    match args.output {
        Some(dir) => {
            let path = template.write_to(&dir, assembly.stack.name(), format)?;
            println!(
                "✅ Synthesized {} ({} resources, {} outputs) to {}",
                assembly.stack.name(),
                template.resources.len(),
                template.outputs.len(),
                path.display()
            );
        }
        None => println!("{}", template.render(format)?),
    }

    Ok(())
}

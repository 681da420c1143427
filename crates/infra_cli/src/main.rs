//! infra CLI - Main entry point.
//!
//! Exit codes:
//! - 0: Success
//! - 1: General error
//! - 2: Invalid arguments
//! - 3: Verification failure
//! - 4: Synthesis error
//! - 5: Deployment error

use std::process::ExitCode;

use clap::Parser;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

mod commands;

use commands::{Cli, CliError, Commands, LogFormat};
use infra_deploy::DeployError;
use infra_stack::StackError;

/// CI-friendly exit codes
pub struct ExitCodes;

impl ExitCodes {
    pub const SUCCESS: u8 = 0;
    pub const GENERAL_ERROR: u8 = 1;
    pub const INVALID_ARGS: u8 = 2;
    pub const VERIFICATION_FAILURE: u8 = 3;
    pub const SYNTHESIS_ERROR: u8 = 4;
    pub const DEPLOYMENT_ERROR: u8 = 5;
}

fn init_logging(cli: &Cli) {
    let default = if cli.verbose {
        "infra=debug,info"
    } else if cli.quiet {
        "error"
    } else {
        "infra=info,warn"
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));

    // Ignore a second initialization; the first subscriber stays in place.
    let _ = match cli.log_format {
        LogFormat::Text => tracing_subscriber::registry()
            .with(fmt::layer().with_target(false))
            .with(filter)
            .try_init(),
        LogFormat::Json => tracing_subscriber::registry()
            .with(fmt::layer().json().with_target(false))
            .with(filter)
            .try_init(),
    };
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    init_logging(&cli);

    let result = match cli.command {
        Commands::Synth(args) => commands::synth::execute(args).await,
        Commands::Plan(args) => commands::plan::execute(args).await,
        Commands::Verify(args) => commands::verify::execute(args).await,
        Commands::Deploy(args) => commands::deploy::execute(args).await,
        Commands::Destroy(args) => commands::destroy::execute(args).await,
        Commands::Outputs(args) => commands::outputs::execute(args).await,
        Commands::Serve(args) => commands::serve::execute(args).await,
    };

    match result {
        Ok(()) => ExitCode::from(ExitCodes::SUCCESS),
        Err(e) => {
            let exit_code = categorize_error(&e);
            eprintln!("❌ Error: {:#}", e);
            ExitCode::from(exit_code)
        }
    }
}

/// Map an error to its exit code.
fn categorize_error(e: &anyhow::Error) -> u8 {
    if let Some(err) = e.downcast_ref::<CliError>() {
        return match err {
            CliError::InvalidArgument(_) => ExitCodes::INVALID_ARGS,
            CliError::VerificationFailed(_) => ExitCodes::VERIFICATION_FAILURE,
        };
    }
    if let Some(err) = e.downcast_ref::<DeployError>() {
        return match err {
            DeployError::Synthesis(_) => ExitCodes::SYNTHESIS_ERROR,
            _ => ExitCodes::DEPLOYMENT_ERROR,
        };
    }
    if e.downcast_ref::<StackError>().is_some() {
        return ExitCodes::SYNTHESIS_ERROR;
    }
    ExitCodes::GENERAL_ERROR
}

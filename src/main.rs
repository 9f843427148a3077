mod canonical;
mod cli;
mod commands;
mod model;
mod pipeline;
mod util;

use anyhow::Result;
use clap::Parser;
use tracing::error;
use tracing_subscriber::EnvFilter;

use crate::cli::{Cli, Commands};
use crate::pipeline::PipelineError;

fn main() {
    init_tracing();

    if let Err(err) = run() {
        error!(error = %err, "command failed");
        for cause in err.chain().skip(1) {
            error!(cause = %cause, "caused by");
        }
        std::process::exit(exit_code(&err));
    }
}

fn run() -> Result<()> {
    let cli = Cli::parse();

    match cli.command {
        Commands::Ddr(args) => commands::ddr::run(args),
        Commands::Series(args) => commands::series::run(args),
        Commands::Bands(args) => commands::bands::run(args),
        Commands::Harness(args) => commands::harness::run(args),
        Commands::Index(args) => commands::index::run(args),
    }
}

/// Structural violations exit with 2 and missing inputs with 3, wherever
/// they sit in the context chain.
fn exit_code(err: &anyhow::Error) -> i32 {
    err.chain()
        .find_map(|cause| cause.downcast_ref::<PipelineError>())
        .map(PipelineError::exit_code)
        .unwrap_or(1)
}

fn init_tracing() {
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}

use std::process;

use clap::Parser;
use keel::{
    cli::{Cli, Commands},
    process_block::run_process_block,
};
use tracing::error;
use tracing_subscriber::EnvFilter;

fn main() {
    let cli = Cli::parse();

    let directive = match &cli.command {
        Commands::ProcessBlock(config) => config.verbosity.directive(),
    };
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(directive));
    tracing_subscriber::fmt().with_env_filter(env_filter).init();

    let result = match cli.command {
        Commands::ProcessBlock(config) => run_process_block(&config),
    };
    if let Err(err) = result {
        error!("{err:#}");
        process::exit(1);
    }
}

pub mod process_block;
pub mod verbosity;

use clap::{Parser, Subcommand};

use crate::cli::process_block::ProcessBlockConfig;

#[derive(Debug, Parser)]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Apply a signed block to a pre-state and write the post-state
    #[command(name = "process-block")]
    ProcessBlock(ProcessBlockConfig),
}

use std::{path::PathBuf, sync::Arc};

use clap::Parser;
use keel_network_spec::{cli::beacon_network_parser, networks::BeaconNetworkSpec};

use crate::cli::verbosity::{Verbosity, verbosity_parser};

const DEFAULT_NETWORK: &str = "mainnet";

#[derive(Debug, Parser)]
pub struct ProcessBlockConfig {
    /// Verbosity level
    #[arg(short, long, default_value = "3", value_parser = verbosity_parser)]
    pub verbosity: Verbosity,

    #[arg(
        long,
        help = "Choose mainnet, minimal, or the path of a YAML config",
        default_value = DEFAULT_NETWORK,
        value_parser = beacon_network_parser
    )]
    pub network: Arc<BeaconNetworkSpec>,

    #[arg(long, help = "SSZ-snappy encoded pre-state")]
    pub pre: PathBuf,

    #[arg(long, help = "SSZ-snappy encoded signed block")]
    pub block: PathBuf,

    #[arg(long, help = "Where to write the SSZ-snappy encoded post-state")]
    pub output: PathBuf,

    #[arg(long, help = "Skip every signature check except deposit signatures")]
    pub no_verify_signatures: bool,
}

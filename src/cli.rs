use std::path::PathBuf;

use clap::Parser;
use log::LevelFilter;

use crate::VNX_DISCOVERY_VERSION;

/// Collect the configuration inventory of an EMC VNX array as facts
#[derive(Parser, Debug)]
#[clap(version = VNX_DISCOVERY_VERSION)]
pub struct Cli {
    /// Logging verbosity [OFF, ERROR, WARN, INFO, DEBUG, TRACE]
    #[arg(short, long, default_value_t = LevelFilter::Info)]
    pub verbosity: LevelFilter,

    /// EMC VNX array address
    #[arg(long)]
    pub server: Option<String>,

    /// EMC VNX username
    #[arg(long)]
    pub username: Option<String>,

    /// EMC VNX password
    #[arg(long, env = "PASSWORD", hide_env_values = true)]
    pub password: Option<String>,

    /// Seconds allowed for reading and extracting the inventory [default: 240]
    #[arg(long)]
    pub timeout: Option<u64>,

    /// Path to write the facts to
    #[arg(short, long)]
    pub output: Option<PathBuf>,

    /// Staged inventory capture [default: /tmp/emc_discovery_<server>.xml]
    #[arg(long)]
    pub inventory: Option<PathBuf>,

    /// Do not delete the staged capture after reading it
    #[arg(long)]
    pub keep_capture: bool,

    /// YAML configuration file, command line flags take precedence
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// Pretty-print the facts
    #[arg(long)]
    pub pretty: bool,

    /// Fail instead of overwriting when two sections produce the same fact
    #[arg(long)]
    pub strict_merge: bool,

    /// Path to save an eventual fatal error
    #[arg(short, long)]
    pub error: Option<PathBuf>,
}

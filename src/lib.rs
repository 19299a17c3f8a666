pub mod assemble;
pub mod cli;
pub mod config;
pub mod discovery;
pub mod error;
pub mod extract;
pub mod facts;
pub mod xml;

pub use assemble::{FactAssembler, MergePolicy};
pub use config::DiscoveryConfig;
pub use discovery::{collect_facts, discover};
pub use facts::Facts;

/// Version as provided by environment variables at build time
pub const VNX_DISCOVERY_VERSION: &str = match option_env!("VNX_DISCOVERY_VERSION") {
    Some(v) => v,
    None => env!("CARGO_PKG_VERSION"),
};

/// Where the vendor CLI stages its capture for a given array.
pub fn default_capture_path(server: &str) -> std::path::PathBuf {
    format!("/tmp/emc_discovery_{server}.xml").into()
}

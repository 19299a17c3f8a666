//! The top-level sections of the fact mapping.
//!
//! Each section selects its own subtree of the capture and returns the fact
//! entries it owns. Sections never read each other's output.

use serde_json::{Map, Value};

use crate::{error::DiscoveryError, extract::IdentityTable, xml::Document};

pub mod controllers;
pub mod storage;
pub mod subsystem;

/// The normalized fact mapping handed to the caller.
pub type Facts = Map<String, Value>;

/// Signature shared by every top-level extractor.
pub type SectionFn = fn(&Document, &IdentityTable) -> Result<Facts, DiscoveryError>;

#[cfg(test)]
pub(crate) mod test_utils {
    use crate::xml::Document;

    pub const INVENTORY: &str = include_str!("../test_data/inventory.xml");

    pub fn inventory() -> Document {
        Document::parse(INVENTORY).unwrap()
    }
}

use log::{debug, warn};
use serde_json::Value;

use crate::{
    error::DiscoveryError,
    extract::{collection, EntityExtractor, EntityKind, IdentityTable},
    xml::Document,
};

use super::Facts;

const SUBSYSTEM_PATH: &[&str] = &["SAN:Subsystems", "CLAR:CLARiiON"];

/// Containers below the array element that are reported by other sections,
/// or not at all.
pub const NESTED_CONTAINERS: &[&str] = &[
    "Softwares",
    "Physicals",
    "FaultInfos",
    "Logicals",
    "DNS",
    "FileMetaData",
];

static SUBSYSTEM: EntityExtractor =
    EntityExtractor::new(EntityKind::Subsystem).excluding(NESTED_CONTAINERS);
static SOFTWARE: EntityExtractor = EntityExtractor::new(EntityKind::Software);

/// Flat identity fields of the array plus its installed software.
pub fn sub_system_info(
    doc: &Document,
    identities: &IdentityTable,
) -> Result<Facts, DiscoveryError> {
    let Some(array) = doc.select_first(SUBSYSTEM_PATH) else {
        warn!(
            "Inventory has no '//{}' element, namespace prefixes must match exactly",
            SUBSYSTEM_PATH.join("/")
        );
        return Ok(Facts::new());
    };

    let mut facts = SUBSYSTEM.extract(array, identities)?;

    let softwares = match array.child("Softwares") {
        Some(container) => collection(container, &SOFTWARE, identities)?,
        None => Vec::new(),
    };
    debug!("Found {} software packages", softwares.len());
    facts.insert("Softwares".into(), Value::Array(softwares));

    Ok(facts)
}

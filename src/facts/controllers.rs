use log::{debug, warn};
use serde_json::Value;

use crate::{
    error::DiscoveryError,
    extract::{keyed, EntityExtractor, EntityKind, IdentityTable, Members, Record, Route},
    xml::{Document, Element},
};

use super::Facts;

const SERVER_PATH: &[&str] = &["SAN:SAN", "SAN:Servers", "SAN:Server"];

pub const HBA_FIELDS: &[&str] = &[
    "NumberOfHBAPorts",
    "HostLoginStatus",
    "HostManagementStatus",
    "IsAttachedHost",
];
pub const HBA_PORT_FIELDS: &[&str] = &["WWN", "VendorDescription", "NumberOfSPPorts"];

static CONTROLLER: EntityExtractor = EntityExtractor::new(EntityKind::Controller);

static HBA_PORT: EntityExtractor = EntityExtractor::new(EntityKind::HbaPort)
    .selecting(HBA_PORT_FIELDS)
    .strict();
static HBA_ROUTES: [Route; 1] = [Route {
    tag: "HBAPorts",
    key: "hba_ports_info",
    member: Some("HBAPort"),
    members: Members::Keyed,
    extractor: &HBA_PORT,
}];
static HBA_INFO: EntityExtractor = EntityExtractor::new(EntityKind::HbaInfo)
    .selecting(HBA_FIELDS)
    .routing(&HBA_ROUTES)
    .strict();

/// Every attached server as `controllers`, plus the `HBAInfo` of the last
/// server that reports one.
pub fn sub_controller_info(
    doc: &Document,
    identities: &IdentityTable,
) -> Result<Facts, DiscoveryError> {
    let mut facts = Facts::new();
    let mut controllers = Vec::new();
    let mut hba_owner: Option<String> = None;

    let servers = doc.select(SERVER_PATH);
    if servers.is_empty() {
        warn!(
            "Inventory has no '//{}' elements, namespace prefixes must match exactly",
            SERVER_PATH.join("/")
        );
    }

    for server in servers {
        // HBAInfo stays in the controller record as flattened text as well
        let record = CONTROLLER.extract(server, identities)?;
        let name = CONTROLLER.identity(&record, identities)?;

        if let Some(hba) = server.child("HBAInfo") {
            let info = hba_info(hba, identities)?;
            if let Some(previous) = hba_owner.replace(name.clone()) {
                warn!("HBA info of controller '{name}' replaces that of controller '{previous}'");
            }
            facts.insert("HBAInfo".into(), Value::Object(info));
        }

        controllers.push(keyed(name, record));
    }

    debug!("Found {} controllers", controllers.len());
    facts.insert("controllers".into(), Value::Array(controllers));

    Ok(facts)
}

/// Strict extraction of a controller's `HBAInfo` element. Any missing field
/// fails the whole extraction.
pub fn hba_info(hba: &Element, identities: &IdentityTable) -> Result<Record, DiscoveryError> {
    HBA_INFO.extract(hba, identities)
}

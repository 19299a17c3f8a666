use log::debug;
use serde_json::Value;

use crate::{
    error::DiscoveryError,
    extract::{wrap_each, EntityExtractor, EntityKind, IdentityTable, Members, Route},
    xml::Document,
};

use super::Facts;

const DISK_PATH: &[&str] = &["CLAR:Physicals", "CLAR:Disks", "CLAR:Disk"];
const RAID_GROUP_PATH: &[&str] = &["CLAR:Logicals", "CLAR:RAIDGroups", "CLAR:RAIDGroup"];
const DISK_POOL_PATH: &[&str] = &["CLAR:Logicals", "CLAR:Diskpools", "CLAR:Diskpool"];
const POOL_PATH: &[&str] = &[
    "CLAR:Logicals",
    "CLAR:PoolProvisioning",
    "CLAR:PoolProvisioningFeature",
    "CLAR:Pools",
    "CLAR:Pool",
];

static DISK: EntityExtractor = EntityExtractor::new(EntityKind::Disk);

static RAID_GROUP_DISK: EntityExtractor = EntityExtractor::new(EntityKind::RaidGroupDisk);
static RAID_GROUP_ROUTES: [Route; 1] = [Route {
    tag: "Disks",
    key: "disks",
    member: Some("Disk"),
    members: Members::Plain,
    extractor: &RAID_GROUP_DISK,
}];
static RAID_GROUP: EntityExtractor =
    EntityExtractor::new(EntityKind::RaidGroup).routing(&RAID_GROUP_ROUTES);

static DISK_POOL_DISK: EntityExtractor = EntityExtractor::new(EntityKind::DiskPoolDisk);
static DISK_POOL_ROUTES: [Route; 1] = [Route {
    tag: "Disks",
    key: "Disks",
    member: Some("Disk"),
    members: Members::Plain,
    extractor: &DISK_POOL_DISK,
}];
static DISK_POOL: EntityExtractor =
    EntityExtractor::new(EntityKind::DiskPool).routing(&DISK_POOL_ROUTES);

static MLU: EntityExtractor = EntityExtractor::new(EntityKind::Mlu);
static POOL_ROUTES: [Route; 1] = [Route {
    tag: "MLUs",
    key: "MLUs",
    member: Some("MLU"),
    members: Members::Plain,
    extractor: &MLU,
}];
static POOL: EntityExtractor = EntityExtractor::new(EntityKind::Pool).routing(&POOL_ROUTES);

fn keyed_section(
    doc: &Document,
    path: &[&str],
    key: &str,
    extractor: &EntityExtractor,
    identities: &IdentityTable,
) -> Result<Facts, DiscoveryError> {
    let entries = wrap_each(doc.select(path), extractor, identities)?;
    debug!("Found {} entries for '{key}'", entries.len());

    let mut facts = Facts::new();
    facts.insert(key.into(), Value::Array(entries));
    Ok(facts)
}

/// Physical disks as `disk_info`.
pub fn disk_info(doc: &Document, identities: &IdentityTable) -> Result<Facts, DiscoveryError> {
    keyed_section(doc, DISK_PATH, "disk_info", &DISK, identities)
}

/// RAID groups as `raid_groups`, member disks under `disks`.
pub fn raid_groups(doc: &Document, identities: &IdentityTable) -> Result<Facts, DiscoveryError> {
    keyed_section(doc, RAID_GROUP_PATH, "raid_groups", &RAID_GROUP, identities)
}

/// Disk pools as `disk_pools`, member disks under `Disks`.
pub fn disk_pools(doc: &Document, identities: &IdentityTable) -> Result<Facts, DiscoveryError> {
    keyed_section(doc, DISK_POOL_PATH, "disk_pools", &DISK_POOL, identities)
}

/// Provisioned pools as `pools`, their LUNs under `MLUs`.
pub fn pools(doc: &Document, identities: &IdentityTable) -> Result<Facts, DiscoveryError> {
    keyed_section(doc, POOL_PATH, "pools", &POOL, identities)
}

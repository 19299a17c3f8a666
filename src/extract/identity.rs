use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use strum_macros::Display;

/// The kinds of inventory entity the extractors know about.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    Hash,
    Serialize,
    Deserialize,
    Display,
)]
#[serde(rename_all = "kebab-case")]
#[strum(serialize_all = "kebab-case")]
pub enum EntityKind {
    Subsystem,
    Software,
    Controller,
    HbaInfo,
    HbaPort,
    Disk,
    RaidGroup,
    RaidGroupDisk,
    DiskPool,
    DiskPoolDisk,
    Pool,
    Mlu,
}

/// Maps entity kinds to the field whose value keys them in a collection.
/// Kinds without an entry are keyed by their first field.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct IdentityTable {
    fields: BTreeMap<EntityKind, String>,
}

impl IdentityTable {
    /// Declare the identity field of the given kinds, keeping the rest.
    pub fn with_overrides<'a>(
        mut self,
        overrides: impl IntoIterator<Item = (&'a EntityKind, &'a String)>,
    ) -> Self {
        for (kind, field) in overrides {
            self.fields.insert(*kind, field.clone());
        }
        self
    }

    pub fn field(&self, kind: EntityKind) -> Option<&str> {
        self.fields.get(&kind).map(String::as_str)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_table_is_positional() {
        let table = IdentityTable::default();
        assert_eq!(table.field(EntityKind::Disk), None);
        assert_eq!(table.field(EntityKind::RaidGroup), None);
        assert_eq!(table.field(EntityKind::HbaPort), None);
    }

    #[test]
    fn test_overrides() {
        let overrides = BTreeMap::from([
            (EntityKind::Disk, "Serial".to_string()),
            (EntityKind::Mlu, "Name".to_string()),
        ]);
        let table = IdentityTable::default().with_overrides(&overrides);
        assert_eq!(table.field(EntityKind::Disk), Some("Serial"));
        assert_eq!(table.field(EntityKind::Mlu), Some("Name"));
        assert_eq!(table.field(EntityKind::Pool), None);

        let table = table.with_overrides(&BTreeMap::from([(
            EntityKind::Disk,
            "Name".to_string(),
        )]));
        assert_eq!(table.field(EntityKind::Disk), Some("Name"));
    }

    #[test]
    fn test_kind_names() {
        assert_eq!(EntityKind::RaidGroup.to_string(), "raid-group");
        assert_eq!(
            serde_yaml::from_str::<EntityKind>("hba-port").unwrap(),
            EntityKind::HbaPort
        );
    }
}

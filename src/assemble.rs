use std::collections::HashMap;

use log::{debug, info, warn};
use serde::{Deserialize, Serialize};

use crate::{
    error::{DiscoveryError, DiscoveryResultExt, ExtractionError},
    extract::IdentityTable,
    facts::{controllers, storage, subsystem, Facts, SectionFn},
    xml::Document,
};

/// A named top-level extractor.
pub struct Section {
    pub name: &'static str,
    pub extract: SectionFn,
}

/// Sections in precedence order: when two sections produce the same key,
/// the later one wins under [`MergePolicy::LastWriterWins`].
pub const SECTIONS: [Section; 6] = [
    Section {
        name: "subsystem",
        extract: subsystem::sub_system_info,
    },
    Section {
        name: "controllers",
        extract: controllers::sub_controller_info,
    },
    Section {
        name: "disk_info",
        extract: storage::disk_info,
    },
    Section {
        name: "raid_groups",
        extract: storage::raid_groups,
    },
    Section {
        name: "disk_pools",
        extract: storage::disk_pools,
    },
    Section {
        name: "pools",
        extract: storage::pools,
    },
];

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum MergePolicy {
    /// Later sections overwrite earlier keys, with a warning.
    #[default]
    LastWriterWins,
    /// Any key produced by two sections is an error.
    RejectCollisions,
}

/// Runs every section against one document and merges the results.
#[derive(Debug, Default, Clone)]
pub struct FactAssembler {
    identities: IdentityTable,
    policy: MergePolicy,
}

impl FactAssembler {
    pub fn new(identities: IdentityTable, policy: MergePolicy) -> Self {
        Self { identities, policy }
    }

    /// Build the fact mapping. An empty result is not an error here; the
    /// caller decides what an empty mapping means.
    pub fn assemble(&self, doc: &Document) -> Result<Facts, DiscoveryError> {
        self.assemble_sections(doc, &SECTIONS)
    }

    fn assemble_sections(
        &self,
        doc: &Document,
        sections: &[Section],
    ) -> Result<Facts, DiscoveryError> {
        let mut facts = Facts::new();
        let mut owners: HashMap<String, &'static str> = HashMap::new();

        for section in sections {
            let produced = (section.extract)(doc, &self.identities)
                .message(format!("Failed to extract section '{}'", section.name))?;
            debug!(
                "Section '{}' produced {} facts",
                section.name,
                produced.len()
            );

            for (key, value) in produced {
                if let Some(previous) = owners.insert(key.clone(), section.name) {
                    match self.policy {
                        MergePolicy::LastWriterWins => warn!(
                            "Fact '{key}' from section '{}' overwrites section '{previous}'",
                            section.name
                        ),
                        MergePolicy::RejectCollisions => {
                            return Err(DiscoveryError::new(ExtractionError::KeyCollision {
                                key,
                                section: section.name.into(),
                                previous: previous.into(),
                            }));
                        }
                    }
                }
                facts.insert(key, value);
            }
        }

        info!("Assembled {} facts", facts.len());
        Ok(facts)
    }
}

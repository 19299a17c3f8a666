//! Generic rules for turning inventory elements into fact records.
//!
//! Every entity in the capture is handled by an [`EntityExtractor`]. In walk
//! mode it flattens each child element into `tag: text`, skipping excluded
//! tags and handing routed tags to a nested collection. In selection mode it
//! looks up a fixed list of named fields among the element's direct children.
//! The strictness flag decides whether absent names are skipped or fatal.

use log::{debug, warn};
use serde_json::{Map, Value};

use crate::{
    error::{DiscoveryError, ExtractionError},
    xml::Element,
};

pub mod identity;

pub use identity::{EntityKind, IdentityTable};

/// Attribute mapping built from one element, in document order.
pub type Record = Map<String, Value>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Strictness {
    /// Absent fields are skipped, absent identities fall back to the first field.
    Permissive,
    /// Absent fields and identities are errors.
    Strict,
}

/// How members of a routed collection are represented.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Members {
    /// `{identity: record}` per member.
    Keyed,
    /// The bare record per member.
    Plain,
}

/// A child tag that is extracted as a nested collection instead of flattened.
#[derive(Debug)]
pub struct Route {
    /// Local name of the container child.
    pub tag: &'static str,
    /// Key the nested collection is stored under.
    pub key: &'static str,
    /// Local name of the members to keep, `None` keeps every child element.
    pub member: Option<&'static str>,
    pub members: Members,
    pub extractor: &'static EntityExtractor,
}

impl Route {
    fn extract(
        &self,
        container: &Element,
        identities: &IdentityTable,
    ) -> Result<Value, DiscoveryError> {
        let members = container
            .child_elements()
            .filter(|member| self.member.map_or(true, |tag| member.local_name() == tag));

        let values = match self.members {
            Members::Keyed => wrap_each(members, self.extractor, identities)?,
            Members::Plain => records(members, self.extractor, identities)?,
        };

        Ok(Value::Array(values))
    }
}

#[derive(Debug)]
pub struct EntityExtractor {
    kind: EntityKind,
    strictness: Strictness,
    exclude: &'static [&'static str],
    routes: &'static [Route],
    fields: Option<&'static [&'static str]>,
}

impl EntityExtractor {
    /// A permissive walk that flattens every child.
    pub const fn new(kind: EntityKind) -> Self {
        Self {
            kind,
            strictness: Strictness::Permissive,
            exclude: &[],
            routes: &[],
            fields: None,
        }
    }

    /// Child tags to leave out of the record entirely.
    pub const fn excluding(mut self, tags: &'static [&'static str]) -> Self {
        self.exclude = tags;
        self
    }

    pub const fn routing(mut self, routes: &'static [Route]) -> Self {
        self.routes = routes;
        self
    }

    /// Switch to selection mode: only the named fields are looked up.
    pub const fn selecting(mut self, fields: &'static [&'static str]) -> Self {
        self.fields = Some(fields);
        self
    }

    pub const fn strict(mut self) -> Self {
        self.strictness = Strictness::Strict;
        self
    }

    /// Build the record for one element.
    pub fn extract(
        &self,
        element: &Element,
        identities: &IdentityTable,
    ) -> Result<Record, DiscoveryError> {
        match self.fields {
            Some(fields) => self.select(element, fields, identities),
            None => self.walk(element, identities),
        }
    }

    fn walk(
        &self,
        element: &Element,
        identities: &IdentityTable,
    ) -> Result<Record, DiscoveryError> {
        let mut record = Record::new();

        for child in element.child_elements() {
            let tag = child.local_name();
            if self.exclude.iter().any(|excluded| *excluded == tag) {
                continue;
            }

            let (key, value) = match self.routes.iter().find(|route| route.tag == tag) {
                Some(route) => (route.key, route.extract(child, identities)?),
                None => (tag, Value::String(child.text().trim().to_string())),
            };

            if record.insert(key.to_string(), value).is_some() {
                warn!(
                    "Repeated '{key}' in {} '{}', keeping the last value",
                    self.kind,
                    element.name()
                );
            }
        }

        Ok(record)
    }

    fn select(
        &self,
        element: &Element,
        fields: &[&str],
        identities: &IdentityTable,
    ) -> Result<Record, DiscoveryError> {
        let mut record = Record::new();

        for field in fields {
            match element.child(field) {
                Some(found) => {
                    record.insert(field.to_string(), Value::String(found.text().trim().into()));
                }
                None => self.missing(field)?,
            }
        }

        for route in self.routes {
            match element.child(route.tag) {
                Some(found) => {
                    record.insert(route.key.to_string(), route.extract(found, identities)?);
                }
                None => self.missing(route.tag)?,
            }
        }

        Ok(record)
    }

    fn missing(&self, field: &str) -> Result<(), DiscoveryError> {
        match self.strictness {
            Strictness::Strict => Err(DiscoveryError::new(ExtractionError::MissingField {
                entity: self.kind.to_string(),
                field: field.into(),
            })),
            Strictness::Permissive => {
                debug!("No '{field}' in {}, skipping", self.kind);
                Ok(())
            }
        }
    }

    /// Wrap a record as `{identity: record}`.
    pub fn wrap(
        &self,
        record: Record,
        identities: &IdentityTable,
    ) -> Result<Value, DiscoveryError> {
        let key = self.identity(&record, identities)?;
        Ok(keyed(key, record))
    }

    /// The key a record is wrapped under: its declared identity field when
    /// the kind has one, its first field otherwise.
    pub fn identity(
        &self,
        record: &Record,
        identities: &IdentityTable,
    ) -> Result<String, DiscoveryError> {
        Ok(match identities.field(self.kind) {
            Some(field) => match record.get(field) {
                Some(value) => identity_key(value),
                None if self.strictness == Strictness::Strict => {
                    return Err(DiscoveryError::new(ExtractionError::MissingIdentity {
                        entity: self.kind.to_string(),
                        field: field.into(),
                    }));
                }
                None => {
                    warn!(
                        "No identity field '{field}' in {}, keying by its first field",
                        self.kind
                    );
                    first_field_key(record)
                }
            },
            None => first_field_key(record),
        })
    }
}

/// A single-entry mapping `{key: record}`.
pub fn keyed(key: String, record: Record) -> Value {
    let mut wrapper = Map::new();
    wrapper.insert(key, Value::Object(record));
    Value::Object(wrapper)
}

fn identity_key(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

fn first_field_key(record: &Record) -> String {
    match record.values().next() {
        Some(value) => identity_key(value),
        None => {
            warn!("Keying an entity without fields by the empty string");
            String::new()
        }
    }
}

/// One keyed wrapper per element, in order. Equal keys are kept as separate
/// entries.
pub fn wrap_each<'a>(
    elements: impl IntoIterator<Item = &'a Element>,
    extractor: &EntityExtractor,
    identities: &IdentityTable,
) -> Result<Vec<Value>, DiscoveryError> {
    elements
        .into_iter()
        .map(|element| {
            let record = extractor.extract(element, identities)?;
            extractor.wrap(record, identities)
        })
        .collect()
}

/// Keyed wrappers for every child element of `container`.
pub fn collection(
    container: &Element,
    extractor: &EntityExtractor,
    identities: &IdentityTable,
) -> Result<Vec<Value>, DiscoveryError> {
    wrap_each(container.child_elements(), extractor, identities)
}

/// Bare records, one per element, in order.
pub fn records<'a>(
    elements: impl IntoIterator<Item = &'a Element>,
    extractor: &EntityExtractor,
    identities: &IdentityTable,
) -> Result<Vec<Value>, DiscoveryError> {
    elements
        .into_iter()
        .map(|element| extractor.extract(element, identities).map(Value::Object))
        .collect()
}

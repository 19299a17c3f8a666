use std::fmt::{Debug, Write};
use std::{borrow::Cow, panic::Location};

use serde::{ser::SerializeStruct, Deserialize, Serialize};
use strum_macros::IntoStaticStr;

/// The input handed to discovery could not be used.
#[derive(Debug, Eq, thiserror::Error, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "kebab-case")]
pub enum InvalidInputError {
    #[error("Failed to read inventory capture from '{path}'")]
    ReadInventory { path: String },
    #[error("Failed to parse inventory capture")]
    ParseInventory,
    #[error("Failed to load configuration file from '{path}'")]
    LoadConfig { path: String },
    #[error("Failed to parse configuration file")]
    ParseConfig,
    #[error("Missing required setting '{0}'")]
    MissingSetting(&'static str),
}

/// The inventory was parsed but could not be projected into facts.
#[derive(Debug, Eq, thiserror::Error, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "kebab-case")]
pub enum ExtractionError {
    #[error("Required field '{field}' is missing from {entity}")]
    MissingField { entity: String, field: String },
    #[error("Identity field '{field}' is missing from {entity}")]
    MissingIdentity { entity: String, field: String },
    #[error("Fact '{key}' from section '{section}' collides with section '{previous}'")]
    KeyCollision {
        key: String,
        section: String,
        previous: String,
    },
    #[error("Could not get updated facts, the inventory produced no facts")]
    EmptyFacts,
}

#[derive(Debug, Eq, thiserror::Error, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "kebab-case")]
pub enum InternalError {
    #[error("Internal error: {0}")]
    Internal(&'static str),
    #[error("Timed out after {seconds}s trying to gather inventory")]
    Timeout { seconds: u64 },
    #[error("Discovery worker panicked")]
    WorkerPanic,
    #[error("Failed to serialize facts")]
    SerializeFacts,
    #[error("Failed to write facts to '{path}'")]
    WriteFacts { path: String },
}

/// Each variant of `ErrorKind` corresponds to a different category of error.
#[derive(Debug, Eq, thiserror::Error, IntoStaticStr, PartialEq)]
#[strum(serialize_all = "kebab-case")]
pub enum ErrorKind {
    /// The capture, configuration or command line was unusable.
    #[error(transparent)]
    InvalidInput(#[from] InvalidInputError),

    /// The capture did not match what the extractors require.
    #[error(transparent)]
    Extraction(#[from] ExtractionError),

    /// Discovery itself failed or ran out of time.
    #[error(transparent)]
    Internal(#[from] InternalError),
}

#[derive(Debug)]
struct DiscoveryErrorInner {
    kind: ErrorKind,
    location: &'static Location<'static>,
    source: Option<anyhow::Error>,
    context: Vec<(Cow<'static, str>, &'static Location<'static>)>,
}

pub struct DiscoveryError(Box<DiscoveryErrorInner>);
impl DiscoveryError {
    #[track_caller]
    pub fn new(kind: impl Into<ErrorKind>) -> Self {
        DiscoveryError(Box::new(DiscoveryErrorInner {
            kind: kind.into(),
            location: Location::caller(),
            source: None,
            context: Vec::new(),
        }))
    }

    /// Returns a reference to the inner ErrorKind.
    pub fn kind(&self) -> &ErrorKind {
        &self.0.kind
    }
}

pub trait ReportError<T, K> {
    /// Convert this error into a structured DiscoveryError.
    fn structured(self, kind: K) -> Result<T, DiscoveryError>;
}

impl<T, K> ReportError<T, K> for Option<T>
where
    K: Into<ErrorKind>,
{
    #[track_caller]
    fn structured(self, kind: K) -> Result<T, DiscoveryError> {
        match self {
            Some(t) => Ok(t),
            None => Err(DiscoveryError(Box::new(DiscoveryErrorInner {
                kind: kind.into(),
                location: Location::caller(),
                source: None,
                context: Vec::new(),
            }))),
        }
    }
}

impl<T, E, K> ReportError<T, K> for Result<T, E>
where
    E: Into<anyhow::Error>,
    K: Into<ErrorKind>,
{
    #[track_caller]
    fn structured(self, kind: K) -> Result<T, DiscoveryError> {
        match self {
            Ok(o) => Ok(o),
            Err(e) => Err(DiscoveryError(Box::new(DiscoveryErrorInner {
                kind: kind.into(),
                location: Location::caller(),
                source: Some(e.into()),
                context: Vec::new(),
            }))),
        }
    }
}

pub trait DiscoveryResultExt<T> {
    /// Attach a context message to the error.
    fn message(self, context: impl Into<Cow<'static, str>>) -> Result<T, DiscoveryError>;
}
impl<T> DiscoveryResultExt<T> for Result<T, DiscoveryError> {
    #[track_caller]
    fn message(mut self, context: impl Into<Cow<'static, str>>) -> Result<T, DiscoveryError> {
        if let Err(ref mut e) = self {
            e.0.context.push((context.into(), Location::caller()));
        }
        self
    }
}

impl Serialize for DiscoveryError {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut state = serializer.serialize_struct("discovery-error", 5)?;
        state.serialize_field("message", &self.0.kind.to_string())?;
        match self.0.kind {
            ErrorKind::InvalidInput(ref e) => state.serialize_field("error", e)?,
            ErrorKind::Extraction(ref e) => state.serialize_field("error", e)?,
            ErrorKind::Internal(ref e) => state.serialize_field("error", e)?,
        }
        state.serialize_field("category", <&str>::from(&self.0.kind))?;
        state.serialize_field(
            "location",
            &format!("{}:{}", self.0.location.file(), self.0.location.line()),
        )?;
        match self.0.source {
            Some(ref e) => state.serialize_field("cause", &Some(format!("{:?}", e)))?,
            None => state.serialize_field("cause", &None::<String>)?,
        }
        state.end()
    }
}

impl Debug for DiscoveryError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{} at {}:{}",
            self.0.kind,
            self.0.location.file(),
            self.0.location.line()
        )?;

        if !self.0.context.is_empty() {
            writeln!(f, "\n\nContext:")?;
            for (i, (context, location)) in self.0.context.iter().enumerate() {
                for (j, line) in context.split('\n').enumerate() {
                    if j == 0 {
                        write!(f, "{: >5}: ", i)?;
                    } else {
                        f.write_str("\n       ")?;
                    }
                    f.write_str(line)?;
                }
                writeln!(f, " at {}:{}", location.file(), location.line())?;
            }
        }

        if let Some(ref source) = self.0.source {
            writeln!(f, "\n\nCaused by:")?;
            let mut source: Option<&dyn std::error::Error> = Some(source.as_ref());
            let mut index = 0;
            while let Some(e) = source {
                write!(f, "{: >5}: ", index)?;
                f.write_str(&e.to_string().replace('\n', "\n       "))?;
                f.write_char('\n')?;
                source = e.source();
                index += 1;
            }
        }
        Ok(())
    }
}

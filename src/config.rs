use std::{
    collections::BTreeMap,
    fmt::{self, Debug, Formatter},
    path::{Path, PathBuf},
    time::Duration,
};

use serde::{Deserialize, Serialize};

use crate::{
    assemble::MergePolicy,
    cli::Cli,
    default_capture_path,
    error::{DiscoveryError, InvalidInputError, ReportError},
    extract::{EntityKind, IdentityTable},
};

/// Default wall-clock budget for reading and extracting one capture.
pub const DEFAULT_TIMEOUT_SECONDS: u64 = 240;

/// Definition of the optional configuration file.
#[derive(Serialize, Deserialize, Debug, Default, PartialEq)]
#[serde(rename_all = "kebab-case", deny_unknown_fields)]
pub struct ConfigFile {
    /// EMC VNX array address.
    pub server: Option<String>,

    pub username: Option<String>,

    pub password: Option<String>,

    /// Seconds allowed for reading and extracting the capture.
    pub timeout: Option<u64>,

    /// Path to write the facts to.
    pub output: Option<PathBuf>,

    /// Staged inventory capture.
    pub inventory: Option<PathBuf>,

    pub keep_capture: Option<bool>,

    pub pretty: Option<bool>,

    pub merge_policy: Option<MergePolicy>,

    /// Identity field per entity kind, replacing the built-in defaults.
    #[serde(default)]
    pub identity_fields: BTreeMap<EntityKind, String>,
}

impl ConfigFile {
    pub fn load(path: impl AsRef<Path>) -> Result<Self, DiscoveryError> {
        let contents = std::fs::read_to_string(path.as_ref()).structured(
            InvalidInputError::LoadConfig {
                path: path.as_ref().display().to_string(),
            },
        )?;

        serde_yaml::from_str(&contents).structured(InvalidInputError::ParseConfig)
    }
}

/// The array the capture was taken from.
#[derive(Clone, PartialEq, Eq)]
pub struct ArrayTarget {
    pub server: String,
    pub username: String,
    pub password: Option<String>,
}

impl Debug for ArrayTarget {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.debug_struct("ArrayTarget")
            .field("server", &self.server)
            .field("username", &self.username)
            .field("password", &self.password.as_ref().map(|_| "<redacted>"))
            .finish()
    }
}

/// Fully resolved settings for one discovery run.
#[derive(Debug, Clone)]
pub struct DiscoveryConfig {
    pub target: ArrayTarget,
    pub timeout: Duration,
    pub output: PathBuf,
    pub inventory: PathBuf,
    pub keep_capture: bool,
    pub pretty: bool,
    pub merge_policy: MergePolicy,
    pub identities: IdentityTable,
}

impl DiscoveryConfig {
    /// Resolve settings from the command line and its config file, if any.
    pub fn from_cli(cli: &Cli) -> Result<Self, DiscoveryError> {
        let file = match &cli.config {
            Some(path) => ConfigFile::load(path)?,
            None => ConfigFile::default(),
        };

        Self::resolve(cli, file)
    }

    /// Command line values win over file values.
    pub fn resolve(cli: &Cli, file: ConfigFile) -> Result<Self, DiscoveryError> {
        let server = cli
            .server
            .clone()
            .or(file.server)
            .structured(InvalidInputError::MissingSetting("server"))?;
        let username = cli
            .username
            .clone()
            .or(file.username)
            .structured(InvalidInputError::MissingSetting("username"))?;
        let output = cli
            .output
            .clone()
            .or(file.output)
            .structured(InvalidInputError::MissingSetting("output"))?;

        let inventory = cli
            .inventory
            .clone()
            .or(file.inventory)
            .unwrap_or_else(|| default_capture_path(&server));

        let merge_policy = if cli.strict_merge {
            MergePolicy::RejectCollisions
        } else {
            file.merge_policy.unwrap_or_default()
        };

        Ok(Self {
            target: ArrayTarget {
                server,
                username,
                password: cli.password.clone().or(file.password),
            },
            timeout: Duration::from_secs(
                cli.timeout
                    .or(file.timeout)
                    .unwrap_or(DEFAULT_TIMEOUT_SECONDS),
            ),
            output,
            inventory,
            keep_capture: cli.keep_capture || file.keep_capture.unwrap_or(false),
            pretty: cli.pretty || file.pretty.unwrap_or(false),
            merge_policy,
            identities: IdentityTable::default().with_overrides(&file.identity_fields),
        })
    }
}

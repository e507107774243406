//! The contract every pluggable feature implements

use flange_core::{ConfigNode, NormalizedConfig};
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::container::ServiceContainer;

/// A feature that contributes a config section and service definitions.
///
/// `register` runs for every active extension, in dependency order, before
/// any `boot`. By the time `boot` runs, every definition contributed by every
/// extension exists, so cross-extension wiring (collecting tagged services,
/// for example) belongs in `boot`.
pub trait Extension {
    /// Unique name; also the name of the extension's top-level config section
    fn alias(&self) -> &str;

    /// Schema for the config section. `None` passes the section through as-is.
    fn config_tree(&self) -> Option<ConfigNode> {
        None
    }

    /// Aliases that must register before this one
    fn dependencies(&self) -> Vec<String> {
        Vec::new()
    }

    /// Whether the extension loads when its section is absent
    fn enabled_by_default(&self) -> bool {
        true
    }

    /// Optional capabilities that must be installed for this extension to load
    fn requirements(&self) -> Vec<Requirement> {
        Vec::new()
    }

    /// Contribute definitions from the validated config
    fn register(
        &self,
        container: &mut dyn ServiceContainer,
        config: &NormalizedConfig,
    ) -> anyhow::Result<()>;

    /// Wire definitions contributed by other extensions
    fn boot(&self, _container: &mut dyn ServiceContainer) -> anyhow::Result<()> {
        Ok(())
    }
}

/// A capability an extension needs, with an install hint shown when it is missing
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Requirement {
    pub capability: String,
    pub hint: String,
}

impl Requirement {
    pub fn new(capability: impl Into<String>, hint: impl Into<String>) -> Self {
        Self {
            capability: capability.into(),
            hint: hint.into(),
        }
    }
}

/// Where an extension is in the load lifecycle
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExtensionState {
    /// Not yet processed
    Unregistered,
    /// Inactive for this configuration
    Skipped,
    Registered,
    Booted,
}

impl fmt::Display for ExtensionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Unregistered => "unregistered",
            Self::Skipped => "skipped",
            Self::Registered => "registered",
            Self::Booted => "booted",
        };
        write!(f, "{}", s)
    }
}

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::extension::ExtensionState;

/// Extension lifecycle events recorded while loading the registry
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ExtensionEvent {
    /// Configuration section validated and normalized
    ConfigValidated {
        extension_name: String,
        /// Whether the section was present in the raw configuration
        section_present: bool,
    },

    /// Extension not active for this configuration
    Skipped {
        extension_name: String,
        reason: String,
    },

    /// `register` completed
    Registered {
        extension_name: String,
        duration_ms: u64,
    },

    /// `boot` completed
    Booted {
        extension_name: String,
        duration_ms: u64,
    },

    /// Loading aborted
    LoadFailed {
        #[serde(skip_serializing_if = "Option::is_none", default)]
        extension_name: Option<String>,
        error_message: String,
    },
}

impl ExtensionEvent {
    /// Extension the event belongs to, if any
    pub fn extension_name(&self) -> Option<&str> {
        match self {
            Self::ConfigValidated { extension_name, .. }
            | Self::Skipped { extension_name, .. }
            | Self::Registered { extension_name, .. }
            | Self::Booted { extension_name, .. } => Some(extension_name),
            Self::LoadFailed { extension_name, .. } => extension_name.as_deref(),
        }
    }
}

/// Event metadata envelope
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EventEnvelope {
    /// Position in the registry's event log
    pub sequence: u64,

    /// Event timestamp (UTC)
    pub timestamp: DateTime<Utc>,

    /// State before event
    pub state_before: Option<ExtensionState>,

    /// State after event
    pub state_after: Option<ExtensionState>,

    /// The actual event payload
    pub event: ExtensionEvent,
}

impl EventEnvelope {
    pub fn new(
        sequence: u64,
        state_before: Option<ExtensionState>,
        state_after: Option<ExtensionState>,
        event: ExtensionEvent,
    ) -> Self {
        Self {
            sequence,
            timestamp: Utc::now(),
            state_before,
            state_after,
            event,
        }
    }
}

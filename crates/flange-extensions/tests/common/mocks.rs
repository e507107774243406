//! Mock implementations for testing
//!
//! Provides an extension double that records each call it receives so tests
//! can check phase ordering without any real services.

#![allow(dead_code)]

use anyhow::bail;
use flange_core::{ConfigNode, NormalizedConfig};
use flange_extensions::{Definition, Extension, Requirement, ServiceContainer};
use std::sync::{Arc, Mutex};

/// Shared log of (extension, phase) calls
#[derive(Clone, Default)]
pub struct CallTracker {
    calls: Arc<Mutex<Vec<(String, String)>>>,
}

impl CallTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a call
    pub fn record(&self, extension: &str, phase: &str) {
        self.calls
            .lock()
            .unwrap()
            .push((extension.to_string(), phase.to_string()));
    }

    /// Check if a phase ran for an extension
    pub fn was_called(&self, extension: &str, phase: &str) -> bool {
        self.calls
            .lock()
            .unwrap()
            .iter()
            .any(|(e, p)| e == extension && p == phase)
    }

    /// Calls as "extension:phase"
    pub fn call_order(&self) -> Vec<String> {
        self.calls
            .lock()
            .unwrap()
            .iter()
            .map(|(e, p)| format!("{}:{}", e, p))
            .collect()
    }

    /// Extensions that ran `phase`, in call order
    pub fn phase_order(&self, phase: &str) -> Vec<String> {
        self.calls
            .lock()
            .unwrap()
            .iter()
            .filter(|(_, p)| p == phase)
            .map(|(e, _)| e.clone())
            .collect()
    }

    pub fn is_empty(&self) -> bool {
        self.calls.lock().unwrap().is_empty()
    }

    /// Reset state
    pub fn reset(&self) {
        self.calls.lock().unwrap().clear();
    }
}

/// Extension double driven by [`ExtensionBuilder`](super::builders::ExtensionBuilder)
pub struct RecordingExtension {
    pub alias: String,
    pub dependencies: Vec<String>,
    pub schema: Option<fn() -> ConfigNode>,
    pub enabled_by_default: bool,
    pub requirements: Vec<Requirement>,
    /// Tag put on the service this extension defines during register
    pub contributes_tag: Option<String>,
    /// Tag whose service count is logged during register and boot
    pub observes_tag: Option<String>,
    pub fail_register: bool,
    pub fail_boot: bool,
    pub tracker: CallTracker,
}

impl Extension for RecordingExtension {
    fn alias(&self) -> &str {
        &self.alias
    }

    fn config_tree(&self) -> Option<ConfigNode> {
        self.schema.map(|build| build())
    }

    fn dependencies(&self) -> Vec<String> {
        self.dependencies.clone()
    }

    fn enabled_by_default(&self) -> bool {
        self.enabled_by_default
    }

    fn requirements(&self) -> Vec<Requirement> {
        self.requirements.clone()
    }

    fn register(
        &self,
        container: &mut dyn ServiceContainer,
        config: &NormalizedConfig,
    ) -> anyhow::Result<()> {
        self.tracker.record(&self.alias, "register");
        if self.fail_register {
            bail!("register failed for {}", self.alias);
        }
        if let Some(tag) = &self.observes_tag {
            let seen = container.tagged(tag).len();
            self.tracker
                .record(&self.alias, &format!("register-saw-{}", seen));
        }

        let mut definition = Definition::new(format!("{}.service", self.alias), "Recorded")
            .arg(config.value().clone());
        if let Some(tag) = &self.contributes_tag {
            definition = definition.tag(tag.as_str());
        }
        container.set(definition)?;
        Ok(())
    }

    fn boot(&self, container: &mut dyn ServiceContainer) -> anyhow::Result<()> {
        self.tracker.record(&self.alias, "boot");
        if self.fail_boot {
            bail!("boot failed for {}", self.alias);
        }
        if let Some(tag) = &self.observes_tag {
            let seen = container.tagged(tag).len();
            self.tracker.record(&self.alias, &format!("boot-saw-{}", seen));
        }
        Ok(())
    }
}

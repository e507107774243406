//! Builders for test extensions and registries

#![allow(dead_code)]

use flange_core::ConfigNode;
use flange_extensions::{ExtensionRegistry, Requirement};

use super::mocks::{CallTracker, RecordingExtension};

/// Builder for creating recording extensions
pub struct ExtensionBuilder {
    extension: RecordingExtension,
}

impl ExtensionBuilder {
    pub fn new(alias: &str, tracker: &CallTracker) -> Self {
        Self {
            extension: RecordingExtension {
                alias: alias.to_string(),
                dependencies: Vec::new(),
                schema: None,
                enabled_by_default: true,
                requirements: Vec::new(),
                contributes_tag: None,
                observes_tag: None,
                fail_register: false,
                fail_boot: false,
                tracker: tracker.clone(),
            },
        }
    }

    pub fn depends_on(mut self, alias: &str) -> Self {
        self.extension.dependencies.push(alias.to_string());
        self
    }

    pub fn schema(mut self, build: fn() -> ConfigNode) -> Self {
        self.extension.schema = Some(build);
        self
    }

    pub fn opt_in(mut self) -> Self {
        self.extension.enabled_by_default = false;
        self
    }

    pub fn requires(mut self, capability: &str) -> Self {
        self.extension.requirements.push(Requirement::new(
            capability,
            format!("Install the {} component.", capability),
        ));
        self
    }

    pub fn contributes(mut self, tag: &str) -> Self {
        self.extension.contributes_tag = Some(tag.to_string());
        self
    }

    pub fn observes(mut self, tag: &str) -> Self {
        self.extension.observes_tag = Some(tag.to_string());
        self
    }

    pub fn failing_register(mut self) -> Self {
        self.extension.fail_register = true;
        self
    }

    pub fn failing_boot(mut self) -> Self {
        self.extension.fail_boot = true;
        self
    }

    pub fn build(self) -> RecordingExtension {
        self.extension
    }
}

/// Build a registry from extensions, in the given insertion order
pub fn registry_of(extensions: Vec<RecordingExtension>) -> ExtensionRegistry {
    let mut builder = ExtensionRegistry::builder();
    for extension in extensions {
        builder.add(extension).expect("unique aliases");
    }
    builder.build().expect("registry builds")
}

/// Registry with every built-in extension and the given capabilities
pub fn builtin_registry(capabilities: &[&str]) -> ExtensionRegistry {
    let mut builder = ExtensionRegistry::builder();
    flange_extensions::builtin::register_all(&mut builder).expect("builtin aliases are unique");
    for capability in capabilities {
        builder.provide(*capability);
    }
    builder.build().expect("builtin registry builds")
}

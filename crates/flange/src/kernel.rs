//! Glue between configuration loading, the extension registry and the container

use anyhow::{Context, Result};
use camino::Utf8Path;
use flange_core::config::ENV_VAR;
use flange_core::{HierarchicalConfigLoader, KernelSettings, NormalizedConfig, RawConfig};
use flange_extensions::{builtin, ContainerBuilder, ExtensionRegistry, ServiceContainer};
use serde_json::Value;
use std::collections::BTreeMap;
use tracing::debug;

/// Capabilities compiled into this binary
const CAPABILITIES: &[&str] = &["asset"];

/// A loaded configuration plus the registry and container built from it
pub struct Kernel {
    settings: KernelSettings,
    raw: RawConfig,
    registry: ExtensionRegistry,
    container: ContainerBuilder,
}

impl Kernel {
    /// Read settings and configuration files; nothing is registered yet
    pub fn load(config: Option<&Utf8Path>, environment: Option<&str>) -> Result<Self> {
        let mut vars: BTreeMap<String, String> = std::env::vars().collect();
        if let Some(env) = environment {
            vars.insert(ENV_VAR.to_string(), env.to_string());
        }
        let settings = KernelSettings::from_vars(&vars);
        debug!(
            "Kernel environment: {} (debug: {})",
            settings.environment, settings.debug
        );

        let loader = HierarchicalConfigLoader::new(settings.clone())?.with_vars(vars);
        let raw = loader.load(config)?;

        Ok(Self {
            settings,
            raw,
            registry: builtin_registry()?,
            container: ContainerBuilder::new(),
        })
    }

    pub fn settings(&self) -> &KernelSettings {
        &self.settings
    }

    pub fn raw(&self) -> &RawConfig {
        &self.raw
    }

    pub fn registry(&self) -> &ExtensionRegistry {
        &self.registry
    }

    pub fn container(&self) -> &ContainerBuilder {
        &self.container
    }

    /// Normalized configuration of every active extension
    pub fn validate(&self) -> Result<Vec<(String, NormalizedConfig)>> {
        self.registry
            .validate(&self.raw.value)
            .context("Configuration is invalid")
    }

    /// Register and boot every active extension into the container
    pub fn boot(&mut self) -> Result<()> {
        self.container.set_parameter(
            "kernel.environment",
            Value::String(self.settings.environment.clone()),
        );
        self.container
            .set_parameter("kernel.debug", Value::Bool(self.settings.debug));
        self.container.set_parameter(
            "kernel.project_dir",
            Value::String(self.raw.working_dir.to_string()),
        );

        self.registry
            .load(&mut self.container, &self.raw.value)
            .context("Failed to build the service container")
    }
}

/// Registry of the built-in extensions with this binary's capabilities
pub fn builtin_registry() -> Result<ExtensionRegistry> {
    let mut builder = ExtensionRegistry::builder();
    builtin::register_all(&mut builder)?;
    for capability in CAPABILITIES {
        builder.provide(*capability);
    }
    Ok(builder.build()?)
}

//! Extension registry and the two-phase load
//!
//! Loading happens in a fixed order and fails fast:
//! 1. Every top-level config section must belong to a registered extension
//! 2. Active extensions are chosen (configured, enabled by default, or needed
//!    by another active extension)
//! 3. Each active extension's section is validated, in dependency order
//! 4. Required capabilities are checked
//! 5. `register` runs for every active extension
//! 6. `boot` runs for every active extension
//!
//! Nothing touches the container before step 5, so a configuration or
//! capability problem never leaves a half-built container behind.

use flange_core::{ConfigNode, NodeKind, NormalizedConfig};
use serde::Serialize;
use serde_json::{Map, Value};
use std::collections::{BTreeSet, HashMap};
use std::fmt;
use std::time::Instant;
use tracing::{debug, info, warn};

use crate::container::ServiceContainer;
use crate::dependency::DependencyResolver;
use crate::error::{ExtensionError, Result};
use crate::events::{EventEnvelope, ExtensionEvent};
use crate::extension::{Extension, ExtensionState};

/// Lifecycle of the registry as a whole
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RegistryStatus {
    /// Built, nothing loaded yet
    Ready,
    Loaded,
    /// A load aborted; the container must be discarded
    Failed,
}

impl fmt::Display for RegistryStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Ready => write!(f, "ready"),
            Self::Loaded => write!(f, "loaded"),
            Self::Failed => write!(f, "failed"),
        }
    }
}

struct Entry {
    extension: Box<dyn Extension>,
    alias: String,
    dependencies: Vec<String>,
    state: ExtensionState,
    config: Option<NormalizedConfig>,
}

/// Collects extensions and capabilities before the dependency order is fixed
#[derive(Default)]
pub struct ExtensionRegistryBuilder {
    entries: Vec<Entry>,
    capabilities: BTreeSet<String>,
}

impl ExtensionRegistryBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add an extension; a second extension with the same alias is rejected
    pub fn add<E: Extension + 'static>(&mut self, extension: E) -> Result<&mut Self> {
        self.add_boxed(Box::new(extension))
    }

    pub fn add_boxed(&mut self, extension: Box<dyn Extension>) -> Result<&mut Self> {
        let alias = extension.alias().to_string();
        if self.entries.iter().any(|e| e.alias == alias) {
            return Err(ExtensionError::duplicate(alias));
        }
        debug!("Adding extension {}", alias);
        self.entries.push(Entry {
            dependencies: extension.dependencies(),
            extension,
            alias,
            state: ExtensionState::Unregistered,
            config: None,
        });
        Ok(self)
    }

    /// Consuming form of [`add`](Self::add)
    pub fn with<E: Extension + 'static>(mut self, extension: E) -> Result<Self> {
        self.add(extension)?;
        Ok(self)
    }

    /// Declare an optional capability as installed
    pub fn provide(&mut self, capability: impl Into<String>) -> &mut Self {
        self.capabilities.insert(capability.into());
        self
    }

    pub fn with_capability(mut self, capability: impl Into<String>) -> Self {
        self.provide(capability);
        self
    }

    /// Fix the dependency order. Unknown dependencies and cycles fail here.
    pub fn build(self) -> Result<ExtensionRegistry> {
        let resolver = DependencyResolver::new(
            self.entries
                .iter()
                .map(|e| (e.alias.clone(), e.dependencies.clone())),
        );
        let sorted = resolver.resolve_all()?;

        let index: HashMap<String, usize> = self
            .entries
            .iter()
            .enumerate()
            .map(|(i, e)| (e.alias.clone(), i))
            .collect();
        let order = sorted.iter().map(|alias| index[alias]).collect();

        debug!("Resolved extension order: {}", sorted.join(", "));

        Ok(ExtensionRegistry {
            entries: self.entries,
            index,
            order,
            capabilities: self.capabilities,
            status: RegistryStatus::Ready,
            events: Vec::new(),
        })
    }
}

/// Validated configuration for every active extension, before anything is registered
struct Plan {
    configs: Vec<Option<NormalizedConfig>>,
    skipped: Vec<Option<&'static str>>,
    present: Vec<bool>,
}

/// Extensions in a fixed dependency order, loaded at most once
pub struct ExtensionRegistry {
    entries: Vec<Entry>,
    index: HashMap<String, usize>,
    order: Vec<usize>,
    capabilities: BTreeSet<String>,
    status: RegistryStatus,
    events: Vec<EventEnvelope>,
}

impl fmt::Debug for ExtensionRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ExtensionRegistry")
            .field("order", &self.order())
            .field("status", &self.status)
            .field("capabilities", &self.capabilities)
            .field("events", &self.events.len())
            .finish_non_exhaustive()
    }
}

impl ExtensionRegistry {
    pub fn builder() -> ExtensionRegistryBuilder {
        ExtensionRegistryBuilder::new()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn status(&self) -> RegistryStatus {
        self.status
    }

    /// Aliases in the order extensions were added
    pub fn aliases(&self) -> Vec<&str> {
        self.entries.iter().map(|e| e.alias.as_str()).collect()
    }

    /// Aliases in dependency order
    pub fn order(&self) -> Vec<&str> {
        self.order
            .iter()
            .map(|&i| self.entries[i].alias.as_str())
            .collect()
    }

    pub fn has_extension(&self, alias: &str) -> bool {
        self.index.contains_key(alias)
    }

    pub fn get(&self, alias: &str) -> Option<&dyn Extension> {
        self.index
            .get(alias)
            .map(|&i| self.entries[i].extension.as_ref())
    }

    /// Extensions in dependency order
    pub fn extensions(&self) -> impl Iterator<Item = &dyn Extension> {
        self.order.iter().map(|&i| self.entries[i].extension.as_ref())
    }

    pub fn dependencies(&self, alias: &str) -> Option<&[String]> {
        self.index
            .get(alias)
            .map(|&i| self.entries[i].dependencies.as_slice())
    }

    pub fn state(&self, alias: &str) -> Option<ExtensionState> {
        self.index.get(alias).map(|&i| self.entries[i].state)
    }

    /// Normalized configuration an extension was registered with
    pub fn config(&self, alias: &str) -> Option<&NormalizedConfig> {
        self.index
            .get(alias)
            .and_then(|&i| self.entries[i].config.as_ref())
    }

    pub fn capabilities(&self) -> impl Iterator<Item = &str> {
        self.capabilities.iter().map(String::as_str)
    }

    pub fn has_capability(&self, capability: &str) -> bool {
        self.capabilities.contains(capability)
    }

    /// Lifecycle events recorded so far
    pub fn events(&self) -> &[EventEnvelope] {
        &self.events
    }

    /// Validate `raw` without touching a container.
    ///
    /// Returns each active extension's normalized configuration in dependency
    /// order. Runs every check [`load`](Self::load) runs before registering.
    pub fn validate(&self, raw: &Value) -> Result<Vec<(String, NormalizedConfig)>> {
        let mut plan = self.prepare(raw)?;
        Ok(self
            .order
            .iter()
            .filter_map(|&i| {
                plan.configs[i]
                    .take()
                    .map(|c| (self.entries[i].alias.clone(), c))
            })
            .collect())
    }

    /// Validate every section, then register and boot active extensions.
    ///
    /// A registry loads once. After a failure the container is in an
    /// unspecified state and the registry refuses further loads.
    pub fn load(&mut self, container: &mut dyn ServiceContainer, raw: &Value) -> Result<()> {
        match self.status {
            RegistryStatus::Ready => {}
            RegistryStatus::Loaded => {
                return Err(ExtensionError::invalid_state(
                    "extensions have already been loaded",
                ))
            }
            RegistryStatus::Failed => {
                return Err(ExtensionError::invalid_state(
                    "a previous load failed; build a new registry and container",
                ))
            }
        }

        info!("Loading {} extensions", self.entries.len());
        match self.run(container, raw) {
            Ok(()) => {
                self.status = RegistryStatus::Loaded;
                let booted = self
                    .entries
                    .iter()
                    .filter(|e| e.state == ExtensionState::Booted)
                    .count();
                info!("Loaded {} of {} extensions", booted, self.entries.len());
                Ok(())
            }
            Err(e) => {
                warn!("Extension loading failed: {}", e);
                self.status = RegistryStatus::Failed;
                self.record(
                    None,
                    None,
                    ExtensionEvent::LoadFailed {
                        extension_name: e.alias().map(String::from),
                        error_message: e.to_string(),
                    },
                );
                Err(e)
            }
        }
    }

    fn run(&mut self, container: &mut dyn ServiceContainer, raw: &Value) -> Result<()> {
        let mut plan = self.prepare(raw)?;

        for k in 0..self.order.len() {
            let i = self.order[k];
            let alias = self.entries[i].alias.clone();
            match plan.configs[i].take() {
                Some(config) => {
                    self.entries[i].config = Some(config);
                    self.record(
                        None,
                        None,
                        ExtensionEvent::ConfigValidated {
                            extension_name: alias,
                            section_present: plan.present[i],
                        },
                    );
                }
                None => {
                    let reason = plan.skipped[i].unwrap_or("inactive");
                    debug!("Skipping extension {}: {}", alias, reason);
                    self.entries[i].state = ExtensionState::Skipped;
                    self.record(
                        Some(ExtensionState::Unregistered),
                        Some(ExtensionState::Skipped),
                        ExtensionEvent::Skipped {
                            extension_name: alias,
                            reason: reason.to_string(),
                        },
                    );
                }
            }
        }

        for k in 0..self.order.len() {
            let i = self.order[k];
            if self.entries[i].state == ExtensionState::Skipped {
                continue;
            }
            self.register_one(i, container)?;
        }

        for k in 0..self.order.len() {
            let i = self.order[k];
            if self.entries[i].state == ExtensionState::Skipped {
                continue;
            }
            self.boot_one(i, container)?;
        }

        Ok(())
    }

    fn register_one(&mut self, i: usize, container: &mut dyn ServiceContainer) -> Result<()> {
        let entry = &self.entries[i];
        let alias = entry.alias.clone();
        if entry.state != ExtensionState::Unregistered {
            return Err(ExtensionError::duplicate(alias));
        }
        let config = entry.config.as_ref().ok_or_else(|| {
            ExtensionError::invalid_state(format!("no configuration prepared for \"{}\"", alias))
        })?;

        debug!("Registering extension {}", alias);
        let started = Instant::now();
        entry
            .extension
            .register(container, config)
            .map_err(|cause| ExtensionError::Register {
                alias: alias.clone(),
                cause,
            })?;

        self.entries[i].state = ExtensionState::Registered;
        self.record(
            Some(ExtensionState::Unregistered),
            Some(ExtensionState::Registered),
            ExtensionEvent::Registered {
                extension_name: alias,
                duration_ms: started.elapsed().as_millis() as u64,
            },
        );
        Ok(())
    }

    fn boot_one(&mut self, i: usize, container: &mut dyn ServiceContainer) -> Result<()> {
        let entry = &self.entries[i];
        let alias = entry.alias.clone();
        if entry.state != ExtensionState::Registered {
            return Err(ExtensionError::invalid_state(format!(
                "cannot boot \"{}\" while {}",
                alias, entry.state
            )));
        }

        debug!("Booting extension {}", alias);
        let started = Instant::now();
        entry
            .extension
            .boot(container)
            .map_err(|cause| ExtensionError::Boot {
                alias: alias.clone(),
                cause,
            })?;

        self.entries[i].state = ExtensionState::Booted;
        self.record(
            Some(ExtensionState::Registered),
            Some(ExtensionState::Booted),
            ExtensionEvent::Booted {
                extension_name: alias,
                duration_ms: started.elapsed().as_millis() as u64,
            },
        );
        Ok(())
    }

    /// Every check that precedes registration
    fn prepare(&self, raw: &Value) -> Result<Plan> {
        let sections = match raw {
            Value::Null => Map::new(),
            Value::Object(map) => map.clone(),
            other => {
                return Err(ExtensionError::invalid_state(format!(
                    "configuration root must be a map, got {}",
                    type_name(other)
                )))
            }
        };

        if let Some(section) = sections.keys().find(|k| !self.index.contains_key(*k)) {
            let mut available: Vec<&str> = self.aliases();
            available.sort_unstable();
            return Err(ExtensionError::UnknownConfigSection {
                section: section.clone(),
                available: available
                    .iter()
                    .map(|a| format!("\"{}\"", a))
                    .collect::<Vec<_>>()
                    .join(", "),
            });
        }

        let n = self.entries.len();
        let present: Vec<bool> = self
            .entries
            .iter()
            .map(|e| sections.contains_key(&e.alias))
            .collect();
        let mut active = self.activation(&sections)?;

        let mut configs: Vec<Option<NormalizedConfig>> = (0..n).map(|_| None).collect();
        let mut skipped = vec![None; n];

        for &i in &self.order {
            let entry = &self.entries[i];
            if !active[i] {
                skipped[i] = Some(if disabled_in(&sections, &entry.alias) {
                    "disabled in configuration"
                } else {
                    "not configured and not enabled by default"
                });
                continue;
            }
            let (config, enabled) = self.validate_section(entry, sections.get(&entry.alias))?;
            if enabled {
                configs[i] = Some(config);
            } else {
                debug!("Extension {} is switched off by its enabled flag", entry.alias);
                active[i] = false;
                skipped[i] = Some("disabled in configuration");
            }
        }

        // A dependency can only be switched off by its flag after activation ran
        for &i in &self.order {
            if !active[i] {
                continue;
            }
            let entry = &self.entries[i];
            if let Some(dep) = entry.dependencies.iter().find(|d| !active[self.index[d.as_str()]]) {
                return Err(ExtensionError::DisabledDependency {
                    alias: entry.alias.clone(),
                    dependency: dep.clone(),
                });
            }
        }

        for &i in &self.order {
            if !active[i] {
                continue;
            }
            let entry = &self.entries[i];
            for requirement in entry.extension.requirements() {
                if !self.capabilities.contains(&requirement.capability) {
                    return Err(ExtensionError::MissingDependency {
                        alias: entry.alias.clone(),
                        capability: requirement.capability,
                        hint: requirement.hint,
                    });
                }
            }
        }

        Ok(Plan {
            configs,
            skipped,
            present,
        })
    }

    /// Which extensions load: configured or enabled by default, plus everything they depend on
    fn activation(&self, sections: &Map<String, Value>) -> Result<Vec<bool>> {
        let disabled: Vec<bool> = self
            .entries
            .iter()
            .map(|e| disabled_in(sections, &e.alias))
            .collect();

        let mut active = vec![false; self.entries.len()];
        let mut pending: Vec<usize> = self
            .order
            .iter()
            .copied()
            .filter(|&i| {
                let entry = &self.entries[i];
                !disabled[i]
                    && (sections.contains_key(&entry.alias)
                        || entry.extension.enabled_by_default())
            })
            .collect();

        while let Some(i) = pending.pop() {
            if active[i] {
                continue;
            }
            active[i] = true;
            let entry = &self.entries[i];
            for dep in &entry.dependencies {
                let j = self.index[dep];
                if disabled[j] {
                    return Err(ExtensionError::DisabledDependency {
                        alias: entry.alias.clone(),
                        dependency: dep.clone(),
                    });
                }
                if !active[j] {
                    debug!("Activating {} as a dependency of {}", dep, entry.alias);
                    pending.push(j);
                }
            }
        }
        Ok(active)
    }

    /// Normalized section, and whether an `enabled` flag left it switched on
    fn validate_section(
        &self,
        entry: &Entry,
        section: Option<&Value>,
    ) -> Result<(NormalizedConfig, bool)> {
        let alias = entry.alias.as_str();
        let tree = entry
            .extension
            .config_tree()
            .unwrap_or_else(ConfigNode::variable);

        tree.check_defaults(alias)
            .map_err(|e| ExtensionError::validation(alias, e))?;

        let config = match section {
            Some(value) => tree.validate_at(alias, value),
            None => tree.validate_absent_at(alias),
        }
        .map_err(|e| ExtensionError::validation(alias, e))?;

        let flagged = tree
            .field("enabled")
            .is_some_and(|flag| flag.kind() == NodeKind::Bool);
        let enabled = !flagged || config.is_enabled();
        Ok((config, enabled))
    }

    fn record(
        &mut self,
        before: Option<ExtensionState>,
        after: Option<ExtensionState>,
        event: ExtensionEvent,
    ) {
        let sequence = self.events.len() as u64;
        self.events
            .push(EventEnvelope::new(sequence, before, after, event));
    }
}

fn disabled_in(sections: &Map<String, Value>, alias: &str) -> bool {
    matches!(sections.get(alias), Some(Value::Bool(false)))
}

fn type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "bool",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "map",
    }
}

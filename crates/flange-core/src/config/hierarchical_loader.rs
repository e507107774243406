//! Hierarchical configuration loader with precedence
//!
//! Loads configuration from multiple sources with the following precedence (low to high):
//! 1. Main config file (`flange.yaml`, searched upward from the working directory)
//! 2. Environment overlay (`flange.<env>.yaml` next to the main file)
//! 3. `%env(NAME)%` and `%kernel.*%` placeholders, resolved in place
//! 4. Environment variables (`FLANGE__SECTION__KEY=value`)
//!
//! The result is raw input; it only becomes typed after each extension
//! validates its own section.

use crate::config::loader::{deep_merge, find_config, read_yaml_file, RawConfig};
use crate::error::{Error, Result};
use camino::{Utf8Path, Utf8PathBuf};
use regex::{Captures, Regex};
use serde_json::{Map, Value};
use std::collections::BTreeMap;
use std::sync::OnceLock;
use tracing::{debug, info};

/// Prefix for section overrides, e.g. `FLANGE__CACHE__DEFAULT_LIFETIME=60`
pub const OVERRIDE_PREFIX: &str = "FLANGE__";

/// Environment name variable
pub const ENV_VAR: &str = "FLANGE_ENV";

/// Debug flag variable
pub const DEBUG_VAR: &str = "FLANGE_DEBUG";

const DEFAULT_ENVIRONMENT: &str = "dev";

/// Kernel settings passed explicitly into loading and registration
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KernelSettings {
    /// Environment name (`dev`, `test`, `prod`, ...)
    pub environment: String,

    /// Debug mode
    pub debug: bool,
}

impl KernelSettings {
    pub fn new(environment: impl Into<String>, debug: bool) -> Self {
        Self {
            environment: environment.into(),
            debug,
        }
    }

    /// Read `FLANGE_ENV` / `FLANGE_DEBUG` from a variable snapshot.
    ///
    /// Debug defaults to on everywhere except `prod`.
    pub fn from_vars(vars: &BTreeMap<String, String>) -> Self {
        let environment = vars
            .get(ENV_VAR)
            .cloned()
            .unwrap_or_else(|| DEFAULT_ENVIRONMENT.to_string());
        let debug = match vars.get(DEBUG_VAR).map(|v| v.trim().to_lowercase()) {
            Some(v) => matches!(v.as_str(), "1" | "true" | "yes" | "on"),
            None => environment != "prod",
        };
        Self { environment, debug }
    }
}

impl Default for KernelSettings {
    fn default() -> Self {
        Self::new(DEFAULT_ENVIRONMENT, true)
    }
}

/// Configuration hierarchy loader
pub struct HierarchicalConfigLoader {
    settings: KernelSettings,

    /// Directory to search from when no explicit path is given
    working_dir: Utf8PathBuf,

    /// Snapshot of the environment used for placeholders and overrides
    vars: BTreeMap<String, String>,
}

impl HierarchicalConfigLoader {
    /// Create a loader reading the process environment once, now
    pub fn new(settings: KernelSettings) -> Result<Self> {
        let cwd = std::env::current_dir()?;
        let working_dir = Utf8PathBuf::try_from(cwd)
            .map_err(|_| Error::invalid_config("Current directory path is not valid UTF-8"))?;
        Ok(Self {
            settings,
            working_dir,
            vars: std::env::vars().collect(),
        })
    }

    /// Create a loader with a custom working directory and no environment
    pub fn with_dir(settings: KernelSettings, working_dir: Utf8PathBuf) -> Self {
        Self {
            settings,
            working_dir,
            vars: BTreeMap::new(),
        }
    }

    /// Replace the environment snapshot
    pub fn with_vars<I, K, V>(mut self, vars: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        self.vars = vars
            .into_iter()
            .map(|(k, v)| (k.into(), v.into()))
            .collect();
        self
    }

    pub fn settings(&self) -> &KernelSettings {
        &self.settings
    }

    /// Load the configuration hierarchy.
    ///
    /// An explicit `path` must exist. Without one, the working directory and
    /// its parents are searched; finding nothing yields an empty config.
    pub fn load(&self, path: Option<&Utf8Path>) -> Result<RawConfig> {
        let config_path = match path {
            Some(p) => {
                if !p.is_file() {
                    return Err(Error::config_not_found(p.as_str()));
                }
                Some(p.to_owned())
            }
            None => find_config(&self.working_dir),
        };

        let mut raw = match &config_path {
            Some(p) => {
                let working_dir = p
                    .parent()
                    .map(|d| d.to_owned())
                    .unwrap_or_else(|| Utf8PathBuf::from("."));
                let mut raw = RawConfig::empty(working_dir);
                raw.value = read_yaml_file(p)?;
                raw.config_path = Some(p.clone());
                raw.sources.push(p.clone());
                raw
            }
            None => {
                debug!(
                    "No configuration file found from {}, starting empty",
                    self.working_dir
                );
                RawConfig::empty(self.working_dir.clone())
            }
        };

        if let Some(p) = &config_path {
            if let Some(overlay_path) = self.overlay_path(p) {
                debug!("Merging environment overlay: {}", overlay_path);
                let overlay = read_yaml_file(&overlay_path)?;
                deep_merge(&mut raw.value, overlay);
                raw.sources.push(overlay_path);
            }
        }

        let project_dir = raw.working_dir.clone();
        resolve_placeholders(&mut raw.value, "", &self.vars, &self.settings, &project_dir)?;

        let overrides = self.apply_env_overrides(&mut raw.value);

        info!(
            "Loaded configuration from {} file(s) with {} environment override(s)",
            raw.sources.len(),
            overrides
        );

        Ok(raw)
    }

    /// `flange.prod.yaml` next to `flange.yaml`, when it exists
    fn overlay_path(&self, config_path: &Utf8Path) -> Option<Utf8PathBuf> {
        let stem = config_path.file_stem()?;
        let ext = config_path.extension().unwrap_or("yaml");
        let overlay =
            config_path.with_file_name(format!("{}.{}.{}", stem, self.settings.environment, ext));
        overlay.is_file().then_some(overlay)
    }

    /// Apply `FLANGE__A__B=value` overrides; returns how many were applied
    fn apply_env_overrides(&self, value: &mut Value) -> usize {
        let mut applied = 0;
        for (name, raw) in &self.vars {
            let Some(rest) = name.strip_prefix(OVERRIDE_PREFIX) else {
                continue;
            };
            let segments: Vec<String> = rest
                .split("__")
                .filter(|s| !s.is_empty())
                .map(|s| s.to_lowercase())
                .collect();
            if segments.is_empty() {
                continue;
            }
            debug!("Applying environment override {} -> {}", name, segments.join("."));
            set_path(value, &segments, Value::String(raw.clone()));
            applied += 1;
        }
        applied
    }
}

fn placeholder_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(r"%env\(([A-Za-z_][A-Za-z0-9_]*)\)%|%kernel\.(environment|debug|project_dir)%")
            .expect("placeholder pattern is valid")
    })
}

fn resolve_placeholders(
    value: &mut Value,
    path: &str,
    vars: &BTreeMap<String, String>,
    settings: &KernelSettings,
    project_dir: &Utf8Path,
) -> Result<()> {
    match value {
        Value::String(s) => {
            if !s.contains('%') {
                return Ok(());
            }
            let mut missing: Option<String> = None;
            let resolved = placeholder_pattern().replace_all(s.as_str(), |caps: &Captures| {
                if let Some(name) = caps.get(1) {
                    match vars.get(name.as_str()) {
                        Some(v) => v.clone(),
                        None => {
                            missing.get_or_insert_with(|| name.as_str().to_string());
                            String::new()
                        }
                    }
                } else {
                    match caps.get(2).map(|m| m.as_str()) {
                        Some("environment") => settings.environment.clone(),
                        Some("debug") => settings.debug.to_string(),
                        _ => project_dir.to_string(),
                    }
                }
            });
            if let Some(name) = missing {
                return Err(Error::unresolved_placeholder(name, display_path(path)));
            }
            *s = resolved.into_owned();
        }
        Value::Array(items) => {
            for (i, item) in items.iter_mut().enumerate() {
                resolve_placeholders(item, &join(path, &i.to_string()), vars, settings, project_dir)?;
            }
        }
        Value::Object(map) => {
            for (key, item) in map.iter_mut() {
                resolve_placeholders(item, &join(path, key), vars, settings, project_dir)?;
            }
        }
        _ => {}
    }
    Ok(())
}

fn set_path(root: &mut Value, segments: &[String], leaf: Value) {
    let Some((last, parents)) = segments.split_last() else {
        return;
    };
    let mut current = root;
    for segment in parents {
        if !current.is_object() {
            *current = Value::Object(Map::new());
        }
        let Value::Object(map) = current else {
            return;
        };
        current = map
            .entry(segment.clone())
            .or_insert_with(|| Value::Object(Map::new()));
    }
    if !current.is_object() {
        *current = Value::Object(Map::new());
    }
    if let Value::Object(map) = current {
        map.insert(last.clone(), leaf);
    }
}

fn join(path: &str, segment: &str) -> String {
    if path.is_empty() {
        segment.to_string()
    } else {
        format!("{}.{}", path, segment)
    }
}

fn display_path(path: &str) -> String {
    if path.is_empty() {
        "<root>".to_string()
    } else {
        path.to_string()
    }
}

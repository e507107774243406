//! Configuration file discovery and parsing

use crate::error::{Error, Result};
use camino::{Utf8Path, Utf8PathBuf};
use serde_json::{Map, Value};
use std::fs;
use tracing::debug;

/// Configuration file names to search for
pub const CONFIG_FILE_NAMES: &[&str] = &["flange.yaml", "flange.yml"];

/// Raw (unvalidated) configuration assembled from one or more files
#[derive(Debug, Clone)]
pub struct RawConfig {
    /// Merged configuration tree, one top-level key per extension alias
    pub value: Value,

    /// Main configuration file, if one was found
    pub config_path: Option<Utf8PathBuf>,

    /// Directory the configuration was loaded from
    pub working_dir: Utf8PathBuf,

    /// Every file that contributed, in merge order
    pub sources: Vec<Utf8PathBuf>,
}

impl RawConfig {
    /// An empty configuration rooted at `working_dir`
    pub fn empty(working_dir: impl Into<Utf8PathBuf>) -> Self {
        Self {
            value: Value::Object(Map::new()),
            config_path: None,
            working_dir: working_dir.into(),
            sources: Vec::new(),
        }
    }
}

/// Find a configuration file in `start` or any parent directory
pub fn find_config(start: &Utf8Path) -> Option<Utf8PathBuf> {
    let mut current = Some(start);

    while let Some(dir) = current {
        for name in CONFIG_FILE_NAMES {
            let path = dir.join(name);
            if path.is_file() {
                debug!("Found configuration file: {}", path);
                return Some(path);
            }
        }
        current = dir.parent();
    }

    None
}

/// Read a YAML file into a map. An empty file is an empty map.
pub fn read_yaml_file(path: &Utf8Path) -> Result<Value> {
    let content = fs::read_to_string(path).map_err(|e| {
        if e.kind() == std::io::ErrorKind::NotFound {
            Error::config_not_found(path.as_str())
        } else {
            Error::Io(e)
        }
    })?;

    parse_yaml(&content, path.as_str())
}

/// Parse YAML text; the document root must be a map
pub fn parse_yaml(content: &str, origin: &str) -> Result<Value> {
    let value: Value = serde_yaml_ng::from_str(content)?;
    match value {
        Value::Null => Ok(Value::Object(Map::new())),
        Value::Object(_) => Ok(value),
        _ => Err(Error::invalid_config(format!(
            "{}: the configuration root must be a map of sections",
            origin
        ))),
    }
}

/// Merge `overlay` into `base`: maps merge key by key, anything else replaces
pub fn deep_merge(base: &mut Value, overlay: Value) {
    match (base, overlay) {
        (Value::Object(base_map), Value::Object(overlay_map)) => {
            for (key, value) in overlay_map {
                match base_map.get_mut(&key) {
                    Some(existing) => deep_merge(existing, value),
                    None => {
                        base_map.insert(key, value);
                    }
                }
            }
        }
        (slot, value) => *slot = value,
    }
}

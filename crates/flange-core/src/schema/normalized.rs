//! Validated configuration values

use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;

/// Configuration that passed validation: defaults filled in, normalizers
/// applied, scalars coerced. Map key order follows the schema declaration.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(transparent)]
pub struct NormalizedConfig(Value);

impl NormalizedConfig {
    pub(crate) fn new(value: Value) -> Self {
        Self(value)
    }

    pub fn value(&self) -> &Value {
        &self.0
    }

    /// Look up a dotted path; numeric segments index into arrays
    pub fn get(&self, path: &str) -> Option<&Value> {
        if path.is_empty() {
            return Some(&self.0);
        }
        path.split('.').try_fold(&self.0, |current, segment| match current {
            Value::Object(map) => map.get(segment),
            Value::Array(items) => segment.parse::<usize>().ok().and_then(|i| items.get(i)),
            _ => None,
        })
    }

    /// Convenience for `can_be_enabled` / `can_be_disabled` sections.
    ///
    /// A section without an `enabled` flag counts as enabled.
    pub fn is_enabled(&self) -> bool {
        self.get("enabled").and_then(Value::as_bool).unwrap_or(true)
    }

    /// Deserialize into a typed configuration struct
    pub fn deserialize<T: DeserializeOwned>(&self) -> Result<T, serde_json::Error> {
        serde_json::from_value(self.0.clone())
    }

    /// Back to raw input form, e.g. to validate it again
    pub fn into_raw(self) -> Value {
        self.0
    }

    pub fn to_yaml(&self) -> Result<String, serde_yaml_ng::Error> {
        serde_yaml_ng::to_string(&self.0)
    }
}

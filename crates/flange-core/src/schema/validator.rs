//! Validation and normalization of raw configuration against a schema
//!
//! Each node runs: normalizers, null handling, type check and coercion,
//! structural recursion, then validators. The first error anywhere aborts
//! the whole call.

use serde_json::{Map, Number, Value};
use std::collections::HashSet;
use tracing::trace;

use super::node::{Children, ConfigNode, NodeKind};
use super::normalized::NormalizedConfig;
use crate::error::{ValidationError, ValidationErrorKind};

type Walk<T> = std::result::Result<T, ValidationError>;

impl ConfigNode {
    /// Validate `raw` against this tree, rooting error paths at `root`.
    pub fn validate_at(&self, root: &str, raw: &Value) -> Walk<NormalizedConfig> {
        trace!("Validating config tree at {}", display_root(root));
        walk(self, raw.clone(), root).map(NormalizedConfig::new)
    }

    /// Validate `raw` against this tree with unqualified error paths
    pub fn validate(&self, raw: &Value) -> Walk<NormalizedConfig> {
        self.validate_at("", raw)
    }

    /// Validate the value this tree takes when its section is absent
    pub fn validate_absent_at(&self, root: &str) -> Walk<NormalizedConfig> {
        let value = fill_absent(self, root)?.unwrap_or(Value::Null);
        Ok(NormalizedConfig::new(value))
    }

    /// Check that every declared default passes its own node's validation
    pub fn check_defaults(&self, root: &str) -> Walk<()> {
        if let Some(default) = &self.default {
            if !(default.is_null() && self.nullable) {
                walk(self, default.clone(), root).map_err(|e| {
                    ValidationError::new(
                        root,
                        ValidationErrorKind::InvalidDefault {
                            message: e.kind.to_string(),
                        },
                    )
                })?;
            }
        }
        match &self.children {
            Children::Fields(fields) => {
                for (name, child) in fields {
                    child.check_defaults(&join(root, name))?;
                }
            }
            Children::Prototype(proto) => proto.check_defaults(&join(root, "*"))?,
            Children::None => {}
        }
        Ok(())
    }
}

fn walk(node: &ConfigNode, raw: Value, path: &str) -> Walk<Value> {
    let mut value = node.normalizers.iter().fold(raw, |v, f| f(v));

    if value.is_null() {
        match node.kind {
            NodeKind::Scalar | NodeKind::Variable => return Ok(Value::Null),
            _ if node.nullable => return Ok(Value::Null),
            NodeKind::Map => value = Value::Object(Map::new()),
            NodeKind::Array => value = Value::Array(Vec::new()),
            kind => {
                return Err(invalid_type(path, kind_label(kind), &value));
            }
        }
    }

    let value = match node.kind {
        NodeKind::Variable => value,
        NodeKind::Scalar => check_scalar(value, path)?,
        NodeKind::String => check_string(value, path)?,
        NodeKind::Bool => coerce_bool(value, path)?,
        NodeKind::Int => coerce_int(value, path)?,
        NodeKind::Float => coerce_float(value, path)?,
        NodeKind::Array => walk_array(node, value, path)?,
        NodeKind::Map => walk_map(node, value, path)?,
    };

    for rule in &node.rules {
        if (rule.predicate)(&value) {
            return Err(ValidationError::new(
                path,
                ValidationErrorKind::Invalid {
                    message: rule.render(&value),
                },
            ));
        }
    }

    Ok(value)
}

fn walk_map(node: &ConfigNode, value: Value, path: &str) -> Walk<Value> {
    let mut input = match value {
        Value::Object(m) => m,
        other => return Err(invalid_type(path, "map", &other)),
    };

    match &node.children {
        Children::Prototype(proto) => {
            let mut out = Map::new();
            for (key, entry) in input {
                let normalized = walk(proto, entry, &join(path, &key))?;
                out.insert(key, normalized);
            }
            Ok(Value::Object(out))
        }
        Children::Fields(_) | Children::None => {
            let fields: Vec<(&str, &ConfigNode)> = node.fields().collect();

            let mut unknown: Vec<String> = input
                .keys()
                .filter(|k| !fields.iter().any(|(n, _)| *n == k.as_str()))
                .cloned()
                .collect();
            if !unknown.is_empty() {
                unknown.sort();
                return Err(ValidationError::new(
                    path,
                    ValidationErrorKind::UnknownKeys {
                        keys: unknown,
                        available: fields.iter().map(|(n, _)| n.to_string()).collect(),
                    },
                ));
            }

            let supplied: HashSet<String> = input
                .iter()
                .filter(|(_, v)| !v.is_null())
                .map(|(k, _)| k.clone())
                .collect();

            let mut out = Map::new();
            for (name, child) in fields {
                let child_path = join(path, name);
                match input.remove(name) {
                    Some(raw) => {
                        out.insert(name.to_string(), walk(child, raw, &child_path)?);
                    }
                    None => {
                        if let Some(v) = fill_absent(child, &child_path)? {
                            out.insert(name.to_string(), v);
                        }
                    }
                }
            }

            for group in &node.exclusive {
                let present: Vec<String> = group
                    .iter()
                    .filter(|k| supplied.contains(*k))
                    .cloned()
                    .collect();
                if present.len() > 1 {
                    return Err(ValidationError::new(
                        path,
                        ValidationErrorKind::MutuallyExclusive { keys: present },
                    ));
                }
            }

            Ok(Value::Object(out))
        }
    }
}

fn walk_array(node: &ConfigNode, value: Value, path: &str) -> Walk<Value> {
    let items = match value {
        Value::Array(items) => items,
        other => return Err(invalid_type(path, "array", &other)),
    };

    match node.prototype() {
        Some(proto) => items
            .into_iter()
            .enumerate()
            .map(|(i, item)| walk(proto, item, &join(path, &i.to_string())))
            .collect::<Walk<Vec<_>>>()
            .map(Value::Array),
        None => Ok(Value::Array(items)),
    }
}

/// Value for a node missing from its parent map; `None` leaves the key out
fn fill_absent(node: &ConfigNode, path: &str) -> Walk<Option<Value>> {
    if let Some(default) = &node.default {
        return Ok(Some(default.clone()));
    }
    if node.required {
        return Err(ValidationError::new(
            path,
            ValidationErrorKind::MissingRequiredKey {
                key: last_segment(path).to_string(),
            },
        ));
    }
    match (&node.kind, &node.children) {
        (NodeKind::Map, Children::Fields(fields)) => {
            let mut out = Map::new();
            for (name, child) in fields {
                if let Some(v) = fill_absent(child, &join(path, name))? {
                    out.insert(name.clone(), v);
                }
            }
            Ok(Some(Value::Object(out)))
        }
        (NodeKind::Map, _) => Ok(Some(Value::Object(Map::new()))),
        (NodeKind::Array, _) => Ok(Some(Value::Array(Vec::new()))),
        _ => Ok(None),
    }
}

fn check_scalar(value: Value, path: &str) -> Walk<Value> {
    match value {
        Value::String(_) | Value::Number(_) | Value::Bool(_) => Ok(value),
        other => Err(invalid_type(path, "scalar", &other)),
    }
}

fn check_string(value: Value, path: &str) -> Walk<Value> {
    match value {
        Value::String(_) => Ok(value),
        other => Err(invalid_type(path, "string", &other)),
    }
}

fn coerce_bool(value: Value, path: &str) -> Walk<Value> {
    match value {
        Value::Bool(_) => Ok(value),
        Value::String(s) => match s.trim() {
            "true" | "1" => Ok(Value::Bool(true)),
            "false" | "0" => Ok(Value::Bool(false)),
            _ => Err(invalid_type(path, "bool", &Value::String(s.clone()))),
        },
        other => Err(invalid_type(path, "bool", &other)),
    }
}

fn coerce_int(value: Value, path: &str) -> Walk<Value> {
    match value {
        Value::Number(n) if n.is_i64() || n.is_u64() => Ok(Value::Number(n)),
        Value::Number(n) => {
            let f = n.as_f64().unwrap_or(f64::NAN);
            integral(f)
                .map(Value::from)
                .ok_or_else(|| lossy(path, n.to_string(), "int"))
        }
        Value::String(s) => {
            let trimmed = s.trim();
            if let Ok(i) = trimmed.parse::<i64>() {
                Ok(Value::from(i))
            } else if trimmed.parse::<f64>().is_ok() {
                Err(lossy(path, format!("\"{}\"", s), "int"))
            } else {
                Err(invalid_type(path, "int", &Value::String(s)))
            }
        }
        other => Err(invalid_type(path, "int", &other)),
    }
}

fn coerce_float(value: Value, path: &str) -> Walk<Value> {
    match value {
        Value::Number(n) => {
            let f = n
                .as_f64()
                .ok_or_else(|| lossy(path, n.to_string(), "float"))?;
            if !round_trips(&n, f) {
                return Err(lossy(path, n.to_string(), "float"));
            }
            Number::from_f64(f)
                .map(Value::Number)
                .ok_or_else(|| lossy(path, n.to_string(), "float"))
        }
        Value::String(s) => match s.trim().parse::<f64>().ok().and_then(Number::from_f64) {
            Some(n) => Ok(Value::Number(n)),
            None => Err(invalid_type(path, "float", &Value::String(s))),
        },
        other => Err(invalid_type(path, "float", &other)),
    }
}

/// Integers beyond 2^53 may not survive conversion to f64
fn round_trips(n: &Number, f: f64) -> bool {
    if let Some(i) = n.as_i64() {
        integral(f) == Some(i)
    } else if let Some(u) = n.as_u64() {
        f < u64::MAX as f64 && f as u64 == u
    } else {
        true
    }
}

/// `i64::MAX as f64` rounds up to 2^63, so the upper bound is exclusive
fn integral(f: f64) -> Option<i64> {
    if f.is_finite() && f.fract() == 0.0 && f >= i64::MIN as f64 && f < i64::MAX as f64 {
        Some(f as i64)
    } else {
        None
    }
}

fn invalid_type(path: &str, expected: &'static str, found: &Value) -> ValidationError {
    ValidationError::new(
        path,
        ValidationErrorKind::InvalidType {
            expected,
            found: type_name(found).to_string(),
        },
    )
}

fn lossy(path: &str, value: String, target: &'static str) -> ValidationError {
    ValidationError::new(path, ValidationErrorKind::LossyCoercion { value, target })
}

fn kind_label(kind: NodeKind) -> &'static str {
    match kind {
        NodeKind::Scalar => "scalar",
        NodeKind::String => "string",
        NodeKind::Bool => "bool",
        NodeKind::Int => "int",
        NodeKind::Float => "float",
        NodeKind::Array => "array",
        NodeKind::Map => "map",
        NodeKind::Variable => "variable",
    }
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

fn join(path: &str, segment: &str) -> String {
    if path.is_empty() {
        segment.to_string()
    } else {
        format!("{}.{}", path, segment)
    }
}

fn last_segment(path: &str) -> &str {
    path.rsplit('.').next().unwrap_or(path)
}

fn display_root(root: &str) -> &str {
    if root.is_empty() {
        "<root>"
    } else {
        root
    }
}

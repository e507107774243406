//! Declarative configuration schema nodes
//!
//! A [`ConfigNode`] describes one configuration value: its kind, whether it
//! is required, its default, the normalizers applied before validation and
//! the validators applied after. Trees are built once when an extension is
//! defined and only read afterwards.

use serde_json::{json, Map, Value};
use std::fmt;
use std::sync::Arc;

/// A pure value -> value rewrite applied before structural validation
pub type Normalizer = Arc<dyn Fn(Value) -> Value + Send + Sync>;

/// Returns `true` when the value is invalid
pub type Predicate = Arc<dyn Fn(&Value) -> bool + Send + Sync>;

/// The shape a node accepts
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NodeKind {
    /// String, number, bool or null
    Scalar,
    /// String only; null unless nullable is rejected
    String,
    Bool,
    Int,
    Float,
    /// Ordered list; elements validated against the prototype if any
    Array,
    /// Declared fields, or entries keyed by name validated against a prototype
    Map,
    /// Anything, passed through unchanged
    Variable,
}

impl fmt::Display for NodeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            NodeKind::Scalar => "scalar",
            NodeKind::String => "string",
            NodeKind::Bool => "bool",
            NodeKind::Int => "int",
            NodeKind::Float => "float",
            NodeKind::Array => "array",
            NodeKind::Map => "map",
            NodeKind::Variable => "variable",
        };
        f.write_str(name)
    }
}

/// A validator: predicate plus message template (`{value}` is substituted)
#[derive(Clone)]
pub(crate) struct Rule {
    pub(crate) predicate: Predicate,
    pub(crate) message: String,
}

impl Rule {
    pub(crate) fn render(&self, value: &Value) -> String {
        self.message.replace("{value}", &value.to_string())
    }
}

#[derive(Clone, Default)]
pub(crate) enum Children {
    #[default]
    None,
    Fields(Vec<(String, ConfigNode)>),
    Prototype(Box<ConfigNode>),
}

/// A typed schema node
#[derive(Clone)]
pub struct ConfigNode {
    pub(crate) kind: NodeKind,
    pub(crate) required: bool,
    pub(crate) nullable: bool,
    pub(crate) default: Option<Value>,
    pub(crate) normalizers: Vec<Normalizer>,
    pub(crate) rules: Vec<Rule>,
    pub(crate) children: Children,
    pub(crate) exclusive: Vec<Vec<String>>,
    pub(crate) info: Option<String>,
}

impl ConfigNode {
    fn of(kind: NodeKind) -> Self {
        Self {
            kind,
            required: false,
            nullable: false,
            default: None,
            normalizers: Vec::new(),
            rules: Vec::new(),
            children: Children::None,
            exclusive: Vec::new(),
            info: None,
        }
    }

    pub fn scalar() -> Self {
        Self::of(NodeKind::Scalar)
    }

    pub fn string() -> Self {
        Self::of(NodeKind::String)
    }

    pub fn boolean() -> Self {
        Self::of(NodeKind::Bool)
    }

    pub fn integer() -> Self {
        Self::of(NodeKind::Int)
    }

    pub fn float() -> Self {
        Self::of(NodeKind::Float)
    }

    pub fn variable() -> Self {
        Self::of(NodeKind::Variable)
    }

    /// Map with declared fields (add them with [`ConfigNode::child`])
    pub fn map() -> Self {
        Self {
            children: Children::Fields(Vec::new()),
            ..Self::of(NodeKind::Map)
        }
    }

    /// Map whose entries are keyed by name and each validated against `prototype`
    pub fn map_of(prototype: ConfigNode) -> Self {
        Self {
            children: Children::Prototype(Box::new(prototype)),
            ..Self::of(NodeKind::Map)
        }
    }

    /// List whose elements are each validated against `prototype`
    pub fn array_of(prototype: ConfigNode) -> Self {
        Self {
            children: Children::Prototype(Box::new(prototype)),
            ..Self::of(NodeKind::Array)
        }
    }

    /// Declare a child field. Only meaningful on [`ConfigNode::map`] nodes.
    ///
    /// Redeclaring a name replaces the earlier child in place.
    pub fn child(mut self, name: impl Into<String>, node: ConfigNode) -> Self {
        let name = name.into();
        if let Children::Fields(fields) = &mut self.children {
            match fields.iter_mut().find(|(n, _)| *n == name) {
                Some(slot) => slot.1 = node,
                None => fields.push((name, node)),
            }
        }
        self
    }

    pub fn required(mut self) -> Self {
        self.required = true;
        self
    }

    /// Accept an explicit `null`
    pub fn nullable(mut self) -> Self {
        self.nullable = true;
        self
    }

    pub fn default_value(mut self, value: impl Into<Value>) -> Self {
        self.default = Some(value.into());
        self
    }

    /// Default to `null` (implies [`ConfigNode::nullable`])
    pub fn default_null(mut self) -> Self {
        self.nullable = true;
        self.default = Some(Value::Null);
        self
    }

    pub fn info(mut self, info: impl Into<String>) -> Self {
        self.info = Some(info.into());
        self
    }

    /// Append a normalizer; normalizers run in declaration order and must be idempotent
    pub fn before_normalization<F>(mut self, normalizer: F) -> Self
    where
        F: Fn(Value) -> Value + Send + Sync + 'static,
    {
        self.normalizers.push(Arc::new(normalizer));
        self
    }

    /// Append a validator that fails with `message` when `predicate` returns `true`
    pub fn then_invalid<F>(mut self, predicate: F, message: impl Into<String>) -> Self
    where
        F: Fn(&Value) -> bool + Send + Sync + 'static,
    {
        self.rules.push(Rule {
            predicate: Arc::new(predicate),
            message: message.into(),
        });
        self
    }

    /// At most one of `keys` may be supplied with a non-null value
    pub fn mutually_exclusive(mut self, keys: &[&str]) -> Self {
        self.exclusive
            .push(keys.iter().map(|k| k.to_string()).collect());
        self
    }

    pub fn allowed_values(self, values: &[&str]) -> Self {
        let allowed: Vec<String> = values.iter().map(|v| v.to_string()).collect();
        let listed = allowed
            .iter()
            .map(|v| format!("\"{}\"", v))
            .collect::<Vec<_>>()
            .join(", ");
        self.then_invalid(
            move |v| {
                let candidate = match v {
                    Value::String(s) => s.clone(),
                    other => other.to_string(),
                };
                !allowed.contains(&candidate)
            },
            format!("the value {{value}} is not allowed, permissible values: {}", listed),
        )
    }

    pub fn min(self, min: i64) -> Self {
        self.then_invalid(
            move |v| v.as_f64().is_some_and(|n| n < min as f64),
            format!("the value {{value}} is too small, should be greater than or equal to {}", min),
        )
    }

    pub fn max(self, max: i64) -> Self {
        self.then_invalid(
            move |v| v.as_f64().is_some_and(|n| n > max as f64),
            format!("the value {{value}} is too big, should be less than or equal to {}", max),
        )
    }

    pub fn cannot_be_empty(self) -> Self {
        self.then_invalid(
            |v| match v {
                Value::String(s) => s.is_empty(),
                Value::Array(a) => a.is_empty(),
                Value::Object(m) => m.is_empty(),
                _ => false,
            },
            "the value cannot be empty",
        )
    }

    /// Accept a bare string where a one-element list is expected
    pub fn accept_string_as_list(self) -> Self {
        self.before_normalization(|v| match v {
            Value::String(s) => json!([s]),
            other => other,
        })
    }

    /// Add an `enabled` flag defaulting to `false`.
    ///
    /// The section may be given as `true`, `false` or `null`; a map without
    /// `enabled` counts as enabled.
    pub fn can_be_enabled(self) -> Self {
        self.with_enabled_flag(false).before_normalization(|v| match v {
            Value::Null => json!({ "enabled": true }),
            Value::Bool(b) => json!({ "enabled": b }),
            Value::Object(mut m) => {
                if !m.contains_key("enabled") {
                    m.insert("enabled".to_string(), Value::Bool(true));
                }
                Value::Object(m)
            }
            other => other,
        })
    }

    /// Add an `enabled` flag defaulting to `true`; `false` disables the section
    pub fn can_be_disabled(self) -> Self {
        self.with_enabled_flag(true).before_normalization(|v| match v {
            Value::Null => json!({ "enabled": true }),
            Value::Bool(b) => json!({ "enabled": b }),
            other => other,
        })
    }

    fn with_enabled_flag(mut self, default: bool) -> Self {
        if let Children::Fields(fields) = &mut self.children {
            fields.retain(|(n, _)| n != "enabled");
            fields.insert(
                0,
                (
                    "enabled".to_string(),
                    ConfigNode::boolean().default_value(default),
                ),
            );
        }
        self
    }

    pub fn kind(&self) -> NodeKind {
        self.kind
    }

    pub fn is_required(&self) -> bool {
        self.required
    }

    pub fn is_nullable(&self) -> bool {
        self.nullable
    }

    /// The explicitly declared default, if any
    pub fn default(&self) -> Option<&Value> {
        self.default.as_ref()
    }

    pub fn description(&self) -> Option<&str> {
        self.info.as_deref()
    }

    /// Declared fields of a map node, in declaration order
    pub fn fields(&self) -> impl Iterator<Item = (&str, &ConfigNode)> {
        let fields: &[(String, ConfigNode)] = match &self.children {
            Children::Fields(fields) => fields.as_slice(),
            _ => &[],
        };
        fields.iter().map(|(n, c)| (n.as_str(), c))
    }

    pub fn field(&self, name: &str) -> Option<&ConfigNode> {
        self.fields().find(|(n, _)| *n == name).map(|(_, c)| c)
    }

    pub fn prototype(&self) -> Option<&ConfigNode> {
        match &self.children {
            Children::Prototype(p) => Some(p),
            _ => None,
        }
    }

    /// The value this node takes when absent from the input.
    ///
    /// Maps with fields collect their children's defaults; prototyped
    /// collections default to empty. Required children without a default
    /// are left out.
    pub fn default_tree(&self) -> Option<Value> {
        if let Some(default) = &self.default {
            return Some(default.clone());
        }
        match (&self.kind, &self.children) {
            (NodeKind::Map, Children::Fields(fields)) => {
                let mut out = Map::new();
                for (name, child) in fields {
                    if let Some(v) = child.default_tree() {
                        out.insert(name.clone(), v);
                    }
                }
                Some(Value::Object(out))
            }
            (NodeKind::Map, Children::Prototype(_)) => Some(Value::Object(Map::new())),
            (NodeKind::Array, _) => Some(Value::Array(Vec::new())),
            _ => None,
        }
    }
}

impl fmt::Debug for ConfigNode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut s = f.debug_struct("ConfigNode");
        s.field("kind", &self.kind)
            .field("required", &self.required)
            .field("nullable", &self.nullable)
            .field("default", &self.default)
            .field("normalizers", &self.normalizers.len())
            .field("validators", &self.rules.len());
        match &self.children {
            Children::Fields(fields) => {
                let names: Vec<&str> = fields.iter().map(|(n, _)| n.as_str()).collect();
                s.field("fields", &names);
            }
            Children::Prototype(p) => {
                s.field("prototype", p);
            }
            Children::None => {}
        }
        s.finish()
    }
}

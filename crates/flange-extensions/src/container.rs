//! Service container abstraction that extensions register into
//!
//! The registry only talks to [`ServiceContainer`]. [`ContainerBuilder`] is an
//! in-memory implementation that records definitions, aliases, parameters and
//! method-call bindings so they can be inspected or exported.

use serde::Serialize;
use serde_json::{Map, Value};
use std::collections::{BTreeMap, HashMap};
use thiserror::Error;

/// Attributes attached to a tag on a definition
pub type TagAttributes = Map<String, Value>;

/// Errors raised by a container
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ContainerError {
    #[error("You have requested a non-existent service \"{id}\"")]
    ServiceNotFound { id: String },

    #[error("Service \"{id}\" is already defined")]
    AlreadyDefined { id: String },

    #[error("Cannot alias \"{alias}\" to non-existent service \"{target}\"")]
    InvalidAlias { alias: String, target: String },
}

/// A service definition
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Definition {
    pub id: String,
    /// Type or factory the service is built from
    pub entity: String,
    pub arguments: Vec<Value>,
    pub tags: Vec<(String, TagAttributes)>,
    pub public: bool,
}

impl Definition {
    pub fn new(id: impl Into<String>, entity: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            entity: entity.into(),
            arguments: Vec::new(),
            tags: Vec::new(),
            public: false,
        }
    }

    pub fn arg(mut self, value: impl Into<Value>) -> Self {
        self.arguments.push(value.into());
        self
    }

    pub fn args<I, V>(mut self, values: I) -> Self
    where
        I: IntoIterator<Item = V>,
        V: Into<Value>,
    {
        self.arguments.extend(values.into_iter().map(Into::into));
        self
    }

    pub fn tag(self, name: impl Into<String>) -> Self {
        self.tag_with(name, Value::Null)
    }

    /// Tag with attributes; anything other than a JSON object means no attributes
    pub fn tag_with(mut self, name: impl Into<String>, attributes: Value) -> Self {
        let attributes = match attributes {
            Value::Object(map) => map,
            _ => Map::new(),
        };
        self.tags.push((name.into(), attributes));
        self
    }

    pub fn public(mut self, public: bool) -> Self {
        self.public = public;
        self
    }

    pub fn has_tag(&self, name: &str) -> bool {
        self.tags.iter().any(|(t, _)| t == name)
    }

    /// Attributes of the first occurrence of `name` on this definition
    pub fn tag_attributes(&self, name: &str) -> Option<&TagAttributes> {
        self.tags
            .iter()
            .find(|(t, _)| t == name)
            .map(|(_, attrs)| attrs)
    }
}

/// A method call recorded against a service, applied when it is built
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Binding {
    pub service: String,
    pub method: String,
    pub arguments: Vec<Value>,
}

impl Binding {
    pub fn new(service: impl Into<String>, method: impl Into<String>) -> Self {
        Self {
            service: service.into(),
            method: method.into(),
            arguments: Vec::new(),
        }
    }

    pub fn arg(mut self, value: impl Into<Value>) -> Self {
        self.arguments.push(value.into());
        self
    }
}

/// What extensions may do to the container
pub trait ServiceContainer {
    /// Add a definition. Redefining an existing id is an error.
    fn set(&mut self, definition: Definition) -> Result<(), ContainerError>;

    /// Record a method call against an existing service
    fn bind(&mut self, binding: Binding) -> Result<(), ContainerError>;

    fn set_parameter(&mut self, name: &str, value: Value);

    fn parameter(&self, name: &str) -> Option<&Value>;

    /// True for definitions and aliases
    fn has(&self, id: &str) -> bool;

    /// Look up a definition, following aliases
    fn get(&self, id: &str) -> Result<&Definition, ContainerError>;

    /// Every (service id, attributes) pair carrying `tag`, in definition order
    fn tagged(&self, tag: &str) -> Vec<(&str, &TagAttributes)>;

    /// Make `alias` resolve to `target`
    fn alias(&mut self, alias: &str, target: &str) -> Result<(), ContainerError>;
}

/// In-memory container that keeps definitions in insertion order
#[derive(Debug, Default, Clone, Serialize)]
pub struct ContainerBuilder {
    definitions: Vec<Definition>,
    #[serde(skip)]
    index: HashMap<String, usize>,
    aliases: BTreeMap<String, String>,
    bindings: Vec<Binding>,
    parameters: BTreeMap<String, Value>,
}

impl ContainerBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn definitions(&self) -> &[Definition] {
        &self.definitions
    }

    pub fn aliases(&self) -> &BTreeMap<String, String> {
        &self.aliases
    }

    pub fn parameters(&self) -> &BTreeMap<String, Value> {
        &self.parameters
    }

    pub fn bindings(&self) -> &[Binding] {
        &self.bindings
    }

    /// Bindings recorded against one service, in the order they were added
    pub fn bindings_for<'a>(&'a self, service: &'a str) -> impl Iterator<Item = &'a Binding> {
        self.bindings.iter().filter(move |b| b.service == service)
    }

    pub fn len(&self) -> usize {
        self.definitions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.definitions.is_empty()
    }

    fn resolve_id<'a>(&'a self, id: &'a str) -> &'a str {
        self.aliases.get(id).map(String::as_str).unwrap_or(id)
    }
}

impl ServiceContainer for ContainerBuilder {
    fn set(&mut self, definition: Definition) -> Result<(), ContainerError> {
        if self.index.contains_key(&definition.id) || self.aliases.contains_key(&definition.id) {
            return Err(ContainerError::AlreadyDefined { id: definition.id });
        }
        tracing::debug!("Defining service {} ({})", definition.id, definition.entity);
        self.index
            .insert(definition.id.clone(), self.definitions.len());
        self.definitions.push(definition);
        Ok(())
    }

    fn bind(&mut self, binding: Binding) -> Result<(), ContainerError> {
        if !self.has(&binding.service) {
            return Err(ContainerError::ServiceNotFound { id: binding.service });
        }
        let service = self.resolve_id(&binding.service).to_string();
        self.bindings.push(Binding { service, ..binding });
        Ok(())
    }

    fn set_parameter(&mut self, name: &str, value: Value) {
        self.parameters.insert(name.to_string(), value);
    }

    fn parameter(&self, name: &str) -> Option<&Value> {
        self.parameters.get(name)
    }

    fn has(&self, id: &str) -> bool {
        self.index.contains_key(id) || self.aliases.contains_key(id)
    }

    fn get(&self, id: &str) -> Result<&Definition, ContainerError> {
        self.index
            .get(self.resolve_id(id))
            .map(|&i| &self.definitions[i])
            .ok_or_else(|| ContainerError::ServiceNotFound { id: id.to_string() })
    }

    fn tagged(&self, tag: &str) -> Vec<(&str, &TagAttributes)> {
        self.definitions
            .iter()
            .flat_map(move |def| {
                def.tags
                    .iter()
                    .filter(move |(t, _)| t == tag)
                    .map(move |(_, attrs)| (def.id.as_str(), attrs))
            })
            .collect()
    }

    /// Aliases of aliases are stored against the service they finally name
    fn alias(&mut self, alias: &str, target: &str) -> Result<(), ContainerError> {
        if self.has(alias) {
            return Err(ContainerError::AlreadyDefined {
                id: alias.to_string(),
            });
        }
        let resolved = self.resolve_id(target);
        if !self.index.contains_key(resolved) {
            return Err(ContainerError::InvalidAlias {
                alias: alias.to_string(),
                target: target.to_string(),
            });
        }
        let resolved = resolved.to_string();
        tracing::debug!("Aliasing {} to {}", alias, resolved);
        self.aliases.insert(alias.to_string(), resolved);
        Ok(())
    }
}

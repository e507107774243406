//! Error types for flange-core

use thiserror::Error;

/// Result type alias using flange-core's Error type
pub type Result<T> = std::result::Result<T, Error>;

/// Core error types for configuration loading
#[derive(Error, Debug)]
pub enum Error {
    /// Configuration file not found
    #[error("Configuration file not found: {path}")]
    ConfigNotFound { path: String },

    /// Invalid configuration format
    #[error("Invalid configuration format: {message}")]
    InvalidConfig { message: String },

    /// YAML parsing error
    #[error("YAML parsing error: {0}")]
    YamlParse(#[from] serde_yaml_ng::Error),

    /// JSON parsing error
    #[error("JSON parsing error: {0}")]
    JsonParse(#[from] serde_json::Error),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// A `%env(NAME)%` placeholder referenced an unset variable
    #[error("Environment variable not found: \"{name}\" (referenced at {path})")]
    UnresolvedPlaceholder { name: String, path: String },

    /// Configuration value rejected by its schema
    #[error(transparent)]
    Validation(#[from] ValidationError),
}

impl Error {
    /// Create a config not found error
    pub fn config_not_found(path: impl Into<String>) -> Self {
        Self::ConfigNotFound { path: path.into() }
    }

    /// Create an invalid config error
    pub fn invalid_config(message: impl Into<String>) -> Self {
        Self::InvalidConfig {
            message: message.into(),
        }
    }

    /// Create an unresolved placeholder error
    pub fn unresolved_placeholder(name: impl Into<String>, path: impl Into<String>) -> Self {
        Self::UnresolvedPlaceholder {
            name: name.into(),
            path: path.into(),
        }
    }
}

/// A configuration value that does not match its schema.
///
/// `path` is the dotted location of the offending node, rooted at the
/// section alias (e.g. `cache.pools.default.adapters`).
#[derive(Error, Debug, Clone, PartialEq)]
#[error("{}{kind}", path_prefix(.path))]
pub struct ValidationError {
    pub path: String,
    pub kind: ValidationErrorKind,
}

/// What went wrong at a [`ValidationError`]'s path
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ValidationErrorKind {
    /// A required child was absent and declares no default
    #[error("the child config \"{key}\" must be configured")]
    MissingRequiredKey { key: String },

    /// Keys not declared by the schema
    #[error("unrecognized option(s) {}; available options are {}", quote_list(.keys), quote_list(.available))]
    UnknownKeys {
        keys: Vec<String>,
        available: Vec<String>,
    },

    /// The value has the wrong shape for the node
    #[error("invalid type, expected {expected} but got {found}")]
    InvalidType {
        expected: &'static str,
        found: String,
    },

    /// Converting the value would drop information
    #[error("cannot convert {value} to {target} without losing information")]
    LossyCoercion { value: String, target: &'static str },

    /// More than one key of an exclusive group was supplied
    #[error("options {} cannot be used together", quote_list(.keys))]
    MutuallyExclusive { keys: Vec<String> },

    /// A declared validator rejected the value
    #[error("{message}")]
    Invalid { message: String },

    /// A node's declared default fails its own validators
    #[error("invalid default value: {message}")]
    InvalidDefault { message: String },
}

impl ValidationError {
    pub fn new(path: impl Into<String>, kind: ValidationErrorKind) -> Self {
        Self {
            path: path.into(),
            kind,
        }
    }

    /// Dotted path of the missing key when this is a `MissingRequiredKey`
    pub fn missing_key_path(&self) -> Option<&str> {
        match self.kind {
            ValidationErrorKind::MissingRequiredKey { .. } => Some(self.path.as_str()),
            _ => None,
        }
    }
}

fn path_prefix(path: &str) -> String {
    if path.is_empty() {
        String::new()
    } else {
        format!("{}: ", path)
    }
}

fn quote_list(items: &[String]) -> String {
    items
        .iter()
        .map(|k| format!("\"{}\"", k))
        .collect::<Vec<_>>()
        .join(", ")
}

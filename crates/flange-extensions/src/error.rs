//! Error types for extension loading

use flange_core::ValidationError;
use thiserror::Error;

use crate::container::ContainerError;

/// Result type alias for registry operations
pub type Result<T> = std::result::Result<T, ExtensionError>;

/// Everything that can abort building the container
#[derive(Error, Debug)]
pub enum ExtensionError {
    /// User configuration rejected by an extension's schema
    #[error("Invalid configuration for extension \"{alias}\": {source}")]
    Validation {
        alias: String,
        #[source]
        source: ValidationError,
    },

    /// An optional capability the extension needs is not installed
    #[error("Extension \"{alias}\" requires \"{capability}\", which is not available. {hint}")]
    MissingDependency {
        alias: String,
        capability: String,
        hint: String,
    },

    /// Extensions depend on each other in a loop
    #[error("Circular dependency detected: {cycle}")]
    CyclicDependency { cycle: String },

    /// The same alias added or registered twice
    #[error("Extension \"{alias}\" is already registered")]
    DuplicateExtension { alias: String },

    /// A dependency names an alias nobody registered
    #[error("Extension \"{alias}\" depends on unknown extension \"{dependency}\"")]
    UnknownDependency { alias: String, dependency: String },

    /// A dependency was explicitly switched off in configuration
    #[error("Extension \"{alias}\" depends on \"{dependency}\", which is disabled")]
    DisabledDependency { alias: String, dependency: String },

    /// A top-level config section with no matching extension
    #[error("There is no extension able to load the configuration for \"{section}\" (available: {available})")]
    UnknownConfigSection { section: String, available: String },

    /// `register` returned an error
    #[error("Extension \"{alias}\" failed to register: {cause}")]
    Register { alias: String, cause: anyhow::Error },

    /// `boot` returned an error
    #[error("Extension \"{alias}\" failed to boot: {cause}")]
    Boot { alias: String, cause: anyhow::Error },

    /// Operation not allowed in the registry's current state
    #[error("Invalid registry state: {message}")]
    InvalidState { message: String },

    /// Container rejected a definition
    #[error(transparent)]
    Container(#[from] ContainerError),
}

impl ExtensionError {
    /// Create a validation error for an extension section
    pub fn validation(alias: impl Into<String>, source: ValidationError) -> Self {
        Self::Validation {
            alias: alias.into(),
            source,
        }
    }

    /// Create a circular dependency error from the nodes along the cycle
    pub fn cyclic_dependency<S: AsRef<str>>(cycle: &[S]) -> Self {
        Self::CyclicDependency {
            cycle: cycle
                .iter()
                .map(|s| s.as_ref())
                .collect::<Vec<_>>()
                .join(" -> "),
        }
    }

    /// Create a duplicate extension error
    pub fn duplicate(alias: impl Into<String>) -> Self {
        Self::DuplicateExtension {
            alias: alias.into(),
        }
    }

    /// Create an invalid state error
    pub fn invalid_state(message: impl Into<String>) -> Self {
        Self::InvalidState {
            message: message.into(),
        }
    }

    /// Alias of the extension the error is attributed to, if any
    pub fn alias(&self) -> Option<&str> {
        match self {
            Self::Validation { alias, .. }
            | Self::MissingDependency { alias, .. }
            | Self::DuplicateExtension { alias }
            | Self::UnknownDependency { alias, .. }
            | Self::DisabledDependency { alias, .. }
            | Self::Register { alias, .. }
            | Self::Boot { alias, .. } => Some(alias),
            _ => None,
        }
    }

    /// Whether fixing user configuration (rather than code) can resolve this
    pub fn is_user_error(&self) -> bool {
        matches!(
            self,
            Self::Validation { .. }
                | Self::MissingDependency { .. }
                | Self::DisabledDependency { .. }
                | Self::UnknownConfigSection { .. }
        )
    }
}

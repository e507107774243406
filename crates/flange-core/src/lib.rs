//! # flange-core
//!
//! Core library for Flange providing:
//! - Declarative configuration schemas (`ConfigNode` trees)
//! - Validation and normalization of raw configuration against a schema
//! - Hierarchical YAML configuration loading (files, overlays, environment)

pub mod config;
pub mod error;
pub mod schema;

pub use config::{HierarchicalConfigLoader, KernelSettings, RawConfig};
pub use error::{Error, Result, ValidationError, ValidationErrorKind};
pub use schema::{ConfigNode, NodeKind, NormalizedConfig};

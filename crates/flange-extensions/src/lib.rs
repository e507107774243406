//! Extension management for Flange
//!
//! This crate handles:
//! - The `Extension` contract and the service container it writes to
//! - Dependency ordering with cycle detection
//! - Two-phase loading: validate every section, register all, then boot all
//! - Lifecycle events and dependency graph export
//! - The built-in extensions (events, cache, asset, console, routing)

pub mod builtin;
pub mod container;
pub mod dependency;
pub mod error;
pub mod events;
pub mod extension;
pub mod graph;
pub mod registry;

pub use container::{Binding, ContainerBuilder, ContainerError, Definition, ServiceContainer, TagAttributes};
pub use dependency::DependencyResolver;
pub use error::{ExtensionError, Result};
pub use events::{EventEnvelope, ExtensionEvent};
pub use extension::{Extension, ExtensionState, Requirement};
pub use graph::{DependencyGraph, GraphFormat};
pub use registry::{ExtensionRegistry, ExtensionRegistryBuilder, RegistryStatus};

//! Command implementations

pub mod about;
pub mod config;
pub mod container;
pub mod extension;

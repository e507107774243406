//! Common test utilities for flange-extensions
//!
//! This module provides shared test infrastructure including:
//! - Recording extensions that log every lifecycle call
//! - Builders for assembling registries from them
//! - YAML configuration fixtures
//! - Assertion helpers for ordering and error shapes

#![allow(dead_code)]
#![allow(unused_imports)]

pub mod assertions;
pub mod builders;
pub mod fixtures;
pub mod mocks;

pub use assertions::*;
pub use builders::*;
pub use fixtures::*;
pub use mocks::*;

//! Configuration schema: typed node trees and the validation engine

mod node;
mod normalized;
mod reference;
mod validator;

pub use node::{ConfigNode, NodeKind, Normalizer, Predicate};
pub use normalized::NormalizedConfig;

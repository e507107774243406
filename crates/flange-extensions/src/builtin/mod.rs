//! Extensions that ship with Flange

mod asset;
mod cache;
mod console;
mod events;
mod routing;

pub use asset::AssetExtension;
pub use cache::{CacheExtension, POOL_TAG};
pub use console::{ConsoleExtension, APPLICATION_ID, COMMAND_TAG};
pub use events::{EventsExtension, DISPATCHER_ID, LISTENER_TAG};
pub use routing::RoutingExtension;

use serde_json::Value;

use crate::error::Result;
use crate::extension::Extension;
use crate::registry::ExtensionRegistryBuilder;

/// All built-in extensions, in the order they are added to a registry
pub fn all() -> Vec<Box<dyn Extension>> {
    vec![
        Box::new(EventsExtension),
        Box::new(CacheExtension),
        Box::new(AssetExtension),
        Box::new(ConsoleExtension),
        Box::new(RoutingExtension),
    ]
}

/// Add every built-in extension to `builder`
pub fn register_all(builder: &mut ExtensionRegistryBuilder) -> Result<()> {
    for extension in all() {
        builder.add_boxed(extension)?;
    }
    Ok(())
}

/// Normalizer letting numeric YAML scalars stand in for strings
pub(crate) fn number_to_string(value: Value) -> Value {
    match value {
        Value::Number(n) => Value::String(n.to_string()),
        other => other,
    }
}

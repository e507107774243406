use anyhow::{anyhow, Context, Result};
use flange_core::{ConfigNode, NormalizedConfig};
use serde::Deserialize;
use serde_json::json;

use super::events::LISTENER_TAG;
use super::number_to_string;
use crate::container::{Binding, Definition, ServiceContainer};
use crate::extension::Extension;

pub const APPLICATION_ID: &str = "console.application";
pub const COMMAND_TAG: &str = "console.command";

/// Console application collecting tagged commands
pub struct ConsoleExtension;

#[derive(Debug, Deserialize)]
struct ConsoleConfig {
    name: String,
    version: String,
    catch_exceptions: bool,
}

impl Extension for ConsoleExtension {
    fn alias(&self) -> &str {
        "console"
    }

    fn dependencies(&self) -> Vec<String> {
        vec!["events".to_string()]
    }

    fn config_tree(&self) -> Option<ConfigNode> {
        Some(
            ConfigNode::map()
                .child("name", ConfigNode::string().default_value("Flange").cannot_be_empty())
                .child(
                    "version",
                    ConfigNode::string()
                        .default_value("UNKNOWN")
                        .before_normalization(number_to_string),
                )
                .child("catch_exceptions", ConfigNode::boolean().default_value(true)),
        )
    }

    fn register(
        &self,
        container: &mut dyn ServiceContainer,
        config: &NormalizedConfig,
    ) -> Result<()> {
        let config: ConsoleConfig = config
            .deserialize()
            .context("Failed to read normalized console configuration")?;

        container.set(
            Definition::new(APPLICATION_ID, "flange::console::Application")
                .arg(config.name)
                .arg(config.version)
                .arg(config.catch_exceptions)
                .public(true),
        )?;
        container.set(
            Definition::new("console.error_listener", "flange::console::ErrorListener").tag_with(
                LISTENER_TAG,
                json!({ "event": "console.error", "method": "on_console_error", "priority": -128 }),
            ),
        )?;
        Ok(())
    }

    /// Add every `console.command` service to the application
    fn boot(&self, container: &mut dyn ServiceContainer) -> Result<()> {
        let mut commands = Vec::new();
        for (id, attrs) in container.tagged(COMMAND_TAG) {
            let name = attrs
                .get("command")
                .and_then(|v| v.as_str())
                .ok_or_else(|| {
                    anyhow!(
                        "Service \"{}\" is tagged \"{}\" but has no \"command\" attribute",
                        id,
                        COMMAND_TAG
                    )
                })?;
            commands.push((name.to_string(), id.to_string()));
        }

        for (name, id) in commands {
            tracing::debug!("Adding console command {} ({})", name, id);
            container.bind(
                Binding::new(APPLICATION_ID, "add")
                    .arg(name)
                    .arg(id),
            )?;
        }
        Ok(())
    }
}

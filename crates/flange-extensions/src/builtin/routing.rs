use anyhow::{Context, Result};
use flange_core::{ConfigNode, NormalizedConfig};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::container::{Definition, ServiceContainer};
use crate::extension::Extension;

const METHODS: &[&str] = &["GET", "HEAD", "POST", "PUT", "PATCH", "DELETE", "OPTIONS"];

/// Route table from configuration
pub struct RoutingExtension;

#[derive(Debug, Deserialize, Serialize)]
struct Route {
    name: Option<String>,
    path: String,
    controller: String,
    methods: Vec<String>,
}

#[derive(Debug, Deserialize)]
struct RoutingConfig {
    routes: Vec<Route>,
}

fn uppercase(value: Value) -> Value {
    match value {
        Value::String(s) => Value::String(s.to_ascii_uppercase()),
        other => other,
    }
}

impl Extension for RoutingExtension {
    fn alias(&self) -> &str {
        "routing"
    }

    fn config_tree(&self) -> Option<ConfigNode> {
        let route = ConfigNode::map()
            .child("name", ConfigNode::string().default_null())
            .child(
                "path",
                ConfigNode::string()
                    .required()
                    .then_invalid(
                        |v| !v.as_str().is_some_and(|p| p.starts_with('/')),
                        "the route path {value} must start with \"/\"",
                    ),
            )
            .child("controller", ConfigNode::string().required().cannot_be_empty())
            .child(
                "methods",
                ConfigNode::array_of(
                    ConfigNode::string()
                        .before_normalization(uppercase)
                        .allowed_values(METHODS),
                )
                .accept_string_as_list(),
            );

        Some(ConfigNode::map().child("routes", ConfigNode::array_of(route)))
    }

    fn register(
        &self,
        container: &mut dyn ServiceContainer,
        config: &NormalizedConfig,
    ) -> Result<()> {
        let config: RoutingConfig = config
            .deserialize()
            .context("Failed to read normalized routing configuration")?;

        tracing::debug!("Registering {} routes", config.routes.len());
        let routes = config
            .routes
            .iter()
            .map(serde_json::to_value)
            .collect::<std::result::Result<Vec<_>, _>>()?;

        container.set(
            Definition::new("router", "flange::routing::Router")
                .args(routes)
                .public(true),
        )?;
        Ok(())
    }
}

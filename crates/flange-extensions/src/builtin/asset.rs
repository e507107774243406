use anyhow::{Context, Result};
use flange_core::{ConfigNode, NormalizedConfig};
use serde::Deserialize;
use serde_json::{json, Value};

use super::number_to_string;
use crate::container::{Definition, ServiceContainer};
use crate::extension::{Extension, Requirement};

/// Versioned public asset URLs
pub struct AssetExtension;

#[derive(Debug, Deserialize)]
struct AssetConfig {
    version: Option<String>,
    version_format: String,
    version_strategy: Option<String>,
    json_manifest_path: Option<String>,
    base_path: Option<String>,
    base_urls: Vec<String>,
}

impl AssetConfig {
    /// Service description of the version strategy in effect
    fn strategy(&self) -> Value {
        if let Some(service) = &self.version_strategy {
            json!({ "service": service })
        } else if let Some(path) = &self.json_manifest_path {
            json!({ "json_manifest": path })
        } else if let Some(version) = &self.version {
            json!({ "static": version, "format": self.version_format })
        } else {
            json!("empty")
        }
    }
}

impl Extension for AssetExtension {
    fn alias(&self) -> &str {
        "asset"
    }

    fn enabled_by_default(&self) -> bool {
        false
    }

    fn requirements(&self) -> Vec<Requirement> {
        vec![Requirement::new(
            "asset",
            "Asset support cannot be enabled as the asset component is not installed.",
        )]
    }

    fn config_tree(&self) -> Option<ConfigNode> {
        Some(
            ConfigNode::map()
                .child(
                    "version",
                    ConfigNode::string()
                        .default_null()
                        .before_normalization(number_to_string),
                )
                .child(
                    "version_format",
                    ConfigNode::string().default_value("%s?%s"),
                )
                .child("version_strategy", ConfigNode::string().default_null())
                .child("json_manifest_path", ConfigNode::string().default_null())
                .child("base_path", ConfigNode::string().default_null())
                .child(
                    "base_urls",
                    ConfigNode::array_of(ConfigNode::string()).accept_string_as_list(),
                )
                .mutually_exclusive(&["version", "version_strategy", "json_manifest_path"])
                .mutually_exclusive(&["base_path", "base_urls"])
                .can_be_enabled(),
        )
    }

    fn register(
        &self,
        container: &mut dyn ServiceContainer,
        config: &NormalizedConfig,
    ) -> Result<()> {
        if !config.is_enabled() {
            tracing::debug!("Asset support disabled");
            return Ok(());
        }
        let config: AssetConfig = config
            .deserialize()
            .context("Failed to read normalized asset configuration")?;

        container.set(
            Definition::new("assets.packages", "flange::asset::Packages")
                .arg(config.strategy())
                .arg(config.base_path.clone().unwrap_or_default())
                .arg(json!(config.base_urls))
                .public(true),
        )?;
        Ok(())
    }
}

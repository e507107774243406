use anyhow::{Context, Result};
use flange_core::{ConfigNode, NormalizedConfig};
use serde::Deserialize;
use serde_json::{json, Value};
use std::collections::BTreeMap;

use crate::container::{Definition, ServiceContainer};
use crate::extension::Extension;

pub const POOL_TAG: &str = "cache.pool";
const DEFAULT_ADAPTER: &str = "cache.adapter.filesystem";

/// Named cache pools built from adapter chains
pub struct CacheExtension;

#[derive(Debug, Deserialize)]
struct CacheConfig {
    prefix_seed: Option<Value>,
    default_lifetime: u64,
    pools: BTreeMap<String, PoolConfig>,
}

#[derive(Debug, Deserialize)]
struct PoolConfig {
    adapters: Vec<String>,
    public: bool,
    tags: Option<Value>,
    default_lifetime: Option<u64>,
}

impl Extension for CacheExtension {
    fn alias(&self) -> &str {
        "cache"
    }

    fn config_tree(&self) -> Option<ConfigNode> {
        let pool = ConfigNode::map()
            .child(
                "adapters",
                ConfigNode::array_of(ConfigNode::string())
                    .accept_string_as_list()
                    .default_value(json!([DEFAULT_ADAPTER]))
                    .cannot_be_empty()
                    .info("Adapter service ids; more than one builds a chain"),
            )
            .child("public", ConfigNode::boolean().default_value(false))
            .child(
                "tags",
                ConfigNode::scalar()
                    .default_null()
                    .info("Name of the tag-aware pool to wrap this one in"),
            )
            .child(
                "default_lifetime",
                ConfigNode::integer().default_null().min(0),
            );

        Some(
            ConfigNode::map()
                .child(
                    "prefix_seed",
                    ConfigNode::scalar()
                        .default_null()
                        .info("Used to namespace cache keys between deployments"),
                )
                .child(
                    "default_lifetime",
                    ConfigNode::integer().default_value(0).min(0),
                )
                .child("pools", ConfigNode::map_of(pool)),
        )
    }

    fn register(
        &self,
        container: &mut dyn ServiceContainer,
        config: &NormalizedConfig,
    ) -> Result<()> {
        let config: CacheConfig = config
            .deserialize()
            .context("Failed to read normalized cache configuration")?;

        let seed = config.prefix_seed.as_ref().map(|seed| match seed {
            Value::String(s) => s.clone(),
            other => other.to_string(),
        });
        if let Some(seed) = &seed {
            container.set_parameter("cache.prefix.seed", Value::String(seed.clone()));
        }

        for (name, pool) in &config.pools {
            let id = format!("cache.pool.{}", name);
            let lifetime = pool.default_lifetime.unwrap_or(config.default_lifetime);
            let namespace = match &seed {
                Some(seed) => format!("{}.{}", seed, name),
                None => name.clone(),
            };

            let definition = if pool.adapters.len() == 1 {
                Definition::new(&id, pool.adapters[0].as_str())
            } else {
                Definition::new(&id, "cache.adapter.chain").arg(json!(pool.adapters))
            };
            let definition = definition
                .arg(namespace)
                .arg(lifetime)
                .public(pool.public)
                .tag_with(POOL_TAG, json!({ "name": name, "tags": pool.tags }));

            container.set(definition)?;
        }

        if config.pools.contains_key("default") {
            container.alias("cache.app", "cache.pool.default")?;
        }
        Ok(())
    }
}

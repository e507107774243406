//! Configuration fixtures

#![allow(dead_code)]

use flange_core::ConfigNode;
use serde_json::Value;

/// Parse a YAML document into a raw configuration value
pub fn yaml(source: &str) -> Value {
    serde_yaml_ng::from_str(source).expect("fixture is valid YAML")
}

/// Section schema with a required `dsn` and an optional `pool_size`
pub fn database_schema() -> ConfigNode {
    ConfigNode::map()
        .child("dsn", ConfigNode::scalar().required())
        .child("pool_size", ConfigNode::integer().default_value(4).min(1))
}

pub const CACHE_CONFIG: &str = r#"
cache:
  pools:
    default:
      adapters: [cache.adapter.filesystem]
"#;

pub const FULL_CONFIG: &str = r#"
cache:
  prefix_seed: acme
  default_lifetime: 300
  pools:
    default:
      adapters: cache.adapter.redis
      public: true
    sessions:
      adapters: [cache.adapter.apcu, cache.adapter.redis]
      default_lifetime: 60
asset:
  version: v2
  base_path: /static
console:
  name: Acme
  version: 1.2
routing:
  routes:
    - path: /
      controller: home
    - name: blog_post
      path: /blog/{slug}
      controller: blog.show
      methods: get
"#;

//! Configuration loading and merging

mod hierarchical_loader;
mod loader;

pub use hierarchical_loader::{
    HierarchicalConfigLoader, KernelSettings, DEBUG_VAR, ENV_VAR, OVERRIDE_PREFIX,
};
pub use loader::{deep_merge, find_config, parse_yaml, read_yaml_file, RawConfig, CONFIG_FILE_NAMES};

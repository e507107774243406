//! Config commands

use anyhow::{anyhow, Result};
use camino::Utf8Path;
use serde_json::{Map, Value};

use crate::cli::{ConfigCommands, ConfigDumpArgs, ConfigReferenceArgs};
use crate::kernel::{builtin_registry, Kernel};
use crate::output;

pub fn run(cmd: ConfigCommands, config: Option<&Utf8Path>, env: Option<&str>) -> Result<()> {
    match cmd {
        ConfigCommands::Validate => validate(config, env),
        ConfigCommands::Dump(args) => dump(args, config, env),
        ConfigCommands::Reference(args) => reference(args),
    }
}

fn validate(config: Option<&Utf8Path>, env: Option<&str>) -> Result<()> {
    let mut kernel = Kernel::load(config, env)?;
    kernel.boot()?;

    match &kernel.raw().config_path {
        Some(path) => output::success(&format!("Configuration is valid: {}", path)),
        None => output::success("Configuration is valid (no configuration file found)"),
    }
    output::kv("Environment", &kernel.settings().environment);
    output::kv("Extensions", &kernel.registry().order().join(", "));
    output::kv("Services", &kernel.container().len().to_string());
    Ok(())
}

fn dump(args: ConfigDumpArgs, config: Option<&Utf8Path>, env: Option<&str>) -> Result<()> {
    let kernel = Kernel::load(config, env)?;
    let configs = kernel.validate()?;

    let mut sections = Map::new();
    for (alias, normalized) in configs {
        if args.alias.as_deref().is_some_and(|a| a != alias) {
            continue;
        }
        sections.insert(alias, normalized.into_raw());
    }

    if let Some(alias) = &args.alias {
        if sections.is_empty() {
            if kernel.registry().has_extension(alias) {
                output::info(&format!("Extension \"{}\" is not active", alias));
                return Ok(());
            }
            return Err(anyhow!("No extension with alias \"{}\"", alias));
        }
    }

    print!("{}", serde_yaml_ng::to_string(&Value::Object(sections))?);
    Ok(())
}

fn reference(args: ConfigReferenceArgs) -> Result<()> {
    let registry = builtin_registry()?;
    let extension = registry.get(&args.alias).ok_or_else(|| {
        anyhow!(
            "No extension with alias \"{}\" (available: {})",
            args.alias,
            registry.aliases().join(", ")
        )
    })?;

    match extension.config_tree() {
        Some(tree) => print!("{}", tree.reference_yaml(&args.alias)),
        None => output::info(&format!(
            "Extension \"{}\" takes no configuration",
            args.alias
        )),
    }
    Ok(())
}

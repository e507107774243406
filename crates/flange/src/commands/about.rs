//! About command

use anyhow::Result;
use camino::Utf8Path;
use serde::Serialize;
use tabled::{settings::Style, Table, Tabled};

use crate::cli::AboutArgs;
use crate::kernel::Kernel;
use crate::version::VersionInfo;

#[derive(Debug, Serialize)]
struct AboutInfo {
    version: VersionInfo,
    os: &'static str,
    arch: &'static str,
    environment: String,
    debug: bool,
    project_dir: String,
    config_file: Option<String>,
    config_sources: Vec<String>,
    extensions: usize,
}

#[derive(Tabled)]
struct AboutRow {
    property: String,
    value: String,
}

impl AboutRow {
    fn new(property: &str, value: impl Into<String>) -> Self {
        Self {
            property: property.to_string(),
            value: value.into(),
        }
    }
}

pub fn run(args: AboutArgs, config: Option<&Utf8Path>, env: Option<&str>) -> Result<()> {
    let kernel = Kernel::load(config, env)?;
    let raw = kernel.raw();

    let info = AboutInfo {
        version: VersionInfo::current(),
        os: std::env::consts::OS,
        arch: std::env::consts::ARCH,
        environment: kernel.settings().environment.clone(),
        debug: kernel.settings().debug,
        project_dir: raw.working_dir.to_string(),
        config_file: raw.config_path.as_ref().map(|p| p.to_string()),
        config_sources: raw.sources.iter().map(|p| p.to_string()).collect(),
        extensions: kernel.registry().len(),
    };

    if args.json {
        println!("{}", serde_json::to_string_pretty(&info)?);
        return Ok(());
    }

    let rows = vec![
        AboutRow::new("Version", info.version.display()),
        AboutRow::new(
            "Build date",
            info.version.build_date.clone().unwrap_or_else(|| "-".to_string()),
        ),
        AboutRow::new("OS / arch", format!("{} / {}", info.os, info.arch)),
        AboutRow::new("Environment", info.environment.clone()),
        AboutRow::new("Debug", if info.debug { "true" } else { "false" }),
        AboutRow::new("Project dir", info.project_dir.clone()),
        AboutRow::new(
            "Config file",
            info.config_file.clone().unwrap_or_else(|| "(none)".to_string()),
        ),
        AboutRow::new("Config sources", info.config_sources.len().to_string()),
        AboutRow::new("Extensions", info.extensions.to_string()),
    ];

    let mut table = Table::new(rows);
    table.with(Style::sharp());
    println!("{}", table);
    Ok(())
}

//! Extension commands

use anyhow::Result;
use camino::Utf8Path;
use flange_extensions::{DependencyGraph, ExtensionState};
use owo_colors::OwoColorize;
use serde::Serialize;
use tabled::{settings::Style, Table, Tabled};

use crate::cli::{ExtensionCommands, ExtensionGraphArgs, ExtensionListArgs};
use crate::kernel::{builtin_registry, Kernel};
use crate::output;

pub fn run(cmd: ExtensionCommands, config: Option<&Utf8Path>, env: Option<&str>) -> Result<()> {
    match cmd {
        ExtensionCommands::List(args) => list(args, config, env),
        ExtensionCommands::Graph(args) => graph(args),
    }
}

/// Row for the extension table
#[derive(Tabled, Serialize)]
struct ExtensionRow {
    alias: String,
    #[tabled(rename = "depends on")]
    depends_on: String,
    activation: String,
    state: String,
}

fn list(args: ExtensionListArgs, config: Option<&Utf8Path>, env: Option<&str>) -> Result<()> {
    let mut kernel = Kernel::load(config, env)?;
    let load_error = kernel.boot().err();

    let registry = kernel.registry();
    let rows: Vec<ExtensionRow> = registry
        .extensions()
        .map(|ext| {
            let alias = ext.alias().to_string();
            let deps = ext.dependencies();
            let state = registry
                .state(&alias)
                .unwrap_or(ExtensionState::Unregistered);
            ExtensionRow {
                depends_on: if deps.is_empty() {
                    "-".to_string()
                } else {
                    deps.join(", ")
                },
                activation: if ext.enabled_by_default() {
                    "default".to_string()
                } else {
                    "opt-in".to_string()
                },
                state: if args.json {
                    state.to_string()
                } else {
                    colored_state(state)
                },
                alias,
            }
        })
        .collect();

    if args.json {
        println!("{}", serde_json::to_string_pretty(&rows)?);
    } else {
        let mut table = Table::new(rows);
        table.with(Style::sharp());
        println!("{}", table);
    }

    if let Some(err) = load_error {
        output::warning(&format!("Extensions did not finish loading: {:#}", err));
    }
    Ok(())
}

fn colored_state(state: ExtensionState) -> String {
    match state {
        ExtensionState::Booted => state.green().to_string(),
        ExtensionState::Registered => state.yellow().to_string(),
        ExtensionState::Skipped => state.dimmed().to_string(),
        ExtensionState::Unregistered => state.red().to_string(),
    }
}

fn graph(args: ExtensionGraphArgs) -> Result<()> {
    let registry = builtin_registry()?;
    let graph = DependencyGraph::from_registry(&registry);
    print!("{}", graph.render(args.format.into()));
    Ok(())
}

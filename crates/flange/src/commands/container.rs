//! Container commands

use anyhow::Result;
use camino::Utf8Path;
use serde::Serialize;
use tabled::{settings::Style, Table, Tabled};

use crate::cli::{ContainerCommands, ContainerListArgs};
use crate::kernel::Kernel;
use crate::output;

pub fn run(cmd: ContainerCommands, config: Option<&Utf8Path>, env: Option<&str>) -> Result<()> {
    match cmd {
        ContainerCommands::List(args) => list(args, config, env),
    }
}

/// Row for the service table
#[derive(Tabled, Serialize)]
struct ServiceRow {
    id: String,
    entity: String,
    public: bool,
    tags: String,
}

fn list(args: ContainerListArgs, config: Option<&Utf8Path>, env: Option<&str>) -> Result<()> {
    let mut kernel = Kernel::load(config, env)?;
    kernel.boot()?;
    let container = kernel.container();

    let rows: Vec<ServiceRow> = container
        .definitions()
        .iter()
        .filter(|def| args.tag.as_deref().map_or(true, |tag| def.has_tag(tag)))
        .map(|def| ServiceRow {
            id: def.id.clone(),
            entity: def.entity.clone(),
            public: def.public,
            tags: def
                .tags
                .iter()
                .map(|(name, _)| name.as_str())
                .collect::<Vec<_>>()
                .join(", "),
        })
        .collect();

    if args.json {
        println!("{}", serde_json::to_string_pretty(&rows)?);
        return Ok(());
    }

    if rows.is_empty() {
        match &args.tag {
            Some(tag) => output::warning(&format!("No services tagged \"{}\"", tag)),
            None => output::warning("No services defined"),
        }
        return Ok(());
    }

    let mut table = Table::new(rows);
    table.with(Style::sharp());
    println!("{}", table);

    if args.tag.is_none() && !container.aliases().is_empty() {
        output::header("Aliases");
        for (alias, target) in container.aliases() {
            output::kv(alias, target);
        }
    }
    Ok(())
}

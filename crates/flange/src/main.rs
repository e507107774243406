//! Flange CLI - configuration-driven service wiring
//!
//! This is the main entry point for the flange command-line interface.

mod cli;
mod commands;
mod kernel;
mod output;
mod version;

use anyhow::Result;
use clap::Parser;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use cli::{Cli, Commands};

fn main() {
    let cli = Cli::parse();

    init_tracing(cli.verbose, cli.quiet);

    if let Err(e) = run(cli) {
        output::error(&format!("{:#}", e));
        std::process::exit(1);
    }
}

fn run(cli: Cli) -> Result<()> {
    let config = cli.config.as_deref();
    let env = cli.env.as_deref();

    match cli.command {
        Commands::About(args) => commands::about::run(args, config, env),
        Commands::Config(cmd) => commands::config::run(cmd, config, env),
        Commands::Extension(cmd) => commands::extension::run(cmd, config, env),
        Commands::Container(cmd) => commands::container::run(cmd, config, env),
    }
}

/// Initialize tracing with appropriate verbosity
fn init_tracing(verbose: u8, quiet: bool) {
    let filter = if quiet {
        EnvFilter::new("error")
    } else {
        match verbose {
            0 => EnvFilter::new("warn"),
            1 => EnvFilter::new("info"),
            2 => EnvFilter::new("debug"),
            _ => EnvFilter::new("trace"),
        }
    };

    tracing_subscriber::registry()
        .with(fmt::layer().with_target(false).with_writer(std::io::stderr))
        .with(filter)
        .init();
}

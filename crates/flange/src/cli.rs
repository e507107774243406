//! CLI argument parsing with clap

use camino::Utf8PathBuf;
use clap::{Args, Parser, Subcommand, ValueEnum};
use flange_extensions::GraphFormat;

/// Flange - configuration-driven service wiring
#[derive(Parser, Debug)]
#[command(name = "flange")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Increase verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Suppress output
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Path to flange.yaml config file
    #[arg(short, long, global = true)]
    pub config: Option<Utf8PathBuf>,

    /// Environment name (overrides FLANGE_ENV)
    #[arg(short, long, global = true)]
    pub env: Option<String>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Show information about the application and its environment
    About(AboutArgs),

    /// Configuration inspection and validation
    #[command(subcommand)]
    Config(ConfigCommands),

    /// Extension inspection
    #[command(subcommand)]
    Extension(ExtensionCommands),

    /// Service container inspection
    #[command(subcommand)]
    Container(ContainerCommands),
}

// About command
#[derive(Args, Debug)]
pub struct AboutArgs {
    /// Output as JSON
    #[arg(long)]
    pub json: bool,
}

// Config commands
#[derive(Subcommand, Debug)]
pub enum ConfigCommands {
    /// Validate configuration and build the container
    Validate,

    /// Print the normalized configuration
    Dump(ConfigDumpArgs),

    /// Print the default configuration of an extension
    Reference(ConfigReferenceArgs),
}

#[derive(Args, Debug)]
pub struct ConfigDumpArgs {
    /// Only dump this extension's section
    pub alias: Option<String>,
}

#[derive(Args, Debug)]
pub struct ConfigReferenceArgs {
    /// Extension alias
    pub alias: String,
}

// Extension commands
#[derive(Subcommand, Debug)]
pub enum ExtensionCommands {
    /// List extensions in load order
    List(ExtensionListArgs),

    /// Print the extension dependency graph
    Graph(ExtensionGraphArgs),
}

#[derive(Args, Debug)]
pub struct ExtensionListArgs {
    /// Output as JSON
    #[arg(long)]
    pub json: bool,
}

#[derive(Args, Debug)]
pub struct ExtensionGraphArgs {
    /// Output format
    #[arg(short, long, value_enum, default_value_t = GraphFormatArg::Dot)]
    pub format: GraphFormatArg,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum GraphFormatArg {
    /// Graphviz
    Dot,

    /// PlantUML
    Puml,

    /// Mermaid flowchart
    Mermaid,
}

impl From<GraphFormatArg> for GraphFormat {
    fn from(arg: GraphFormatArg) -> Self {
        match arg {
            GraphFormatArg::Dot => GraphFormat::Dot,
            GraphFormatArg::Puml => GraphFormat::Puml,
            GraphFormatArg::Mermaid => GraphFormat::Mermaid,
        }
    }
}

// Container commands
#[derive(Subcommand, Debug)]
pub enum ContainerCommands {
    /// List service definitions after boot
    List(ContainerListArgs),
}

#[derive(Args, Debug)]
pub struct ContainerListArgs {
    /// Only services carrying this tag
    #[arg(long)]
    pub tag: Option<String>,

    /// Output as JSON
    #[arg(long)]
    pub json: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_global_flags_after_subcommand() {
        let cli = Cli::try_parse_from([
            "flange", "config", "validate", "-vv", "-c", "app/flange.yaml", "-e", "prod",
        ])
        .unwrap();

        assert_eq!(cli.verbose, 2);
        assert_eq!(cli.config.as_deref().map(|p| p.as_str()), Some("app/flange.yaml"));
        assert_eq!(cli.env.as_deref(), Some("prod"));
        assert!(matches!(cli.command, Commands::Config(ConfigCommands::Validate)));
    }

    #[test]
    fn test_graph_format_parsing() {
        let cli = Cli::try_parse_from(["flange", "extension", "graph", "--format", "mermaid"]).unwrap();
        match cli.command {
            Commands::Extension(ExtensionCommands::Graph(args)) => {
                assert_eq!(GraphFormat::from(args.format), GraphFormat::Mermaid);
            }
            other => panic!("unexpected command {:?}", other),
        }
    }

    #[test]
    fn test_graph_format_defaults_to_dot() {
        let cli = Cli::try_parse_from(["flange", "extension", "graph"]).unwrap();
        assert!(matches!(
            cli.command,
            Commands::Extension(ExtensionCommands::Graph(ExtensionGraphArgs {
                format: GraphFormatArg::Dot
            }))
        ));
    }

    #[test]
    fn test_unknown_graph_format_rejected() {
        let result = Cli::try_parse_from(["flange", "extension", "graph", "--format", "svg"]);
        assert!(result.is_err());
    }

    #[test]
    fn test_container_list_tag_filter() {
        let cli = Cli::try_parse_from(["flange", "container", "list", "--tag", "cache.pool"]).unwrap();
        match cli.command {
            Commands::Container(ContainerCommands::List(args)) => {
                assert_eq!(args.tag.as_deref(), Some("cache.pool"));
                assert!(!args.json);
            }
            other => panic!("unexpected command {:?}", other),
        }
    }

    #[test]
    fn test_reference_requires_alias() {
        assert!(Cli::try_parse_from(["flange", "config", "reference"]).is_err());
    }
}

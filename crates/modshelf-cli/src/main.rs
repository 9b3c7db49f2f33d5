//! modshelf CLI
//!
//! Command-line interface for modshelf - saving, updating and browsing
//! reusable email modules.

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use tracing::debug;
use tracing_subscriber::EnvFilter;

use modshelf_core::{Config, ModuleEngine};

mod commands;
mod output;
mod slug;

use output::{Output, OutputFormat};

#[derive(Parser)]
#[command(name = "modshelf")]
#[command(about = "modshelf - Versioned storage for reusable email modules")]
#[command(version)]
#[command(propagate_version = true)]
struct Cli {
    /// Output as JSON
    #[arg(long, global = true)]
    json: bool,

    /// Quiet mode - minimal output
    #[arg(short, long, global = true)]
    quiet: bool,

    /// Increase log verbosity (-v info, -vv debug, -vvv trace)
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Use a specific config file
    #[arg(long, global = true, value_name = "PATH")]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Save a module (updates it if the id already exists)
    Save {
        /// Display label
        #[arg(short, long)]
        label: String,
        /// Unique identifier (defaults to custom-<label slug>)
        #[arg(long)]
        id: Option<String>,
        #[command(flatten)]
        content: ContentArgs,
    },
    /// Update an existing module; omitted fields keep their current value
    Update {
        /// Module id
        id: String,
        /// New display label
        #[arg(short, long)]
        label: Option<String>,
        #[command(flatten)]
        content: ContentArgs,
    },
    /// Delete a module
    #[command(alias = "rm")]
    Delete {
        /// Module id
        id: String,
    },
    /// List all modules
    #[command(alias = "ls")]
    List {
        /// Only show modules in this category
        #[arg(short, long)]
        category: Option<String>,
    },
    /// Show a module with its version history
    Show {
        /// Module id
        id: String,
    },
    /// Show which storage backend is in use
    Status,
    /// Show or set configuration
    Config {
        #[command(subcommand)]
        command: Option<ConfigCommands>,
    },
}

/// Module content shared by `save` and `update`
#[derive(Args, Debug, Clone, Default)]
struct ContentArgs {
    /// Markup payload
    #[arg(short, long, conflicts_with = "file")]
    markup: Option<String>,
    /// Read markup from a file ('-' for stdin)
    #[arg(short, long, value_name = "PATH")]
    file: Option<PathBuf>,
    /// Category (defaults to the configured default category)
    #[arg(short, long)]
    category: Option<String>,
    /// Thumbnail URL (pass an empty value to clear it)
    #[arg(short, long)]
    thumbnail: Option<String>,
    /// Extra metadata as key=value (repeatable)
    #[arg(long = "meta", value_name = "KEY=VALUE")]
    meta: Vec<String>,
}

#[derive(Subcommand, Clone)]
enum ConfigCommands {
    /// Show current configuration
    Show,
    /// Set a configuration value
    Set {
        /// Configuration key (data_dir, primary_enabled, default_category,
        /// event_capacity, log_level)
        key: String,
        /// Configuration value
        value: String,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let output = Output::new(OutputFormat::from_flags(cli.json, cli.quiet));

    let config = Config::load_with_cli_override(cli.config.as_ref())
        .context("Failed to load configuration")?;
    init_logging(cli.verbose, config.log_level.as_deref());

    // Config commands don't need the engine
    if let Commands::Config { command } = &cli.command {
        return match command.clone().unwrap_or(ConfigCommands::Show) {
            ConfigCommands::Show => commands::config::show(cli.config.as_ref(), &output),
            ConfigCommands::Set { key, value } => {
                commands::config::set(key, value, cli.config.as_ref(), &output)
            }
        };
    }

    let engine = ModuleEngine::open(&config).context("Failed to open module storage")?;
    let mut changes = engine.subscribe();

    let result = match cli.command {
        Commands::Save { label, id, content } => {
            commands::module::save(&engine, label, id, content.into(), &output).await
        }
        Commands::Update { id, label, content } => {
            commands::module::update(&engine, id, label, content.into(), &output).await
        }
        Commands::Delete { id } => commands::module::delete(&engine, id, &output).await,
        Commands::List { category } => commands::module::list(&engine, category, &output).await,
        Commands::Show { id } => commands::module::show(&engine, id, &output).await,
        Commands::Status => commands::status::show(&engine, &config, &output).await,
        Commands::Config { .. } => unreachable!(), // Handled above
    };

    while let Ok(event) = changes.try_recv() {
        debug!(
            event = event.name(),
            modules = event.modules().len(),
            "change notification"
        );
    }

    result
}

impl From<ContentArgs> for commands::module::Content {
    fn from(args: ContentArgs) -> Self {
        Self {
            markup: args.markup,
            file: args.file,
            category: args.category,
            thumbnail: args.thumbnail,
            meta: args.meta,
        }
    }
}

/// Install the stderr log subscriber
///
/// `-v` flags win over RUST_LOG, which wins over `log_level` in the config.
fn init_logging(verbose: u8, config_level: Option<&str>) {
    let level = match verbose {
        0 => None,
        1 => Some("info"),
        2 => Some("debug"),
        _ => Some("trace"),
    };

    let env_filter = match level {
        Some(level) => filter_for(level),
        None => EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| filter_for(config_level.unwrap_or("warn"))),
    };

    let _ = tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .try_init();
}

fn filter_for(level: &str) -> EnvFilter {
    EnvFilter::new(format!("modshelf_core={},modshelf_cli={}", level, level))
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition_is_valid() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_parse_save() {
        let cli = Cli::try_parse_from([
            "modshelf",
            "save",
            "--label",
            "Hero",
            "--markup",
            "<mjml/>",
            "--meta",
            "owner=ana",
            "--meta",
            "tone=bold",
        ])
        .unwrap();

        match cli.command {
            Commands::Save { label, id, content } => {
                assert_eq!(label, "Hero");
                assert!(id.is_none());
                assert_eq!(content.markup.as_deref(), Some("<mjml/>"));
                assert_eq!(content.meta, vec!["owner=ana", "tone=bold"]);
            }
            _ => panic!("expected save"),
        }
    }

    #[test]
    fn test_markup_and_file_conflict() {
        let result = Cli::try_parse_from([
            "modshelf", "save", "-l", "Hero", "--markup", "<mjml/>", "--file", "hero.mjml",
        ]);
        assert!(result.is_err());
    }

    #[test]
    fn test_global_flags_after_subcommand() {
        let cli = Cli::try_parse_from(["modshelf", "ls", "--json", "-vv"]).unwrap();
        assert!(cli.json);
        assert_eq!(cli.verbose, 2);
        assert!(matches!(cli.command, Commands::List { category: None }));
    }
}

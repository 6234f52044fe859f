use anyhow::Result;
use clap::{Parser, Subcommand};
use sift::config::{EngineConfig, DEFAULT_CONFIG_FILE};
use std::path::PathBuf;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

mod commands;

use commands::OutputFormat;

#[derive(Parser, Debug)]
#[command(name = "sift")]
#[command(about = "Sift CLI - search request assembly and facet configuration tools")]
#[command(version)]
struct Cli {
    /// Configuration file path
    #[arg(short, long, global = true, default_value = DEFAULT_CONFIG_FILE)]
    config: PathBuf,

    /// Configuration store directory (overrides store.path)
    #[arg(long, global = true, env = "SIFT_STORE")]
    store: Option<PathBuf>,

    /// Output format
    #[arg(long, global = true, value_enum, default_value = "json")]
    format: OutputFormat,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Show the resolved container configuration of a request context
    Container {
        /// Request type (e.g. product_search)
        #[arg(short, long)]
        request_type: String,

        /// Localized catalog code
        #[arg(short = 'l', long)]
        catalog: String,

        /// Entity type, when it differs from the request type's own
        #[arg(short, long)]
        entity: Option<String>,
    },

    /// Inspect or edit facet configuration
    Facet {
        #[command(subcommand)]
        command: FacetCommand,
    },

    /// Assemble the search body for a set of search parameters
    Assemble {
        #[arg(short, long)]
        request_type: String,

        #[arg(short = 'l', long)]
        catalog: String,

        /// JSON file with search parameters (stdin when omitted)
        #[arg(short, long)]
        params: Option<PathBuf>,
    },

    /// Check the engine config and the configuration store for problems
    Lint,
}

#[derive(Subcommand, Debug)]
enum FacetCommand {
    /// Show effective values, fallbacks and explicit overrides
    Resolve {
        /// Field codes
        #[arg(required = true)]
        fields: Vec<String>,

        #[arg(short, long)]
        category: Option<String>,
    },

    /// Set one attribute of an override row; an empty value clears it
    Set {
        field: String,
        attribute: String,
        value: String,

        #[arg(short, long)]
        category: Option<String>,
    },

    /// Delete an override row
    Unset {
        field: String,

        #[arg(short, long)]
        category: Option<String>,
    },
}

fn init_logging(config: &EngineConfig) {
    let filter = tracing_subscriber::EnvFilter::new(
        std::env::var("RUST_LOG").unwrap_or_else(|_| config.logging.level.clone()),
    );
    let format = std::env::var("LOG_FORMAT").unwrap_or_else(|_| config.logging.format.clone());

    // Logs go to stderr; stdout carries command output
    let registry = tracing_subscriber::registry().with(filter);
    if format == "json" {
        registry
            .with(tracing_subscriber::fmt::layer().json().with_writer(std::io::stderr))
            .init();
    } else {
        registry
            .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
            .init();
    }
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let mut config = EngineConfig::load_or_default(&cli.config)?;
    if let Some(store) = cli.store {
        config.store.path = store;
    }
    init_logging(&config);
    tracing::debug!("Using config {} and store {}", cli.config.display(), config.store.path.display());

    match cli.command {
        Commands::Container {
            request_type,
            catalog,
            entity,
        } => commands::run_container(config, &request_type, &catalog, entity.as_deref(), cli.format),
        Commands::Facet { command } => match command {
            FacetCommand::Resolve { fields, category } => {
                commands::run_facet_resolve(&config, &fields, category.as_deref(), cli.format)
            }
            FacetCommand::Set {
                field,
                attribute,
                value,
                category,
            } => commands::run_facet_set(&config, &field, category.as_deref(), &attribute, &value),
            FacetCommand::Unset { field, category } => {
                commands::run_facet_unset(&config, &field, category.as_deref())
            }
        },
        Commands::Assemble {
            request_type,
            catalog,
            params,
        } => commands::run_assemble(config, &request_type, &catalog, params.as_deref(), cli.format),
        Commands::Lint => commands::run_lint(&config),
    }
}

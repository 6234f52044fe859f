pub mod assemble;
pub mod container;
pub mod facet;
pub mod lint;

pub use assemble::run_assemble;
pub use container::run_container;
pub use facet::{run_facet_resolve, run_facet_set, run_facet_unset};
pub use lint::run_lint;

use anyhow::{Context, Result};
use serde::Serialize;
use sift::config::EngineConfig;
use sift::store::YamlStore;

#[derive(clap::ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormat {
    Json,
    Yaml,
}

/// Print a value to stdout in the selected format
pub fn print<T: Serialize>(value: &T, format: OutputFormat) -> Result<()> {
    let rendered = match format {
        OutputFormat::Json => serde_json::to_string_pretty(value)?,
        OutputFormat::Yaml => serde_yaml::to_string(value)?,
    };
    println!("{}", rendered.trim_end());
    Ok(())
}

pub fn open_store(config: &EngineConfig) -> Result<YamlStore> {
    YamlStore::open(&config.store.path)
        .with_context(|| format!("Failed to open store at {}", config.store.path.display()))
}

use super::{open_store, print, OutputFormat};
use anyhow::{Context, Result};
use sift::container::RequestContext;
use sift::{EngineConfig, SearchParameters, SearchPipeline};
use std::io::Read;
use std::path::Path;
use std::sync::Arc;

/// Assemble and print the search body, preceded by the target index on stderr
pub fn run_assemble(
    config: EngineConfig,
    request_type: &str,
    catalog: &str,
    params_path: Option<&Path>,
    format: OutputFormat,
) -> Result<()> {
    let params = read_params(params_path)?;
    let store = Arc::new(open_store(&config)?);
    let pipeline = SearchPipeline::new(Arc::new(config), store);

    let request = pipeline.prepare_for_request(&RequestContext::new(request_type, catalog), &params)?;
    eprintln!("index: {}", request.index);
    print(&request.to_dsl()?, format)
}

fn read_params(path: Option<&Path>) -> Result<SearchParameters> {
    let content = match path {
        Some(path) => std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read parameters {}", path.display()))?,
        None => {
            let mut buf = String::new();
            std::io::stdin().read_to_string(&mut buf)?;
            buf
        }
    };
    if content.trim().is_empty() {
        return Ok(SearchParameters::new());
    }
    serde_json::from_str(&content).context("Failed to parse search parameters")
}

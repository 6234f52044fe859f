use super::{open_store, print, OutputFormat};
use anyhow::Result;
use sift::container::RequestContext;
use sift::{EngineConfig, SearchPipeline};
use std::sync::Arc;

/// Resolve and print the container of one request context
pub fn run_container(
    config: EngineConfig,
    request_type: &str,
    catalog: &str,
    entity: Option<&str>,
    format: OutputFormat,
) -> Result<()> {
    let store = Arc::new(open_store(&config)?);
    let pipeline = SearchPipeline::new(Arc::new(config), store);
    let context = RequestContext::new(request_type, catalog);

    let container = match entity {
        Some(entity_type) => pipeline.container_for(entity_type, &context)?,
        None => pipeline.container(&context)?,
    };
    print(container.as_ref(), format)
}

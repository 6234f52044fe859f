use super::{open_store, print, OutputFormat};
use anyhow::Result;
use sift::cache::ResolverCache;
use sift::facet::{FacetOverride, FacetReport, FacetResolver};
use sift::store::ConfigurationStore;
use sift::EngineConfig;
use std::sync::Arc;

pub fn run_facet_resolve(
    config: &EngineConfig,
    fields: &[String],
    category: Option<&str>,
    format: OutputFormat,
) -> Result<()> {
    let store = Arc::new(open_store(config)?);
    let resolver = FacetResolver::new(store, Arc::new(ResolverCache::new()));
    let reports: Vec<FacetReport> = resolver
        .resolve_all(fields, category)?
        .iter()
        .map(|facet| facet.report())
        .collect();
    print(&reports, format)
}

pub fn run_facet_set(
    config: &EngineConfig,
    field: &str,
    category: Option<&str>,
    attribute: &str,
    value: &str,
) -> Result<()> {
    let store = open_store(config)?;
    let mut row = store
        .load_override(field, category)?
        .unwrap_or_else(|| FacetOverride::new(field, category));
    row.set_attribute(attribute, value)?;

    let event = store.put_override(row)?;
    tracing::info!("Saved override: {:?}", event);
    println!("{} = {:?} for {}", attribute, value, label(field, category));
    Ok(())
}

pub fn run_facet_unset(config: &EngineConfig, field: &str, category: Option<&str>) -> Result<()> {
    let store = open_store(config)?;
    match store.remove_override(field, category)? {
        Some(event) => {
            tracing::info!("Removed override: {:?}", event);
            println!("Removed override for {}", label(field, category));
        }
        None => println!("No override for {}", label(field, category)),
    }
    Ok(())
}

fn label(field: &str, category: Option<&str>) -> String {
    match category {
        Some(category) => format!("'{field}' in category '{category}'"),
        None => format!("'{field}' (global)"),
    }
}

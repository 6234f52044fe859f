use super::open_store;
use anyhow::Result;
use sift::store::ConfigurationStore;
use sift::EngineConfig;

/// Print every problem found; fails when there is at least one
pub fn run_lint(config: &EngineConfig) -> Result<()> {
    let store = open_store(config)?;
    let mut issues = store.lint();

    for (name, request) in &config.requests {
        match store.load_entity_metadata(&request.entity_type)? {
            None => issues.push(format!(
                "requests.{name}: unknown entity type '{}'",
                request.entity_type
            )),
            Some(metadata) => {
                let weights = request.catalogs.iter().flat_map(|(catalog, c)| {
                    c.weights.keys().map(move |code| (catalog, code))
                });
                for (catalog, code) in weights {
                    if metadata.field(code).is_none() {
                        issues.push(format!(
                            "requests.{name}.catalogs.{catalog}: weight on unknown field '{code}'"
                        ));
                    }
                }
            }
        }
    }

    if issues.is_empty() {
        println!("No issues found");
        return Ok(());
    }
    for issue in &issues {
        println!("  - {issue}");
    }
    anyhow::bail!("{} issue(s) found", issues.len())
}

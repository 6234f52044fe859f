use super::configuration::FacetConfiguration;
use super::overrides::{normalize_category, FacetOverride};
use super::types::FacetDefaults;
use crate::cache::ResolverCache;
use crate::error::Result;
use crate::store::ConfigurationStore;
use std::sync::Arc;
use tracing::debug;

/// Resolves facet configuration through the override → global default →
/// constant table cascade.
pub struct FacetResolver {
    store: Arc<dyn ConfigurationStore>,
    cache: Arc<ResolverCache>,
}

impl FacetResolver {
    pub fn new(store: Arc<dyn ConfigurationStore>, cache: Arc<ResolverCache>) -> Self {
        Self { store, cache }
    }

    /// Configuration for `field` in `category`, or the field's global
    /// default when `category` is `None`. Every getter on the result is
    /// fully defaulted.
    pub fn resolve(&self, field: &str, category: Option<&str>) -> Result<FacetConfiguration> {
        match normalize_category(category) {
            None => Ok(self.resolve_default(field)?.as_ref().clone()),
            Some(category) => {
                let global = self.resolve_default(field)?;
                let explicit = self
                    .store
                    .load_override(field, Some(category))?
                    .unwrap_or_else(|| FacetOverride::new(field, Some(category)));
                Ok(FacetConfiguration::new(explicit, global.effective()))
            }
        }
    }

    /// Resolve several fields for one category, in the given order
    pub fn resolve_all(&self, fields: &[String], category: Option<&str>) -> Result<Vec<FacetConfiguration>> {
        fields
            .iter()
            .map(|field| self.resolve(field, category))
            .collect()
    }

    /// The global default of a field never falls back to another default:
    /// its fallback is the constant table.
    fn resolve_default(&self, field: &str) -> Result<Arc<FacetConfiguration>> {
        self.cache.facet_default(field, || {
            let explicit = self
                .store
                .load_override(field, None)?
                .unwrap_or_else(|| FacetOverride::new(field, None));
            debug!("Resolved global facet default for '{}'", field);
            Ok(FacetConfiguration::new(explicit, FacetDefaults::CONSTANT))
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::facet::{DisplayMode, FacetSortOrder};
    use crate::store::InMemoryStore;

    fn setup() -> (Arc<InMemoryStore>, Arc<ResolverCache>, FacetResolver) {
        let store = Arc::new(InMemoryStore::new());
        let cache = Arc::new(ResolverCache::new());
        let resolver = FacetResolver::new(store.clone(), cache.clone());
        (store, cache, resolver)
    }

    #[test]
    fn test_global_default_without_override_is_constant_table() {
        let (_, _, resolver) = setup();
        let config = resolver.resolve("color", None).unwrap();
        assert_eq!(config.effective(), FacetDefaults::CONSTANT);
    }

    #[test]
    fn test_category_falls_back_to_global_row() {
        let (store, _, resolver) = setup();
        let mut global = FacetOverride::new("color", None);
        global.max_size = Some(50);
        global.sort_order = Some(FacetSortOrder::Name);
        store.put_override(global).unwrap();

        let mut category = FacetOverride::new("color", Some("shoes"));
        category.sort_order = Some(FacetSortOrder::Relevance);
        store.put_override(category).unwrap();

        let config = resolver.resolve("color", Some("shoes")).unwrap();
        assert_eq!(config.max_size(), 50);
        assert_eq!(config.default_max_size(), 50);
        assert_eq!(config.sort_order(), FacetSortOrder::Relevance);
        assert_eq!(config.default_sort_order(), FacetSortOrder::Name);
        assert_eq!(config.display_mode(), DisplayMode::Auto);
        assert_eq!(config.coverage_rate(), 90);
    }

    #[test]
    fn test_category_without_any_override() {
        let (_, _, resolver) = setup();
        let config = resolver.resolve("size", Some("shirts")).unwrap();
        assert_eq!(config.effective(), FacetDefaults::CONSTANT);
        assert_eq!(config.category(), Some("shirts"));
    }

    #[test]
    fn test_global_write_needs_invalidation() {
        let (store, cache, resolver) = setup();
        assert_eq!(resolver.resolve("color", None).unwrap().max_size(), 10);

        let mut global = FacetOverride::new("color", None);
        global.max_size = Some(5);
        let event = store.put_override(global).unwrap();
        assert_eq!(resolver.resolve("color", None).unwrap().max_size(), 10);

        cache.apply(&event);
        assert_eq!(resolver.resolve("color", None).unwrap().max_size(), 5);
        assert_eq!(resolver.resolve("color", Some("shoes")).unwrap().max_size(), 5);
    }

    #[test]
    fn test_category_write_is_seen_immediately() {
        let (store, _, resolver) = setup();
        assert_eq!(resolver.resolve("color", Some("shoes")).unwrap().max_size(), 10);

        let mut row = FacetOverride::new("color", Some("shoes"));
        row.max_size = Some(3);
        store.put_override(row).unwrap();
        assert_eq!(resolver.resolve("color", Some("shoes")).unwrap().max_size(), 3);
    }

    #[test]
    fn test_resolve_all_keeps_order() {
        let (_, _, resolver) = setup();
        let fields = vec!["size".to_string(), "color".to_string()];
        let configs = resolver.resolve_all(&fields, Some("shoes")).unwrap();
        let names: Vec<&str> = configs.iter().map(|c| c.field()).collect();
        assert_eq!(names, vec!["size", "color"]);
    }
}

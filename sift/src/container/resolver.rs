use super::metadata::{EntityMetadata, FieldMetadata};
use super::relevance::{RelevanceConfiguration, RelevanceOverride};
use crate::config::EngineConfig;
use crate::error::{Error, Result};
use crate::query::{QueryNode, TermQuery, TermsQuery};
use crate::store::ConfigurationStore;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::sync::Arc;
use tracing::{debug, warn};

/// Which request is being served, and for which localized catalog
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RequestContext {
    pub request_type: String,
    pub localized_catalog: String,
}

impl RequestContext {
    pub fn new(request_type: impl Into<String>, localized_catalog: impl Into<String>) -> Self {
        Self {
            request_type: request_type.into(),
            localized_catalog: localized_catalog.into(),
        }
    }
}

/// Resolved field capabilities and relevance tuning for one request context.
///
/// Read-only once built; share it behind an `Arc`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ContainerConfiguration {
    pub entity_type: String,
    pub request_type: String,
    pub localized_catalog: String,
    pub index_name: String,
    pub scope_field: String,
    pub relevance: RelevanceConfiguration,
    pub fields: Vec<FieldMetadata>,
    /// Mandatory filters restricting the request to its context
    pub filters: Vec<QueryNode>,
}

impl ContainerConfiguration {
    pub fn field(&self, code: &str) -> Option<&FieldMetadata> {
        self.fields.iter().find(|f| f.code == code)
    }

    pub fn searchable_fields(&self) -> impl Iterator<Item = &FieldMetadata> {
        self.fields.iter().filter(|f| f.searchable)
    }

    pub fn filterable_fields(&self) -> impl Iterator<Item = &FieldMetadata> {
        self.fields.iter().filter(|f| f.filterable)
    }

    pub fn sortable_fields(&self) -> impl Iterator<Item = &FieldMetadata> {
        self.fields.iter().filter(|f| f.sortable)
    }

    pub fn aggregatable_fields(&self) -> impl Iterator<Item = &FieldMetadata> {
        self.fields.iter().filter(|f| f.is_aggregatable())
    }

    pub fn spellchecked_fields(&self) -> impl Iterator<Item = &FieldMetadata> {
        self.fields.iter().filter(|f| f.searchable && f.spellchecked)
    }

    pub fn require_field(&self, code: &str) -> Result<&FieldMetadata> {
        self.field(code).ok_or_else(|| Error::UnknownField {
            entity: self.entity_type.clone(),
            field: code.to_string(),
        })
    }

    pub fn require_filterable(&self, code: &str) -> Result<&FieldMetadata> {
        let field = self.require_field(code)?;
        if !field.filterable {
            return Err(Error::FieldNotFilterable(code.to_string()));
        }
        Ok(field)
    }

    pub fn require_sortable(&self, code: &str) -> Result<&FieldMetadata> {
        let field = self.require_field(code)?;
        if !field.sortable {
            return Err(Error::FieldNotSortable(code.to_string()));
        }
        Ok(field)
    }
}

pub fn index_name(prefix: &str, localized_catalog: &str, entity_type: &str) -> String {
    format!("{prefix}{localized_catalog}_{entity_type}")
}

/// Builds container configurations from entity metadata and engine config.
///
/// Resolution is pure: it reads the store and the config, nothing else.
pub struct ContainerResolver {
    store: Arc<dyn ConfigurationStore>,
    config: Arc<EngineConfig>,
}

impl ContainerResolver {
    pub fn new(store: Arc<dyn ConfigurationStore>, config: Arc<EngineConfig>) -> Self {
        Self { store, config }
    }

    pub fn resolve(&self, entity_type: &str, context: &RequestContext) -> Result<ContainerConfiguration> {
        let request = match self.config.request_type(&context.request_type) {
            Some(request) if request.entity_type != entity_type => {
                return Err(Error::RequestTypeMismatch {
                    request_type: context.request_type.clone(),
                    configured: request.entity_type.clone(),
                    requested: entity_type.to_string(),
                });
            }
            Some(request) => Some(request),
            None => {
                debug!(
                    "No configuration for request type '{}', using engine defaults",
                    context.request_type
                );
                None
            }
        };
        let metadata = self
            .store
            .load_entity_metadata(entity_type)?
            .ok_or_else(|| Error::UnknownEntityType(entity_type.to_string()))?;
        let catalog = request.and_then(|r| r.catalogs.get(&context.localized_catalog));

        let layers: Vec<&RelevanceOverride> = [
            request.and_then(|r| r.relevance.as_ref()),
            catalog.and_then(|c| c.relevance.as_ref()),
        ]
        .into_iter()
        .flatten()
        .collect();
        let relevance = self.config.relevance.clone().layered(layers);

        let fields = apply_weights(&metadata, catalog.map(|c| &c.weights));

        let mut filters: Vec<QueryNode> = vec![TermQuery::new(
            metadata.scope_field.clone(),
            context.localized_catalog.clone(),
        )
        .into()];
        if let Some(request) = request {
            for filter in &request.filters {
                filters.push(static_filter(&filter.field, &filter.value));
            }
        }

        debug!(
            "Resolved container {}/{} for catalog {} ({} fields)",
            entity_type,
            context.request_type,
            context.localized_catalog,
            fields.len()
        );

        Ok(ContainerConfiguration {
            entity_type: metadata.entity_type.clone(),
            request_type: context.request_type.clone(),
            localized_catalog: context.localized_catalog.clone(),
            index_name: index_name(
                &self.config.search.index_prefix,
                &context.localized_catalog,
                &metadata.entity_type,
            ),
            scope_field: metadata.scope_field.clone(),
            relevance,
            fields,
            filters,
        })
    }

    /// Resolve using the request type's configured entity
    pub fn resolve_for_request(&self, context: &RequestContext) -> Result<ContainerConfiguration> {
        let entity_type = self
            .config
            .request_type(&context.request_type)
            .map(|r| r.entity_type.clone())
            .ok_or_else(|| Error::UnknownRequestType(context.request_type.clone()))?;
        self.resolve(&entity_type, context)
    }
}

fn apply_weights(
    metadata: &EntityMetadata,
    weights: Option<&std::collections::BTreeMap<String, f32>>,
) -> Vec<FieldMetadata> {
    let mut fields = metadata.fields.clone();
    let Some(weights) = weights else {
        return fields;
    };
    for (code, weight) in weights {
        match fields.iter_mut().find(|f| &f.code == code) {
            Some(field) => field.weight = *weight,
            None => warn!(
                "Weight override for unknown field '{}' on entity '{}'",
                code, metadata.entity_type
            ),
        }
    }
    fields
}

fn static_filter(field: &str, value: &Value) -> QueryNode {
    match value {
        Value::Array(values) => TermsQuery::new(field, values.clone()).into(),
        other => TermQuery::new(field, other.clone()).into(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{CatalogConfig, RequestTypeConfig, StaticFilter};
    use crate::container::FieldType;
    use crate::query::Fuzziness;
    use crate::store::InMemoryStore;
    use serde_json::json;

    fn store() -> Arc<InMemoryStore> {
        let store = InMemoryStore::new();
        store.put_entity_metadata(EntityMetadata::new(
            "product",
            vec![
                FieldMetadata::new("name", FieldType::Text).searchable(2.0).spellchecked(),
                FieldMetadata::new("sku", FieldType::Keyword).searchable(1.0).filterable(),
                FieldMetadata::new("color", FieldType::Select).filterable(),
                FieldMetadata::new("price.price", FieldType::Price)
                    .nested("price")
                    .filterable()
                    .sortable(),
            ],
        ));
        Arc::new(store)
    }

    fn config() -> Arc<EngineConfig> {
        let mut config = EngineConfig::default();
        config.search.index_prefix = "shop_".to_string();
        let mut request = RequestTypeConfig::new("product");
        request.relevance = Some(RelevanceOverride {
            fuzziness_enabled: Some(true),
            ..Default::default()
        });
        request.filters.push(StaticFilter {
            field: "is_active".to_string(),
            value: json!(true),
        });
        let mut catalog = CatalogConfig::default();
        catalog.weights.insert("name".to_string(), 5.0);
        catalog.relevance = Some(RelevanceOverride {
            fuzziness: Some(Fuzziness::Edits(1)),
            ..Default::default()
        });
        request.catalogs.insert("b2c_fr".to_string(), catalog);
        config.requests.insert("product_search".to_string(), request);
        Arc::new(config)
    }

    #[test]
    fn test_resolve_layers_catalog_over_request() {
        let resolver = ContainerResolver::new(store(), config());
        let container = resolver
            .resolve("product", &RequestContext::new("product_search", "b2c_fr"))
            .unwrap();

        assert_eq!(container.index_name, "shop_b2c_fr_product");
        assert!(container.relevance.fuzziness.enabled);
        assert_eq!(container.relevance.fuzziness.value, Fuzziness::Edits(1));
        assert_eq!(container.field("name").unwrap().weight, 5.0);
        assert_eq!(container.filters.len(), 2);
        assert_eq!(
            container.filters[0],
            QueryNode::from(TermQuery::new("catalog", "b2c_fr"))
        );
    }

    #[test]
    fn test_other_catalog_keeps_request_layer_only() {
        let resolver = ContainerResolver::new(store(), config());
        let container = resolver
            .resolve("product", &RequestContext::new("product_search", "b2c_en"))
            .unwrap();
        assert_eq!(container.relevance.fuzziness.value, Fuzziness::Auto);
        assert_eq!(container.field("name").unwrap().weight, 2.0);
    }

    #[test]
    fn test_unknown_request_type_uses_defaults() {
        let resolver = ContainerResolver::new(store(), config());
        let container = resolver
            .resolve("product", &RequestContext::new("autocomplete", "b2c_fr"))
            .unwrap();
        assert!(!container.relevance.fuzziness.enabled);
        assert_eq!(container.filters.len(), 1);
    }

    #[test]
    fn test_unknown_entity_type() {
        let resolver = ContainerResolver::new(store(), config());
        let err = resolver
            .resolve("cms_page", &RequestContext::new("cms_search", "b2c_fr"))
            .unwrap_err();
        assert!(matches!(err, Error::UnknownEntityType(ref e) if e == "cms_page"));
    }

    #[test]
    fn test_capability_checks() {
        let resolver = ContainerResolver::new(store(), config());
        let container = resolver
            .resolve("product", &RequestContext::new("product_search", "b2c_fr"))
            .unwrap();
        assert!(container.require_filterable("color").is_ok());
        assert!(matches!(
            container.require_filterable("name"),
            Err(Error::FieldNotFilterable(_))
        ));
        assert!(matches!(
            container.require_sortable("color"),
            Err(Error::FieldNotSortable(_))
        ));
        assert!(matches!(
            container.require_field("weight"),
            Err(Error::UnknownField { .. })
        ));
        assert_eq!(container.spellchecked_fields().count(), 1);
    }

    #[test]
    fn test_request_type_for_other_entity() {
        let resolver = ContainerResolver::new(store(), config());
        let err = resolver
            .resolve("category", &RequestContext::new("product_search", "b2c_fr"))
            .unwrap_err();
        assert!(matches!(err, Error::RequestTypeMismatch { .. }));
    }

    #[test]
    fn test_resolve_for_request() {
        let resolver = ContainerResolver::new(store(), config());
        let container = resolver
            .resolve_for_request(&RequestContext::new("product_search", "b2c_fr"))
            .unwrap();
        assert_eq!(container.entity_type, "product");
        assert!(matches!(
            resolver.resolve_for_request(&RequestContext::new("nope", "b2c_fr")),
            Err(Error::UnknownRequestType(_))
        ));
    }

    #[test]
    fn test_resolve_is_idempotent() {
        let resolver = ContainerResolver::new(store(), config());
        let context = RequestContext::new("product_search", "b2c_fr");
        assert_eq!(
            resolver.resolve("product", &context).unwrap(),
            resolver.resolve("product", &context).unwrap()
        );
    }
}

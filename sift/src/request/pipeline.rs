use super::builder::{RequestBuilder, SearchRequest};
use super::params::SearchParameters;
use crate::cache::{ContainerKey, ResolverCache};
use crate::config::EngineConfig;
use crate::container::{ContainerConfiguration, ContainerResolver, RequestContext};
use crate::error::{Error, Result};
use crate::facet::{FacetConfiguration, FacetResolver};
use crate::store::{ConfigurationEvent, ConfigurationStore};
use std::sync::Arc;
use tracing::info;

/// Wires both resolvers, the shared cache and the request builder together.
///
/// Cheap to share across threads; every request goes through [`SearchPipeline::prepare`].
pub struct SearchPipeline {
    config: Arc<EngineConfig>,
    cache: Arc<ResolverCache>,
    containers: ContainerResolver,
    facets: FacetResolver,
}

impl SearchPipeline {
    pub fn new(config: Arc<EngineConfig>, store: Arc<dyn ConfigurationStore>) -> Self {
        let cache = Arc::new(ResolverCache::new());
        Self {
            containers: ContainerResolver::new(store.clone(), config.clone()),
            facets: FacetResolver::new(store, cache.clone()),
            config,
            cache,
        }
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn cache(&self) -> &ResolverCache {
        &self.cache
    }

    /// Container for the request type's configured entity, cached per context
    pub fn container(&self, context: &RequestContext) -> Result<Arc<ContainerConfiguration>> {
        let entity_type = self.entity_type_of(context)?;
        self.container_for(&entity_type, context)
    }

    pub fn container_for(&self, entity_type: &str, context: &RequestContext) -> Result<Arc<ContainerConfiguration>> {
        let key = ContainerKey::new(
            entity_type,
            context.request_type.clone(),
            context.localized_catalog.clone(),
        );
        self.cache
            .container(&key, || self.containers.resolve(entity_type, context))
    }

    pub fn facet(&self, field: &str, category: Option<&str>) -> Result<FacetConfiguration> {
        self.facets.resolve(field, category)
    }

    /// Resolve everything a request needs and build it
    pub fn prepare(
        &self,
        entity_type: &str,
        context: &RequestContext,
        params: &SearchParameters,
    ) -> Result<SearchRequest> {
        let container = self.container_for(entity_type, context)?;

        let fields: Vec<String> = if params.facets.is_empty() {
            container
                .aggregatable_fields()
                .filter(|f| f.filterable)
                .map(|f| f.code.clone())
                .collect()
        } else {
            params.facets.clone()
        };
        let facets = self.facets.resolve_all(&fields, params.category.as_deref())?;

        RequestBuilder::new(&self.config).build(params, &container, &facets)
    }

    /// Like [`SearchPipeline::prepare`], for the request type's configured entity
    pub fn prepare_for_request(&self, context: &RequestContext, params: &SearchParameters) -> Result<SearchRequest> {
        let entity_type = self.entity_type_of(context)?;
        self.prepare(&entity_type, context, params)
    }

    fn entity_type_of(&self, context: &RequestContext) -> Result<String> {
        self.config
            .request_type(&context.request_type)
            .map(|r| r.entity_type.clone())
            .ok_or_else(|| Error::UnknownRequestType(context.request_type.clone()))
    }

    /// Forward a store change to the cache
    pub fn apply(&self, event: &ConfigurationEvent) {
        info!("Applying configuration event {:?}", event);
        self.cache.apply(event);
    }
}

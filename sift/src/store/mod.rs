//! Configuration store: where entity metadata and facet overrides live
//!
//! Resolvers only read through [`ConfigurationStore`]. Writers get back a
//! [`ConfigurationEvent`] to forward to the resolver cache.

mod memory;
mod yaml;

pub use memory::InMemoryStore;
pub use yaml::YamlStore;

use crate::container::EntityMetadata;
use crate::error::Result;
use crate::facet::{normalize_category, FacetOverride};
use serde::{Deserialize, Serialize};

pub trait ConfigurationStore: Send + Sync {
    /// Override row for a field, either global (`category = None`) or for one category
    fn load_override(&self, field: &str, category: Option<&str>) -> Result<Option<FacetOverride>>;

    fn load_entity_metadata(&self, entity_type: &str) -> Result<Option<EntityMetadata>>;
}

/// A change to stored configuration that resolved views may depend on
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum ConfigurationEvent {
    FacetChanged {
        field: String,
        category: Option<String>,
    },
    EntityChanged {
        entity_type: String,
    },
    Reloaded,
}

impl ConfigurationEvent {
    pub fn facet(field: impl Into<String>, category: Option<&str>) -> Self {
        ConfigurationEvent::FacetChanged {
            field: field.into(),
            category: normalize_category(category).map(str::to_string),
        }
    }

    pub fn entity(entity_type: impl Into<String>) -> Self {
        ConfigurationEvent::EntityChanged {
            entity_type: entity_type.into(),
        }
    }
}

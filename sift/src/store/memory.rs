use super::{ConfigurationEvent, ConfigurationStore};
use crate::container::EntityMetadata;
use crate::error::Result;
use crate::facet::{normalize_category, FacetOverride};
use parking_lot::RwLock;
use std::collections::HashMap;

type OverrideKey = (String, Option<String>);

fn override_key(field: &str, category: Option<&str>) -> OverrideKey {
    (field.to_string(), normalize_category(category).map(str::to_string))
}

pub(super) fn normalized(mut row: FacetOverride) -> FacetOverride {
    row.category = normalize_category(row.category.as_deref()).map(str::to_string);
    row
}

/// Store held entirely in memory, mostly for tests and embedding
#[derive(Debug, Default)]
pub struct InMemoryStore {
    overrides: RwLock<HashMap<OverrideKey, FacetOverride>>,
    entities: RwLock<HashMap<String, EntityMetadata>>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or replace an override row
    pub fn put_override(&self, row: FacetOverride) -> Result<ConfigurationEvent> {
        row.validate()?;
        let row = normalized(row);
        let event = ConfigurationEvent::facet(row.field.clone(), row.category.as_deref());
        let key = override_key(&row.field, row.category.as_deref());
        self.overrides.write().insert(key, row);
        Ok(event)
    }

    pub fn remove_override(&self, field: &str, category: Option<&str>) -> Option<ConfigurationEvent> {
        let key = override_key(field, category);
        self.overrides
            .write()
            .remove(&key)
            .map(|_| ConfigurationEvent::facet(field, category))
    }

    pub fn put_entity_metadata(&self, metadata: EntityMetadata) -> ConfigurationEvent {
        let event = ConfigurationEvent::entity(metadata.entity_type.clone());
        self.entities
            .write()
            .insert(metadata.entity_type.clone(), metadata);
        event
    }

    pub fn override_count(&self) -> usize {
        self.overrides.read().len()
    }

    /// All override rows, ordered by field then category
    pub fn overrides(&self) -> Vec<FacetOverride> {
        let mut rows: Vec<FacetOverride> = self.overrides.read().values().cloned().collect();
        rows.sort_by(|a, b| a.key().cmp(&b.key()));
        rows
    }

    pub fn entity_types(&self) -> Vec<String> {
        let mut types: Vec<String> = self.entities.read().keys().cloned().collect();
        types.sort();
        types
    }

    /// Replace every entity and override row
    pub fn replace_all(&self, entities: Vec<EntityMetadata>, overrides: Vec<FacetOverride>) {
        let entities = entities
            .into_iter()
            .map(|e| (e.entity_type.clone(), e))
            .collect();
        let overrides = overrides
            .into_iter()
            .map(normalized)
            .map(|o| (override_key(&o.field, o.category.as_deref()), o))
            .collect();
        *self.entities.write() = entities;
        *self.overrides.write() = overrides;
    }
}

impl ConfigurationStore for InMemoryStore {
    fn load_override(&self, field: &str, category: Option<&str>) -> Result<Option<FacetOverride>> {
        let key = override_key(field, category);
        Ok(self.overrides.read().get(&key).cloned())
    }

    fn load_entity_metadata(&self, entity_type: &str) -> Result<Option<EntityMetadata>> {
        Ok(self.entities.read().get(entity_type).cloned())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_put_and_load_override() {
        let store = InMemoryStore::new();
        let mut row = FacetOverride::new("color", Some("shoes"));
        row.max_size = Some(3);
        let event = store.put_override(row.clone()).unwrap();

        assert_eq!(event, ConfigurationEvent::facet("color", Some("shoes")));
        assert_eq!(store.load_override("color", Some("shoes")).unwrap(), Some(row));
        assert_eq!(store.load_override("color", None).unwrap(), None);
    }

    #[test]
    fn test_invalid_override_rejected() {
        let store = InMemoryStore::new();
        let mut row = FacetOverride::new("color", None);
        row.coverage_rate = Some(120);
        assert!(store.put_override(row).is_err());
        assert_eq!(store.override_count(), 0);
    }

    #[test]
    fn test_remove_override() {
        let store = InMemoryStore::new();
        store.put_override(FacetOverride::new("color", None)).unwrap();
        assert!(store.remove_override("color", None).is_some());
        assert!(store.remove_override("color", None).is_none());
    }

    #[test]
    fn test_blank_category_is_global_row() {
        let store = InMemoryStore::new();
        let mut row = FacetOverride::new("color", None);
        row.max_size = Some(4);
        store.put_override(row).unwrap();

        let mut blank = FacetOverride::new("color", None);
        blank.category = Some("  ".to_string());
        blank.max_size = Some(7);
        let event = store.put_override(blank).unwrap();

        assert_eq!(event, ConfigurationEvent::facet("color", None));
        assert_eq!(store.override_count(), 1);
        let global = store.load_override("color", Some("")).unwrap().unwrap();
        assert_eq!(global.category, None);
        assert_eq!(global.max_size, Some(7));
        assert!(store.remove_override("color", Some(" ")).is_some());
        assert_eq!(store.override_count(), 0);
    }
}

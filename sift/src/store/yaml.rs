use super::memory::normalized;
use super::{ConfigurationEvent, ConfigurationStore, InMemoryStore};
use crate::container::EntityMetadata;
use crate::error::{Error, Result};
use crate::facet::FacetOverride;
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::info;

const ENTITIES_DIR: &str = "entities";
const FACETS_FILE: &str = "facets.yaml";

#[derive(Debug, Default, Serialize, Deserialize)]
struct FacetsFile {
    #[serde(default)]
    facets: Vec<FacetOverride>,
}

/// Store backed by a directory of YAML files:
///
/// ```text
/// <root>/entities/<entity>.yaml   entity metadata
/// <root>/facets.yaml              facet override rows
/// ```
///
/// Content is loaded on open and on [`YamlStore::reload`]; reads never touch disk.
pub struct YamlStore {
    root: PathBuf,
    inner: InMemoryStore,
    /// Serializes edits so the file and memory change in the same order
    writes: Mutex<()>,
}

impl YamlStore {
    pub fn open(root: impl AsRef<Path>) -> Result<Self> {
        let store = Self {
            root: root.as_ref().to_path_buf(),
            inner: InMemoryStore::new(),
            writes: Mutex::new(()),
        };
        store.reload()?;
        Ok(store)
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Re-read every file; the previous content stays in place on failure
    pub fn reload(&self) -> Result<ConfigurationEvent> {
        if !self.root.is_dir() {
            return Err(Error::Store(format!(
                "Configuration directory does not exist: {}",
                self.root.display()
            )));
        }

        let _writes = self.writes.lock();
        let entities = self.load_entities()?;
        let overrides = self.load_facets()?;
        info!(
            "Loaded {} entities and {} facet overrides from {}",
            entities.len(),
            overrides.len(),
            self.root.display()
        );
        self.inner.replace_all(entities, overrides);
        Ok(ConfigurationEvent::Reloaded)
    }

    /// Insert or replace an override row and persist `facets.yaml`.
    /// Memory is only updated once the file is written.
    pub fn put_override(&self, row: FacetOverride) -> Result<ConfigurationEvent> {
        row.validate()?;
        let row = normalized(row);
        let _writes = self.writes.lock();

        let mut rows: Vec<FacetOverride> = self
            .inner
            .overrides()
            .into_iter()
            .filter(|r| r.key() != row.key())
            .collect();
        rows.push(row.clone());
        rows.sort_by(|a, b| a.key().cmp(&b.key()));
        self.save_facets(rows)?;

        self.inner.put_override(row)
    }

    pub fn remove_override(&self, field: &str, category: Option<&str>) -> Result<Option<ConfigurationEvent>> {
        let _writes = self.writes.lock();
        if self.inner.load_override(field, category)?.is_none() {
            return Ok(None);
        }

        let target = FacetOverride::new(field, category);
        let rows = self
            .inner
            .overrides()
            .into_iter()
            .filter(|r| r.key() != target.key())
            .collect();
        self.save_facets(rows)?;

        Ok(self.inner.remove_override(field, category))
    }

    pub fn entity_types(&self) -> Vec<String> {
        self.inner.entity_types()
    }

    pub fn overrides(&self) -> Vec<FacetOverride> {
        self.inner.overrides()
    }

    /// Human-readable issues across the whole store (empty = ok)
    pub fn lint(&self) -> Vec<String> {
        let mut issues = Vec::new();
        let mut known_fields = HashSet::new();

        for entity_type in self.inner.entity_types() {
            if let Ok(Some(metadata)) = self.inner.load_entity_metadata(&entity_type) {
                for issue in metadata.lint() {
                    issues.push(format!("entities/{entity_type}.yaml: {issue}"));
                }
                known_fields.extend(metadata.fields.into_iter().map(|f| f.code));
            }
        }

        for row in self.inner.overrides() {
            let label = match &row.category {
                Some(category) => format!("{}@{}", row.field, category),
                None => row.field.clone(),
            };
            if !known_fields.contains(&row.field) {
                issues.push(format!("{FACETS_FILE}: override '{label}' targets an unknown field"));
            }
            if row.is_empty() {
                issues.push(format!("{FACETS_FILE}: override '{label}' sets nothing"));
            }
        }
        issues
    }

    fn load_entities(&self) -> Result<Vec<EntityMetadata>> {
        let dir = self.root.join(ENTITIES_DIR);
        let mut entities = Vec::new();
        if !dir.is_dir() {
            return Ok(entities);
        }

        for entry in fs::read_dir(&dir)? {
            let path = entry?.path();
            if path.extension().and_then(|e| e.to_str()) != Some("yaml") {
                continue;
            }
            let content = fs::read_to_string(&path)?;
            let metadata: EntityMetadata = serde_yaml::from_str(&content)?;
            entities.push(metadata);
        }
        Ok(entities)
    }

    fn load_facets(&self) -> Result<Vec<FacetOverride>> {
        let path = self.root.join(FACETS_FILE);
        if !path.exists() {
            return Ok(Vec::new());
        }
        let content = fs::read_to_string(&path)?;
        let file: FacetsFile = serde_yaml::from_str(&content)?;

        let mut seen = HashSet::new();
        for row in &file.facets {
            row.validate()?;
            if !seen.insert((row.field.clone(), row.category.clone())) {
                return Err(Error::Store(format!(
                    "{FACETS_FILE}: duplicate override for '{}' ({})",
                    row.field,
                    row.category.as_deref().unwrap_or("global")
                )));
            }
        }
        Ok(file.facets)
    }

    fn save_facets(&self, facets: Vec<FacetOverride>) -> Result<()> {
        let content = serde_yaml::to_string(&FacetsFile { facets })?;
        fs::write(self.root.join(FACETS_FILE), content)?;
        Ok(())
    }
}

impl ConfigurationStore for YamlStore {
    fn load_override(&self, field: &str, category: Option<&str>) -> Result<Option<FacetOverride>> {
        self.inner.load_override(field, category)
    }

    fn load_entity_metadata(&self, entity_type: &str) -> Result<Option<EntityMetadata>> {
        self.inner.load_entity_metadata(entity_type)
    }
}

//! Engine configuration
//!
//! Default config location: ./sift.toml

use crate::container::{RelevanceConfiguration, RelevanceOverride};
use anyhow::{anyhow, Context, Result};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

pub const DEFAULT_CONFIG_FILE: &str = "sift.toml";

/// Main configuration
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
pub struct EngineConfig {
    #[serde(default)]
    pub search: SearchConfig,
    /// Engine-wide relevance tuning, the bottom layer of every request
    #[serde(default)]
    pub relevance: RelevanceConfiguration,
    /// Request types keyed by name (e.g. `product_catalog`, `product_search`)
    #[serde(default)]
    pub requests: BTreeMap<String, RequestTypeConfig>,
    #[serde(default)]
    pub facets: FacetsConfig,
    #[serde(default)]
    pub store: StoreConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct SearchConfig {
    /// Prepended to every index name
    #[serde(default)]
    pub index_prefix: String,
    /// Upper bound of `from + size` the engine accepts
    #[serde(default = "default_max_result_window")]
    pub max_result_window: u32,
    #[serde(default = "default_max_page_size")]
    pub max_page_size: u32,
    #[serde(default = "default_page_size")]
    pub default_page_size: u32,
    #[serde(default = "default_true")]
    pub track_total_hits: bool,
}

fn default_max_result_window() -> u32 {
    10_000
}

fn default_max_page_size() -> u32 {
    100
}

fn default_page_size() -> u32 {
    30
}

fn default_true() -> bool {
    true
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            index_prefix: String::new(),
            max_result_window: default_max_result_window(),
            max_page_size: default_max_page_size(),
            default_page_size: default_page_size(),
            track_total_hits: true,
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct RequestTypeConfig {
    pub entity_type: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub relevance: Option<RelevanceOverride>,
    /// Per localized catalog tuning, keyed by catalog code
    #[serde(default)]
    pub catalogs: BTreeMap<String, CatalogConfig>,
    /// Term filters always applied to this request type
    #[serde(default)]
    pub filters: Vec<StaticFilter>,
}

impl RequestTypeConfig {
    pub fn new(entity_type: impl Into<String>) -> Self {
        Self {
            entity_type: entity_type.into(),
            relevance: None,
            catalogs: BTreeMap::new(),
            filters: Vec::new(),
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize, Default)]
pub struct CatalogConfig {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub relevance: Option<RelevanceOverride>,
    /// Search weight overrides keyed by field code
    #[serde(default)]
    pub weights: BTreeMap<String, f32>,
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct StaticFilter {
    pub field: String,
    pub value: Value,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct FacetsConfig {
    /// Histogram interval for numeric facets without their own
    #[serde(default = "default_histogram_interval")]
    pub histogram_interval: f64,
    #[serde(default = "default_date_interval")]
    pub date_interval: String,
    /// Bucket cap used when a facet's max size is 0 (unlimited)
    #[serde(default = "default_max_bucket_size")]
    pub max_bucket_size: u32,
}

fn default_histogram_interval() -> f64 {
    10.0
}

fn default_date_interval() -> String {
    "1M".to_string()
}

fn default_max_bucket_size() -> u32 {
    1000
}

impl Default for FacetsConfig {
    fn default() -> Self {
        Self {
            histogram_interval: default_histogram_interval(),
            date_interval: default_date_interval(),
            max_bucket_size: default_max_bucket_size(),
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct StoreConfig {
    /// Directory of the YAML configuration store
    #[serde(default = "default_store_path")]
    pub path: PathBuf,
}

fn default_store_path() -> PathBuf {
    PathBuf::from("./conf")
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            path: default_store_path(),
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct LoggingConfig {
    #[serde(default = "default_log_level")]
    pub level: String,
    /// `pretty` or `json`
    #[serde(default = "default_log_format")]
    pub format: String,
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_log_format() -> String {
    "pretty".to_string()
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            format: default_log_format(),
        }
    }
}

/// Expand ~ to home directory in path
pub fn expand_tilde(path: &Path) -> Result<PathBuf> {
    let s = path.to_string_lossy();
    if let Some(rest) = s.strip_prefix("~/") {
        let home = dirs::home_dir().ok_or_else(|| anyhow!("Cannot determine home directory"))?;
        Ok(home.join(rest))
    } else if s == "~" {
        dirs::home_dir().ok_or_else(|| anyhow!("Cannot determine home directory"))
    } else {
        Ok(path.to_path_buf())
    }
}

impl EngineConfig {
    /// Load config from a TOML file
    pub fn load_from(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config {}", path.display()))?;
        let mut config: EngineConfig = toml::from_str(&content)
            .with_context(|| format!("Failed to parse config {}", path.display()))?;
        config.expand_paths()?;
        config.validate()?;
        Ok(config)
    }

    /// Load config from file path, or fall back to defaults if it does not exist
    pub fn load_or_default(path: &Path) -> Result<Self> {
        if path.exists() {
            Self::load_from(path)
        } else {
            let mut config = EngineConfig::default();
            config.expand_paths()?;
            Ok(config)
        }
    }

    /// Save config to file
    pub fn save(&self, path: &Path) -> Result<()> {
        let content = toml::to_string_pretty(self)?;
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(path, content)?;
        Ok(())
    }

    pub fn request_type(&self, name: &str) -> Option<&RequestTypeConfig> {
        self.requests.get(name)
    }

    fn expand_paths(&mut self) -> Result<()> {
        self.store.path = expand_tilde(&self.store.path)?;
        Ok(())
    }

    fn validate(&self) -> Result<()> {
        if self.search.max_page_size == 0 {
            return Err(anyhow!("search.max_page_size must be > 0"));
        }
        if self.search.default_page_size > self.search.max_page_size {
            return Err(anyhow!(
                "search.default_page_size ({}) exceeds search.max_page_size ({})",
                self.search.default_page_size,
                self.search.max_page_size
            ));
        }
        if self.facets.histogram_interval <= 0.0 {
            return Err(anyhow!("facets.histogram_interval must be > 0"));
        }
        for (name, request) in &self.requests {
            if request.entity_type.trim().is_empty() {
                return Err(anyhow!("requests.{name}.entity_type must be set"));
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::query::Fuzziness;
    use tempfile::TempDir;

    #[test]
    fn test_defaults() {
        let config = EngineConfig::default();
        assert_eq!(config.search.max_result_window, 10_000);
        assert_eq!(config.search.max_page_size, 100);
        assert_eq!(config.search.default_page_size, 30);
        assert!(config.search.track_total_hits);
        assert_eq!(config.facets.histogram_interval, 10.0);
        assert_eq!(config.logging.level, "info");
        assert!(config.requests.is_empty());
    }

    #[test]
    fn test_load_request_types() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("sift.toml");
        fs::write(
            &path,
            r#"
            [search]
            index_prefix = "shop_"

            [requests.product_search]
            entity_type = "product"
            relevance = { fuzziness_enabled = true, fuzziness = "AUTO" }
            filters = [{ field = "is_active", value = true }]

            [requests.product_search.catalogs.b2c_fr]
            relevance = { fuzziness = 1 }
            weights = { name = 5.0 }
            "#,
        )
        .unwrap();

        let config = EngineConfig::load_from(&path).unwrap();
        assert_eq!(config.search.index_prefix, "shop_");
        let request = config.request_type("product_search").unwrap();
        assert_eq!(request.entity_type, "product");
        assert_eq!(request.filters[0].value, serde_json::json!(true));
        let catalog = &request.catalogs["b2c_fr"];
        assert_eq!(catalog.weights["name"], 5.0);
        assert_eq!(
            catalog.relevance.as_ref().unwrap().fuzziness,
            Some(Fuzziness::Edits(1))
        );
    }

    #[test]
    fn test_load_or_default_missing_file() {
        let dir = TempDir::new().unwrap();
        let config = EngineConfig::load_or_default(&dir.path().join("absent.toml")).unwrap();
        assert_eq!(config.search.max_page_size, 100);
    }

    #[test]
    fn test_save_and_reload() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("nested/sift.toml");
        let mut config = EngineConfig::default();
        config
            .requests
            .insert("category_listing".to_string(), RequestTypeConfig::new("product"));
        config.save(&path).unwrap();

        let loaded = EngineConfig::load_from(&path).unwrap();
        assert_eq!(loaded.requests["category_listing"].entity_type, "product");
    }

    #[test]
    fn test_rejects_default_page_size_over_max() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("sift.toml");
        fs::write(&path, "[search]\nmax_page_size = 10\ndefault_page_size = 20\n").unwrap();
        assert!(EngineConfig::load_from(&path).is_err());
    }

    #[test]
    fn test_expand_tilde_passthrough() {
        let path = Path::new("/etc/sift");
        assert_eq!(expand_tilde(path).unwrap(), PathBuf::from("/etc/sift"));
    }
}

//! Facet configuration: per-field, per-category display behaviour with
//! layered fallbacks.

pub mod configuration;
pub mod overrides;
pub mod resolver;
pub mod types;

pub use configuration::{FacetConfiguration, FacetReport};
pub use overrides::{normalize_category, FacetOverride};
pub use resolver::FacetResolver;
pub use types::{DisplayMode, FacetDefaults, FacetSortOrder};

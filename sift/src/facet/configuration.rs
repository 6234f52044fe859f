use super::overrides::FacetOverride;
use super::types::{DisplayMode, FacetDefaults, FacetSortOrder};
use serde::Serialize;

/// Resolved facet configuration for one (field, category) pair.
///
/// Holds the explicit override values next to the injected fallback record,
/// so each getter is a plain merge and nothing is looked up again.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FacetConfiguration {
    explicit: FacetOverride,
    defaults: FacetDefaults,
}

impl FacetConfiguration {
    pub fn new(explicit: FacetOverride, defaults: FacetDefaults) -> Self {
        Self { explicit, defaults }
    }

    pub fn field(&self) -> &str {
        &self.explicit.field
    }

    pub fn category(&self) -> Option<&str> {
        self.explicit.category.as_deref()
    }

    pub fn display_mode(&self) -> DisplayMode {
        self.explicit.display_mode.unwrap_or(self.defaults.display_mode)
    }

    pub fn coverage_rate(&self) -> u8 {
        self.explicit.coverage_rate.unwrap_or(self.defaults.coverage_rate)
    }

    pub fn max_size(&self) -> u32 {
        self.explicit.max_size.unwrap_or(self.defaults.max_size)
    }

    pub fn sort_order(&self) -> FacetSortOrder {
        self.explicit.sort_order.unwrap_or(self.defaults.sort_order)
    }

    pub fn is_recommendable(&self) -> bool {
        self.explicit
            .is_recommendable
            .unwrap_or(self.defaults.is_recommendable)
    }

    pub fn is_virtual(&self) -> bool {
        self.explicit.is_virtual.unwrap_or(self.defaults.is_virtual)
    }

    pub fn default_display_mode(&self) -> DisplayMode {
        self.defaults.display_mode
    }

    pub fn default_coverage_rate(&self) -> u8 {
        self.defaults.coverage_rate
    }

    pub fn default_max_size(&self) -> u32 {
        self.defaults.max_size
    }

    pub fn default_sort_order(&self) -> FacetSortOrder {
        self.defaults.sort_order
    }

    pub fn default_is_recommendable(&self) -> bool {
        self.defaults.is_recommendable
    }

    pub fn default_is_virtual(&self) -> bool {
        self.defaults.is_virtual
    }

    pub fn explicit(&self) -> &FacetOverride {
        &self.explicit
    }

    /// Every attribute with its fallback applied
    pub fn effective(&self) -> FacetDefaults {
        FacetDefaults {
            display_mode: self.display_mode(),
            coverage_rate: self.coverage_rate(),
            max_size: self.max_size(),
            sort_order: self.sort_order(),
            is_recommendable: self.is_recommendable(),
            is_virtual: self.is_virtual(),
        }
    }

    /// Coverage thresholding only applies to auto-displayed facets
    pub fn is_coverage_gated(&self) -> bool {
        self.display_mode() == DisplayMode::Auto && self.coverage_rate() > 0
    }

    pub fn report(&self) -> FacetReport {
        FacetReport {
            field: self.field().to_string(),
            category: self.explicit.category.clone(),
            effective: self.effective(),
            defaults: self.defaults.clone(),
            overridden: self.explicit.clone(),
        }
    }
}

/// Serializable view of a resolved facet: values, fallbacks and overrides
#[derive(Debug, Clone, Serialize)]
pub struct FacetReport {
    pub field: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,
    pub effective: FacetDefaults,
    pub defaults: FacetDefaults,
    pub overridden: FacetOverride,
}

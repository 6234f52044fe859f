use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Whether a facet is shown to shoppers
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DisplayMode {
    /// Shown when enough of the result set carries a value
    Auto,
    Displayed,
    Hidden,
}

impl DisplayMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            DisplayMode::Auto => "auto",
            DisplayMode::Displayed => "displayed",
            DisplayMode::Hidden => "hidden",
        }
    }
}

impl fmt::Display for DisplayMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for DisplayMode {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "auto" => Ok(DisplayMode::Auto),
            "displayed" => Ok(DisplayMode::Displayed),
            "hidden" => Ok(DisplayMode::Hidden),
            other => Err(Error::InvalidFacetValue {
                field: "display_mode".to_string(),
                reason: format!("unknown display mode '{other}'"),
            }),
        }
    }
}

/// How facet options are ordered
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FacetSortOrder {
    ResultCount,
    AdminSort,
    Name,
    Relevance,
}

impl FacetSortOrder {
    pub fn as_str(&self) -> &'static str {
        match self {
            FacetSortOrder::ResultCount => "result_count",
            FacetSortOrder::AdminSort => "admin_sort",
            FacetSortOrder::Name => "name",
            FacetSortOrder::Relevance => "relevance",
        }
    }
}

impl fmt::Display for FacetSortOrder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for FacetSortOrder {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "result_count" => Ok(FacetSortOrder::ResultCount),
            "admin_sort" => Ok(FacetSortOrder::AdminSort),
            "name" => Ok(FacetSortOrder::Name),
            "relevance" => Ok(FacetSortOrder::Relevance),
            other => Err(Error::InvalidFacetValue {
                field: "sort_order".to_string(),
                reason: format!("unknown sort order '{other}'"),
            }),
        }
    }
}

/// A fully populated facet record; the terminal fallback of every lookup
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FacetDefaults {
    pub display_mode: DisplayMode,
    pub coverage_rate: u8,
    pub max_size: u32,
    pub sort_order: FacetSortOrder,
    pub is_recommendable: bool,
    pub is_virtual: bool,
}

impl FacetDefaults {
    pub const CONSTANT: FacetDefaults = FacetDefaults {
        display_mode: DisplayMode::Auto,
        coverage_rate: 90,
        max_size: 10,
        sort_order: FacetSortOrder::ResultCount,
        is_recommendable: false,
        is_virtual: false,
    };
}

impl Default for FacetDefaults {
    fn default() -> Self {
        Self::CONSTANT
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_constant_table() {
        let defaults = FacetDefaults::default();
        assert_eq!(defaults.display_mode, DisplayMode::Auto);
        assert_eq!(defaults.coverage_rate, 90);
        assert_eq!(defaults.max_size, 10);
        assert_eq!(defaults.sort_order, FacetSortOrder::ResultCount);
        assert!(!defaults.is_recommendable);
        assert!(!defaults.is_virtual);
    }

    #[test]
    fn test_wire_values() {
        for mode in [DisplayMode::Auto, DisplayMode::Displayed, DisplayMode::Hidden] {
            assert_eq!(mode.as_str().parse::<DisplayMode>().unwrap(), mode);
            assert_eq!(serde_json::to_value(mode).unwrap(), mode.as_str());
        }
        for order in [
            FacetSortOrder::ResultCount,
            FacetSortOrder::AdminSort,
            FacetSortOrder::Name,
            FacetSortOrder::Relevance,
        ] {
            assert_eq!(order.as_str().parse::<FacetSortOrder>().unwrap(), order);
        }
        assert!("always".parse::<DisplayMode>().is_err());
    }
}

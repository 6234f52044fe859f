use crate::sort::Direction;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Storefront search parameters, as received from the API layer
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchParameters {
    /// Free-text search phrase
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub search: Option<String>,
    #[serde(default)]
    pub filters: Vec<FacetFilter>,
    #[serde(default)]
    pub sort: Vec<SortParameter>,
    /// 1-indexed
    #[serde(default = "default_current_page")]
    pub current_page: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub page_size: Option<u32>,
    /// Category being browsed; selects category-level facet configuration
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,
    /// Facets to aggregate; empty means every aggregatable, filterable field
    #[serde(default)]
    pub facets: Vec<String>,
}

fn default_current_page() -> u32 {
    1
}

impl SearchParameters {
    pub fn new() -> Self {
        Self {
            current_page: default_current_page(),
            ..Default::default()
        }
    }

    pub fn search(mut self, text: impl Into<String>) -> Self {
        self.search = Some(text.into());
        self
    }

    pub fn filter(mut self, filter: FacetFilter) -> Self {
        self.filters.push(filter);
        self
    }

    pub fn sort(mut self, field: impl Into<String>, direction: Direction) -> Self {
        self.sort.push(SortParameter {
            field: field.into(),
            direction,
        });
        self
    }

    pub fn page(mut self, current_page: u32, page_size: u32) -> Self {
        self.current_page = current_page;
        self.page_size = Some(page_size);
        self
    }

    pub fn category(mut self, category: impl Into<String>) -> Self {
        self.category = Some(category.into());
        self
    }

    /// Search phrase with surrounding blanks removed, if anything is left
    pub fn search_text(&self) -> Option<&str> {
        self.search
            .as_deref()
            .map(str::trim)
            .filter(|s| !s.is_empty())
    }
}

/// One active facet selection
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FacetFilter {
    pub field: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub values: Vec<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub range: Option<RangeFilter>,
}

impl FacetFilter {
    pub fn values(field: impl Into<String>, values: Vec<Value>) -> Self {
        Self {
            field: field.into(),
            values,
            range: None,
        }
    }

    pub fn range(field: impl Into<String>, gte: Option<Value>, lte: Option<Value>) -> Self {
        Self {
            field: field.into(),
            values: Vec::new(),
            range: Some(RangeFilter { gte, lte }),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RangeFilter {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub gte: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub lte: Option<Value>,
}

/// `field` is a sortable field code, or `_score`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SortParameter {
    pub field: String,
    #[serde(default)]
    pub direction: Direction,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_decode_camel_case() {
        let params: SearchParameters = serde_json::from_value(json!({
            "search": "red shoes",
            "currentPage": 2,
            "pageSize": 10,
            "filters": [{"field": "color", "values": ["red"]}],
            "sort": [{"field": "price.price", "direction": "desc"}]
        }))
        .unwrap();
        assert_eq!(params.current_page, 2);
        assert_eq!(params.page_size, Some(10));
        assert_eq!(params.filters[0].values, vec![json!("red")]);
        assert_eq!(params.sort[0].direction, Direction::Desc);
    }

    #[test]
    fn test_defaults() {
        let params: SearchParameters = serde_json::from_value(json!({})).unwrap();
        assert_eq!(params, SearchParameters::new());
        assert_eq!(params.current_page, 1);
        assert!(params.search_text().is_none());
    }

    #[test]
    fn test_blank_search_is_none() {
        assert!(SearchParameters::new().search("   ").search_text().is_none());
        assert_eq!(SearchParameters::new().search(" bag ").search_text(), Some("bag"));
    }
}

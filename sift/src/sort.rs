//! Sort orders and their lowering to engine DSL

use crate::error::{Error, Result};
use crate::query::{QueryAssembler, QueryNode};
use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    #[default]
    Asc,
    Desc,
}

impl Direction {
    pub fn as_str(&self) -> &'static str {
        match self {
            Direction::Asc => "asc",
            Direction::Desc => "desc",
        }
    }
}

/// Where documents without a value are placed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MissingPlacement {
    First,
    Last,
}

impl MissingPlacement {
    pub fn as_str(&self) -> &'static str {
        match self {
            MissingPlacement::First => "_first",
            MissingPlacement::Last => "_last",
        }
    }
}

/// How multi-valued fields are reduced to one sort value
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortMode {
    Min,
    Max,
    Sum,
    Avg,
    Median,
}

impl SortMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            SortMode::Min => "min",
            SortMode::Max => "max",
            SortMode::Sum => "sum",
            SortMode::Avg => "avg",
            SortMode::Median => "median",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum SortOrder {
    Standard(StandardSort),
    Nested(NestedSort),
    Score(ScoreSort),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StandardSort {
    pub field: String,
    #[serde(default)]
    pub direction: Direction,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub missing: Option<MissingPlacement>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub unmapped_type: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NestedSort {
    pub field: String,
    pub path: String,
    #[serde(default)]
    pub direction: Direction,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub filter: Option<QueryNode>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mode: Option<SortMode>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub missing: Option<MissingPlacement>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScoreSort {
    #[serde(default = "default_score_direction")]
    pub direction: Direction,
}

fn default_score_direction() -> Direction {
    Direction::Desc
}

impl SortOrder {
    pub fn field(field: impl Into<String>, direction: Direction) -> Self {
        SortOrder::Standard(StandardSort {
            field: field.into(),
            direction,
            missing: None,
            unmapped_type: None,
        })
    }

    pub fn score() -> Self {
        SortOrder::Score(ScoreSort {
            direction: Direction::Desc,
        })
    }
}

pub struct SortAssembler;

impl SortAssembler {
    pub fn assemble(sort: &SortOrder) -> Result<Value> {
        match sort {
            SortOrder::Standard(s) => Ok(Self::assemble_standard(s)),
            SortOrder::Nested(s) => Self::assemble_nested(s),
            SortOrder::Score(s) => Ok(json!({ "_score": { "order": s.direction.as_str() } })),
        }
    }

    pub fn assemble_all(sorts: &[SortOrder]) -> Result<Vec<Value>> {
        sorts.iter().map(Self::assemble).collect()
    }

    fn assemble_standard(sort: &StandardSort) -> Value {
        let mut params = Map::new();
        params.insert("order".to_string(), Value::from(sort.direction.as_str()));
        if let Some(missing) = sort.missing {
            params.insert("missing".to_string(), Value::from(missing.as_str()));
        }
        if let Some(unmapped) = &sort.unmapped_type {
            params.insert("unmapped_type".to_string(), Value::from(unmapped.clone()));
        }
        json!({ sort.field.clone(): params })
    }

    fn assemble_nested(sort: &NestedSort) -> Result<Value> {
        if sort.path.is_empty() {
            return Err(Error::InvalidNode(format!(
                "nested sort on '{}' requires a path",
                sort.field
            )));
        }

        let mut nested = Map::new();
        nested.insert("path".to_string(), Value::from(sort.path.clone()));
        if let Some(filter) = &sort.filter {
            nested.insert("filter".to_string(), QueryAssembler::assemble(filter)?);
        }

        let mut params = Map::new();
        params.insert("order".to_string(), Value::from(sort.direction.as_str()));
        if let Some(mode) = sort.mode {
            params.insert("mode".to_string(), Value::from(mode.as_str()));
        }
        if let Some(missing) = sort.missing {
            params.insert("missing".to_string(), Value::from(missing.as_str()));
        }
        params.insert("nested".to_string(), Value::Object(nested));

        Ok(json!({ sort.field.clone(): params }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::query::TermQuery;

    #[test]
    fn test_standard_sort() {
        let sort = SortOrder::Standard(StandardSort {
            field: "size".to_string(),
            direction: Direction::Desc,
            missing: Some(MissingPlacement::Last),
            unmapped_type: Some("long".to_string()),
        });
        assert_eq!(
            SortAssembler::assemble(&sort).unwrap(),
            json!({"size": {"order": "desc", "missing": "_last", "unmapped_type": "long"}})
        );
    }

    #[test]
    fn test_score_sort() {
        assert_eq!(
            SortAssembler::assemble(&SortOrder::score()).unwrap(),
            json!({"_score": {"order": "desc"}})
        );
    }

    #[test]
    fn test_nested_sort() {
        let sort = SortOrder::Nested(NestedSort {
            field: "price.price".to_string(),
            path: "price".to_string(),
            direction: Direction::Asc,
            filter: Some(TermQuery::new("price.group_id", 0).into()),
            mode: Some(SortMode::Min),
            missing: None,
        });
        assert_eq!(
            SortAssembler::assemble(&sort).unwrap(),
            json!({"price.price": {
                "order": "asc",
                "mode": "min",
                "nested": {"path": "price", "filter": {"term": {"price.group_id": {"value": 0}}}}
            }})
        );
    }

    #[test]
    fn test_nested_sort_requires_path() {
        let sort = SortOrder::Nested(NestedSort {
            field: "stock.qty".to_string(),
            path: String::new(),
            direction: Direction::Asc,
            filter: None,
            mode: None,
            missing: None,
        });
        assert!(SortAssembler::assemble(&sort).is_err());
    }

    #[test]
    fn test_decode_sort_defaults() {
        let sort: SortOrder = serde_json::from_value(json!({"type": "score"})).unwrap();
        assert_eq!(sort, SortOrder::score());
        let sort: SortOrder =
            serde_json::from_value(json!({"type": "standard", "field": "sku"})).unwrap();
        assert_eq!(sort, SortOrder::field("sku", Direction::Asc));
    }
}

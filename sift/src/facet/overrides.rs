//! Stored facet override rows
//!
//! Every attribute is optional. Empty form submissions arrive as empty
//! strings; those are read as "unset" so they never shadow a default.

use super::types::{DisplayMode, FacetSortOrder};
use crate::error::{Error, Result};
use serde::de::{self, Deserializer};
use serde::{Deserialize, Serialize};
use std::fmt::Display;
use std::str::FromStr;

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct FacetOverride {
    pub field: String,
    /// `None` for the field's global row
    #[serde(default, deserialize_with = "blank_as_none_str", skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,
    #[serde(default, deserialize_with = "blank_as_none", skip_serializing_if = "Option::is_none")]
    pub display_mode: Option<DisplayMode>,
    #[serde(default, deserialize_with = "blank_as_none", skip_serializing_if = "Option::is_none")]
    pub coverage_rate: Option<u8>,
    #[serde(default, deserialize_with = "blank_as_none", skip_serializing_if = "Option::is_none")]
    pub max_size: Option<u32>,
    #[serde(default, deserialize_with = "blank_as_none", skip_serializing_if = "Option::is_none")]
    pub sort_order: Option<FacetSortOrder>,
    #[serde(default, deserialize_with = "blank_as_none", skip_serializing_if = "Option::is_none")]
    pub is_recommendable: Option<bool>,
    #[serde(default, deserialize_with = "blank_as_none", skip_serializing_if = "Option::is_none")]
    pub is_virtual: Option<bool>,
}

/// A blank category names no category: it is the field's global row.
pub fn normalize_category(category: Option<&str>) -> Option<&str> {
    category.map(str::trim).filter(|c| !c.is_empty())
}

impl FacetOverride {
    pub fn new(field: impl Into<String>, category: Option<&str>) -> Self {
        Self {
            field: field.into(),
            category: normalize_category(category).map(str::to_string),
            ..Default::default()
        }
    }

    pub fn key(&self) -> (&str, Option<&str>) {
        (&self.field, self.category.as_deref())
    }

    /// Set one attribute from its raw form value; blank input clears it.
    /// The row is left untouched when the value is rejected.
    pub fn set_attribute(&mut self, attribute: &str, raw: &str) -> Result<()> {
        let mut next = self.clone();
        match attribute {
            "display_mode" => next.display_mode = parse_blank(attribute, raw)?,
            "coverage_rate" => next.coverage_rate = parse_blank(attribute, raw)?,
            "max_size" => next.max_size = parse_blank(attribute, raw)?,
            "sort_order" => next.sort_order = parse_blank(attribute, raw)?,
            "is_recommendable" => next.is_recommendable = parse_blank(attribute, raw)?,
            "is_virtual" => next.is_virtual = parse_blank(attribute, raw)?,
            other => {
                return Err(Error::InvalidFacetValue {
                    field: self.field.clone(),
                    reason: format!("unknown attribute '{other}'"),
                })
            }
        }
        next.validate()?;
        *self = next;
        Ok(())
    }

    pub fn validate(&self) -> Result<()> {
        if let Some(rate) = self.coverage_rate {
            if rate > 100 {
                return Err(Error::InvalidFacetValue {
                    field: self.field.clone(),
                    reason: format!("coverage rate must be between 0 and 100 (got {rate})"),
                });
            }
        }
        if self.field.trim().is_empty() {
            return Err(Error::InvalidFacetValue {
                field: self.field.clone(),
                reason: "field must be set".to_string(),
            });
        }
        Ok(())
    }

    pub fn is_empty(&self) -> bool {
        self.display_mode.is_none()
            && self.coverage_rate.is_none()
            && self.max_size.is_none()
            && self.sort_order.is_none()
            && self.is_recommendable.is_none()
            && self.is_virtual.is_none()
    }
}

fn parse_blank<T>(attribute: &str, raw: &str) -> Result<Option<T>>
where
    T: FromStr,
    T::Err: Display,
{
    let raw = raw.trim();
    if raw.is_empty() {
        return Ok(None);
    }
    raw.parse().map(Some).map_err(|e| Error::InvalidFacetValue {
        field: attribute.to_string(),
        reason: format!("'{raw}': {e}"),
    })
}

#[derive(Deserialize)]
#[serde(untagged)]
enum RawValue {
    Bool(bool),
    Int(i64),
    Float(f64),
    Str(String),
}

fn blank_as_none<'de, D, T>(deserializer: D) -> std::result::Result<Option<T>, D::Error>
where
    D: Deserializer<'de>,
    T: FromStr,
    T::Err: Display,
{
    let raw = match Option::<RawValue>::deserialize(deserializer)? {
        None => return Ok(None),
        Some(RawValue::Bool(b)) => b.to_string(),
        Some(RawValue::Int(i)) => i.to_string(),
        // 50.0 reads as 50
        Some(RawValue::Float(f)) if f.fract() == 0.0 && f.abs() < i64::MAX as f64 => (f as i64).to_string(),
        Some(RawValue::Float(f)) => {
            return Err(de::Error::custom(format!("expected a whole number, got {f}")));
        }
        Some(RawValue::Str(s)) => s,
    };
    let raw = raw.trim();
    if raw.is_empty() {
        return Ok(None);
    }
    raw.parse().map(Some).map_err(de::Error::custom)
}

fn blank_as_none_str<'de, D>(deserializer: D) -> std::result::Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let category = Option::<String>::deserialize(deserializer)?;
    Ok(normalize_category(category.as_deref()).map(str::to_string))
}

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FieldType {
    Text,
    Keyword,
    Select,
    Boolean,
    Int,
    Float,
    Price,
    Stock,
    Date,
    Reference,
    Category,
}

impl FieldType {
    pub fn is_numeric(&self) -> bool {
        matches!(self, FieldType::Int | FieldType::Float | FieldType::Price)
    }
}

/// Static description of one indexed field of an entity
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FieldMetadata {
    pub code: String,
    #[serde(rename = "type")]
    pub field_type: FieldType,
    /// Set when the field lives inside a nested document (e.g. `price`)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub nested_path: Option<String>,
    #[serde(default)]
    pub searchable: bool,
    #[serde(default)]
    pub filterable: bool,
    #[serde(default)]
    pub sortable: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub aggregatable: Option<bool>,
    #[serde(default = "default_weight")]
    pub weight: f32,
    #[serde(default)]
    pub spellchecked: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub histogram_interval: Option<f64>,
}

fn default_weight() -> f32 {
    1.0
}

impl FieldMetadata {
    pub fn new(code: impl Into<String>, field_type: FieldType) -> Self {
        Self {
            code: code.into(),
            field_type,
            nested_path: None,
            searchable: false,
            filterable: false,
            sortable: false,
            aggregatable: None,
            weight: default_weight(),
            spellchecked: false,
            histogram_interval: None,
        }
    }

    pub fn searchable(mut self, weight: f32) -> Self {
        self.searchable = true;
        self.weight = weight;
        self
    }

    pub fn filterable(mut self) -> Self {
        self.filterable = true;
        self
    }

    pub fn sortable(mut self) -> Self {
        self.sortable = true;
        self
    }

    pub fn spellchecked(mut self) -> Self {
        self.spellchecked = true;
        self
    }

    pub fn nested(mut self, path: impl Into<String>) -> Self {
        self.nested_path = Some(path.into());
        self
    }

    /// Full-text fields never aggregate unless metadata says so explicitly
    pub fn is_aggregatable(&self) -> bool {
        self.aggregatable
            .unwrap_or(self.field_type != FieldType::Text)
    }

    pub fn is_nested(&self) -> bool {
        self.nested_path.is_some()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EntityMetadata {
    pub entity_type: String,
    /// Field holding the localized catalog a document belongs to
    #[serde(default = "default_scope_field")]
    pub scope_field: String,
    #[serde(default)]
    pub fields: Vec<FieldMetadata>,
}

fn default_scope_field() -> String {
    "catalog".to_string()
}

impl EntityMetadata {
    pub fn new(entity_type: impl Into<String>, fields: Vec<FieldMetadata>) -> Self {
        Self {
            entity_type: entity_type.into(),
            scope_field: default_scope_field(),
            fields,
        }
    }

    pub fn field(&self, code: &str) -> Option<&FieldMetadata> {
        self.fields.iter().find(|f| f.code == code)
    }

    /// Human-readable problems with this metadata (empty = ok)
    pub fn lint(&self) -> Vec<String> {
        let mut issues = Vec::new();
        if self.entity_type.trim().is_empty() {
            issues.push("entity_type must be set".to_string());
        }
        let mut seen = std::collections::HashSet::new();
        for field in &self.fields {
            if !seen.insert(field.code.as_str()) {
                issues.push(format!("field '{}' is declared twice", field.code));
            }
            if field.weight <= 0.0 {
                issues.push(format!("field '{}' weight must be > 0 (got {})", field.code, field.weight));
            }
            if let Some(path) = &field.nested_path {
                if !field.code.starts_with(&format!("{path}.")) {
                    issues.push(format!(
                        "nested field '{}' must live under its path '{}'",
                        field.code, path
                    ));
                }
            }
            if field.spellchecked && !field.searchable {
                issues.push(format!("field '{}' is spellchecked but not searchable", field.code));
            }
        }
        issues
    }
}

use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    /// A node's `type` tag is unknown, or its body does not fit the tagged variant.
    #[error("Invalid {kind} type '{found}': {reason}")]
    InvalidVariantTag {
        kind: &'static str,
        found: String,
        reason: String,
    },

    #[error("Aggregation '{aggregation}' references unknown sibling path '{path}'")]
    DanglingReference { aggregation: String, path: String },

    #[error("Unknown entity type: {0}")]
    UnknownEntityType(String),

    #[error("Unknown request type: {0}")]
    UnknownRequestType(String),

    #[error("Request type '{request_type}' serves entity '{configured}', not '{requested}'")]
    RequestTypeMismatch {
        request_type: String,
        configured: String,
        requested: String,
    },

    #[error("Page {page} with page size {size} exceeds the result window of {window}")]
    InvalidPagination { page: u32, size: u32, window: u32 },

    #[error("Unknown field '{field}' for entity '{entity}'")]
    UnknownField { entity: String, field: String },

    #[error("Field is not filterable: {0}")]
    FieldNotFilterable(String),

    #[error("Field is not sortable: {0}")]
    FieldNotSortable(String),

    #[error("Invalid facet value for '{field}': {reason}")]
    InvalidFacetValue { field: String, reason: String },

    #[error("Invalid node: {0}")]
    InvalidNode(String),

    #[error("Store error: {0}")]
    Store(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, Error>;

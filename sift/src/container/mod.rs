//! Container configuration: which fields a request may search, filter, sort
//! and aggregate on, and how full-text relevance is tuned.

pub mod metadata;
pub mod relevance;
pub mod resolver;

pub use metadata::{EntityMetadata, FieldMetadata, FieldType};
pub use relevance::{
    FulltextConfiguration, FuzzinessConfiguration, PhoneticConfiguration, PhraseMatchConfiguration,
    RelevanceConfiguration, RelevanceOverride,
};
pub use resolver::{index_name, ContainerConfiguration, ContainerResolver, RequestContext};

pub mod aggregation;
pub mod cache;
pub mod config;
pub mod container;
pub mod error;
pub mod facet;
pub mod query;
pub mod request;
pub mod sort;
pub mod store;

pub use config::EngineConfig;
pub use error::{Error, Result};
pub use request::{SearchParameters, SearchPipeline, SearchRequest};

//! Search request assembly: parameters in, engine search body out

pub mod builder;
pub mod pagination;
pub mod params;
pub mod pipeline;

pub use builder::{
    RequestBuilder, SearchRequest, COVERAGE_AGGREGATION, COVERAGE_BUCKET_KEY, COVERAGE_SELECTOR,
    FULLTEXT_QUERY_NAME, RELEVANCE_METRIC,
};
pub use pagination::{expected_items, last_page, Pagination, PaginationInfo};
pub use params::{FacetFilter, RangeFilter, SearchParameters, SortParameter};
pub use pipeline::SearchPipeline;

use super::pagination::Pagination;
use super::params::{FacetFilter, SearchParameters, SortParameter};
use crate::aggregation::{
    AggregationAssembler, AggregationNode, BucketOrder, BucketSelectorPipeline, BucketsPath,
    DateHistogramAggregation, FilterAggregation, FiltersAggregation, HistogramAggregation,
    MetricAggregation, MetricType, NamedFilter, NestedAggregation, TermsAggregation,
};
use crate::config::EngineConfig;
use crate::container::{ContainerConfiguration, FieldMetadata, FieldType};
use crate::error::{Error, Result};
use crate::facet::{DisplayMode, FacetConfiguration, FacetSortOrder};
use crate::query::{
    BoolQuery, ExistsQuery, MultiMatchQuery, MultiMatchType, NestedQuery, QueryAssembler,
    QueryNode, RangeQuery, TermQuery, TermsQuery, WeightedField,
};
use crate::sort::{Direction, NestedSort, SortAssembler, SortMode, SortOrder};
use serde::Serialize;
use serde_json::{Map, Value};
use std::collections::BTreeMap;
use tracing::{debug, warn};

/// Name of the full-text clause in the engine response
pub const FULLTEXT_QUERY_NAME: &str = "fulltext";
/// Key of the single bucket wrapping a coverage-gated facet
pub const COVERAGE_BUCKET_KEY: &str = "all";
pub const COVERAGE_AGGREGATION: &str = "coverage";
pub const COVERAGE_SELECTOR: &str = "coverage_gate";
pub const RELEVANCE_METRIC: &str = "top_score";

/// A fully assembled, paginated search request
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SearchRequest {
    pub index: String,
    pub query: QueryNode,
    pub aggregations: Vec<AggregationNode>,
    pub sort: Vec<SortOrder>,
    pub pagination: Pagination,
    pub track_total_hits: bool,
}

impl SearchRequest {
    /// Lower the whole request into the engine's search body.
    ///
    /// Any node failing to assemble fails the whole body.
    pub fn to_dsl(&self) -> Result<Value> {
        let mut body = Map::new();
        body.insert("from".to_string(), Value::from(self.pagination.from()));
        body.insert("size".to_string(), Value::from(self.pagination.size()));
        body.insert("track_total_hits".to_string(), Value::from(self.track_total_hits));
        body.insert("query".to_string(), QueryAssembler::assemble(&self.query)?);
        if !self.aggregations.is_empty() {
            body.insert(
                "aggs".to_string(),
                Value::Object(AggregationAssembler::assemble_all(&self.aggregations)?),
            );
        }
        if !self.sort.is_empty() {
            body.insert(
                "sort".to_string(),
                Value::Array(SortAssembler::assemble_all(&self.sort)?),
            );
        }
        Ok(Value::Object(body))
    }
}

/// Turns search parameters into a [`SearchRequest`] for one container.
pub struct RequestBuilder<'a> {
    config: &'a EngineConfig,
}

impl<'a> RequestBuilder<'a> {
    pub fn new(config: &'a EngineConfig) -> Self {
        Self { config }
    }

    pub fn build(
        &self,
        params: &SearchParameters,
        container: &ContainerConfiguration,
        facets: &[FacetConfiguration],
    ) -> Result<SearchRequest> {
        let pagination = Pagination::new(params.current_page, params.page_size, &self.config.search)?;

        let mut root = BoolQuery::new();
        if let Some(text) = params.search_text() {
            root = root.must(self.fulltext_query(text, container)?);
        }
        for filter in &container.filters {
            root = root.filter(filter.clone());
        }
        if let Some(category) = &params.category {
            if let Some(field) = container.fields.iter().find(|f| f.field_type == FieldType::Category) {
                root = root.filter(wrap_nested(field, TermQuery::new(field.code.clone(), category.clone())));
            }
        }
        for filter in &params.filters {
            root = root.filter(facet_filter(filter, container)?);
        }

        let mut aggregations = Vec::new();
        for facet in facets {
            if let Some(aggregation) = self.facet_aggregation(facet, container)? {
                aggregations.push(aggregation);
            }
        }

        let sort = sort_orders(&params.sort, params.search_text().is_some(), container)?;

        debug!(
            "Built request on {} ({} filters, {} aggregations, page {})",
            container.index_name,
            root.filter.len(),
            aggregations.len(),
            pagination.current_page
        );

        Ok(SearchRequest {
            index: container.index_name.clone(),
            query: root.into(),
            aggregations,
            sort,
            pagination,
            track_total_hits: self.config.search.track_total_hits,
        })
    }

    /// Full-text clause: weighted best-fields match, nested groups, and the
    /// optional fuzzy and phrase clauses, any of which may match.
    fn fulltext_query(&self, text: &str, container: &ContainerConfiguration) -> Result<QueryNode> {
        let relevance = &container.relevance;
        let mut fields = Vec::new();
        let mut nested: BTreeMap<&str, Vec<WeightedField>> = BTreeMap::new();
        for field in container.searchable_fields() {
            let weighted = WeightedField::new(field.code.clone(), field.weight);
            match &field.nested_path {
                Some(path) => nested.entry(path.as_str()).or_default().push(weighted),
                None => {
                    if relevance.phonetic.enabled && field.field_type == FieldType::Text {
                        fields.push(WeightedField::new(format!("{}.phonetic", field.code), field.weight));
                    }
                    fields.push(weighted);
                }
            }
        }

        let configure = |mut query: MultiMatchQuery| {
            query.minimum_should_match = Some(relevance.fulltext.minimum_should_match.as_str().into());
            query.tie_breaker = Some(relevance.fulltext.tie_breaker);
            query
        };

        let mut fulltext = BoolQuery::new().minimum_should_match(1).named(FULLTEXT_QUERY_NAME);
        if !fields.is_empty() {
            let mut main = configure(MultiMatchQuery::new(text, fields.clone()));
            main.cutoff_frequency = Some(relevance.cutoff_frequency);
            fulltext = fulltext.should(main);
        }
        for (path, group) in nested {
            fulltext = fulltext.should(NestedQuery::new(path, configure(MultiMatchQuery::new(text, group))));
        }

        if relevance.fuzziness.enabled {
            let spellchecked: Vec<WeightedField> = container
                .spellchecked_fields()
                .filter(|f| !f.is_nested())
                .map(|f| WeightedField::new(f.code.clone(), f.weight))
                .collect();
            if !spellchecked.is_empty() {
                let mut fuzzy = configure(MultiMatchQuery::new(text, spellchecked));
                fuzzy.fuzziness = Some(relevance.fuzziness.value);
                fuzzy.prefix_length = Some(relevance.fuzziness.prefix_length);
                fuzzy.max_expansions = Some(relevance.fuzziness.max_expansions);
                fulltext = fulltext.should(fuzzy);
            }
        }

        if relevance.phrase_match.enabled && !fields.is_empty() {
            let phrase = MultiMatchQuery::new(text, fields)
                .match_type(MultiMatchType::Phrase)
                .boosted(relevance.phrase_match.boost);
            fulltext = fulltext.should(phrase);
        }

        if fulltext.should.is_empty() {
            return Err(Error::InvalidNode(format!(
                "entity '{}' has no searchable fields",
                container.entity_type
            )));
        }
        Ok(fulltext.into())
    }

    /// Aggregation for one facet, or `None` when the facet is not shown
    fn facet_aggregation(
        &self,
        facet: &FacetConfiguration,
        container: &ContainerConfiguration,
    ) -> Result<Option<AggregationNode>> {
        let code = facet.field();
        if facet.is_virtual() {
            warn!("Skipping virtual facet '{}'", code);
            return Ok(None);
        }
        if facet.display_mode() == DisplayMode::Hidden {
            debug!("Facet '{}' is hidden", code);
            return Ok(None);
        }
        let Some(field) = container.field(code) else {
            warn!("Skipping facet on unknown field '{}' of '{}'", code, container.entity_type);
            return Ok(None);
        };
        if !field.is_aggregatable() {
            warn!("Skipping facet on non-aggregatable field '{}'", code);
            return Ok(None);
        }

        let buckets = self.bucket_aggregation(facet, field);
        let aggregation = match &field.nested_path {
            Some(path) => {
                let mut nested = NestedAggregation::new(code, path.clone());
                nested.aggregations.push(buckets);
                nested.into()
            }
            None => buckets,
        };

        if !facet.is_coverage_gated() {
            return Ok(Some(aggregation));
        }

        let mut gate = FiltersAggregation::new(
            code,
            vec![NamedFilter {
                key: COVERAGE_BUCKET_KEY.to_string(),
                query: QueryNode::match_all(),
            }],
        );
        let buckets_path = BucketsPath::new()
            .with("covered", format!("{COVERAGE_AGGREGATION}._count"))
            .with("total", "_count");
        gate.aggregations = vec![
            aggregation,
            FilterAggregation::new(
                COVERAGE_AGGREGATION,
                wrap_nested(field, ExistsQuery::new(field.code.clone())),
            )
            .into(),
            BucketSelectorPipeline::new(
                COVERAGE_SELECTOR,
                buckets_path,
                format!(
                    "params.total > 0 && params.covered * 100 >= params.total * {}",
                    facet.coverage_rate()
                ),
            )
            .into(),
        ];
        Ok(Some(gate.into()))
    }

    fn bucket_aggregation(&self, facet: &FacetConfiguration, field: &FieldMetadata) -> AggregationNode {
        let code = facet.field();
        if field.field_type.is_numeric() {
            let interval = field
                .histogram_interval
                .unwrap_or(self.config.facets.histogram_interval);
            let mut histogram = HistogramAggregation::new(code, field.code.clone(), interval);
            histogram.min_doc_count = Some(1);
            return histogram.into();
        }
        if field.field_type == FieldType::Date {
            let mut histogram = DateHistogramAggregation::new(
                code,
                field.code.clone(),
                self.config.facets.date_interval.clone(),
            );
            histogram.min_doc_count = Some(1);
            return histogram.into();
        }

        let size = match facet.max_size() {
            0 => self.config.facets.max_bucket_size,
            size => size,
        };
        let terms = TermsAggregation::new(code, field.code.clone()).size(size);
        match facet.sort_order() {
            // Admin positions are applied when buckets are hydrated
            FacetSortOrder::ResultCount | FacetSortOrder::AdminSort => {
                terms.order(BucketOrder::count_desc()).into()
            }
            FacetSortOrder::Name => terms.order(BucketOrder::key_asc()).into(),
            FacetSortOrder::Relevance => terms
                .order(BucketOrder::new(RELEVANCE_METRIC, Direction::Desc))
                .child(MetricAggregation::script(RELEVANCE_METRIC, MetricType::Max, "_score"))
                .into(),
        }
    }
}

fn wrap_nested(field: &FieldMetadata, query: impl Into<QueryNode>) -> QueryNode {
    match &field.nested_path {
        Some(path) => NestedQuery::new(path.clone(), query).into(),
        None => query.into(),
    }
}

fn facet_filter(filter: &FacetFilter, container: &ContainerConfiguration) -> Result<QueryNode> {
    let field = container.require_filterable(&filter.field)?;
    let query: QueryNode = match (filter.values.as_slice(), &filter.range) {
        ([value], _) => TermQuery::new(field.code.clone(), value.clone()).into(),
        ([], Some(range)) if range.gte.is_some() || range.lte.is_some() => {
            let mut query = RangeQuery::new(field.code.clone());
            query.gte = range.gte.clone();
            query.lte = range.lte.clone();
            query.into()
        }
        ([], _) => {
            return Err(Error::InvalidFacetValue {
                field: filter.field.clone(),
                reason: "filter selects no value".to_string(),
            })
        }
        (values, _) => TermsQuery::new(field.code.clone(), values.to_vec()).into(),
    };
    Ok(wrap_nested(field, query))
}

fn sort_orders(
    params: &[SortParameter],
    has_search: bool,
    container: &ContainerConfiguration,
) -> Result<Vec<SortOrder>> {
    if params.is_empty() {
        return Ok(if has_search { vec![SortOrder::score()] } else { Vec::new() });
    }

    params
        .iter()
        .map(|param| {
            if param.field == "_score" {
                let mut score = SortOrder::score();
                if let SortOrder::Score(s) = &mut score {
                    s.direction = param.direction;
                }
                return Ok(score);
            }
            let field = container.require_sortable(&param.field)?;
            Ok(match &field.nested_path {
                Some(path) => SortOrder::Nested(NestedSort {
                    field: field.code.clone(),
                    path: path.clone(),
                    direction: param.direction,
                    filter: None,
                    mode: Some(match param.direction {
                        Direction::Asc => SortMode::Min,
                        Direction::Desc => SortMode::Max,
                    }),
                    missing: None,
                }),
                None => SortOrder::field(field.code.clone(), param.direction),
            })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::container::RelevanceConfiguration;
    use crate::facet::{FacetDefaults, FacetOverride};
    use serde_json::json;

    fn container() -> ContainerConfiguration {
        ContainerConfiguration {
            entity_type: "product".to_string(),
            request_type: "product_search".to_string(),
            localized_catalog: "b2c_fr".to_string(),
            index_name: "b2c_fr_product".to_string(),
            scope_field: "catalog".to_string(),
            relevance: RelevanceConfiguration::default(),
            fields: vec![
                FieldMetadata::new("name", FieldType::Text).searchable(2.0).spellchecked(),
                FieldMetadata::new("color", FieldType::Select).filterable(),
                FieldMetadata::new("price.price", FieldType::Price)
                    .nested("price")
                    .filterable()
                    .sortable(),
            ],
            filters: vec![TermQuery::new("catalog", "b2c_fr").into()],
        }
    }

    fn facet(field: &str, edit: impl FnOnce(&mut FacetOverride)) -> FacetConfiguration {
        let mut row = FacetOverride::new(field, None);
        edit(&mut row);
        FacetConfiguration::new(row, FacetDefaults::CONSTANT)
    }

    #[test]
    fn test_context_filter_always_present() {
        let config = EngineConfig::default();
        let request = RequestBuilder::new(&config)
            .build(&SearchParameters::new(), &container(), &[])
            .unwrap();
        let dsl = request.to_dsl().unwrap();
        assert_eq!(
            dsl["query"],
            json!({"bool": {"filter": [{"term": {"catalog": {"value": "b2c_fr"}}}]}})
        );
        assert!(dsl.get("aggs").is_none());
        assert!(dsl.get("sort").is_none());
    }

    #[test]
    fn test_nested_filter_and_sort() {
        let config = EngineConfig::default();
        let params = SearchParameters::new()
            .filter(FacetFilter::range("price.price", Some(json!(10)), None))
            .sort("price.price", Direction::Asc);
        let request = RequestBuilder::new(&config)
            .build(&params, &container(), &[])
            .unwrap();
        let dsl = request.to_dsl().unwrap();
        assert_eq!(
            dsl["query"]["bool"]["filter"][1],
            json!({"nested": {"path": "price", "query": {"range": {"price.price": {"gte": 10}}}}})
        );
        assert_eq!(dsl["sort"][0]["price.price"]["mode"], json!("min"));
    }

    #[test]
    fn test_filter_on_non_filterable_field() {
        let config = EngineConfig::default();
        let params = SearchParameters::new().filter(FacetFilter::values("name", vec![json!("x")]));
        assert!(matches!(
            RequestBuilder::new(&config).build(&params, &container(), &[]),
            Err(Error::FieldNotFilterable(_))
        ));
    }

    #[test]
    fn test_empty_filter_rejected() {
        let config = EngineConfig::default();
        let params = SearchParameters::new().filter(FacetFilter::values("color", Vec::new()));
        assert!(matches!(
            RequestBuilder::new(&config).build(&params, &container(), &[]),
            Err(Error::InvalidFacetValue { .. })
        ));
    }

    #[test]
    fn test_fulltext_default_sort_is_score() {
        let config = EngineConfig::default();
        let params = SearchParameters::new().search("bag");
        let request = RequestBuilder::new(&config)
            .build(&params, &container(), &[])
            .unwrap();
        assert_eq!(request.sort, vec![SortOrder::score()]);
        let dsl = request.to_dsl().unwrap();
        let fulltext = &dsl["query"]["bool"]["must"][0]["bool"];
        assert_eq!(fulltext["_name"], json!("fulltext"));
        assert_eq!(fulltext["minimum_should_match"], json!(1));
        assert_eq!(
            fulltext["should"][0]["multi_match"]["fields"],
            json!(["name^2"])
        );
    }

    #[test]
    fn test_fuzzy_clause_when_enabled() {
        let config = EngineConfig::default();
        let mut container = container();
        container.relevance.fuzziness.enabled = true;
        let request = RequestBuilder::new(&config)
            .build(&SearchParameters::new().search("bga"), &container, &[])
            .unwrap();
        let dsl = request.to_dsl().unwrap();
        let should = &dsl["query"]["bool"]["must"][0]["bool"]["should"];
        assert_eq!(should.as_array().unwrap().len(), 2);
        assert_eq!(should[1]["multi_match"]["fuzziness"], json!("AUTO"));
    }

    #[test]
    fn test_no_searchable_fields() {
        let config = EngineConfig::default();
        let mut container = container();
        container.fields.retain(|f| !f.searchable);
        assert!(RequestBuilder::new(&config)
            .build(&SearchParameters::new().search("bag"), &container, &[])
            .is_err());
    }

    #[test]
    fn test_displayed_facet_is_plain_terms() {
        let config = EngineConfig::default();
        let facets = [facet("color", |r| r.display_mode = Some(DisplayMode::Displayed))];
        let request = RequestBuilder::new(&config)
            .build(&SearchParameters::new(), &container(), &facets)
            .unwrap();
        let dsl = request.to_dsl().unwrap();
        assert_eq!(
            dsl["aggs"]["color"],
            json!({"terms": {"field": "color", "size": 10, "order": [{"_count": "desc"}]}})
        );
    }

    #[test]
    fn test_auto_facet_is_coverage_gated() {
        let config = EngineConfig::default();
        let facets = [facet("color", |_| {})];
        let request = RequestBuilder::new(&config)
            .build(&SearchParameters::new(), &container(), &facets)
            .unwrap();
        let dsl = request.to_dsl().unwrap();
        let gate = &dsl["aggs"]["color"];
        assert_eq!(gate["filters"]["filters"]["all"], json!({"bool": {}}));
        assert_eq!(gate["aggs"]["coverage"], json!({"filter": {"exists": {"field": "color"}}}));
        assert_eq!(
            gate["aggs"]["coverage_gate"]["bucket_selector"]["buckets_path"],
            json!({"covered": "coverage._count", "total": "_count"})
        );
        assert!(gate["aggs"]["coverage_gate"]["bucket_selector"]["script"]
            .as_str()
            .unwrap()
            .ends_with("* 90"));
    }

    #[test]
    fn test_hidden_and_virtual_facets_skipped() {
        let config = EngineConfig::default();
        let facets = [
            facet("color", |r| r.display_mode = Some(DisplayMode::Hidden)),
            facet("color", |r| r.is_virtual = Some(true)),
            facet("weight", |_| {}),
            facet("name", |_| {}),
        ];
        let request = RequestBuilder::new(&config)
            .build(&SearchParameters::new(), &container(), &facets)
            .unwrap();
        assert!(request.aggregations.is_empty());
    }

    #[test]
    fn test_nested_price_facet() {
        let config = EngineConfig::default();
        let facets = [facet("price.price", |r| r.display_mode = Some(DisplayMode::Displayed))];
        let request = RequestBuilder::new(&config)
            .build(&SearchParameters::new(), &container(), &facets)
            .unwrap();
        let dsl = request.to_dsl().unwrap();
        assert_eq!(
            dsl["aggs"]["price.price"],
            json!({
                "nested": {"path": "price"},
                "aggs": {"price.price": {"histogram": {
                    "field": "price.price", "interval": 10.0, "min_doc_count": 1
                }}}
            })
        );
    }

    #[test]
    fn test_relevance_sorted_facet() {
        let config = EngineConfig::default();
        let facets = [facet("color", |r| {
            r.display_mode = Some(DisplayMode::Displayed);
            r.sort_order = Some(FacetSortOrder::Relevance);
            r.max_size = Some(0);
        })];
        let request = RequestBuilder::new(&config)
            .build(&SearchParameters::new(), &container(), &facets)
            .unwrap();
        let dsl = request.to_dsl().unwrap();
        assert_eq!(dsl["aggs"]["color"]["terms"]["size"], json!(1000));
        assert_eq!(dsl["aggs"]["color"]["terms"]["order"], json!([{"top_score": "desc"}]));
        assert_eq!(
            dsl["aggs"]["color"]["aggs"]["top_score"],
            json!({"max": {"script": {"source": "_score"}}})
        );
    }

    #[test]
    fn test_pagination_window() {
        let config = EngineConfig::default();
        let request = RequestBuilder::new(&config)
            .build(&SearchParameters::new().page(3, 20), &container(), &[])
            .unwrap();
        let dsl = request.to_dsl().unwrap();
        assert_eq!(dsl["from"], json!(40));
        assert_eq!(dsl["size"], json!(20));
        assert_eq!(dsl["track_total_hits"], json!(true));
    }
}

use super::types::*;
use crate::error::{Error, Result};
use crate::query::QueryAssembler;
use serde_json::{json, Map, Value};
use std::collections::HashSet;

/// Lowers aggregation trees into the engine's `aggs` object.
pub struct AggregationAssembler;

impl AggregationAssembler {
    /// Assemble a sibling group, keyed by aggregation name in declared order.
    pub fn assemble_all(aggregations: &[AggregationNode]) -> Result<Map<String, Value>> {
        Self::check_siblings(aggregations)?;

        let mut out = Map::new();
        for aggregation in aggregations {
            out.insert(aggregation.name().to_string(), Self::assemble(aggregation)?);
        }
        Ok(out)
    }

    /// Assemble one node into its `{ <kind>: {...}, "aggs": {...} }` body.
    pub fn assemble(aggregation: &AggregationNode) -> Result<Value> {
        let (kind, body) = match aggregation {
            AggregationNode::Terms(a) => ("terms", Self::assemble_terms(a)?),
            AggregationNode::Histogram(a) => ("histogram", Self::assemble_histogram(a)),
            AggregationNode::DateHistogram(a) => ("date_histogram", Self::assemble_date_histogram(a)),
            AggregationNode::Filter(a) => ("filter", QueryAssembler::assemble(&a.query)?),
            AggregationNode::Filters(a) => ("filters", Self::assemble_filters(a)?),
            AggregationNode::Nested(a) => {
                if a.path.is_empty() {
                    return Err(Error::InvalidNode(format!(
                        "nested aggregation '{}' requires a path",
                        a.name
                    )));
                }
                ("nested", json!({ "path": a.path }))
            }
            AggregationNode::ReverseNested(a) => {
                let mut body = Map::new();
                if let Some(path) = &a.path {
                    body.insert("path".to_string(), Value::from(path.clone()));
                }
                ("reverse_nested", Value::Object(body))
            }
            AggregationNode::Metric(a) => (a.metric.as_str(), Self::assemble_metric(a)?),
            AggregationNode::BucketSelector(p) => ("bucket_selector", Self::assemble_bucket_selector(p)),
            AggregationNode::BucketSort(p) => ("bucket_sort", Self::assemble_bucket_sort(p)),
            AggregationNode::SerialDiff(p) => {
                let mut body = Map::new();
                body.insert("buckets_path".to_string(), Value::from(p.buckets_path.clone()));
                if let Some(lag) = p.lag {
                    body.insert("lag".to_string(), Value::from(lag));
                }
                body.insert("gap_policy".to_string(), Value::from(p.gap_policy.as_str()));
                ("serial_diff", Value::Object(body))
            }
            AggregationNode::MovingFunction(p) => {
                let mut body = Map::new();
                body.insert("buckets_path".to_string(), Value::from(p.buckets_path.clone()));
                body.insert("window".to_string(), Value::from(p.window));
                body.insert("script".to_string(), Value::from(p.script.clone()));
                if let Some(shift) = p.shift {
                    body.insert("shift".to_string(), Value::from(shift));
                }
                body.insert("gap_policy".to_string(), Value::from(p.gap_policy.as_str()));
                ("moving_fn", Value::Object(body))
            }
            AggregationNode::MaxBucket(p) => (
                "max_bucket",
                json!({ "buckets_path": p.buckets_path, "gap_policy": p.gap_policy.as_str() }),
            ),
        };

        let mut out = Map::new();
        out.insert(kind.to_string(), body);

        let children = aggregation.children();
        if !children.is_empty() {
            out.insert("aggs".to_string(), Value::Object(Self::assemble_all(children)?));
        }
        Ok(Value::Object(out))
    }

    /// Names must be unique among siblings, and every path a pipeline or
    /// bucket ordering reads must resolve to a sibling or a built-in.
    fn check_siblings(aggregations: &[AggregationNode]) -> Result<()> {
        let mut names = HashSet::new();
        for aggregation in aggregations {
            if aggregation.name().is_empty() {
                return Err(Error::InvalidNode(format!(
                    "{} aggregation requires a name",
                    aggregation.aggregation_type()
                )));
            }
            if !names.insert(aggregation.name()) {
                return Err(Error::InvalidNode(format!(
                    "duplicate aggregation name '{}'",
                    aggregation.name()
                )));
            }
        }

        for aggregation in aggregations {
            for path in aggregation.referenced_paths() {
                let root = path_root(path);
                let resolves = BUILTIN_BUCKET_PATHS.contains(&root)
                    || (root != aggregation.name() && names.contains(root));
                if !resolves {
                    return Err(Error::DanglingReference {
                        aggregation: aggregation.name().to_string(),
                        path: path.to_string(),
                    });
                }
            }
        }
        Ok(())
    }

    fn assemble_terms(a: &TermsAggregation) -> Result<Value> {
        let child_names: HashSet<&str> = a.aggregations.iter().map(AggregationNode::name).collect();

        let mut body = Map::new();
        body.insert("field".to_string(), Value::from(a.field.clone()));
        if let Some(size) = a.size {
            body.insert("size".to_string(), Value::from(size));
        }
        if !a.order.is_empty() {
            let mut order = Vec::with_capacity(a.order.len());
            for o in &a.order {
                if !o.key.starts_with('_') && !child_names.contains(path_root(&o.key)) {
                    return Err(Error::DanglingReference {
                        aggregation: a.name.clone(),
                        path: o.key.clone(),
                    });
                }
                order.push(json!({ o.key.clone(): o.direction.as_str() }));
            }
            body.insert("order".to_string(), Value::Array(order));
        }
        if let Some(min_doc_count) = a.min_doc_count {
            body.insert("min_doc_count".to_string(), Value::from(min_doc_count));
        }
        if let Some(include) = &a.include {
            body.insert("include".to_string(), include.clone());
        }
        if let Some(exclude) = &a.exclude {
            body.insert("exclude".to_string(), exclude.clone());
        }
        Ok(Value::Object(body))
    }

    fn assemble_histogram(a: &HistogramAggregation) -> Value {
        let mut body = Map::new();
        body.insert("field".to_string(), Value::from(a.field.clone()));
        body.insert("interval".to_string(), Value::from(a.interval));
        if let Some(min_doc_count) = a.min_doc_count {
            body.insert("min_doc_count".to_string(), Value::from(min_doc_count));
        }
        if let Some(bounds) = &a.extended_bounds {
            body.insert(
                "extended_bounds".to_string(),
                json!({ "min": bounds.min, "max": bounds.max }),
            );
        }
        Value::Object(body)
    }

    fn assemble_date_histogram(a: &DateHistogramAggregation) -> Value {
        let mut body = Map::new();
        body.insert("field".to_string(), Value::from(a.field.clone()));
        body.insert(
            "calendar_interval".to_string(),
            Value::from(a.calendar_interval.clone()),
        );
        if let Some(format) = &a.format {
            body.insert("format".to_string(), Value::from(format.clone()));
        }
        if let Some(min_doc_count) = a.min_doc_count {
            body.insert("min_doc_count".to_string(), Value::from(min_doc_count));
        }
        Value::Object(body)
    }

    fn assemble_filters(a: &FiltersAggregation) -> Result<Value> {
        let mut filters = Map::new();
        for filter in &a.filters {
            filters.insert(filter.key.clone(), QueryAssembler::assemble(&filter.query)?);
        }
        let mut body = Map::new();
        body.insert("filters".to_string(), Value::Object(filters));
        if let Some(key) = &a.other_bucket_key {
            body.insert("other_bucket_key".to_string(), Value::from(key.clone()));
        }
        Ok(Value::Object(body))
    }

    fn assemble_metric(a: &MetricAggregation) -> Result<Value> {
        let mut body = Map::new();
        match (&a.field, &a.script) {
            (Some(field), None) => {
                body.insert("field".to_string(), Value::from(field.clone()));
            }
            (None, Some(script)) => {
                body.insert("script".to_string(), json!({ "source": script }));
            }
            _ => {
                return Err(Error::InvalidNode(format!(
                    "metric aggregation '{}' requires exactly one of field or script",
                    a.name
                )))
            }
        }
        if let Some(missing) = &a.missing {
            body.insert("missing".to_string(), missing.clone());
        }
        Ok(Value::Object(body))
    }

    fn assemble_bucket_selector(p: &BucketSelectorPipeline) -> Value {
        let paths: Map<String, Value> = p
            .buckets_path
            .iter()
            .map(|(variable, path)| (variable.to_string(), Value::from(path)))
            .collect();
        json!({
            "buckets_path": paths,
            "script": p.script,
            "gap_policy": p.gap_policy.as_str(),
        })
    }

    fn assemble_bucket_sort(p: &BucketSortPipeline) -> Value {
        let mut body = Map::new();
        if !p.sort.is_empty() {
            let sort: Vec<Value> = p
                .sort
                .iter()
                .map(|o| json!({ o.key.clone(): { "order": o.direction.as_str() } }))
                .collect();
            body.insert("sort".to_string(), Value::Array(sort));
        }
        if let Some(from) = p.from {
            body.insert("from".to_string(), Value::from(from));
        }
        if let Some(size) = p.size {
            body.insert("size".to_string(), Value::from(size));
        }
        body.insert("gap_policy".to_string(), Value::from(p.gap_policy.as_str()));
        Value::Object(body)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::query::{BoolQuery, ExistsQuery};
    use crate::sort::Direction;

    fn selector(name: &str, paths: &[(&str, &str)]) -> AggregationNode {
        let buckets_path: BucketsPath = paths.iter().copied().collect();
        BucketSelectorPipeline::new(name, buckets_path, "params.covered > 0").into()
    }

    #[test]
    fn test_terms_with_order_and_size() {
        let agg: AggregationNode = TermsAggregation::new("color", "color")
            .size(10)
            .order(BucketOrder::count_desc())
            .into();
        let out = AggregationAssembler::assemble_all(&[agg]).unwrap();
        assert_eq!(
            Value::Object(out),
            json!({"color": {"terms": {"field": "color", "size": 10, "order": [{"_count": "desc"}]}}})
        );
    }

    #[test]
    fn test_bucket_selector_shape() {
        let aggs = vec![
            FilterAggregation::new("coverage", ExistsQuery::new("color")).into(),
            selector("gate", &[("covered", "coverage._count"), ("total", "_count")]),
        ];
        let out = AggregationAssembler::assemble_all(&aggs).unwrap();
        assert_eq!(
            out["gate"],
            json!({"bucket_selector": {
                "buckets_path": {"covered": "coverage._count", "total": "_count"},
                "script": "params.covered > 0",
                "gap_policy": "skip"
            }})
        );
    }

    #[test]
    fn test_bucket_selector_emits_declared_order() {
        let aggs = vec![
            FilterAggregation::new("coverage", ExistsQuery::new("color")).into(),
            selector("gate", &[("total", "_count"), ("covered", "coverage._count")]),
        ];
        let out = AggregationAssembler::assemble_all(&aggs).unwrap();
        let variables: Vec<&String> = out["gate"]["bucket_selector"]["buckets_path"]
            .as_object()
            .unwrap()
            .keys()
            .collect();
        assert_eq!(variables, vec!["total", "covered"]);
    }

    #[test]
    fn test_dangling_pipeline_reference() {
        let aggs = vec![selector("gate", &[("covered", "coverage._count")])];
        let err = AggregationAssembler::assemble_all(&aggs).unwrap_err();
        assert!(matches!(
            err,
            Error::DanglingReference { ref aggregation, ref path }
                if aggregation == "gate" && path == "coverage._count"
        ));
    }

    #[test]
    fn test_pipeline_cannot_reference_itself() {
        let aggs = vec![selector("gate", &[("covered", "gate._count")])];
        assert!(matches!(
            AggregationAssembler::assemble_all(&aggs),
            Err(Error::DanglingReference { .. })
        ));
    }

    #[test]
    fn test_builtin_paths_resolve() {
        let aggs = vec![selector("gate", &[("total", "_count")])];
        assert!(AggregationAssembler::assemble_all(&aggs).is_ok());
    }

    #[test]
    fn test_nested_children_are_validated() {
        let inner = TermsAggregation::new("color", "color")
            .child(selector("gate", &[("covered", "nowhere._count")]));
        let outer: AggregationNode = FilterAggregation {
            name: "all".to_string(),
            query: BoolQuery::new().into(),
            aggregations: vec![inner.into()],
        }
        .into();
        assert!(matches!(
            AggregationAssembler::assemble_all(&[outer]),
            Err(Error::DanglingReference { .. })
        ));
    }

    #[test]
    fn test_duplicate_sibling_names() {
        let aggs: Vec<AggregationNode> = vec![
            TermsAggregation::new("color", "color").into(),
            TermsAggregation::new("color", "color_id").into(),
        ];
        assert!(matches!(
            AggregationAssembler::assemble_all(&aggs),
            Err(Error::InvalidNode(_))
        ));
    }

    #[test]
    fn test_terms_order_on_child_metric() {
        let agg: AggregationNode = TermsAggregation::new("brand", "brand")
            .order(BucketOrder::new("top_score", Direction::Desc))
            .child(MetricAggregation::script("top_score", MetricType::Max, "_score"))
            .into();
        let out = AggregationAssembler::assemble(&agg).unwrap();
        assert_eq!(
            out,
            json!({
                "terms": {"field": "brand", "order": [{"top_score": "desc"}]},
                "aggs": {"top_score": {"max": {"script": {"source": "_score"}}}}
            })
        );
    }

    #[test]
    fn test_terms_order_on_unknown_child() {
        let agg: AggregationNode = TermsAggregation::new("brand", "brand")
            .order(BucketOrder::new("top_score", Direction::Desc))
            .into();
        assert!(matches!(
            AggregationAssembler::assemble(&agg),
            Err(Error::DanglingReference { .. })
        ));
    }

    #[test]
    fn test_nested_requires_path() {
        let agg: AggregationNode = NestedAggregation::new("price", "").into();
        assert!(AggregationAssembler::assemble(&agg).is_err());
    }

    #[test]
    fn test_metric_requires_single_source() {
        let mut metric = MetricAggregation::field("avg", MetricType::Avg, "price");
        metric.script = Some("doc['price'].value".to_string());
        assert!(AggregationAssembler::assemble(&metric.into()).is_err());
    }

    #[test]
    fn test_histogram() {
        let agg: AggregationNode = HistogramAggregation::new("price", "price", 10.0).into();
        assert_eq!(
            AggregationAssembler::assemble(&agg).unwrap(),
            json!({"histogram": {"field": "price", "interval": 10.0}})
        );
    }

    #[test]
    fn test_declared_order_is_kept() {
        let aggs: Vec<AggregationNode> = vec![
            TermsAggregation::new("zeta", "zeta").into(),
            TermsAggregation::new("alpha", "alpha").into(),
        ];
        let out = AggregationAssembler::assemble_all(&aggs).unwrap();
        let keys: Vec<&String> = out.keys().collect();
        assert_eq!(keys, vec!["zeta", "alpha"]);
    }
}

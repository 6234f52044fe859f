//! Aggregation node model
//!
//! Bucket aggregations own an ordered list of child aggregations, which may
//! include pipeline aggregations. Pipelines reference their siblings through
//! `buckets_path`.

use crate::error::{Error, Result};
use crate::query::QueryNode;
use crate::sort::Direction;
use serde::de::{MapAccess, Visitor};
use serde::ser::SerializeMap;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde_json::Value;
use std::fmt;
use std::str::FromStr;

/// Bucket paths the engine resolves without a sibling aggregation
pub const BUILTIN_BUCKET_PATHS: [&str; 3] = ["_count", "_key", "_bucket_count"];

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum AggregationNode {
    // Bucket aggregations
    Terms(TermsAggregation),
    Histogram(HistogramAggregation),
    DateHistogram(DateHistogramAggregation),
    Filter(FilterAggregation),
    Filters(FiltersAggregation),
    Nested(NestedAggregation),
    ReverseNested(ReverseNestedAggregation),

    // Metric aggregations
    Metric(MetricAggregation),

    // Pipeline aggregations
    BucketSelector(BucketSelectorPipeline),
    BucketSort(BucketSortPipeline),
    SerialDiff(SerialDiffPipeline),
    MovingFunction(MovingFunctionPipeline),
    MaxBucket(MaxBucketPipeline),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AggregationType {
    Terms,
    Histogram,
    DateHistogram,
    Filter,
    Filters,
    Nested,
    ReverseNested,
    Metric,
    BucketSelector,
    BucketSort,
    SerialDiff,
    MovingFunction,
    MaxBucket,
}

impl AggregationType {
    pub const ALL: [AggregationType; 13] = [
        AggregationType::Terms,
        AggregationType::Histogram,
        AggregationType::DateHistogram,
        AggregationType::Filter,
        AggregationType::Filters,
        AggregationType::Nested,
        AggregationType::ReverseNested,
        AggregationType::Metric,
        AggregationType::BucketSelector,
        AggregationType::BucketSort,
        AggregationType::SerialDiff,
        AggregationType::MovingFunction,
        AggregationType::MaxBucket,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            AggregationType::Terms => "terms",
            AggregationType::Histogram => "histogram",
            AggregationType::DateHistogram => "dateHistogram",
            AggregationType::Filter => "filter",
            AggregationType::Filters => "filters",
            AggregationType::Nested => "nested",
            AggregationType::ReverseNested => "reverseNested",
            AggregationType::Metric => "metric",
            AggregationType::BucketSelector => "bucketSelector",
            AggregationType::BucketSort => "bucketSort",
            AggregationType::SerialDiff => "serialDiff",
            AggregationType::MovingFunction => "movingFunction",
            AggregationType::MaxBucket => "maxBucket",
        }
    }

    pub fn is_pipeline(&self) -> bool {
        matches!(
            self,
            AggregationType::BucketSelector
                | AggregationType::BucketSort
                | AggregationType::SerialDiff
                | AggregationType::MovingFunction
                | AggregationType::MaxBucket
        )
    }
}

impl fmt::Display for AggregationType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for AggregationType {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        AggregationType::ALL
            .into_iter()
            .find(|t| t.as_str() == s)
            .ok_or_else(|| Error::InvalidVariantTag {
                kind: "aggregation",
                found: s.to_string(),
                reason: "unknown aggregation type".to_string(),
            })
    }
}

impl AggregationNode {
    pub fn aggregation_type(&self) -> AggregationType {
        match self {
            AggregationNode::Terms(_) => AggregationType::Terms,
            AggregationNode::Histogram(_) => AggregationType::Histogram,
            AggregationNode::DateHistogram(_) => AggregationType::DateHistogram,
            AggregationNode::Filter(_) => AggregationType::Filter,
            AggregationNode::Filters(_) => AggregationType::Filters,
            AggregationNode::Nested(_) => AggregationType::Nested,
            AggregationNode::ReverseNested(_) => AggregationType::ReverseNested,
            AggregationNode::Metric(_) => AggregationType::Metric,
            AggregationNode::BucketSelector(_) => AggregationType::BucketSelector,
            AggregationNode::BucketSort(_) => AggregationType::BucketSort,
            AggregationNode::SerialDiff(_) => AggregationType::SerialDiff,
            AggregationNode::MovingFunction(_) => AggregationType::MovingFunction,
            AggregationNode::MaxBucket(_) => AggregationType::MaxBucket,
        }
    }

    pub fn name(&self) -> &str {
        match self {
            AggregationNode::Terms(a) => &a.name,
            AggregationNode::Histogram(a) => &a.name,
            AggregationNode::DateHistogram(a) => &a.name,
            AggregationNode::Filter(a) => &a.name,
            AggregationNode::Filters(a) => &a.name,
            AggregationNode::Nested(a) => &a.name,
            AggregationNode::ReverseNested(a) => &a.name,
            AggregationNode::Metric(a) => &a.name,
            AggregationNode::BucketSelector(a) => &a.name,
            AggregationNode::BucketSort(a) => &a.name,
            AggregationNode::SerialDiff(a) => &a.name,
            AggregationNode::MovingFunction(a) => &a.name,
            AggregationNode::MaxBucket(a) => &a.name,
        }
    }

    /// Child aggregations of a bucket aggregation; empty for metrics and pipelines
    pub fn children(&self) -> &[AggregationNode] {
        match self {
            AggregationNode::Terms(a) => &a.aggregations,
            AggregationNode::Histogram(a) => &a.aggregations,
            AggregationNode::DateHistogram(a) => &a.aggregations,
            AggregationNode::Filter(a) => &a.aggregations,
            AggregationNode::Filters(a) => &a.aggregations,
            AggregationNode::Nested(a) => &a.aggregations,
            AggregationNode::ReverseNested(a) => &a.aggregations,
            AggregationNode::Metric(_)
            | AggregationNode::BucketSelector(_)
            | AggregationNode::BucketSort(_)
            | AggregationNode::SerialDiff(_)
            | AggregationNode::MovingFunction(_)
            | AggregationNode::MaxBucket(_) => &[],
        }
    }

    /// Sibling paths this node reads from (pipelines and ordered terms)
    pub fn referenced_paths(&self) -> Vec<&str> {
        match self {
            AggregationNode::BucketSelector(p) => p.buckets_path.paths().collect(),
            AggregationNode::BucketSort(p) => p.sort.iter().map(|o| o.key.as_str()).collect(),
            AggregationNode::SerialDiff(p) => vec![p.buckets_path.as_str()],
            AggregationNode::MovingFunction(p) => vec![p.buckets_path.as_str()],
            AggregationNode::MaxBucket(p) => vec![p.buckets_path.as_str()],
            _ => Vec::new(),
        }
    }

    /// Decode a node from its wire form, checking the `type` tag first
    pub fn from_value(value: Value) -> Result<Self> {
        let tag = value
            .get("type")
            .and_then(Value::as_str)
            .ok_or_else(|| Error::InvalidVariantTag {
                kind: "aggregation",
                found: String::new(),
                reason: "missing 'type' tag".to_string(),
            })?
            .to_string();
        tag.parse::<AggregationType>()?;
        serde_json::from_value(value).map_err(|e| Error::InvalidVariantTag {
            kind: "aggregation",
            found: tag,
            reason: e.to_string(),
        })
    }
}

macro_rules! aggregation_variant {
    ($($variant:ident($ty:ty)),* $(,)?) => {
        $(
            impl From<$ty> for AggregationNode {
                fn from(a: $ty) -> Self {
                    AggregationNode::$variant(a)
                }
            }
        )*
    };
}

aggregation_variant!(
    Terms(TermsAggregation),
    Histogram(HistogramAggregation),
    DateHistogram(DateHistogramAggregation),
    Filter(FilterAggregation),
    Filters(FiltersAggregation),
    Nested(NestedAggregation),
    ReverseNested(ReverseNestedAggregation),
    Metric(MetricAggregation),
    BucketSelector(BucketSelectorPipeline),
    BucketSort(BucketSortPipeline),
    SerialDiff(SerialDiffPipeline),
    MovingFunction(MovingFunctionPipeline),
    MaxBucket(MaxBucketPipeline),
);

/// Bucket ordering entry, e.g. `{"_count": "desc"}`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BucketOrder {
    pub key: String,
    #[serde(default)]
    pub direction: Direction,
}

impl BucketOrder {
    pub fn new(key: impl Into<String>, direction: Direction) -> Self {
        Self {
            key: key.into(),
            direction,
        }
    }

    pub fn count_desc() -> Self {
        Self::new("_count", Direction::Desc)
    }

    pub fn key_asc() -> Self {
        Self::new("_key", Direction::Asc)
    }
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TermsAggregation {
    pub name: String,
    pub field: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub size: Option<u32>,
    #[serde(default)]
    pub order: Vec<BucketOrder>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub min_doc_count: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub include: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub exclude: Option<Value>,
    #[serde(default)]
    pub aggregations: Vec<AggregationNode>,
}

impl TermsAggregation {
    pub fn new(name: impl Into<String>, field: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            field: field.into(),
            ..Default::default()
        }
    }

    pub fn size(mut self, size: u32) -> Self {
        self.size = Some(size);
        self
    }

    pub fn order(mut self, order: BucketOrder) -> Self {
        self.order.push(order);
        self
    }

    pub fn child(mut self, aggregation: impl Into<AggregationNode>) -> Self {
        self.aggregations.push(aggregation.into());
        self
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExtendedBounds {
    pub min: f64,
    pub max: f64,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HistogramAggregation {
    pub name: String,
    pub field: String,
    pub interval: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub min_doc_count: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub extended_bounds: Option<ExtendedBounds>,
    #[serde(default)]
    pub aggregations: Vec<AggregationNode>,
}

impl HistogramAggregation {
    pub fn new(name: impl Into<String>, field: impl Into<String>, interval: f64) -> Self {
        Self {
            name: name.into(),
            field: field.into(),
            interval,
            ..Default::default()
        }
    }
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DateHistogramAggregation {
    pub name: String,
    pub field: String,
    pub calendar_interval: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub format: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub min_doc_count: Option<u64>,
    #[serde(default)]
    pub aggregations: Vec<AggregationNode>,
}

impl DateHistogramAggregation {
    pub fn new(
        name: impl Into<String>,
        field: impl Into<String>,
        calendar_interval: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            field: field.into(),
            calendar_interval: calendar_interval.into(),
            ..Default::default()
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FilterAggregation {
    pub name: String,
    pub query: QueryNode,
    #[serde(default)]
    pub aggregations: Vec<AggregationNode>,
}

impl FilterAggregation {
    pub fn new(name: impl Into<String>, query: impl Into<QueryNode>) -> Self {
        Self {
            name: name.into(),
            query: query.into(),
            aggregations: Vec::new(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NamedFilter {
    pub key: String,
    pub query: QueryNode,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FiltersAggregation {
    pub name: String,
    pub filters: Vec<NamedFilter>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub other_bucket_key: Option<String>,
    #[serde(default)]
    pub aggregations: Vec<AggregationNode>,
}

impl FiltersAggregation {
    pub fn new(name: impl Into<String>, filters: Vec<NamedFilter>) -> Self {
        Self {
            name: name.into(),
            filters,
            other_bucket_key: None,
            aggregations: Vec::new(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NestedAggregation {
    pub name: String,
    pub path: String,
    #[serde(default)]
    pub aggregations: Vec<AggregationNode>,
}

impl NestedAggregation {
    pub fn new(name: impl Into<String>, path: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            path: path.into(),
            aggregations: Vec::new(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReverseNestedAggregation {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub path: Option<String>,
    #[serde(default)]
    pub aggregations: Vec<AggregationNode>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MetricType {
    Min,
    Max,
    Avg,
    Sum,
    Stats,
    Cardinality,
    ValueCount,
}

impl MetricType {
    pub fn as_str(&self) -> &'static str {
        match self {
            MetricType::Min => "min",
            MetricType::Max => "max",
            MetricType::Avg => "avg",
            MetricType::Sum => "sum",
            MetricType::Stats => "stats",
            MetricType::Cardinality => "cardinality",
            MetricType::ValueCount => "value_count",
        }
    }
}

/// Single metric over a field or a script
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MetricAggregation {
    pub name: String,
    pub metric: MetricType,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub field: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub script: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub missing: Option<Value>,
}

impl MetricAggregation {
    pub fn field(name: impl Into<String>, metric: MetricType, field: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            metric,
            field: Some(field.into()),
            script: None,
            missing: None,
        }
    }

    pub fn script(name: impl Into<String>, metric: MetricType, script: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            metric,
            field: None,
            script: Some(script.into()),
            missing: None,
        }
    }
}

/// Policy applied when a referenced bucket has no value
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GapPolicy {
    #[default]
    Skip,
    InsertZeros,
    KeepValues,
}

impl GapPolicy {
    pub fn as_str(&self) -> &'static str {
        match self {
            GapPolicy::Skip => "skip",
            GapPolicy::InsertZeros => "insert_zeros",
            GapPolicy::KeepValues => "keep_values",
        }
    }
}

/// Script variables bound to sibling paths, kept in declaration order
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct BucketsPath(Vec<(String, String)>);

impl BucketsPath {
    pub fn new() -> Self {
        Self::default()
    }

    /// Bind `variable` to `path`, replacing an earlier binding in place
    pub fn insert(&mut self, variable: impl Into<String>, path: impl Into<String>) {
        let (variable, path) = (variable.into(), path.into());
        match self.0.iter_mut().find(|(v, _)| *v == variable) {
            Some(entry) => entry.1 = path,
            None => self.0.push((variable, path)),
        }
    }

    pub fn with(mut self, variable: impl Into<String>, path: impl Into<String>) -> Self {
        self.insert(variable, path);
        self
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.0.iter().map(|(v, p)| (v.as_str(), p.as_str()))
    }

    pub fn paths(&self) -> impl Iterator<Item = &str> {
        self.0.iter().map(|(_, p)| p.as_str())
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl<V: Into<String>, P: Into<String>> FromIterator<(V, P)> for BucketsPath {
    fn from_iter<I: IntoIterator<Item = (V, P)>>(iter: I) -> Self {
        let mut buckets_path = BucketsPath::new();
        for (variable, path) in iter {
            buckets_path.insert(variable, path);
        }
        buckets_path
    }
}

impl Serialize for BucketsPath {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.0.len()))?;
        for (variable, path) in &self.0 {
            map.serialize_entry(variable, path)?;
        }
        map.end()
    }
}

impl<'de> Deserialize<'de> for BucketsPath {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        struct BucketsPathVisitor;

        impl<'de> Visitor<'de> for BucketsPathVisitor {
            type Value = BucketsPath;

            fn expecting(&self, f: &mut fmt::Formatter) -> fmt::Result {
                f.write_str("a map of script variables to bucket paths")
            }

            fn visit_map<A: MapAccess<'de>>(self, mut access: A) -> std::result::Result<BucketsPath, A::Error> {
                let mut entries: Vec<(String, String)> = Vec::new();
                while let Some((variable, path)) = access.next_entry::<String, String>()? {
                    if entries.iter().any(|(v, _)| *v == variable) {
                        return Err(serde::de::Error::custom(format!(
                            "duplicate bucket path variable '{variable}'"
                        )));
                    }
                    entries.push((variable, path));
                }
                Ok(BucketsPath(entries))
            }
        }

        deserializer.deserialize_map(BucketsPathVisitor)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BucketSelectorPipeline {
    pub name: String,
    pub buckets_path: BucketsPath,
    pub script: String,
    #[serde(default)]
    pub gap_policy: GapPolicy,
}

impl BucketSelectorPipeline {
    pub fn new(
        name: impl Into<String>,
        buckets_path: BucketsPath,
        script: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            buckets_path,
            script: script.into(),
            gap_policy: GapPolicy::default(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BucketSortPipeline {
    pub name: String,
    #[serde(default)]
    pub sort: Vec<BucketOrder>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub from: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub size: Option<u32>,
    #[serde(default)]
    pub gap_policy: GapPolicy,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SerialDiffPipeline {
    pub name: String,
    pub buckets_path: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub lag: Option<u32>,
    #[serde(default)]
    pub gap_policy: GapPolicy,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MovingFunctionPipeline {
    pub name: String,
    pub buckets_path: String,
    pub window: u32,
    pub script: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub shift: Option<i32>,
    #[serde(default)]
    pub gap_policy: GapPolicy,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MaxBucketPipeline {
    pub name: String,
    pub buckets_path: String,
    #[serde(default)]
    pub gap_policy: GapPolicy,
}

/// First segment of a bucket path: the sibling aggregation it names.
///
/// `coverage._count` → `coverage`, `sales>avg_price` → `sales`,
/// `colors['black']>_count` → `colors`.
pub fn path_root(path: &str) -> &str {
    let end = path.find(['>', '.', '[']).unwrap_or(path.len());
    &path[..end]
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_path_root() {
        assert_eq!(path_root("coverage._count"), "coverage");
        assert_eq!(path_root("sales>avg_price"), "sales");
        assert_eq!(path_root("colors['black']>_count"), "colors");
        assert_eq!(path_root("_count"), "_count");
        assert_eq!(path_root("total"), "total");
    }

    #[test]
    fn test_pipeline_classification() {
        assert!(AggregationType::BucketSelector.is_pipeline());
        assert!(AggregationType::MaxBucket.is_pipeline());
        assert!(!AggregationType::Terms.is_pipeline());
        assert!(!AggregationType::Metric.is_pipeline());
    }

    #[test]
    fn test_decode_bucket_selector() {
        let node = AggregationNode::from_value(json!({
            "type": "bucketSelector",
            "name": "keep",
            "bucketsPath": {"covered": "coverage._count", "total": "_count"},
            "script": "params.covered > 0"
        }))
        .unwrap();
        assert_eq!(node.aggregation_type(), AggregationType::BucketSelector);
        assert_eq!(node.referenced_paths(), vec!["coverage._count", "_count"]);
        let AggregationNode::BucketSelector(p) = node else {
            panic!("expected bucket selector");
        };
        assert_eq!(p.gap_policy, GapPolicy::Skip);
    }

    #[test]
    fn test_buckets_path_keeps_declared_order() {
        let p: BucketSelectorPipeline = serde_json::from_value(json!({
            "name": "keep",
            "bucketsPath": {"total": "_count", "covered": "coverage._count"},
            "script": "params.covered > 0"
        }))
        .unwrap();
        let variables: Vec<&str> = p.buckets_path.iter().map(|(v, _)| v).collect();
        assert_eq!(variables, vec!["total", "covered"]);

        let duplicate = serde_json::from_str::<BucketsPath>(r#"{"a": "x", "a": "y"}"#);
        assert!(duplicate.is_err());
    }

    #[test]
    fn test_unknown_aggregation_tag() {
        let err = AggregationNode::from_value(json!({"type": "geohash", "name": "g"})).unwrap_err();
        assert!(matches!(err, Error::InvalidVariantTag { kind: "aggregation", .. }));
    }

    #[test]
    fn test_children_of_metric_are_empty() {
        let metric: AggregationNode = MetricAggregation::field("avg", MetricType::Avg, "size").into();
        assert!(metric.children().is_empty());
        let terms: AggregationNode = TermsAggregation::new("color", "color").child(metric).into();
        assert_eq!(terms.children().len(), 1);
    }
}

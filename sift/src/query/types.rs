//! Search request query model
//!
//! A closed set of typed query nodes. Every node lowers to exactly one
//! Elasticsearch query clause through [`super::QueryAssembler`].

use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;
use std::str::FromStr;

/// Relevance multiplier of a clause, `1.0` unless set
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Boost(pub f32);

impl Default for Boost {
    fn default() -> Self {
        Boost(1.0)
    }
}

impl Boost {
    pub fn is_default(&self) -> bool {
        (self.0 - 1.0).abs() < f32::EPSILON
    }

    pub fn value(self) -> f32 {
        self.0
    }
}

/// Query node, discriminated by its `type` tag
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum QueryNode {
    /// Boolean composition (must, should, must_not, filter)
    Bool(BoolQuery),

    /// Query on a nested document path
    Nested(NestedQuery),

    /// Negation of a single clause
    Not(NotQuery),

    /// Field has a value
    Exists(ExistsQuery),

    /// Field has no value
    Missing(MissingQuery),

    /// Exact value match (not analyzed)
    Term(TermQuery),

    /// Any of several exact values
    Terms(TermsQuery),

    /// Range over a field
    Range(RangeQuery),

    /// Analyzed full-text match on one field
    Match(MatchQuery),

    /// Phrase prefix match (autocomplete)
    MatchPhrasePrefix(MatchPhrasePrefixQuery),

    /// Full-text match across weighted fields
    MultiMatch(MultiMatchQuery),

    /// Common terms query using a cutoff frequency
    Common(CommonQuery),

    /// Edit-distance term match
    Fuzzy(FuzzyQuery),

    /// Rescoring wrapper
    FunctionScore(FunctionScoreQuery),
}

/// Tag of a [`QueryNode`] variant
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum QueryType {
    Bool,
    Nested,
    Not,
    Exists,
    Missing,
    Term,
    Terms,
    Range,
    Match,
    MatchPhrasePrefix,
    MultiMatch,
    Common,
    Fuzzy,
    FunctionScore,
}

impl QueryType {
    pub const ALL: [QueryType; 14] = [
        QueryType::Bool,
        QueryType::Nested,
        QueryType::Not,
        QueryType::Exists,
        QueryType::Missing,
        QueryType::Term,
        QueryType::Terms,
        QueryType::Range,
        QueryType::Match,
        QueryType::MatchPhrasePrefix,
        QueryType::MultiMatch,
        QueryType::Common,
        QueryType::Fuzzy,
        QueryType::FunctionScore,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            QueryType::Bool => "bool",
            QueryType::Nested => "nested",
            QueryType::Not => "not",
            QueryType::Exists => "exists",
            QueryType::Missing => "missing",
            QueryType::Term => "term",
            QueryType::Terms => "terms",
            QueryType::Range => "range",
            QueryType::Match => "match",
            QueryType::MatchPhrasePrefix => "matchPhrasePrefix",
            QueryType::MultiMatch => "multiMatch",
            QueryType::Common => "common",
            QueryType::Fuzzy => "fuzzy",
            QueryType::FunctionScore => "functionScore",
        }
    }
}

impl fmt::Display for QueryType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for QueryType {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        QueryType::ALL
            .into_iter()
            .find(|t| t.as_str() == s)
            .ok_or_else(|| Error::InvalidVariantTag {
                kind: "query",
                found: s.to_string(),
                reason: "unknown query type".to_string(),
            })
    }
}

impl QueryNode {
    pub fn query_type(&self) -> QueryType {
        match self {
            QueryNode::Bool(_) => QueryType::Bool,
            QueryNode::Nested(_) => QueryType::Nested,
            QueryNode::Not(_) => QueryType::Not,
            QueryNode::Exists(_) => QueryType::Exists,
            QueryNode::Missing(_) => QueryType::Missing,
            QueryNode::Term(_) => QueryType::Term,
            QueryNode::Terms(_) => QueryType::Terms,
            QueryNode::Range(_) => QueryType::Range,
            QueryNode::Match(_) => QueryType::Match,
            QueryNode::MatchPhrasePrefix(_) => QueryType::MatchPhrasePrefix,
            QueryNode::MultiMatch(_) => QueryType::MultiMatch,
            QueryNode::Common(_) => QueryType::Common,
            QueryNode::Fuzzy(_) => QueryType::Fuzzy,
            QueryNode::FunctionScore(_) => QueryType::FunctionScore,
        }
    }

    /// Clause label reported back by the engine in `matched_queries`
    pub fn name(&self) -> Option<&str> {
        let name = match self {
            QueryNode::Bool(q) => &q.name,
            QueryNode::Nested(q) => &q.name,
            QueryNode::Not(q) => &q.name,
            QueryNode::Exists(q) => &q.name,
            QueryNode::Missing(q) => &q.name,
            QueryNode::Term(q) => &q.name,
            QueryNode::Terms(q) => &q.name,
            QueryNode::Range(q) => &q.name,
            QueryNode::Match(q) => &q.name,
            QueryNode::MatchPhrasePrefix(q) => &q.name,
            QueryNode::MultiMatch(q) => &q.name,
            QueryNode::Common(q) => &q.name,
            QueryNode::Fuzzy(q) => &q.name,
            QueryNode::FunctionScore(q) => &q.name,
        };
        name.as_deref()
    }

    /// Decode a node from its wire form, checking the `type` tag first.
    ///
    /// Unknown tags and bodies that do not fit the tagged variant both fail
    /// with [`Error::InvalidVariantTag`].
    pub fn from_value(value: Value) -> Result<Self> {
        let tag = value
            .get("type")
            .and_then(Value::as_str)
            .ok_or_else(|| Error::InvalidVariantTag {
                kind: "query",
                found: String::new(),
                reason: "missing 'type' tag".to_string(),
            })?
            .to_string();
        tag.parse::<QueryType>()?;
        serde_json::from_value(value).map_err(|e| Error::InvalidVariantTag {
            kind: "query",
            found: tag,
            reason: e.to_string(),
        })
    }

    /// An empty bool query, matching every document
    pub fn match_all() -> Self {
        QueryNode::Bool(BoolQuery::new())
    }
}

macro_rules! query_variant {
    ($($variant:ident($ty:ty)),* $(,)?) => {
        $(
            impl From<$ty> for QueryNode {
                fn from(q: $ty) -> Self {
                    QueryNode::$variant(q)
                }
            }

            impl $ty {
                /// Label the clause in the engine response
                pub fn named(mut self, name: impl Into<String>) -> Self {
                    self.name = Some(name.into());
                    self
                }

                pub fn boosted(mut self, boost: f32) -> Self {
                    self.boost = Boost(boost);
                    self
                }
            }
        )*
    };
}

query_variant!(
    Bool(BoolQuery),
    Nested(NestedQuery),
    Not(NotQuery),
    Exists(ExistsQuery),
    Missing(MissingQuery),
    Term(TermQuery),
    Terms(TermsQuery),
    Range(RangeQuery),
    Match(MatchQuery),
    MatchPhrasePrefix(MatchPhrasePrefixQuery),
    MultiMatch(MultiMatchQuery),
    Common(CommonQuery),
    Fuzzy(FuzzyQuery),
    FunctionScore(FunctionScoreQuery),
);

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum MinimumShouldMatch {
    Count(i32),
    Expression(String),
}

impl MinimumShouldMatch {
    pub fn to_value(&self) -> Value {
        match self {
            MinimumShouldMatch::Count(n) => Value::from(*n),
            MinimumShouldMatch::Expression(s) => Value::from(s.clone()),
        }
    }
}

impl From<i32> for MinimumShouldMatch {
    fn from(n: i32) -> Self {
        MinimumShouldMatch::Count(n)
    }
}

impl From<&str> for MinimumShouldMatch {
    fn from(s: &str) -> Self {
        MinimumShouldMatch::Expression(s.to_string())
    }
}

/// Fuzziness of a match: `AUTO` or a fixed number of edits (0, 1 or 2)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "FuzzinessRepr", into = "FuzzinessRepr")]
pub enum Fuzziness {
    Auto,
    Edits(u8),
}

#[derive(Serialize, Deserialize)]
#[serde(untagged)]
enum FuzzinessRepr {
    Edits(u8),
    Text(String),
}

impl TryFrom<FuzzinessRepr> for Fuzziness {
    type Error = String;

    fn try_from(repr: FuzzinessRepr) -> std::result::Result<Self, String> {
        let fuzziness = match repr {
            FuzzinessRepr::Edits(n) => Fuzziness::Edits(n),
            FuzzinessRepr::Text(s) if s.eq_ignore_ascii_case("auto") => Fuzziness::Auto,
            FuzzinessRepr::Text(s) => Fuzziness::Edits(
                s.trim()
                    .parse()
                    .map_err(|_| format!("invalid fuzziness '{}'", s))?,
            ),
        };
        match fuzziness {
            Fuzziness::Edits(n) if n > 2 => Err(format!("fuzziness must be 0, 1 or 2 (got {})", n)),
            f => Ok(f),
        }
    }
}

impl From<Fuzziness> for FuzzinessRepr {
    fn from(f: Fuzziness) -> Self {
        match f {
            Fuzziness::Auto => FuzzinessRepr::Text("AUTO".to_string()),
            Fuzziness::Edits(n) => FuzzinessRepr::Edits(n),
        }
    }
}

impl Fuzziness {
    pub fn to_value(self) -> Value {
        match self {
            Fuzziness::Auto => Value::from("AUTO"),
            Fuzziness::Edits(n) => Value::from(n),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Operator {
    And,
    Or,
}

impl Operator {
    pub fn as_str(&self) -> &'static str {
        match self {
            Operator::And => "and",
            Operator::Or => "or",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BoolQuery {
    #[serde(default)]
    pub must: Vec<QueryNode>,
    #[serde(default)]
    pub should: Vec<QueryNode>,
    #[serde(default)]
    pub must_not: Vec<QueryNode>,
    #[serde(default)]
    pub filter: Vec<QueryNode>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub minimum_should_match: Option<MinimumShouldMatch>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Boost::is_default")]
    pub boost: Boost,
}

impl BoolQuery {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn must(mut self, query: impl Into<QueryNode>) -> Self {
        self.must.push(query.into());
        self
    }

    pub fn should(mut self, query: impl Into<QueryNode>) -> Self {
        self.should.push(query.into());
        self
    }

    pub fn must_not(mut self, query: impl Into<QueryNode>) -> Self {
        self.must_not.push(query.into());
        self
    }

    pub fn filter(mut self, query: impl Into<QueryNode>) -> Self {
        self.filter.push(query.into());
        self
    }

    pub fn minimum_should_match(mut self, msm: impl Into<MinimumShouldMatch>) -> Self {
        self.minimum_should_match = Some(msm.into());
        self
    }

    pub fn is_empty(&self) -> bool {
        self.must.is_empty()
            && self.should.is_empty()
            && self.must_not.is_empty()
            && self.filter.is_empty()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NestedScoreMode {
    Avg,
    Sum,
    Min,
    Max,
    None,
}

impl NestedScoreMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            NestedScoreMode::Avg => "avg",
            NestedScoreMode::Sum => "sum",
            NestedScoreMode::Min => "min",
            NestedScoreMode::Max => "max",
            NestedScoreMode::None => "none",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NestedQuery {
    pub path: String,
    pub query: Box<QueryNode>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub score_mode: Option<NestedScoreMode>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Boost::is_default")]
    pub boost: Boost,
}

impl NestedQuery {
    pub fn new(path: impl Into<String>, query: impl Into<QueryNode>) -> Self {
        Self {
            path: path.into(),
            query: Box::new(query.into()),
            score_mode: None,
            name: None,
            boost: Boost::default(),
        }
    }

    pub fn score_mode(mut self, mode: NestedScoreMode) -> Self {
        self.score_mode = Some(mode);
        self
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NotQuery {
    pub query: Box<QueryNode>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Boost::is_default")]
    pub boost: Boost,
}

impl NotQuery {
    pub fn new(query: impl Into<QueryNode>) -> Self {
        Self {
            query: Box::new(query.into()),
            name: None,
            boost: Boost::default(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExistsQuery {
    pub field: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Boost::is_default")]
    pub boost: Boost,
}

impl ExistsQuery {
    pub fn new(field: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            name: None,
            boost: Boost::default(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MissingQuery {
    pub field: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Boost::is_default")]
    pub boost: Boost,
}

impl MissingQuery {
    pub fn new(field: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            name: None,
            boost: Boost::default(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TermQuery {
    pub field: String,
    pub value: Value,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Boost::is_default")]
    pub boost: Boost,
}

impl TermQuery {
    pub fn new(field: impl Into<String>, value: impl Into<Value>) -> Self {
        Self {
            field: field.into(),
            value: value.into(),
            name: None,
            boost: Boost::default(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TermsQuery {
    pub field: String,
    pub values: Vec<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Boost::is_default")]
    pub boost: Boost,
}

impl TermsQuery {
    pub fn new(field: impl Into<String>, values: Vec<Value>) -> Self {
        Self {
            field: field.into(),
            values,
            name: None,
            boost: Boost::default(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RangeQuery {
    pub field: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub gt: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub gte: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub lt: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub lte: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub format: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Boost::is_default")]
    pub boost: Boost,
}

impl RangeQuery {
    pub fn new(field: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            ..Default::default()
        }
    }

    pub fn gte(mut self, value: impl Into<Value>) -> Self {
        self.gte = Some(value.into());
        self
    }

    pub fn gt(mut self, value: impl Into<Value>) -> Self {
        self.gt = Some(value.into());
        self
    }

    pub fn lte(mut self, value: impl Into<Value>) -> Self {
        self.lte = Some(value.into());
        self
    }

    pub fn lt(mut self, value: impl Into<Value>) -> Self {
        self.lt = Some(value.into());
        self
    }
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MatchQuery {
    pub field: String,
    pub text: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub operator: Option<Operator>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub minimum_should_match: Option<MinimumShouldMatch>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fuzziness: Option<Fuzziness>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub prefix_length: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_expansions: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cutoff_frequency: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub analyzer: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Boost::is_default")]
    pub boost: Boost,
}

impl MatchQuery {
    pub fn new(field: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            text: text.into(),
            ..Default::default()
        }
    }
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MatchPhrasePrefixQuery {
    pub field: String,
    pub text: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_expansions: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub slop: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Boost::is_default")]
    pub boost: Boost,
}

impl MatchPhrasePrefixQuery {
    pub fn new(field: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            text: text.into(),
            ..Default::default()
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MultiMatchType {
    #[default]
    BestFields,
    MostFields,
    CrossFields,
    Phrase,
    PhrasePrefix,
}

impl MultiMatchType {
    pub fn as_str(&self) -> &'static str {
        match self {
            MultiMatchType::BestFields => "best_fields",
            MultiMatchType::MostFields => "most_fields",
            MultiMatchType::CrossFields => "cross_fields",
            MultiMatchType::Phrase => "phrase",
            MultiMatchType::PhrasePrefix => "phrase_prefix",
        }
    }
}

fn default_weight() -> f32 {
    1.0
}

/// Field with its relevance weight, emitted as `field^weight`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WeightedField {
    pub field: String,
    #[serde(default = "default_weight")]
    pub weight: f32,
}

impl WeightedField {
    pub fn new(field: impl Into<String>, weight: f32) -> Self {
        Self {
            field: field.into(),
            weight,
        }
    }

    pub fn to_dsl(&self) -> String {
        if (self.weight - 1.0).abs() < f32::EPSILON {
            self.field.clone()
        } else {
            format!("{}^{}", self.field, self.weight)
        }
    }
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MultiMatchQuery {
    pub text: String,
    pub fields: Vec<WeightedField>,
    #[serde(default)]
    pub match_type: MultiMatchType,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub operator: Option<Operator>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub minimum_should_match: Option<MinimumShouldMatch>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tie_breaker: Option<f32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fuzziness: Option<Fuzziness>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub prefix_length: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_expansions: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cutoff_frequency: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub analyzer: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Boost::is_default")]
    pub boost: Boost,
}

impl MultiMatchQuery {
    pub fn new(text: impl Into<String>, fields: Vec<WeightedField>) -> Self {
        Self {
            text: text.into(),
            fields,
            ..Default::default()
        }
    }

    pub fn match_type(mut self, match_type: MultiMatchType) -> Self {
        self.match_type = match_type;
        self
    }
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CommonQuery {
    pub field: String,
    pub text: String,
    pub cutoff_frequency: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub minimum_should_match: Option<MinimumShouldMatch>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub low_freq_operator: Option<Operator>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub analyzer: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Boost::is_default")]
    pub boost: Boost,
}

impl CommonQuery {
    pub fn new(field: impl Into<String>, text: impl Into<String>, cutoff_frequency: f64) -> Self {
        Self {
            field: field.into(),
            text: text.into(),
            cutoff_frequency,
            ..Default::default()
        }
    }
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FuzzyQuery {
    pub field: String,
    pub value: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fuzziness: Option<Fuzziness>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub prefix_length: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_expansions: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub transpositions: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Boost::is_default")]
    pub boost: Boost,
}

impl FuzzyQuery {
    pub fn new(field: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            value: value.into(),
            ..Default::default()
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FunctionScoreMode {
    Multiply,
    Sum,
    Avg,
    First,
    Max,
    Min,
}

impl FunctionScoreMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            FunctionScoreMode::Multiply => "multiply",
            FunctionScoreMode::Sum => "sum",
            FunctionScoreMode::Avg => "avg",
            FunctionScoreMode::First => "first",
            FunctionScoreMode::Max => "max",
            FunctionScoreMode::Min => "min",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BoostMode {
    Multiply,
    Replace,
    Sum,
    Avg,
    Max,
    Min,
}

impl BoostMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            BoostMode::Multiply => "multiply",
            BoostMode::Replace => "replace",
            BoostMode::Sum => "sum",
            BoostMode::Avg => "avg",
            BoostMode::Max => "max",
            BoostMode::Min => "min",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FieldValueModifier {
    None,
    Log,
    Log1p,
    Log2p,
    Ln,
    Ln1p,
    Ln2p,
    Square,
    Sqrt,
    Reciprocal,
}

impl FieldValueModifier {
    pub fn as_str(&self) -> &'static str {
        match self {
            FieldValueModifier::None => "none",
            FieldValueModifier::Log => "log",
            FieldValueModifier::Log1p => "log1p",
            FieldValueModifier::Log2p => "log2p",
            FieldValueModifier::Ln => "ln",
            FieldValueModifier::Ln1p => "ln1p",
            FieldValueModifier::Ln2p => "ln2p",
            FieldValueModifier::Square => "square",
            FieldValueModifier::Sqrt => "sqrt",
            FieldValueModifier::Reciprocal => "reciprocal",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "function", rename_all = "camelCase")]
pub enum ScoreFunction {
    FieldValueFactor {
        field: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        factor: Option<f32>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        modifier: Option<FieldValueModifier>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        missing: Option<f64>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        filter: Option<Box<QueryNode>>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        weight: Option<f32>,
    },
    Weight {
        weight: f32,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        filter: Option<Box<QueryNode>>,
    },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FunctionScoreQuery {
    pub query: Box<QueryNode>,
    #[serde(default)]
    pub functions: Vec<ScoreFunction>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub score_mode: Option<FunctionScoreMode>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub boost_mode: Option<BoostMode>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Boost::is_default")]
    pub boost: Boost,
}

impl FunctionScoreQuery {
    pub fn new(query: impl Into<QueryNode>, functions: Vec<ScoreFunction>) -> Self {
        Self {
            query: Box::new(query.into()),
            functions,
            score_mode: None,
            boost_mode: None,
            name: None,
            boost: Boost::default(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_query_type_round_trips_through_tag() {
        for t in QueryType::ALL {
            assert_eq!(t.as_str().parse::<QueryType>().unwrap(), t);
        }
    }

    #[test]
    fn test_unknown_tag_is_rejected() {
        let err = QueryNode::from_value(json!({"type": "wildcard", "field": "sku"})).unwrap_err();
        match err {
            Error::InvalidVariantTag { kind, found, .. } => {
                assert_eq!(kind, "query");
                assert_eq!(found, "wildcard");
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_body_not_matching_tag_is_rejected() {
        // a term node without a value
        let err = QueryNode::from_value(json!({"type": "term", "field": "sku"})).unwrap_err();
        assert!(matches!(err, Error::InvalidVariantTag { ref found, .. } if found == "term"));
    }

    #[test]
    fn test_missing_tag_is_rejected() {
        let err = QueryNode::from_value(json!({"field": "sku"})).unwrap_err();
        assert!(matches!(err, Error::InvalidVariantTag { .. }));
    }

    #[test]
    fn test_decode_nested_tree() {
        let node = QueryNode::from_value(json!({
            "type": "bool",
            "must": [{"type": "match", "field": "name", "text": "bag"}],
            "filter": [{"type": "nested", "path": "price", "query": {"type": "range", "field": "price.price", "gte": 10}}]
        }))
        .unwrap();
        let QueryNode::Bool(b) = node else {
            panic!("expected bool");
        };
        assert_eq!(b.must[0].query_type(), QueryType::Match);
        assert_eq!(b.filter[0].query_type(), QueryType::Nested);
        assert!(b.boost.is_default());
    }

    #[test]
    fn test_wire_form_omits_unset_fields() {
        let node: QueryNode = TermQuery::new("sku", "24-MB01").into();
        assert_eq!(
            serde_json::to_value(&node).unwrap(),
            json!({"type": "term", "field": "sku", "value": "24-MB01"})
        );

        let mut multi = MultiMatchQuery::new("bag", vec![WeightedField::new("name", 2.0)]);
        multi.tie_breaker = Some(0.5);
        let wire = serde_json::to_value(QueryNode::from(multi)).unwrap();
        assert!(wire.get("name").is_none());
        assert!(wire.get("operator").is_none());
        assert_eq!(wire["tieBreaker"], json!(0.5));
    }

    #[test]
    fn test_fuzziness_parsing() {
        let f: Fuzziness = serde_json::from_value(json!("auto")).unwrap();
        assert_eq!(f, Fuzziness::Auto);
        let f: Fuzziness = serde_json::from_value(json!(2)).unwrap();
        assert_eq!(f, Fuzziness::Edits(2));
        let f: Fuzziness = serde_json::from_value(json!("1")).unwrap();
        assert_eq!(f, Fuzziness::Edits(1));
        assert!(serde_json::from_value::<Fuzziness>(json!(3)).is_err());
        assert_eq!(serde_json::to_value(Fuzziness::Auto).unwrap(), json!("AUTO"));
    }

    #[test]
    fn test_weighted_field_dsl() {
        assert_eq!(WeightedField::new("name", 1.0).to_dsl(), "name");
        assert_eq!(WeightedField::new("name", 5.0).to_dsl(), "name^5");
        assert_eq!(WeightedField::new("sku", 2.5).to_dsl(), "sku^2.5");
    }

    #[test]
    fn test_named_and_boosted_builders() {
        let node: QueryNode = ExistsQuery::new("color").named("has_color").boosted(2.0).into();
        assert_eq!(node.name(), Some("has_color"));
        let QueryNode::Exists(q) = node else {
            panic!("expected exists");
        };
        assert_eq!(q.boost, Boost(2.0));
    }
}

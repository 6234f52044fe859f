//! Lowering of query nodes to Elasticsearch query DSL

use crate::error::{Error, Result};
use crate::query::types::*;
use serde_json::{json, Map, Number, Value};

/// Assembles [`QueryNode`] trees into engine query DSL
pub struct QueryAssembler;

impl QueryAssembler {
    /// Lower a query tree. Pure: the same tree always yields the same DSL.
    pub fn assemble(query: &QueryNode) -> Result<Value> {
        match query {
            QueryNode::Bool(q) => Self::assemble_bool(q),
            QueryNode::Nested(q) => Self::assemble_nested(q),
            QueryNode::Not(q) => Self::assemble_not(q),
            QueryNode::Exists(q) => Ok(Self::assemble_exists(q)),
            QueryNode::Missing(q) => Ok(Self::assemble_missing(q)),
            QueryNode::Term(q) => Ok(Self::assemble_term(q)),
            QueryNode::Terms(q) => Self::assemble_terms(q),
            QueryNode::Range(q) => Self::assemble_range(q),
            QueryNode::Match(q) => Ok(Self::assemble_match(q)),
            QueryNode::MatchPhrasePrefix(q) => Ok(Self::assemble_match_phrase_prefix(q)),
            QueryNode::MultiMatch(q) => Self::assemble_multi_match(q),
            QueryNode::Common(q) => Ok(Self::assemble_common(q)),
            QueryNode::Fuzzy(q) => Ok(Self::assemble_fuzzy(q)),
            QueryNode::FunctionScore(q) => Self::assemble_function_score(q),
        }
    }

    fn assemble_clauses(queries: &[QueryNode]) -> Result<Vec<Value>> {
        queries.iter().map(Self::assemble).collect()
    }

    fn assemble_bool(query: &BoolQuery) -> Result<Value> {
        let mut params = Map::new();

        for (key, clauses) in [
            ("must", &query.must),
            ("should", &query.should),
            ("must_not", &query.must_not),
            ("filter", &query.filter),
        ] {
            if !clauses.is_empty() {
                params.insert(key.to_string(), Value::Array(Self::assemble_clauses(clauses)?));
            }
        }

        if let Some(msm) = &query.minimum_should_match {
            params.insert("minimum_should_match".to_string(), msm.to_value());
        }
        with_common(&mut params, &query.name, query.boost);

        Ok(json!({ "bool": params }))
    }

    fn assemble_nested(query: &NestedQuery) -> Result<Value> {
        if query.path.is_empty() {
            return Err(Error::InvalidNode("nested query requires a path".to_string()));
        }

        let mut params = Map::new();
        params.insert("path".to_string(), Value::from(query.path.clone()));
        params.insert("query".to_string(), Self::assemble(&query.query)?);
        if let Some(mode) = query.score_mode {
            params.insert("score_mode".to_string(), Value::from(mode.as_str()));
        }
        with_common(&mut params, &query.name, query.boost);

        Ok(json!({ "nested": params }))
    }

    fn assemble_not(query: &NotQuery) -> Result<Value> {
        let mut params = Map::new();
        params.insert("must_not".to_string(), json!([Self::assemble(&query.query)?]));
        with_common(&mut params, &query.name, query.boost);

        Ok(json!({ "bool": params }))
    }

    fn assemble_exists(query: &ExistsQuery) -> Value {
        let mut params = Map::new();
        params.insert("field".to_string(), Value::from(query.field.clone()));
        with_common(&mut params, &query.name, query.boost);

        json!({ "exists": params })
    }

    fn assemble_missing(query: &MissingQuery) -> Value {
        let mut params = Map::new();
        params.insert(
            "must_not".to_string(),
            json!([{ "exists": { "field": query.field } }]),
        );
        with_common(&mut params, &query.name, query.boost);

        json!({ "bool": params })
    }

    fn assemble_term(query: &TermQuery) -> Value {
        let mut params = Map::new();
        params.insert("value".to_string(), query.value.clone());
        with_common(&mut params, &query.name, query.boost);

        json!({ "term": { query.field.clone(): params } })
    }

    fn assemble_terms(query: &TermsQuery) -> Result<Value> {
        if query.values.is_empty() {
            return Err(Error::InvalidNode(format!(
                "terms query on '{}' requires at least one value",
                query.field
            )));
        }

        let mut params = Map::new();
        params.insert(query.field.clone(), Value::Array(query.values.clone()));
        with_common(&mut params, &query.name, query.boost);

        Ok(json!({ "terms": params }))
    }

    fn assemble_range(query: &RangeQuery) -> Result<Value> {
        let mut params = Map::new();
        for (key, bound) in [
            ("gt", &query.gt),
            ("gte", &query.gte),
            ("lt", &query.lt),
            ("lte", &query.lte),
        ] {
            if let Some(v) = bound {
                params.insert(key.to_string(), v.clone());
            }
        }

        if params.is_empty() {
            return Err(Error::InvalidNode(format!(
                "range query on '{}' must have at least one bound",
                query.field
            )));
        }

        if let Some(format) = &query.format {
            params.insert("format".to_string(), Value::from(format.clone()));
        }
        with_common(&mut params, &query.name, query.boost);

        Ok(json!({ "range": { query.field.clone(): params } }))
    }

    fn assemble_match(query: &MatchQuery) -> Value {
        let mut params = Map::new();
        params.insert("query".to_string(), Value::from(query.text.clone()));
        if let Some(op) = query.operator {
            params.insert("operator".to_string(), Value::from(op.as_str()));
        }
        if let Some(msm) = &query.minimum_should_match {
            params.insert("minimum_should_match".to_string(), msm.to_value());
        }
        with_fuzziness(
            &mut params,
            query.fuzziness,
            query.prefix_length,
            query.max_expansions,
        );
        if let Some(cutoff) = query.cutoff_frequency {
            params.insert("cutoff_frequency".to_string(), Value::from(cutoff));
        }
        if let Some(analyzer) = &query.analyzer {
            params.insert("analyzer".to_string(), Value::from(analyzer.clone()));
        }
        with_common(&mut params, &query.name, query.boost);

        json!({ "match": { query.field.clone(): params } })
    }

    fn assemble_match_phrase_prefix(query: &MatchPhrasePrefixQuery) -> Value {
        let mut params = Map::new();
        params.insert("query".to_string(), Value::from(query.text.clone()));
        if let Some(max) = query.max_expansions {
            params.insert("max_expansions".to_string(), Value::from(max));
        }
        if let Some(slop) = query.slop {
            params.insert("slop".to_string(), Value::from(slop));
        }
        with_common(&mut params, &query.name, query.boost);

        json!({ "match_phrase_prefix": { query.field.clone(): params } })
    }

    fn assemble_multi_match(query: &MultiMatchQuery) -> Result<Value> {
        if query.fields.is_empty() {
            return Err(Error::InvalidNode(
                "multi_match query requires at least one field".to_string(),
            ));
        }

        let fields: Vec<Value> = query
            .fields
            .iter()
            .map(|f| Value::from(f.to_dsl()))
            .collect();

        let mut params = Map::new();
        params.insert("query".to_string(), Value::from(query.text.clone()));
        params.insert("fields".to_string(), Value::Array(fields));
        params.insert("type".to_string(), Value::from(query.match_type.as_str()));
        if let Some(op) = query.operator {
            params.insert("operator".to_string(), Value::from(op.as_str()));
        }
        if let Some(msm) = &query.minimum_should_match {
            params.insert("minimum_should_match".to_string(), msm.to_value());
        }
        if let Some(tie) = query.tie_breaker {
            params.insert("tie_breaker".to_string(), float(tie));
        }
        with_fuzziness(
            &mut params,
            query.fuzziness,
            query.prefix_length,
            query.max_expansions,
        );
        if let Some(cutoff) = query.cutoff_frequency {
            params.insert("cutoff_frequency".to_string(), Value::from(cutoff));
        }
        if let Some(analyzer) = &query.analyzer {
            params.insert("analyzer".to_string(), Value::from(analyzer.clone()));
        }
        with_common(&mut params, &query.name, query.boost);

        Ok(json!({ "multi_match": params }))
    }

    fn assemble_common(query: &CommonQuery) -> Value {
        let mut params = Map::new();
        params.insert("query".to_string(), Value::from(query.text.clone()));
        params.insert(
            "cutoff_frequency".to_string(),
            Value::from(query.cutoff_frequency),
        );
        if let Some(msm) = &query.minimum_should_match {
            params.insert("minimum_should_match".to_string(), msm.to_value());
        }
        if let Some(op) = query.low_freq_operator {
            params.insert("low_freq_operator".to_string(), Value::from(op.as_str()));
        }
        if let Some(analyzer) = &query.analyzer {
            params.insert("analyzer".to_string(), Value::from(analyzer.clone()));
        }
        with_common(&mut params, &query.name, query.boost);

        json!({ "common": { query.field.clone(): params } })
    }

    fn assemble_fuzzy(query: &FuzzyQuery) -> Value {
        let mut params = Map::new();
        params.insert("value".to_string(), Value::from(query.value.clone()));
        with_fuzziness(
            &mut params,
            query.fuzziness,
            query.prefix_length,
            query.max_expansions,
        );
        if let Some(transpositions) = query.transpositions {
            params.insert("transpositions".to_string(), Value::from(transpositions));
        }
        with_common(&mut params, &query.name, query.boost);

        json!({ "fuzzy": { query.field.clone(): params } })
    }

    fn assemble_function_score(query: &FunctionScoreQuery) -> Result<Value> {
        let mut params = Map::new();
        params.insert("query".to_string(), Self::assemble(&query.query)?);

        if !query.functions.is_empty() {
            let functions = query
                .functions
                .iter()
                .map(Self::assemble_score_function)
                .collect::<Result<Vec<_>>>()?;
            params.insert("functions".to_string(), Value::Array(functions));
        }
        if let Some(mode) = query.score_mode {
            params.insert("score_mode".to_string(), Value::from(mode.as_str()));
        }
        if let Some(mode) = query.boost_mode {
            params.insert("boost_mode".to_string(), Value::from(mode.as_str()));
        }
        with_common(&mut params, &query.name, query.boost);

        Ok(json!({ "function_score": params }))
    }

    fn assemble_score_function(function: &ScoreFunction) -> Result<Value> {
        let mut out = Map::new();
        let (filter, weight) = match function {
            ScoreFunction::FieldValueFactor {
                field,
                factor,
                modifier,
                missing,
                filter,
                weight,
            } => {
                let mut fvf = Map::new();
                fvf.insert("field".to_string(), Value::from(field.clone()));
                if let Some(factor) = factor {
                    fvf.insert("factor".to_string(), float(*factor));
                }
                if let Some(modifier) = modifier {
                    fvf.insert("modifier".to_string(), Value::from(modifier.as_str()));
                }
                if let Some(missing) = missing {
                    fvf.insert("missing".to_string(), Value::from(*missing));
                }
                out.insert("field_value_factor".to_string(), Value::Object(fvf));
                (filter, *weight)
            }
            ScoreFunction::Weight { weight, filter } => (filter, Some(*weight)),
        };

        if let Some(filter) = filter {
            out.insert("filter".to_string(), Self::assemble(filter)?);
        }
        if let Some(weight) = weight {
            out.insert("weight".to_string(), float(weight));
        }
        Ok(Value::Object(out))
    }
}

/// An `f32` as the JSON number with the same shortest decimal form, so a
/// boost of 1.2 is emitted as 1.2 rather than its widened f64 value
fn float(value: f32) -> Value {
    value
        .to_string()
        .parse::<f64>()
        .ok()
        .and_then(Number::from_f64)
        .map_or_else(|| Value::from(f64::from(value)), Value::Number)
}

/// Attach `boost` and `_name` only when they carry information
fn with_common(params: &mut Map<String, Value>, name: &Option<String>, boost: Boost) {
    if !boost.is_default() {
        params.insert("boost".to_string(), float(boost.value()));
    }
    if let Some(name) = name.as_deref().filter(|n| !n.is_empty()) {
        params.insert("_name".to_string(), Value::from(name));
    }
}

fn with_fuzziness(
    params: &mut Map<String, Value>,
    fuzziness: Option<Fuzziness>,
    prefix_length: Option<u32>,
    max_expansions: Option<u32>,
) {
    if let Some(f) = fuzziness {
        params.insert("fuzziness".to_string(), f.to_value());
    }
    if let Some(p) = prefix_length {
        params.insert("prefix_length".to_string(), Value::from(p));
    }
    if let Some(m) = max_expansions {
        params.insert("max_expansions".to_string(), Value::from(m));
    }
}

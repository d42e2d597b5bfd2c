//! Typed query model for the document store.
//!
//! Requests are built as plain Rust values and rendered to the engine's JSON
//! query DSL at the boundary. Responses are parsed back into typed hits and
//! aggregation results, guided by the aggregations that were requested.

use std::collections::BTreeMap;

use serde::de::DeserializeOwned;
use serde_json::{json, Map, Value};

use crate::error::StoreError;

/// Sort direction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortOrder {
    Asc,
    Desc,
}

impl SortOrder {
    pub fn as_str(self) -> &'static str {
        match self {
            SortOrder::Asc => "asc",
            SortOrder::Desc => "desc",
        }
    }
}

/// Query clause.
#[derive(Debug, Clone, PartialEq)]
pub enum Query {
    MatchAll,
    /// Exact match on a keyword or numeric field.
    Term { field: String, value: Value },
    /// Exact match against any of several values.
    Terms { field: String, values: Vec<Value> },
    /// Full-text match across fields; `"title^3"` boosts a field.
    MultiMatch { query: String, fields: Vec<String> },
    /// Scoring `must` clauses combined with non-scoring `filter` clauses.
    Bool { must: Vec<Query>, filter: Vec<Query> },
}

impl Query {
    pub fn term(field: impl Into<String>, value: impl Into<Value>) -> Self {
        Query::Term {
            field: field.into(),
            value: value.into(),
        }
    }

    pub fn terms<V: Into<Value>>(field: impl Into<String>, values: impl IntoIterator<Item = V>) -> Self {
        Query::Terms {
            field: field.into(),
            values: values.into_iter().map(Into::into).collect(),
        }
    }

    pub fn multi_match<F: Into<String>>(
        query: impl Into<String>,
        fields: impl IntoIterator<Item = F>,
    ) -> Self {
        Query::MultiMatch {
            query: query.into(),
            fields: fields.into_iter().map(Into::into).collect(),
        }
    }

    pub fn to_json(&self) -> Value {
        match self {
            Query::MatchAll => json!({ "match_all": {} }),
            Query::Term { field, value } => json!({ "term": { field.as_str(): value } }),
            Query::Terms { field, values } => json!({ "terms": { field.as_str(): values } }),
            Query::MultiMatch { query, fields } => json!({
                "multi_match": { "query": query, "fields": fields }
            }),
            Query::Bool { must, filter } => json!({
                "bool": {
                    "must": must.iter().map(Query::to_json).collect::<Vec<_>>(),
                    "filter": filter.iter().map(Query::to_json).collect::<Vec<_>>(),
                }
            }),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Sort {
    pub field: String,
    pub order: SortOrder,
}

impl Sort {
    pub fn asc(field: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            order: SortOrder::Asc,
        }
    }

    pub fn desc(field: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            order: SortOrder::Desc,
        }
    }

    pub fn to_json(&self) -> Value {
        json!({ self.field.as_str(): { "order": self.order.as_str() } })
    }
}

/// Aggregation request.
#[derive(Debug, Clone, PartialEq)]
pub enum Aggregation {
    /// Mean of a numeric field; `None` when no document carries it.
    Avg { field: String },
    /// Bucket documents by a keyword field.
    Terms {
        field: String,
        size: usize,
        /// Order buckets by a named sub-aggregation instead of document count.
        order: Option<(String, SortOrder)>,
        aggs: BTreeMap<String, Aggregation>,
    },
}

impl Aggregation {
    pub fn avg(field: impl Into<String>) -> Self {
        Aggregation::Avg {
            field: field.into(),
        }
    }

    pub fn to_json(&self) -> Value {
        match self {
            Aggregation::Avg { field } => json!({ "avg": { "field": field } }),
            Aggregation::Terms {
                field,
                size,
                order,
                aggs,
            } => {
                let mut terms = json!({ "field": field, "size": size });
                if let Some((name, dir)) = order {
                    terms["order"] = json!({ name.as_str(): dir.as_str() });
                }
                let mut body = json!({ "terms": terms });
                if !aggs.is_empty() {
                    body["aggs"] = aggs_to_json(aggs);
                }
                body
            }
        }
    }
}

fn aggs_to_json(aggs: &BTreeMap<String, Aggregation>) -> Value {
    Value::Object(
        aggs.iter()
            .map(|(name, agg)| (name.clone(), agg.to_json()))
            .collect::<Map<_, _>>(),
    )
}

/// A search against one index.
#[derive(Debug, Clone, PartialEq)]
pub struct SearchRequest {
    pub query: Query,
    /// Empty means relevance order.
    pub sort: Vec<Sort>,
    pub aggs: BTreeMap<String, Aggregation>,
    pub from: usize,
    pub size: usize,
}

impl SearchRequest {
    pub fn new(query: Query) -> Self {
        Self {
            query,
            sort: Vec::new(),
            aggs: BTreeMap::new(),
            from: 0,
            size: 10,
        }
    }

    pub fn sort(mut self, sort: Sort) -> Self {
        self.sort.push(sort);
        self
    }

    pub fn page(mut self, from: usize, size: usize) -> Self {
        self.from = from;
        self.size = size;
        self
    }

    /// Aggregation-only request: no hits are returned.
    pub fn aggregate(mut self, name: impl Into<String>, agg: Aggregation) -> Self {
        self.aggs.insert(name.into(), agg);
        self.size = 0;
        self
    }

    pub fn to_json(&self) -> Value {
        let mut body = json!({
            "query": self.query.to_json(),
            "from": self.from,
            "size": self.size,
        });
        if !self.sort.is_empty() {
            body["sort"] = Value::Array(self.sort.iter().map(Sort::to_json).collect());
        }
        if !self.aggs.is_empty() {
            body["aggs"] = aggs_to_json(&self.aggs);
        }
        body
    }
}

/// Aggregation result, shaped after the request that produced it.
#[derive(Debug, Clone, PartialEq)]
pub enum AggregationResult {
    Metric(Option<f64>),
    Buckets(Vec<Bucket>),
}

#[derive(Debug, Clone, PartialEq)]
pub struct Bucket {
    pub key: String,
    pub doc_count: u64,
    pub aggregations: BTreeMap<String, AggregationResult>,
}

impl Bucket {
    pub fn metric(&self, name: &str) -> Option<f64> {
        match self.aggregations.get(name) {
            Some(AggregationResult::Metric(value)) => *value,
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct SearchResponse {
    pub total: u64,
    /// Document sources, in result order.
    pub hits: Vec<Value>,
    pub aggregations: BTreeMap<String, AggregationResult>,
}

impl SearchResponse {
    /// Decode every hit into `T`, dropping fields `T` does not declare.
    pub fn hits_as<T: DeserializeOwned>(&self) -> Result<Vec<T>, StoreError> {
        self.hits
            .iter()
            .map(|hit| serde_json::from_value(hit.clone()).map_err(StoreError::from))
            .collect()
    }

    pub fn metric(&self, name: &str) -> Option<f64> {
        match self.aggregations.get(name) {
            Some(AggregationResult::Metric(value)) => *value,
            _ => None,
        }
    }

    pub fn buckets(&self, name: &str) -> &[Bucket] {
        match self.aggregations.get(name) {
            Some(AggregationResult::Buckets(buckets)) => buckets,
            _ => &[],
        }
    }

    /// Parse a raw `_search` response body.
    pub fn from_json(body: &Value, request: &SearchRequest) -> Result<Self, StoreError> {
        let hits = body
            .get("hits")
            .ok_or_else(|| StoreError::decode("search response without hits"))?;

        // `total` is an object in recent engines and a bare number in older ones.
        let total = match hits.get("total") {
            Some(Value::Number(n)) => n.as_u64().unwrap_or(0),
            Some(total) => total.get("value").and_then(Value::as_u64).unwrap_or(0),
            None => 0,
        };

        let sources = hits
            .get("hits")
            .and_then(Value::as_array)
            .map(|items| {
                items
                    .iter()
                    .filter_map(|hit| hit.get("_source").cloned())
                    .collect()
            })
            .unwrap_or_default();

        let aggregations = match body.get("aggregations") {
            Some(raw) => parse_aggregations(raw, &request.aggs)?,
            None => BTreeMap::new(),
        };

        Ok(Self {
            total,
            hits: sources,
            aggregations,
        })
    }
}

fn parse_aggregations(
    raw: &Value,
    requested: &BTreeMap<String, Aggregation>,
) -> Result<BTreeMap<String, AggregationResult>, StoreError> {
    let mut out = BTreeMap::new();
    for (name, agg) in requested {
        let Some(node) = raw.get(name) else {
            continue;
        };
        let result = match agg {
            Aggregation::Avg { .. } => {
                AggregationResult::Metric(node.get("value").and_then(Value::as_f64))
            }
            Aggregation::Terms { aggs, .. } => {
                let raw_buckets = node
                    .get("buckets")
                    .and_then(Value::as_array)
                    .ok_or_else(|| {
                        StoreError::decode(format!("terms aggregation '{name}' without buckets"))
                    })?;
                let mut buckets = Vec::with_capacity(raw_buckets.len());
                for bucket in raw_buckets {
                    let key = match bucket.get("key") {
                        Some(Value::String(s)) => s.clone(),
                        Some(other) => other.to_string(),
                        None => {
                            return Err(StoreError::decode(format!(
                                "bucket without key in '{name}'"
                            )))
                        }
                    };
                    buckets.push(Bucket {
                        key,
                        doc_count: bucket.get("doc_count").and_then(Value::as_u64).unwrap_or(0),
                        aggregations: parse_aggregations(bucket, aggs)?,
                    });
                }
                AggregationResult::Buckets(buckets)
            }
        };
        out.insert(name.clone(), result);
    }
    Ok(out)
}

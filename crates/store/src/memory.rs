//! In-process document store.
//!
//! Evaluates the typed query model directly over JSON documents. Writes are
//! visible immediately regardless of the requested [`Refresh`] level.

use std::cmp::Ordering;
use std::collections::{BTreeMap, HashMap};
use std::sync::RwLock;

use async_trait::async_trait;
use serde_json::Value;

use crate::bootstrap::IndexDefinition;
use crate::error::StoreError;
use crate::query::{
    Aggregation, AggregationResult, Bucket, Query, SearchRequest, SearchResponse, SortOrder,
};
use crate::{DocumentStore, Refresh};

#[derive(Debug, Default)]
struct MemoryIndex {
    next_seq: u64,
    docs: HashMap<String, (u64, Value)>,
}

/// Document store kept entirely in memory.
#[derive(Debug, Default)]
pub struct MemoryStore {
    indices: RwLock<HashMap<String, MemoryIndex>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of documents held in `index`.
    pub fn len(&self, index: &str) -> usize {
        self.indices
            .read()
            .map(|indices| indices.get(index).map_or(0, |idx| idx.docs.len()))
            .unwrap_or(0)
    }

    pub fn is_empty(&self, index: &str) -> bool {
        self.len(index) == 0
    }

    fn read<R>(
        &self,
        index: &str,
        f: impl FnOnce(&MemoryIndex) -> Result<R, StoreError>,
    ) -> Result<R, StoreError> {
        let indices = self
            .indices
            .read()
            .map_err(|_| StoreError::request("memory store lock poisoned"))?;
        let idx = indices
            .get(index)
            .ok_or_else(|| StoreError::index_not_found(index))?;
        f(idx)
    }
}

#[async_trait]
impl DocumentStore for MemoryStore {
    async fn index_exists(&self, index: &str) -> Result<bool, StoreError> {
        let indices = self
            .indices
            .read()
            .map_err(|_| StoreError::request("memory store lock poisoned"))?;
        Ok(indices.contains_key(index))
    }

    async fn create_index(&self, definition: &IndexDefinition) -> Result<(), StoreError> {
        let mut indices = self
            .indices
            .write()
            .map_err(|_| StoreError::request("memory store lock poisoned"))?;
        if indices.contains_key(&definition.name) {
            return Err(StoreError::status(
                400,
                format!("resource_already_exists_exception: {}", definition.name),
            ));
        }
        indices.insert(definition.name.clone(), MemoryIndex::default());
        Ok(())
    }

    async fn get(&self, index: &str, id: &str) -> Result<Option<Value>, StoreError> {
        self.read(index, |idx| Ok(idx.docs.get(id).map(|(_, doc)| doc.clone())))
    }

    async fn index(
        &self,
        index: &str,
        id: &str,
        document: Value,
        _refresh: Refresh,
    ) -> Result<(), StoreError> {
        let mut indices = self
            .indices
            .write()
            .map_err(|_| StoreError::request("memory store lock poisoned"))?;
        // Writing to a missing index creates it, like the real engine does.
        let idx = indices.entry(index.to_string()).or_default();
        let seq = idx.next_seq;
        idx.next_seq += 1;
        idx.docs.insert(id.to_string(), (seq, document));
        Ok(())
    }

    async fn search(
        &self,
        index: &str,
        request: &SearchRequest,
    ) -> Result<SearchResponse, StoreError> {
        self.read(index, |idx| Ok(execute(idx, request)))
    }

    async fn multi_get(&self, index: &str, ids: &[String]) -> Result<Vec<Option<Value>>, StoreError> {
        self.read(index, |idx| {
            Ok(ids
                .iter()
                .map(|id| idx.docs.get(id).map(|(_, doc)| doc.clone()))
                .collect())
        })
    }
}

struct Scored<'a> {
    seq: u64,
    score: f64,
    doc: &'a Value,
}

fn execute(idx: &MemoryIndex, request: &SearchRequest) -> SearchResponse {
    let mut matched: Vec<Scored<'_>> = idx
        .docs
        .values()
        .filter_map(|(seq, doc)| {
            score(&request.query, doc).map(|score| Scored {
                seq: *seq,
                score,
                doc,
            })
        })
        .collect();

    if request.sort.is_empty() {
        matched.sort_by(|a, b| {
            b.score
                .partial_cmp(&a.score)
                .unwrap_or(Ordering::Equal)
                .then(a.seq.cmp(&b.seq))
        });
    } else {
        matched.sort_by(|a, b| {
            request
                .sort
                .iter()
                .map(|sort| {
                    compare_missing_last(field(a.doc, &sort.field), field(b.doc, &sort.field), sort.order)
                })
                .find(|ord| *ord != Ordering::Equal)
                .unwrap_or(Ordering::Equal)
                .then(a.seq.cmp(&b.seq))
        });
    }

    let docs: Vec<&Value> = matched.iter().map(|s| s.doc).collect();
    let aggregations = aggregate(&request.aggs, &docs);
    let hits = docs
        .iter()
        .skip(request.from)
        .take(request.size)
        .map(|doc| (*doc).clone())
        .collect();

    SearchResponse {
        total: matched.len() as u64,
        hits,
        aggregations,
    }
}

/// Relevance score of `doc` for `query`, or `None` when it does not match.
fn score(query: &Query, doc: &Value) -> Option<f64> {
    match query {
        Query::MatchAll => Some(1.0),
        Query::Term { field: name, value } => contains(field(doc, name), value).then_some(1.0),
        Query::Terms { field: name, values } => values
            .iter()
            .any(|value| contains(field(doc, name), value))
            .then_some(1.0),
        Query::MultiMatch { query, fields } => multi_match(query, fields, doc),
        Query::Bool { must, filter } => {
            if !filter.iter().all(|q| score(q, doc).is_some()) {
                return None;
            }
            let mut total = 0.0;
            for q in must {
                total += score(q, doc)?;
            }
            Some(if must.is_empty() { 1.0 } else { total })
        }
    }
}

fn multi_match(query: &str, fields: &[String], doc: &Value) -> Option<f64> {
    let terms = tokenize(query);
    let mut total = 0.0;

    for spec in fields {
        let (name, boost) = match spec.split_once('^') {
            Some((name, boost)) => (name, boost.parse::<f64>().unwrap_or(1.0)),
            None => (spec.as_str(), 1.0),
        };

        // `.raw` sub-fields are exact keywords.
        if let Some(base) = name.strip_suffix(".raw") {
            if field(doc, base).and_then(Value::as_str) == Some(query) {
                total += boost;
            }
            continue;
        }

        match field(doc, name) {
            Some(Value::String(text)) => {
                let tokens = tokenize(text);
                let hits = terms.iter().filter(|t| tokens.contains(t)).count();
                total += boost * hits as f64;
            }
            // Keyword arrays only match the whole query string.
            Some(Value::Array(items)) => {
                if items.iter().any(|item| item.as_str() == Some(query)) {
                    total += boost;
                }
            }
            _ => {}
        }
    }

    (total > 0.0).then_some(total)
}

fn tokenize(text: &str) -> Vec<String> {
    text.split(|c: char| !c.is_alphanumeric())
        .filter(|t| !t.is_empty())
        .map(str::to_lowercase)
        .collect()
}

fn field<'a>(doc: &'a Value, name: &str) -> Option<&'a Value> {
    doc.get(name).filter(|v| !v.is_null())
}

fn contains(actual: Option<&Value>, expected: &Value) -> bool {
    match actual {
        Some(Value::Array(items)) => items.iter().any(|item| values_equal(item, expected)),
        Some(value) => values_equal(value, expected),
        None => false,
    }
}

fn values_equal(a: &Value, b: &Value) -> bool {
    match (a, b) {
        (Value::Number(x), Value::Number(y)) => x.as_f64() == y.as_f64(),
        _ => a == b,
    }
}

fn compare_values(a: &Value, b: &Value) -> Ordering {
    match (a, b) {
        (Value::Number(x), Value::Number(y)) => x
            .as_f64()
            .partial_cmp(&y.as_f64())
            .unwrap_or(Ordering::Equal),
        (Value::String(x), Value::String(y)) => x.cmp(y),
        _ => a.to_string().cmp(&b.to_string()),
    }
}

/// Documents without the field sort last in either direction.
fn compare_missing_last(a: Option<&Value>, b: Option<&Value>, order: SortOrder) -> Ordering {
    match (a, b) {
        (Some(a), Some(b)) => match order {
            SortOrder::Asc => compare_values(a, b),
            SortOrder::Desc => compare_values(b, a),
        },
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => Ordering::Equal,
    }
}

fn aggregate(
    aggs: &BTreeMap<String, Aggregation>,
    docs: &[&Value],
) -> BTreeMap<String, AggregationResult> {
    aggs.iter()
        .map(|(name, agg)| (name.clone(), run_aggregation(agg, docs)))
        .collect()
}

fn run_aggregation(agg: &Aggregation, docs: &[&Value]) -> AggregationResult {
    match agg {
        Aggregation::Avg { field: name } => {
            let values: Vec<f64> = docs
                .iter()
                .filter_map(|doc| field(doc, name).and_then(Value::as_f64))
                .collect();
            let avg = (!values.is_empty()).then(|| values.iter().sum::<f64>() / values.len() as f64);
            AggregationResult::Metric(avg)
        }
        Aggregation::Terms {
            field: name,
            size,
            order,
            aggs,
        } => {
            let mut groups: BTreeMap<String, Vec<&Value>> = BTreeMap::new();
            for doc in docs {
                let keys: Vec<String> = match field(doc, name) {
                    Some(Value::Array(items)) => items.iter().map(bucket_key).collect(),
                    Some(value) => vec![bucket_key(value)],
                    None => continue,
                };
                for key in keys {
                    groups.entry(key).or_default().push(*doc);
                }
            }

            let mut buckets: Vec<Bucket> = groups
                .into_iter()
                .map(|(key, members)| Bucket {
                    key,
                    doc_count: members.len() as u64,
                    aggregations: aggregate(aggs, &members),
                })
                .collect();

            match order {
                Some((metric, dir)) => buckets.sort_by(|a, b| {
                    let ord = match (a.metric(metric), b.metric(metric)) {
                        (Some(x), Some(y)) => x.partial_cmp(&y).unwrap_or(Ordering::Equal),
                        (Some(_), None) => Ordering::Greater,
                        (None, Some(_)) => Ordering::Less,
                        (None, None) => Ordering::Equal,
                    };
                    let ord = match dir {
                        SortOrder::Asc => ord,
                        SortOrder::Desc => ord.reverse(),
                    };
                    ord.then_with(|| a.key.cmp(&b.key))
                }),
                None => buckets.sort_by(|a, b| b.doc_count.cmp(&a.doc_count).then_with(|| a.key.cmp(&b.key))),
            }
            buckets.truncate(*size);
            AggregationResult::Buckets(buckets)
        }
    }
}

fn bucket_key(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

use crate::traits::{BackendResult, SearchBackend};
use chrono::NaiveDate;
use dsapi_core::{parse, BackendError, Bound, Dialect, QueryClause, SearchResult};
use parking_lot::RwLock;
use serde_json::Value as JsonValue;
use std::cmp::Ordering;
use std::collections::HashMap;
use std::path::Path;
use std::sync::Arc;

/// Evaluates standard-dialect queries over documents held in memory.
/// Documents keep insertion order; an unknown index holds no documents.
#[derive(Clone, Default)]
pub struct InMemoryBackend {
    inner: Arc<RwLock<Inner>>,
}

#[derive(Default)]
struct Inner {
    // index name -> documents
    indexes: HashMap<String, Vec<JsonValue>>,
}

impl InMemoryBackend {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&self, index: &str, docs: impl IntoIterator<Item = JsonValue>) {
        self.inner
            .write()
            .indexes
            .entry(index.to_string())
            .or_default()
            .extend(docs);
    }

    pub fn len(&self, index: &str) -> usize {
        self.inner
            .read()
            .indexes
            .get(index)
            .map(Vec::len)
            .unwrap_or(0)
    }

    /// Seeds from `{"<index>": [doc, ...], ...}`.
    pub fn from_seed_json(bytes: &[u8]) -> serde_json::Result<Self> {
        let indexes: HashMap<String, Vec<JsonValue>> = serde_json::from_slice(bytes)?;
        let backend = Self::new();
        backend.inner.write().indexes = indexes;
        Ok(backend)
    }

    pub fn load_seed(path: impl AsRef<Path>) -> std::io::Result<Self> {
        let bytes = std::fs::read(path)?;
        Self::from_seed_json(&bytes)
            .map_err(|e| std::io::Error::new(std::io::ErrorKind::InvalidData, e))
    }
}

#[async_trait::async_trait]
impl SearchBackend for InMemoryBackend {
    fn name(&self) -> &'static str {
        "memory"
    }

    fn dialect(&self) -> Dialect {
        Dialect::Standard
    }

    async fn search(
        &self,
        index: &str,
        query: &str,
        offset: u64,
        limit: u64,
    ) -> BackendResult<SearchResult> {
        let clause = parse(query).map_err(|e| BackendError::malformed(e.to_string()))?;
        let inner = self.inner.read();
        let docs = match inner.indexes.get(index) {
            Some(docs) => docs,
            None => {
                return Ok(SearchResult {
                    num_found: 0,
                    start: offset,
                    docs: Vec::new(),
                })
            }
        };
        let hits: Vec<&JsonValue> = docs.iter().filter(|d| matches(&clause, d)).collect();
        let num_found = hits.len() as u64;
        let skip = usize::try_from(offset).unwrap_or(usize::MAX);
        let take = usize::try_from(limit).unwrap_or(usize::MAX);
        Ok(SearchResult {
            num_found,
            start: offset,
            docs: hits.into_iter().skip(skip).take(take).cloned().collect(),
        })
    }
}

fn matches(clause: &QueryClause, doc: &JsonValue) -> bool {
    match clause {
        QueryClause::MatchAll => true,
        QueryClause::FieldEquals { field, value } => field_values(doc, field)
            .into_iter()
            .any(|v| scalar_text(v).as_deref() == Some(value.as_str())),
        QueryClause::FieldRange { field, low, high } => field_values(doc, field)
            .into_iter()
            .any(|v| in_range(v, low, high)),
        QueryClause::DateRange { field, low, high } => field_values(doc, field)
            .into_iter()
            .filter_map(doc_date)
            .any(|d| d >= *low && d <= *high),
        QueryClause::And { left, right } => matches(left, doc) && matches(right, doc),
        QueryClause::Or { left, right } => matches(left, doc) || matches(right, doc),
    }
}

fn field_values<'a>(doc: &'a JsonValue, field: &str) -> Vec<&'a JsonValue> {
    let found = doc
        .get(field)
        .or_else(|| doc.pointer(&format!("/{}", field.replace('.', "/"))));
    match found {
        Some(JsonValue::Array(items)) => items.iter().collect(),
        Some(v) => vec![v],
        None => Vec::new(),
    }
}

fn scalar_text(v: &JsonValue) -> Option<String> {
    match v {
        JsonValue::String(s) => Some(s.clone()),
        JsonValue::Number(n) => Some(n.to_string()),
        JsonValue::Bool(b) => Some(b.to_string()),
        _ => None,
    }
}

fn compare(doc: &str, bound: &str) -> Ordering {
    match (doc.parse::<f64>(), bound.parse::<f64>()) {
        (Ok(a), Ok(b)) => a.partial_cmp(&b).unwrap_or(Ordering::Equal),
        _ => doc.cmp(bound),
    }
}

fn in_range(v: &JsonValue, low: &Bound, high: &Bound) -> bool {
    let Some(text) = scalar_text(v) else {
        return false;
    };
    let above = match low {
        Bound::Unbounded => true,
        Bound::Value(b) => compare(&text, b) != Ordering::Less,
    };
    let below = match high {
        Bound::Unbounded => true,
        Bound::Value(b) => compare(&text, b) != Ordering::Greater,
    };
    above && below
}

fn doc_date(v: &JsonValue) -> Option<NaiveDate> {
    let text = scalar_text(v)?;
    NaiveDate::parse_from_str(&text, "%Y%m%d")
        .or_else(|_| NaiveDate::parse_from_str(&text, "%Y-%m-%d"))
        .ok()
        .or_else(|| {
            text.get(..10)
                .and_then(|head| NaiveDate::parse_from_str(head, "%Y-%m-%d").ok())
        })
}

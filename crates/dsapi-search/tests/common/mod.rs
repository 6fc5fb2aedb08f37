//! Scripted backend shared by the gateway and service tests.

#![allow(dead_code)]

use dsapi_core::{BackendError, Dialect, SearchResult};
use dsapi_search::{BackendResult, SearchBackend};
use parking_lot::Mutex;
use serde_json::json;
use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Call {
    pub index: String,
    pub query: String,
    pub offset: u64,
    pub limit: u64,
}

/// Holds one slot of the active-search count until the search future ends,
/// whether it completes or is dropped mid-flight.
struct ActiveSlot(Arc<AtomicUsize>);

impl ActiveSlot {
    fn enter(active: &Arc<AtomicUsize>, peak: &AtomicUsize) -> Self {
        let now = active.fetch_add(1, Ordering::SeqCst) + 1;
        peak.fetch_max(now, Ordering::SeqCst);
        Self(active.clone())
    }
}

impl Drop for ActiveSlot {
    fn drop(&mut self) {
        self.0.fetch_sub(1, Ordering::SeqCst);
    }
}

/// Replays queued outcomes in order, then keeps answering with `fallback`.
/// Counts calls and tracks the peak number of concurrent searches.
#[derive(Clone)]
pub struct ScriptedBackend {
    dialect: Dialect,
    delay: Duration,
    script: Arc<Mutex<VecDeque<BackendResult<SearchResult>>>>,
    fallback: BackendResult<SearchResult>,
    calls: Arc<Mutex<Vec<Call>>>,
    active: Arc<AtomicUsize>,
    peak: Arc<AtomicUsize>,
}

impl ScriptedBackend {
    pub fn answering(result: SearchResult) -> Self {
        Self::with_fallback(Ok(result))
    }

    pub fn failing(err: BackendError) -> Self {
        Self::with_fallback(Err(err))
    }

    fn with_fallback(fallback: BackendResult<SearchResult>) -> Self {
        Self {
            dialect: Dialect::Standard,
            delay: Duration::ZERO,
            script: Arc::default(),
            fallback,
            calls: Arc::default(),
            active: Arc::default(),
            peak: Arc::default(),
        }
    }

    pub fn dialect(mut self, dialect: Dialect) -> Self {
        self.dialect = dialect;
        self
    }

    pub fn delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    pub fn then(self, outcome: BackendResult<SearchResult>) -> Self {
        self.script.lock().push_back(outcome);
        self
    }

    pub fn call_count(&self) -> usize {
        self.calls.lock().len()
    }

    pub fn calls(&self) -> Vec<Call> {
        self.calls.lock().clone()
    }

    pub fn active(&self) -> usize {
        self.active.load(Ordering::SeqCst)
    }

    pub fn peak_concurrency(&self) -> usize {
        self.peak.load(Ordering::SeqCst)
    }
}

#[async_trait::async_trait]
impl SearchBackend for ScriptedBackend {
    fn name(&self) -> &'static str {
        "scripted"
    }

    fn dialect(&self) -> Dialect {
        self.dialect
    }

    async fn search(
        &self,
        index: &str,
        query: &str,
        offset: u64,
        limit: u64,
    ) -> BackendResult<SearchResult> {
        self.calls.lock().push(Call {
            index: index.to_string(),
            query: query.to_string(),
            offset,
            limit,
        });
        let _slot = ActiveSlot::enter(&self.active, &self.peak);
        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }
        let next = self.script.lock().pop_front();
        next.unwrap_or_else(|| self.fallback.clone())
    }
}

pub fn hits(n: u64) -> SearchResult {
    SearchResult {
        num_found: n,
        start: 0,
        docs: (0..n).map(|i| json!({ "i": i })).collect(),
    }
}

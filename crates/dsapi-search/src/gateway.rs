//! Search gateway: the only place a request waits on the backend.
//!
//! Every call is bounded three ways. `rows` is clamped to
//! [`GatewayConfig::max_rows`], each attempt runs under
//! [`GatewayConfig::timeout`], and at most [`GatewayConfig::max_in_flight`]
//! attempts hold a backend permit at once. Transient failures
//! (`Unavailable`, `Timeout`) are retried with exponential backoff up to
//! [`GatewayConfig::max_retries`] times; `Malformed` is returned at once.

use crate::traits::{BackendResult, SearchBackend};
use dsapi_core::{BackendError, DataError, Dialect, SearchResult};
use once_cell::sync::Lazy;
use prometheus::{register_counter_vec, register_histogram_vec, CounterVec, HistogramVec};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Semaphore;
use tokio_util::sync::CancellationToken;

pub const DEFAULT_MAX_ROWS: u64 = 1000;

static BACKEND_QUERY_SECONDS: Lazy<HistogramVec> = Lazy::new(|| {
    register_histogram_vec!(
        "dsapi_backend_query_seconds",
        "Backend search latency including retries",
        &["backend"]
    )
    .unwrap()
});

static BACKEND_ERRORS_TOTAL: Lazy<CounterVec> = Lazy::new(|| {
    register_counter_vec!(
        "dsapi_backend_errors_total",
        "Backend searches that failed, by kind",
        &["kind"]
    )
    .unwrap()
});

static BACKEND_RETRIES_TOTAL: Lazy<CounterVec> = Lazy::new(|| {
    register_counter_vec!(
        "dsapi_backend_retries_total",
        "Backend search retries, by failure kind",
        &["kind"]
    )
    .unwrap()
});

#[derive(Debug, Clone)]
pub struct GatewayConfig {
    pub max_rows: u64,
    pub timeout: Duration,
    pub max_retries: u32,
    pub retry_backoff: Duration,
    pub max_in_flight: usize,
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            max_rows: DEFAULT_MAX_ROWS,
            timeout: Duration::from_secs(10),
            max_retries: 2,
            retry_backoff: Duration::from_millis(100),
            max_in_flight: 32,
        }
    }
}

#[derive(Clone)]
pub struct SearchGateway {
    backend: Arc<dyn SearchBackend>,
    config: GatewayConfig,
    permits: Arc<Semaphore>,
}

impl SearchGateway {
    pub fn new(backend: Arc<dyn SearchBackend>, config: GatewayConfig) -> Self {
        let permits = Arc::new(Semaphore::new(config.max_in_flight.max(1)));
        Self {
            backend,
            config,
            permits,
        }
    }

    pub fn dialect(&self) -> Dialect {
        self.backend.dialect()
    }

    pub fn backend_name(&self) -> &'static str {
        self.backend.name()
    }

    pub fn config(&self) -> &GatewayConfig {
        &self.config
    }

    /// Permits not currently held by an in-flight backend call.
    pub fn available_permits(&self) -> usize {
        self.permits.available_permits()
    }

    pub fn clamp_rows(&self, rows: u64) -> u64 {
        rows.clamp(1, self.config.max_rows.max(1))
    }

    pub async fn execute(
        &self,
        index: &str,
        query: &str,
        start: u64,
        rows: u64,
    ) -> BackendResult<SearchResult> {
        let rows = self.clamp_rows(rows);
        let _timer = BACKEND_QUERY_SECONDS
            .with_label_values(&[self.backend.name()])
            .start_timer();
        let mut attempt = 0u32;
        loop {
            match self.attempt(index, query, start, rows).await {
                Ok(mut result) => {
                    result.start = start;
                    result.docs.truncate(usize::try_from(rows).unwrap_or(usize::MAX));
                    return Ok(result);
                }
                Err(e) if e.kind.is_transient() && attempt < self.config.max_retries => {
                    BACKEND_RETRIES_TOTAL
                        .with_label_values(&[e.kind.as_str()])
                        .inc();
                    let delay = self
                        .config
                        .retry_backoff
                        .saturating_mul(2u32.saturating_pow(attempt));
                    tracing::warn!(
                        index,
                        attempt,
                        kind = %e.kind,
                        ?delay,
                        "retrying backend search"
                    );
                    tokio::time::sleep(delay).await;
                    attempt += 1;
                }
                Err(e) => {
                    BACKEND_ERRORS_TOTAL
                        .with_label_values(&[e.kind.as_str()])
                        .inc();
                    tracing::error!(
                        index,
                        kind = %e.kind,
                        error = %e.message,
                        "backend search failed"
                    );
                    return Err(e);
                }
            }
        }
    }

    /// Like [`execute`](Self::execute) but gives up with
    /// [`DataError::Cancelled`] as soon as `cancel` fires.
    pub async fn execute_cancellable(
        &self,
        index: &str,
        query: &str,
        start: u64,
        rows: u64,
        cancel: &CancellationToken,
    ) -> dsapi_core::Result<SearchResult> {
        tokio::select! {
            biased;
            _ = cancel.cancelled() => {
                tracing::debug!(index, "backend search cancelled");
                Err(DataError::Cancelled)
            }
            r = self.execute(index, query, start, rows) => r.map_err(DataError::from),
        }
    }

    async fn attempt(
        &self,
        index: &str,
        query: &str,
        start: u64,
        rows: u64,
    ) -> BackendResult<SearchResult> {
        let limit = self.config.timeout;
        let call = async {
            let _permit = self
                .permits
                .acquire()
                .await
                .map_err(|_| BackendError::unavailable("backend pool closed"))?;
            self.backend.search(index, query, start, rows).await
        };
        match tokio::time::timeout(limit, call).await {
            Ok(result) => result,
            Err(_) => Err(BackendError::timeout(format!(
                "no backend response within {limit:?}"
            ))),
        }
    }
}

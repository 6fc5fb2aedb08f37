use dsapi_core::{BackendError, Dialect, SearchResult};

pub type BackendResult<T> = std::result::Result<T, BackendError>;

/// Client side of the external full-text engine.
#[async_trait::async_trait]
pub trait SearchBackend: Send + Sync + 'static {
    /// Short label used in logs and metrics.
    fn name(&self) -> &'static str;

    /// Query syntax the backend expects from the renderer.
    fn dialect(&self) -> Dialect;

    /// Runs `query` against `index`, returning at most `limit` documents
    /// starting at `offset`, and the total match count.
    async fn search(
        &self,
        index: &str,
        query: &str,
        offset: u64,
        limit: u64,
    ) -> BackendResult<SearchResult>;
}

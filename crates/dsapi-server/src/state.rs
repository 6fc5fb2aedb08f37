use dsapi_core::DEFAULT_ROWS;
use dsapi_search::DataService;
use std::path::PathBuf;
use tokio_util::sync::CancellationToken;

#[derive(Clone)]
pub struct AppState {
    pub service: DataService,
    pub default_rows: u64,
    /// Source re-read by `POST /admin/reload`.
    pub catalog_path: Option<PathBuf>,
    /// Fired on shutdown; in-flight searches give up with `Cancelled`.
    pub shutdown: CancellationToken,
}

impl AppState {
    pub fn new(service: DataService) -> Self {
        Self {
            service,
            default_rows: DEFAULT_ROWS,
            catalog_path: None,
            shutdown: CancellationToken::new(),
        }
    }

    pub fn with_default_rows(mut self, rows: u64) -> Self {
        self.default_rows = rows;
        self
    }

    pub fn with_catalog_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.catalog_path = Some(path.into());
        self
    }

    pub fn with_shutdown(mut self, token: CancellationToken) -> Self {
        self.shutdown = token;
        self
    }
}

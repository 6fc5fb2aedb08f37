use clap::{Parser, ValueEnum};
use dsapi_search::GatewayConfig;
use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::time::Duration;

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum BackendKind {
    /// Seeded in-memory documents.
    Memory,
    Solr,
}

/// Server configuration from command-line flags or environment variables.
#[derive(Parser, Debug, Clone)]
#[command(name = "dsapi-server", version, about = "Dataset search API server")]
pub struct ServerConfig {
    #[arg(long, env = "DSAPI_ADDR", default_value = "0.0.0.0:8080")]
    pub addr: SocketAddr,

    /// JSON catalog, `{"apis": [...]}`
    #[arg(long, env = "DSAPI_CATALOG", default_value = "catalog.json")]
    pub catalog: PathBuf,

    #[arg(long, env = "DSAPI_BACKEND", value_enum, default_value = "memory")]
    pub backend: BackendKind,

    /// Base URL of the Solr instance, e.g. `http://localhost:8983/solr`
    #[arg(long, env = "SOLR_URL")]
    pub solr_url: Option<String>,

    /// Seed documents for the memory backend, `{"<index>": [doc, ...]}`
    #[arg(long, env = "DSAPI_SEED")]
    pub seed: Option<PathBuf>,

    #[arg(long, env = "DSAPI_DEFAULT_ROWS", default_value_t = dsapi_core::DEFAULT_ROWS)]
    pub default_rows: u64,

    #[arg(long, env = "DSAPI_MAX_ROWS", default_value_t = dsapi_search::gateway::DEFAULT_MAX_ROWS)]
    pub max_rows: u64,

    #[arg(long, env = "DSAPI_BACKEND_TIMEOUT_MS", default_value_t = 10_000)]
    pub backend_timeout_ms: u64,

    #[arg(long, env = "DSAPI_BACKEND_RETRIES", default_value_t = 2)]
    pub backend_retries: u32,

    #[arg(long, env = "DSAPI_RETRY_BACKOFF_MS", default_value_t = 100)]
    pub retry_backoff_ms: u64,

    #[arg(long, env = "DSAPI_MAX_IN_FLIGHT", default_value_t = 32)]
    pub max_in_flight: usize,

    #[arg(long, env = "TLS_CERT_PATH")]
    pub tls_cert: Option<PathBuf>,

    #[arg(long, env = "TLS_KEY_PATH")]
    pub tls_key: Option<PathBuf>,
}

impl ServerConfig {
    pub fn backend_timeout(&self) -> Duration {
        Duration::from_millis(self.backend_timeout_ms)
    }

    pub fn gateway(&self) -> GatewayConfig {
        GatewayConfig {
            max_rows: self.max_rows,
            timeout: self.backend_timeout(),
            max_retries: self.backend_retries,
            retry_backoff: Duration::from_millis(self.retry_backoff_ms),
            max_in_flight: self.max_in_flight,
        }
    }

    /// Cert and key, when both are set.
    pub fn tls(&self) -> Option<(&Path, &Path)> {
        match (&self.tls_cert, &self.tls_key) {
            (Some(cert), Some(key)) => Some((cert.as_path(), key.as_path())),
            _ => None,
        }
    }

    pub fn validate(&self) -> Result<(), String> {
        if self.default_rows == 0 {
            return Err("default rows must be at least 1".into());
        }
        if self.max_rows < self.default_rows {
            return Err(format!(
                "max rows ({}) is below default rows ({})",
                self.max_rows, self.default_rows
            ));
        }
        if self.max_in_flight == 0 {
            return Err("max in-flight must be at least 1".into());
        }
        if self.backend == BackendKind::Solr && self.solr_url.is_none() {
            return Err("the solr backend needs SOLR_URL".into());
        }
        if self.tls_cert.is_some() != self.tls_key.is_some() {
            return Err("TLS needs both a certificate and a key".into());
        }
        Ok(())
    }
}

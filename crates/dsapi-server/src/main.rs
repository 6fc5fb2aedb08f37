use anyhow::{anyhow, Context};
use clap::Parser;
use dsapi_core::{Catalog, Registry};
use dsapi_search::{DataService, InMemoryBackend, SearchBackend, SearchGateway, SolrBackend};
use dsapi_server::{AppState, BackendKind, ServerConfig};
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::info;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let config = ServerConfig::parse();
    config.validate().map_err(|e| anyhow!(e))?;

    let catalog = Catalog::load(&config.catalog)
        .with_context(|| format!("loading catalog {}", config.catalog.display()))?;
    info!(
        datasets = catalog.len(),
        fingerprint = %catalog.fingerprint(),
        "catalog loaded"
    );

    let backend = build_backend(&config)?;
    let gateway = SearchGateway::new(backend, config.gateway());
    let service = DataService::new(Arc::new(Registry::new(catalog)), gateway);

    let shutdown = CancellationToken::new();
    let state = AppState::new(service)
        .with_default_rows(config.default_rows)
        .with_catalog_path(config.catalog.clone())
        .with_shutdown(shutdown.clone());
    let app = dsapi_server::app(state);

    let handle = axum_server::Handle::new();
    tokio::spawn(shutdown_signal(handle.clone(), shutdown));

    if let Some((cert, key)) = config.tls() {
        let tls = axum_server::tls_rustls::RustlsConfig::from_pem_file(cert, key)
            .await
            .context("loading TLS certificate and key")?;
        info!(addr = %config.addr, "https listening");
        axum_server::bind_rustls(config.addr, tls)
            .handle(handle)
            .serve(app.into_make_service())
            .await?;
    } else {
        info!(addr = %config.addr, "http listening");
        axum_server::bind(config.addr)
            .handle(handle)
            .serve(app.into_make_service())
            .await?;
    }
    info!("server stopped");
    Ok(())
}

fn build_backend(config: &ServerConfig) -> anyhow::Result<Arc<dyn SearchBackend>> {
    match config.backend {
        BackendKind::Memory => {
            let backend = match &config.seed {
                Some(path) => InMemoryBackend::load_seed(path)
                    .with_context(|| format!("loading seed {}", path.display()))?,
                None => InMemoryBackend::new(),
            };
            info!(seeded = config.seed.is_some(), "using in-memory backend");
            Ok(Arc::new(backend))
        }
        BackendKind::Solr => {
            let url = config
                .solr_url
                .as_deref()
                .ok_or_else(|| anyhow!("SOLR_URL is required for the solr backend"))?;
            let backend = SolrBackend::new(url, config.backend_timeout())?;
            info!(url, "using solr backend");
            Ok(Arc::new(backend))
        }
    }
}

async fn shutdown_signal(handle: axum_server::Handle, shutdown: CancellationToken) {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "cannot listen for shutdown signal");
        return;
    }
    info!("shutting down");
    shutdown.cancel();
    handle.graceful_shutdown(Some(Duration::from_secs(10)));
}

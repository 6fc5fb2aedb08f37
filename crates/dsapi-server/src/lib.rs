pub mod config;
pub mod error;
pub mod handlers;
pub mod metrics;
pub mod openapi;
pub mod state;

use axum::routing::{get, post};
use axum::{middleware, Router};
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

pub use config::{BackendKind, ServerConfig};
pub use error::ApiError;
pub use state::AppState;

pub fn app(state: AppState) -> Router {
    metrics::CATALOG_DATASETS.set(state.service.registry().snapshot().len() as i64);
    Router::new()
        .route("/", get(handlers::list))
        .route("/:dataset/:version/fields", get(handlers::fields))
        .route("/:dataset/:version/records", post(handlers::records))
        .route("/openapi.json", get(handlers::openapi))
        .route("/admin/reload", post(handlers::reload))
        .route("/health", get(handlers::health))
        .route("/metrics", get(handlers::metrics))
        .route_layer(middleware::from_fn(metrics::track))
        .with_state(state)
        .layer(TraceLayer::new_for_http())
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
}

use crate::error::ApiError;
use crate::metrics::{BACKEND_PERMITS_AVAILABLE, CATALOG_DATASETS};
use crate::openapi;
use crate::state::AppState;
use axum::extract::rejection::FormRejection;
use axum::extract::{Path, Query, State};
use axum::http::{header, StatusCode};
use axum::response::IntoResponse;
use axum::{Form, Json};
use dsapi_core::catalog::{CatalogListing, DatasetFields};
use dsapi_core::{Catalog, QueryCriteria, SearchResult};
use prometheus::{Encoder, TextEncoder};
use serde::Deserialize;
use serde_json::{json, Value as JsonValue};

pub async fn list(State(state): State<AppState>) -> Json<CatalogListing> {
    Json(state.service.list())
}

pub async fn fields(
    State(state): State<AppState>,
    Path((dataset, version)): Path<(String, String)>,
) -> Result<Json<DatasetFields>, ApiError> {
    Ok(Json(state.service.fields(&dataset, &version)?))
}

/// Form body of a records search. Values stay raw strings so that bad
/// numbers surface as `invalid_param` rather than a generic form rejection.
#[derive(Debug, Default, Deserialize)]
pub struct RecordsForm {
    pub criteria: Option<String>,
    pub start: Option<String>,
    pub rows: Option<String>,
}

pub async fn records(
    State(state): State<AppState>,
    Path((dataset, version)): Path<(String, String)>,
    form: Result<Form<RecordsForm>, FormRejection>,
) -> Result<Json<SearchResult>, ApiError> {
    state.service.registry().get(&dataset, &version)?;
    let Form(form) = form.map_err(|e| ApiError::BadRequest(e.body_text()))?;
    let criteria = QueryCriteria::from_params(
        form.criteria.as_deref(),
        form.start.as_deref(),
        form.rows.as_deref(),
        state.default_rows,
    )?;
    let result = state
        .service
        .records_cancellable(&dataset, &version, &criteria, &state.shutdown)
        .await?;
    Ok(Json(result))
}

/// Whitespace-separated path patterns for `/openapi.json`.
#[derive(Debug, Default, Deserialize)]
pub struct OpenApiParams {
    pub include: Option<String>,
    pub exclude: Option<String>,
}

pub async fn openapi(
    State(state): State<AppState>,
    Query(params): Query<OpenApiParams>,
) -> Result<Json<JsonValue>, ApiError> {
    let split = |v: &Option<String>| -> Vec<String> {
        v.as_deref()
            .map(|s| s.split_whitespace().map(str::to_string).collect())
            .unwrap_or_else(Vec::new)
    };
    let filter = openapi::PathFilter::new(split(&params.include), split(&params.exclude))
        .map_err(|e| ApiError::BadRequest(format!("invalid path pattern: {e}")))?;
    let catalog = state.service.registry().snapshot();
    Ok(Json(openapi::document_filtered(&catalog, &filter)))
}

pub async fn reload(State(state): State<AppState>) -> Result<Json<JsonValue>, ApiError> {
    let path = state
        .catalog_path
        .clone()
        .ok_or_else(|| ApiError::BadRequest("no catalog file configured".into()))?;
    let catalog = tokio::task::spawn_blocking(move || Catalog::load(path))
        .await
        .map_err(|e| ApiError::Internal(format!("catalog loader: {e}")))??;
    let fingerprint = catalog.fingerprint().to_string();
    let datasets = catalog.len();
    let previous = state.service.reload(catalog);
    CATALOG_DATASETS.set(datasets as i64);
    let total = state.service.list().total();
    Ok(Json(json!({
        "fingerprint": fingerprint,
        "previousFingerprint": previous.fingerprint(),
        "datasets": datasets,
        "total": total,
    })))
}

pub async fn health() -> impl IntoResponse {
    (StatusCode::OK, "ok")
}

pub async fn metrics(State(state): State<AppState>) -> impl IntoResponse {
    BACKEND_PERMITS_AVAILABLE.set(state.service.gateway().available_permits() as i64);
    let encoder = TextEncoder::new();
    let mut buf = Vec::new();
    if let Err(e) = encoder.encode(&prometheus::gather(), &mut buf) {
        tracing::warn!(error = %e, "metrics encoding failed");
    }
    (
        StatusCode::OK,
        [(header::CONTENT_TYPE, encoder.format_type().to_string())],
        String::from_utf8(buf).unwrap_or_default(),
    )
}

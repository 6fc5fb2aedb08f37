use axum::extract::{MatchedPath, Request};
use axum::middleware::Next;
use axum::response::Response;
use once_cell::sync::Lazy;
use prometheus::{
    register_counter_vec, register_histogram_vec, register_int_gauge, CounterVec, HistogramVec,
    IntGauge,
};

pub static HTTP_REQUESTS_TOTAL: Lazy<CounterVec> = Lazy::new(|| {
    register_counter_vec!(
        "dsapi_http_requests_total",
        "HTTP requests by route and status",
        &["route", "status"]
    )
    .unwrap()
});

pub static HTTP_REQUEST_SECONDS: Lazy<HistogramVec> = Lazy::new(|| {
    register_histogram_vec!(
        "dsapi_http_request_seconds",
        "HTTP request latency by route",
        &["route"],
        vec![0.005, 0.01, 0.025, 0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0, 10.0]
    )
    .unwrap()
});

pub static BACKEND_PERMITS_AVAILABLE: Lazy<IntGauge> = Lazy::new(|| {
    register_int_gauge!(
        "dsapi_backend_permits_available",
        "Backend permits not held by an in-flight search"
    )
    .unwrap()
});

pub static CATALOG_DATASETS: Lazy<IntGauge> = Lazy::new(|| {
    register_int_gauge!("dsapi_catalog_datasets", "Datasets in the current catalog").unwrap()
});

/// Route-level middleware; labels by the matched route template, never the raw path.
pub async fn track(matched: Option<MatchedPath>, req: Request, next: Next) -> Response {
    let route = matched
        .as_ref()
        .map(MatchedPath::as_str)
        .unwrap_or("unmatched")
        .to_owned();
    let timer = HTTP_REQUEST_SECONDS
        .with_label_values(&[route.as_str()])
        .start_timer();
    let resp = next.run(req).await;
    timer.observe_duration();
    HTTP_REQUESTS_TOTAL
        .with_label_values(&[route.as_str(), resp.status().as_str()])
        .inc();
    resp
}

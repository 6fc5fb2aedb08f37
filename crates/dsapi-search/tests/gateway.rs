mod common;

use common::{hits, ScriptedBackend};
use dsapi_core::{BackendError, BackendErrorKind, DataError};
use dsapi_search::{GatewayConfig, SearchGateway};
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;

fn config() -> GatewayConfig {
    GatewayConfig {
        max_rows: 100,
        timeout: Duration::from_millis(500),
        max_retries: 2,
        retry_backoff: Duration::from_millis(1),
        max_in_flight: 4,
    }
}

fn gateway(backend: &ScriptedBackend, config: GatewayConfig) -> SearchGateway {
    SearchGateway::new(Arc::new(backend.clone()), config)
}

#[tokio::test]
async fn transient_failures_stop_after_max_retries() {
    let backend = ScriptedBackend::failing(BackendError::unavailable("connection refused"));
    let gw = gateway(&backend, config());

    let err = gw.execute("idx", "*:*", 0, 10).await.unwrap_err();

    assert_eq!(err.kind, BackendErrorKind::Unavailable);
    assert_eq!(backend.call_count(), 3);
}

#[tokio::test]
async fn malformed_is_not_retried() {
    let backend = ScriptedBackend::failing(BackendError::malformed("undefined field"));
    let gw = gateway(&backend, config());

    let err = gw.execute("idx", "x:1", 0, 10).await.unwrap_err();

    assert_eq!(err.kind, BackendErrorKind::Malformed);
    assert_eq!(backend.call_count(), 1);
}

#[tokio::test]
async fn recovers_after_one_transient_failure() {
    let backend = ScriptedBackend::answering(hits(3))
        .then(Err(BackendError::unavailable("503")));
    let gw = gateway(&backend, config());

    let res = gw.execute("idx", "*:*", 0, 10).await.unwrap();

    assert_eq!(res.num_found, 3);
    assert_eq!(backend.call_count(), 2);
}

#[tokio::test]
async fn rows_are_clamped_before_reaching_the_backend() {
    let backend = ScriptedBackend::answering(hits(1));
    let gw = gateway(&backend, config());

    gw.execute("idx", "*:*", 7, 5_000).await.unwrap();
    gw.execute("idx", "*:*", 0, 0).await.unwrap();

    let calls = backend.calls();
    assert_eq!((calls[0].offset, calls[0].limit), (7, 100));
    assert_eq!(calls[1].limit, 1);
}

#[tokio::test]
async fn timeout_reports_timeout_and_returns_the_permit() {
    let backend = ScriptedBackend::answering(hits(1)).delay(Duration::from_millis(300));
    let gw = gateway(
        &backend,
        GatewayConfig {
            timeout: Duration::from_millis(20),
            max_retries: 0,
            max_in_flight: 2,
            ..config()
        },
    );

    let err = gw.execute("idx", "*:*", 0, 10).await.unwrap_err();

    assert_eq!(err.kind, BackendErrorKind::Timeout);
    assert_eq!(gw.available_permits(), 2);
    assert_eq!(backend.active(), 0);
}

#[tokio::test]
async fn timeouts_are_retried() {
    let backend = ScriptedBackend::answering(hits(1)).delay(Duration::from_millis(200));
    let gw = gateway(
        &backend,
        GatewayConfig {
            timeout: Duration::from_millis(10),
            max_retries: 1,
            ..config()
        },
    );

    let err = gw.execute("idx", "*:*", 0, 10).await.unwrap_err();

    assert_eq!(err.kind, BackendErrorKind::Timeout);
    assert_eq!(backend.call_count(), 2);
}

#[tokio::test]
async fn cancellation_interrupts_a_slow_search() {
    let backend = ScriptedBackend::answering(hits(1)).delay(Duration::from_secs(5));
    let gw = gateway(
        &backend,
        GatewayConfig {
            timeout: Duration::from_secs(10),
            ..config()
        },
    );
    let token = CancellationToken::new();
    let trigger = token.clone();
    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(20)).await;
        trigger.cancel();
    });

    let err = gw
        .execute_cancellable("idx", "*:*", 0, 10, &token)
        .await
        .unwrap_err();

    assert!(matches!(err, DataError::Cancelled));
    assert_eq!(gw.available_permits(), 4);
    assert_eq!(backend.active(), 0);
}

#[tokio::test]
async fn cancelled_token_skips_the_backend() {
    let backend = ScriptedBackend::answering(hits(1));
    let gw = gateway(&backend, config());
    let token = CancellationToken::new();
    token.cancel();

    let err = gw
        .execute_cancellable("idx", "*:*", 0, 10, &token)
        .await
        .unwrap_err();

    assert!(matches!(err, DataError::Cancelled));
    assert_eq!(backend.call_count(), 0);
}

#[tokio::test]
async fn in_flight_calls_never_exceed_the_pool() {
    let backend = ScriptedBackend::answering(hits(1)).delay(Duration::from_millis(25));
    let gw = gateway(
        &backend,
        GatewayConfig {
            max_in_flight: 2,
            ..config()
        },
    );

    let calls = (0..6).map(|_| gw.execute("idx", "*:*", 0, 10));
    let results = futures::future::join_all(calls).await;

    assert!(results.iter().all(Result::is_ok));
    assert_eq!(backend.call_count(), 6);
    assert!(backend.peak_concurrency() <= 2);
    assert_eq!(gw.available_permits(), 2);
}

#[tokio::test]
async fn abandoned_searches_leave_nothing_in_flight() {
    let backend = ScriptedBackend::answering(hits(1)).delay(Duration::from_millis(50));
    let gw = gateway(
        &backend,
        GatewayConfig {
            max_in_flight: 2,
            ..config()
        },
    );

    for _ in 0..3 {
        let token = CancellationToken::new();
        let trigger = token.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(5)).await;
            trigger.cancel();
        });
        let err = gw
            .execute_cancellable("idx", "*:*", 0, 10, &token)
            .await
            .unwrap_err();
        assert!(matches!(err, DataError::Cancelled));
    }
    assert_eq!(backend.active(), 0);

    let calls = (0..4).map(|_| gw.execute("idx", "*:*", 0, 10));
    let results = futures::future::join_all(calls).await;

    assert!(results.iter().all(Result::is_ok));
    assert!(backend.peak_concurrency() <= 2);
    assert_eq!(backend.active(), 0);
}

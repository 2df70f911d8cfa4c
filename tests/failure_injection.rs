//! Failure injection tests for the circuit breaker.

use std::sync::Arc;
use std::time::Duration;

use futures_util::future::join_all;
use resource_breaker::resilience::{retry_through, RetryPolicy};
use resource_breaker::{BreakerError, BreakerRegistry, CircuitBreakerConfig, CircuitState};
use tokio::time::advance;

mod common;

use common::{breaker, QueryError, ScriptedResource};

#[tokio::test(start_paused = true)]
async fn test_fast_fail_after_threshold() {
    let cb = breaker(5, 30_000, 2);
    let store = ScriptedResource::new(false);

    for _ in 0..5 {
        let err = cb.execute(|| store.query()).await.unwrap_err();
        assert!(err.inner().is_some());
    }
    assert_eq!(store.calls(), 5);

    // Would succeed now, but the circuit must not let it through.
    store.set_healthy(true);
    let err = cb.execute(|| store.query()).await.unwrap_err();

    assert!(err.is_open());
    assert_eq!(store.calls(), 5);
}

#[tokio::test(start_paused = true)]
async fn test_cooldown_probe() {
    let cb = breaker(5, 30_000, 2);
    let store = ScriptedResource::new(false);
    for _ in 0..5 {
        let _ = cb.execute(|| store.query()).await;
    }
    store.set_healthy(true);

    advance(Duration::from_millis(29_999)).await;
    assert!(cb.execute(|| store.query()).await.unwrap_err().is_open());
    assert_eq!(store.calls(), 5);

    advance(Duration::from_millis(1)).await;
    assert_eq!(cb.execute(|| store.query()).await.unwrap(), "document-6");
    assert_eq!(store.calls(), 6);
    assert_eq!(cb.state(), CircuitState::HalfOpen);
}

#[tokio::test(start_paused = true)]
async fn test_half_open_success_path() {
    let cb = breaker(2, 1_000, 2);
    let store = ScriptedResource::new(false);
    for _ in 0..2 {
        let _ = cb.execute(|| store.query()).await;
    }
    store.set_healthy(true);
    advance(Duration::from_millis(1_000)).await;

    cb.execute(|| store.query()).await.unwrap();
    cb.execute(|| store.query()).await.unwrap();

    let snap = cb.snapshot();
    assert_eq!(snap.state, CircuitState::Closed);
    assert_eq!(snap.failure_count, 0);
    assert_eq!(snap.success_count, 0);
}

#[tokio::test(start_paused = true)]
async fn test_half_open_failure_path() {
    let cb = breaker(2, 1_000, 2);
    let store = ScriptedResource::new(false);
    for _ in 0..2 {
        let _ = cb.execute(|| store.query()).await;
    }
    advance(Duration::from_millis(1_000)).await;

    store.set_healthy(true);
    cb.execute(|| store.query()).await.unwrap();
    assert_eq!(cb.snapshot().success_count, 1);

    advance(Duration::from_millis(250)).await;
    store.set_healthy(false);
    let _ = cb.execute(|| store.query()).await;

    let snap = cb.snapshot();
    assert_eq!(snap.state, CircuitState::Open);
    assert_eq!(snap.success_count, 0);
    assert_eq!(snap.last_failure_ms_ago, Some(0));
}

#[tokio::test]
async fn test_pass_through() {
    let cb = breaker(5, 30_000, 2);
    let store = ScriptedResource::new(true);

    let value = cb.execute(|| store.query()).await.unwrap();
    assert_eq!(value, "document-1");

    store.set_healthy(false);
    let err = cb.execute(|| store.query()).await.unwrap_err();
    assert_eq!(err.to_string(), "document store unreachable (request 2)");
    assert_eq!(err.into_inner(), Some(QueryError::Unreachable(2)));
    assert_eq!(cb.state(), CircuitState::Closed);
}

#[tokio::test(start_paused = true)]
async fn test_idempotent_rejection() {
    let cb = breaker(1, 30_000, 2);
    let store = ScriptedResource::new(false);
    let _ = cb.execute(|| store.query()).await;

    for _ in 0..1_000 {
        match cb.execute(|| store.query()).await {
            Err(BreakerError::Open(open)) => assert_eq!(open.breaker, "users"),
            other => panic!("expected rejection, got {other:?}"),
        }
    }

    assert_eq!(store.calls(), 1);
    assert_eq!(cb.state(), CircuitState::Open);
}

#[tokio::test(start_paused = true)]
async fn test_end_to_end_scenario() {
    let cb = breaker(2, 1_000, 1);
    let store = ScriptedResource::new(false);

    let _ = cb.execute(|| store.query()).await;
    let _ = cb.execute(|| store.query()).await;
    assert_eq!(cb.state(), CircuitState::Open);

    advance(Duration::from_millis(500)).await;
    store.set_healthy(true);
    assert!(cb.execute(|| store.query()).await.unwrap_err().is_open());

    advance(Duration::from_millis(500)).await;
    assert!(cb.execute(|| store.query()).await.is_ok());
    assert_eq!(cb.state(), CircuitState::Closed);

    store.set_healthy(false);
    let _ = cb.execute(|| store.query()).await;
    let snap = cb.snapshot();
    assert_eq!(snap.state, CircuitState::Closed);
    assert_eq!(snap.failure_count, 1);
    assert_eq!(store.calls(), 4);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_callers_share_state() {
    let cb = Arc::new(breaker(10, 60_000, 2));
    let store = Arc::new(ScriptedResource::new(false));

    let tasks = (0..64).map(|_| {
        let cb = Arc::clone(&cb);
        let store = Arc::clone(&store);
        tokio::spawn(async move { cb.execute(|| store.query()).await })
    });
    let results = join_all(tasks).await;

    let rejected = results
        .iter()
        .filter(|r| matches!(r, Ok(Err(e)) if e.is_open()))
        .count() as u32;
    assert_eq!(rejected + store.calls(), 64);
    assert!(store.calls() >= 10);
    assert_eq!(cb.state(), CircuitState::Open);

    let before = store.calls();
    for _ in 0..20 {
        assert!(cb.execute(|| store.query()).await.unwrap_err().is_open());
    }
    assert_eq!(store.calls(), before);
}

#[tokio::test(start_paused = true)]
async fn test_concurrent_probes_after_cooldown() {
    let cb = Arc::new(breaker(1, 1_000, 2));
    let store = Arc::new(ScriptedResource::new(false));
    let _ = cb.execute(|| store.query()).await;
    store.set_healthy(true);
    advance(Duration::from_millis(1_000)).await;

    let probes = (0..5).map(|_| {
        let cb = Arc::clone(&cb);
        let store = Arc::clone(&store);
        tokio::spawn(async move {
            cb.execute(|| store.slow_query(Duration::from_millis(10))).await
        })
    });

    for result in join_all(probes).await {
        assert!(result.unwrap().is_ok());
    }
    assert_eq!(store.calls(), 6);
    assert_eq!(cb.state(), CircuitState::Closed);
}

#[tokio::test(start_paused = true)]
async fn test_registry_shares_breaker_across_call_sites() {
    let registry = BreakerRegistry::new(CircuitBreakerConfig {
        failure_threshold: 3,
        ..CircuitBreakerConfig::default()
    });
    let store = ScriptedResource::new(false);

    // Two independent call sites guarding the same resource.
    let find_user = registry.get_or_create("users");
    let update_user = registry.get_or_create("users");

    let _ = find_user.execute(|| store.query()).await;
    let _ = update_user.execute(|| store.query()).await;
    let _ = find_user.execute(|| store.query()).await;

    assert!(update_user.execute(|| store.query()).await.unwrap_err().is_open());
    assert_eq!(store.calls(), 3);

    let products = registry.get_or_create("products");
    assert_eq!(products.state(), CircuitState::Closed);
}

#[tokio::test(start_paused = true)]
async fn test_retries_layered_above_breaker() {
    let cb = breaker(3, 5_000, 1);
    let store = ScriptedResource::new(false);
    let policy = RetryPolicy {
        max_attempts: 10,
        ..RetryPolicy::default()
    };

    let err = retry_through(&policy, &cb, || store.query()).await.unwrap_err();
    assert!(err.is_open());
    assert_eq!(store.calls(), 3);

    store.set_healthy(true);
    advance(Duration::from_millis(5_000)).await;
    let value = retry_through(&policy, &cb, || store.query()).await.unwrap();
    assert_eq!(value, "document-4");
    assert_eq!(cb.state(), CircuitState::Closed);
}

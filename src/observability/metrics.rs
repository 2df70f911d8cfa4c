//! Metrics collection and exposition.
//!
//! # Metrics
//! - `breaker_state` (gauge): 0=closed, 1=open, 2=half-open, by breaker
//! - `breaker_transitions_total` (counter): state changes by breaker, from, to
//! - `breaker_rejections_total` (counter): calls refused by an open circuit
//! - `breaker_calls_total` (counter): admitted calls by breaker, outcome
//! - `breaker_call_duration_seconds` (histogram): admitted call latency
//!
//! # Design Decisions
//! - Recorded through the `metrics` facade; a no-op until a recorder is installed
//! - Labels carry the breaker (resource) name

use std::net::SocketAddr;

use metrics::{counter, gauge, histogram};
use metrics_exporter_prometheus::PrometheusBuilder;
use tokio::time::Instant;

use crate::resilience::CircuitState;

/// Install the Prometheus recorder and expose it over HTTP at `addr`.
pub fn init_metrics(addr: SocketAddr) {
    match PrometheusBuilder::new().with_http_listener(addr).install() {
        Ok(()) => tracing::info!(address = %addr, "Metrics endpoint listening"),
        Err(e) => tracing::error!(address = %addr, error = %e, "Failed to install metrics exporter"),
    }
}

pub fn record_state(breaker: &str, state: CircuitState) {
    gauge!("breaker_state", "breaker" => breaker.to_string()).set(state.as_gauge());
}

pub fn record_transition(breaker: &str, from: CircuitState, to: CircuitState) {
    counter!(
        "breaker_transitions_total",
        "breaker" => breaker.to_string(),
        "from" => from.as_str(),
        "to" => to.as_str()
    )
    .increment(1);
    record_state(breaker, to);
}

pub fn record_rejection(breaker: &str) {
    counter!("breaker_rejections_total", "breaker" => breaker.to_string()).increment(1);
}

pub fn record_call(breaker: &str, outcome: &'static str, started: Instant) {
    counter!(
        "breaker_calls_total",
        "breaker" => breaker.to_string(),
        "outcome" => outcome
    )
    .increment(1);
    histogram!("breaker_call_duration_seconds", "breaker" => breaker.to_string())
        .record(started.elapsed().as_secs_f64());
}

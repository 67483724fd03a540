//! Prometheus Metrics Module
//!
//! Process-wide command metrics.
//!
//! # Metrics Collected
//! - Dispatch outcomes by command
//! - Gate denials by command and stage
//! - Handler latency histograms
//! - Rate limiter events (notification, execution, release)
//! - Dispatches currently in flight

use once_cell::sync::Lazy;
use prometheus::{
    Encoder, HistogramOpts, HistogramVec, IntCounterVec, IntGauge, Opts, Registry, TextEncoder,
};

/// Global metrics registry
pub static REGISTRY: Lazy<Registry> = Lazy::new(|| {
    let registry = Registry::new();
    register_metrics(&registry);
    registry
});

/// Dispatch counter by command and outcome (`invoked`, `denied`, `failed`, `ignored`)
pub static COMMANDS_DISPATCHED_TOTAL: Lazy<IntCounterVec> = Lazy::new(|| {
    IntCounterVec::new(
        Opts::new("commands_dispatched_total", "Total number of command dispatches")
            .namespace("chat_commands"),
        &["command", "outcome"],
    )
    .expect("Failed to create COMMANDS_DISPATCHED_TOTAL metric")
});

/// Denials by command and gate stage
pub static COMMAND_DENIALS_TOTAL: Lazy<IntCounterVec> = Lazy::new(|| {
    IntCounterVec::new(
        Opts::new("command_denials_total", "Total number of gate denials")
            .namespace("chat_commands"),
        &["command", "stage"],
    )
    .expect("Failed to create COMMAND_DENIALS_TOTAL metric")
});

/// Handler latency in seconds
pub static COMMAND_HANDLER_DURATION_SECONDS: Lazy<HistogramVec> = Lazy::new(|| {
    let buckets = vec![0.001, 0.005, 0.01, 0.025, 0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0, 10.0];
    HistogramVec::new(
        HistogramOpts::new(
            "command_handler_duration_seconds",
            "Command handler latency in seconds",
        )
        .namespace("chat_commands")
        .buckets(buckets),
        &["command"],
    )
    .expect("Failed to create COMMAND_HANDLER_DURATION_SECONDS metric")
});

/// Rate limiter events
pub static RATELIMIT_EVENTS_TOTAL: Lazy<IntCounterVec> = Lazy::new(|| {
    IntCounterVec::new(
        Opts::new("ratelimit_events_total", "Rate limiter events by kind")
            .namespace("chat_commands"),
        &["event"], // "notification", "execution", "release"
    )
    .expect("Failed to create RATELIMIT_EVENTS_TOTAL metric")
});

/// Dispatches currently running or waiting for a worker slot
pub static DISPATCHES_IN_FLIGHT: Lazy<IntGauge> = Lazy::new(|| {
    IntGauge::with_opts(
        Opts::new("dispatches_in_flight", "Dispatches currently in flight").namespace("chat_commands"),
    )
    .expect("Failed to create DISPATCHES_IN_FLIGHT metric")
});

/// Register all metrics with the registry
fn register_metrics(registry: &Registry) {
    registry
        .register(Box::new(COMMANDS_DISPATCHED_TOTAL.clone()))
        .expect("Failed to register COMMANDS_DISPATCHED_TOTAL");
    registry
        .register(Box::new(COMMAND_DENIALS_TOTAL.clone()))
        .expect("Failed to register COMMAND_DENIALS_TOTAL");
    registry
        .register(Box::new(COMMAND_HANDLER_DURATION_SECONDS.clone()))
        .expect("Failed to register COMMAND_HANDLER_DURATION_SECONDS");
    registry
        .register(Box::new(RATELIMIT_EVENTS_TOTAL.clone()))
        .expect("Failed to register RATELIMIT_EVENTS_TOTAL");
    registry
        .register(Box::new(DISPATCHES_IN_FLIGHT.clone()))
        .expect("Failed to register DISPATCHES_IN_FLIGHT");
}

/// Collect and encode all metrics as Prometheus text format
pub fn gather_metrics() -> String {
    let encoder = TextEncoder::new();
    let metric_families = REGISTRY.gather();
    let mut buffer = Vec::new();
    if let Err(e) = encoder.encode(&metric_families, &mut buffer) {
        tracing::warn!(error = %e, "Failed to encode metrics");
        return String::new();
    }
    String::from_utf8_lossy(&buffer).into_owned()
}

/// Record the terminal outcome of one dispatch
pub fn record_dispatch(command: &str, outcome: &str) {
    COMMANDS_DISPATCHED_TOTAL
        .with_label_values(&[command, outcome])
        .inc();
}

/// Record a gate denial
pub fn record_denial(command: &str, stage: &str) {
    COMMAND_DENIALS_TOTAL.with_label_values(&[command, stage]).inc();
}

/// Record handler latency
pub fn record_handler_duration(command: &str, duration_secs: f64) {
    COMMAND_HANDLER_DURATION_SECONDS
        .with_label_values(&[command])
        .observe(duration_secs);
}

/// Record a rate limiter event
pub fn record_ratelimit_event(event: &str) {
    RATELIMIT_EVENTS_TOTAL.with_label_values(&[event]).inc();
}

/// Track a dispatch entering (`+1`) or leaving (`-1`) the pool
pub fn adjust_in_flight(delta: i64) {
    DISPATCHES_IN_FLIGHT.add(delta);
}

//! Prometheus metrics for the session hub.
//!
//! Metrics are exposed on a dedicated HTTP listener (see [`crate::http`]).
//!
//! - `planning_poker_active_users` - Sessions currently joined (gauge)
//! - `planning_poker_users_total` - Sessions ever joined (counter)
//! - `planning_poker_active_rooms` - Rooms currently open (gauge)
//! - `planning_poker_events_total{type}` - Inbound events handled
//! - `planning_poker_event_errors_total{type,error}` - Inbound events that failed
//! - `planning_poker_event_duration_seconds{type}` - Event handling latency
//! - `planning_poker_lock_wait_seconds` - Time spent acquiring room locks
//! - `planning_poker_broadcast_dropped_total` - Updates a local client missed
//!
//! Use cases record domain metrics through the [`Metrics`] trait so tests
//! can observe or silence them; [`PrometheusMetrics`] forwards to the
//! process-wide registry.

use prometheus::{
    Encoder, Histogram, HistogramOpts, HistogramVec, IntCounter, IntCounterVec, IntGauge, Opts,
    Registry, TextEncoder,
};
use std::sync::OnceLock;
use std::time::Duration;

/// Global Prometheus registry for all metrics.
pub static REGISTRY: OnceLock<Registry> = OnceLock::new();

pub fn registry() -> &'static Registry {
    REGISTRY.get_or_init(Registry::new)
}

// ========================================================================
// Gauges
// ========================================================================

pub static ACTIVE_USERS: OnceLock<IntGauge> = OnceLock::new();

pub static ACTIVE_ROOMS: OnceLock<IntGauge> = OnceLock::new();

// ========================================================================
// Counters
// ========================================================================

pub static USERS_TOTAL: OnceLock<IntCounter> = OnceLock::new();

pub static EVENTS: OnceLock<IntCounterVec> = OnceLock::new();

pub static EVENT_ERRORS: OnceLock<IntCounterVec> = OnceLock::new();

/// Updates that could not be written to a local client.
pub static BROADCAST_DROPPED: OnceLock<IntCounter> = OnceLock::new();

// ========================================================================
// Histograms
// ========================================================================

pub static EVENT_LATENCY: OnceLock<HistogramVec> = OnceLock::new();

pub static LOCK_WAIT: OnceLock<Histogram> = OnceLock::new();

/// Initialize the Prometheus metrics registry.
///
/// Call once at startup. Later calls leave the registered metrics in place.
pub fn init() {
    let r = registry();

    macro_rules! register {
        ($metric:ident, $init:expr) => {
            match $init {
                Ok(m) => {
                    if let Err(e) = r.register(Box::new(m.clone())) {
                        tracing::warn!(
                            error = %e,
                            concat!("Failed to register metric ", stringify!($metric))
                        );
                    }
                    let _ = $metric.set(m);
                }
                Err(e) => {
                    tracing::error!(
                        error = %e,
                        concat!("Failed to create metric ", stringify!($metric))
                    );
                }
            }
        };
    }

    register!(
        ACTIVE_USERS,
        IntGauge::new("planning_poker_active_users", "Sessions currently joined")
    );
    register!(
        ACTIVE_ROOMS,
        IntGauge::new("planning_poker_active_rooms", "Rooms currently open")
    );
    register!(
        USERS_TOTAL,
        IntCounter::new("planning_poker_users_total", "Sessions ever joined")
    );
    register!(
        EVENTS,
        IntCounterVec::new(
            Opts::new(
                "planning_poker_events_total",
                "Inbound events handled by type"
            ),
            &["type"]
        )
    );
    register!(
        EVENT_ERRORS,
        IntCounterVec::new(
            Opts::new(
                "planning_poker_event_errors_total",
                "Inbound events that failed by type and error"
            ),
            &["type", "error"]
        )
    );
    register!(
        BROADCAST_DROPPED,
        IntCounter::new(
            "planning_poker_broadcast_dropped_total",
            "Room updates a local client missed"
        )
    );
    register!(
        EVENT_LATENCY,
        HistogramVec::new(
            HistogramOpts::new(
                "planning_poker_event_duration_seconds",
                "Inbound event latency by type"
            )
            .buckets(vec![0.0005, 0.001, 0.005, 0.01, 0.05, 0.1, 0.5, 1.0, 5.0]),
            &["type"]
        )
    );
    register!(
        LOCK_WAIT,
        Histogram::with_opts(
            HistogramOpts::new(
                "planning_poker_lock_wait_seconds",
                "Time spent acquiring room locks"
            )
            .buckets(vec![0.0001, 0.001, 0.005, 0.01, 0.05, 0.1, 0.5, 1.0, 5.0])
        )
    );
}

/// Gather all metrics and encode them in Prometheus text format.
pub fn gather_metrics() -> String {
    let encoder = TextEncoder::new();
    let metric_families = registry().gather();
    let mut buffer = vec![];
    if let Err(e) = encoder.encode(&metric_families, &mut buffer) {
        tracing::error!(error = %e, "Failed to encode Prometheus metrics");
        return String::new();
    }
    match String::from_utf8(buffer) {
        Ok(s) => s,
        Err(e) => {
            tracing::error!(error = %e, "Prometheus metrics were not valid UTF-8");
            String::new()
        }
    }
}

// ============================================================================
// Recording helpers
// ============================================================================

#[inline]
pub fn record_event(event: &str, duration_secs: f64) {
    if let Some(c) = EVENTS.get() {
        c.with_label_values(&[event]).inc();
    }
    if let Some(h) = EVENT_LATENCY.get() {
        h.with_label_values(&[event]).observe(duration_secs);
    }
}

#[inline]
pub fn record_event_error(event: &str, error: &str) {
    if let Some(c) = EVENT_ERRORS.get() {
        c.with_label_values(&[event, error]).inc();
    }
}

#[inline]
pub fn record_broadcast_dropped() {
    if let Some(c) = BROADCAST_DROPPED.get() {
        c.inc();
    }
}

// ============================================================================
// Domain metrics sink
// ============================================================================

/// Domain metrics recorded by use cases.
pub trait Metrics: Send + Sync {
    fn user_joined(&self);

    fn user_left(&self);

    fn room_opened(&self);

    fn room_closed(&self);

    fn lock_waited(&self, wait: Duration);
}

/// Records into the global Prometheus registry.
#[derive(Debug, Default, Clone, Copy)]
pub struct PrometheusMetrics;

impl Metrics for PrometheusMetrics {
    fn user_joined(&self) {
        if let Some(g) = ACTIVE_USERS.get() {
            g.inc();
        }
        if let Some(c) = USERS_TOTAL.get() {
            c.inc();
        }
    }

    fn user_left(&self) {
        if let Some(g) = ACTIVE_USERS.get() {
            g.dec();
        }
    }

    fn room_opened(&self) {
        if let Some(g) = ACTIVE_ROOMS.get() {
            g.inc();
        }
    }

    fn room_closed(&self) {
        if let Some(g) = ACTIVE_ROOMS.get() {
            g.dec();
        }
    }

    fn lock_waited(&self, wait: Duration) {
        if let Some(h) = LOCK_WAIT.get() {
            h.observe(wait.as_secs_f64());
        }
    }
}

/// Discards everything.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopMetrics;

impl Metrics for NoopMetrics {
    fn user_joined(&self) {}
    fn user_left(&self) {}
    fn room_opened(&self) {}
    fn room_closed(&self) {}
    fn lock_waited(&self, _wait: Duration) {}
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_metrics_lifecycle() {
        init();

        record_event("vote", 0.001);
        record_event_error("vote", "not_authorized");
        PrometheusMetrics.user_joined();
        PrometheusMetrics.room_opened();

        let output = gather_metrics();
        assert!(output.contains("planning_poker_events_total"));
        assert!(output.contains("planning_poker_event_errors_total"));
        assert!(output.contains("planning_poker_users_total"));
        assert!(output.contains("planning_poker_active_rooms"));
    }
}

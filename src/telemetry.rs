//! Telemetry utilities: subscriber setup, event timing and span constructors.

use crate::config::{LogConfig, LogFormat};
use std::time::Instant;
use tracing_subscriber::EnvFilter;

/// Install the global tracing subscriber. `RUST_LOG` overrides the
/// configured level.
pub fn init_tracing(log: &LogConfig) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(log.level.as_str()));

    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_thread_ids(false);

    match log.format {
        LogFormat::Json => builder.json().init(),
        LogFormat::Pretty => builder.init(),
    }
}

/// Guard for timing an inbound event and recording metrics.
///
/// Records the event and its latency when dropped, unless it failed.
pub struct EventTimer {
    event: &'static str,
    start: Instant,
    failed: Option<&'static str>,
}

impl EventTimer {
    pub fn new(event: &'static str) -> Self {
        Self {
            event,
            start: Instant::now(),
            failed: None,
        }
    }

    /// Count the event as failed with `error_code` instead.
    pub fn fail(&mut self, error_code: &'static str) {
        self.failed = Some(error_code);
    }
}

impl Drop for EventTimer {
    fn drop(&mut self) {
        match self.failed {
            Some(code) => crate::metrics::record_event_error(self.event, code),
            None => {
                let duration = self.start.elapsed().as_secs_f64();
                crate::metrics::record_event(self.event, duration);
            }
        }
    }
}

/// Standardized span constructors.
pub mod spans {
    use tracing::{Span, info_span};

    /// Root span for the room hub; parents its forwarding tasks.
    pub fn hub(backend: &str) -> Span {
        info_span!("hub", backend = %backend)
    }

    /// Root span for use cases; parents every room mutation.
    pub fn use_cases() -> Span {
        info_span!("use_cases")
    }

    /// Span for one use case run.
    pub fn use_case(parent: &Span, name: &'static str, room_id: &str) -> Span {
        info_span!(parent: parent, "use_case", name = name, room_id = %room_id)
    }

    /// Span for a WebSocket session, before and after the client id is known.
    pub fn session(room_id: &str) -> Span {
        info_span!("session", room_id = %room_id, client_id = tracing::field::Empty)
    }
}

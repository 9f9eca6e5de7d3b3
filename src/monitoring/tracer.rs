/*!
 * Lifecycle Tracing
 * Structured tracing for arena and object transitions using the tracing crate
 *
 * Features:
 * - Compact human-readable output for development
 * - JSON-formatted logs for structured parsing
 * - Disposal spans that flag slow drains
 */

use crate::core::errors::LifecycleResult;
use crate::core::types::ObjectId;
use std::time::{Duration, Instant};
use tracing::{debug, info, span, warn, Level};
use tracing_subscriber::{fmt::format::FmtSpan, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Disposal slower than this is reported at `warn`
const SLOW_DISPOSAL: Duration = Duration::from_millis(100);

/// Initialize structured tracing
///
/// Environment variables:
/// - RUST_LOG: Set log level (default: info)
/// - LIFECYCLE_TRACE_JSON: Enable JSON output (default: false)
///
/// Returns `false` if a global subscriber was already installed.
pub fn init_tracing() -> bool {
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    let use_json = std::env::var("LIFECYCLE_TRACE_JSON")
        .map(|v| v == "1" || v == "true")
        .unwrap_or(false);

    let registry = tracing_subscriber::registry().with(env_filter);

    let installed = if use_json {
        registry
            .with(
                tracing_subscriber::fmt::layer()
                    .json()
                    .with_target(true)
                    .with_thread_ids(true)
                    .with_thread_names(true)
                    .with_current_span(true)
                    .with_span_list(true)
                    .with_span_events(FmtSpan::CLOSE),
            )
            .try_init()
            .is_ok()
    } else {
        registry
            .with(
                tracing_subscriber::fmt::layer()
                    .with_target(true)
                    .with_thread_ids(true)
                    .with_span_events(FmtSpan::CLOSE)
                    .compact(),
            )
            .try_init()
            .is_ok()
    };

    if installed {
        info!(json = use_json, "Lifecycle tracing initialized");
    }
    installed
}

/// Span around one free, clear or cascade of a native object
pub struct DisposalSpan {
    span: tracing::Span,
    start: Instant,
    operation: &'static str,
    object: ObjectId,
}

impl DisposalSpan {
    pub fn new(operation: &'static str, object: ObjectId) -> Self {
        let span = span!(
            Level::DEBUG,
            "disposal",
            operation,
            object = %object,
            duration_us = tracing::field::Empty,
            result = tracing::field::Empty,
        );
        Self {
            span,
            start: Instant::now(),
            operation,
            object,
        }
    }

    pub fn enter(&self) -> tracing::span::Entered<'_> {
        self.span.enter()
    }

    pub fn record_result<T>(&self, result: &LifecycleResult<T>) {
        match result {
            Ok(_) => self.span.record("result", "success"),
            Err(e) => self.span.record("result", tracing::field::display(e)),
        };
    }
}

impl Drop for DisposalSpan {
    fn drop(&mut self) {
        let duration = self.start.elapsed();
        let _entered = self.span.enter();
        self.span.record("duration_us", duration.as_micros() as u64);

        if duration > SLOW_DISPOSAL {
            warn!(
                operation = self.operation,
                object = %self.object,
                duration_ms = duration.as_millis() as u64,
                slow = true,
                "Slow disposal detected"
            );
        } else {
            debug!(
                operation = self.operation,
                object = %self.object,
                duration_us = duration.as_micros() as u64,
                "Disposal completed"
            );
        }
    }
}

//! Dispatch metrics.
//!
//! Recorded through the `metrics` facade; install any recorder to export
//! them. Without one, recording is a no-op.
//!
//! | Metric | Type | Labels | Description |
//! |--------|------|--------|-------------|
//! | `waypoint_dispatch_total` | Counter | `outcome` | Dispatched requests |
//! | `waypoint_dispatch_duration_seconds` | Histogram | `outcome` | Dispatch latency |

use std::time::Duration;

use metrics::{counter, describe_counter, describe_histogram, histogram, Unit};

/// Counter of dispatched requests.
pub const DISPATCH_TOTAL: &str = "waypoint_dispatch_total";

/// Histogram of dispatch latency.
pub const DISPATCH_DURATION: &str = "waypoint_dispatch_duration_seconds";

/// How a dispatch ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DispatchOutcome {
    /// A route matched and produced a response.
    Matched,
    /// No route matched and the fallback answered.
    Fallback,
    /// No route matched and there was no fallback.
    NotFound,
    /// The path exists for other methods.
    MethodNotAllowed,
    /// Resolution or declaration failure.
    Error,
}

impl DispatchOutcome {
    /// Returns the label value.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Matched => "matched",
            Self::Fallback => "fallback",
            Self::NotFound => "not_found",
            Self::MethodNotAllowed => "method_not_allowed",
            Self::Error => "error",
        }
    }
}

/// Registers metric descriptions with the installed recorder.
pub fn describe_metrics() {
    describe_counter!(DISPATCH_TOTAL, Unit::Count, "Total number of dispatched requests");
    describe_histogram!(
        DISPATCH_DURATION,
        Unit::Seconds,
        "Time from dispatch start to response"
    );
}

/// Records one dispatch.
pub fn record_dispatch(outcome: DispatchOutcome, duration: Duration) {
    let outcome = outcome.as_str();
    counter!(DISPATCH_TOTAL, "outcome" => outcome).increment(1);
    histogram!(DISPATCH_DURATION, "outcome" => outcome).record(duration.as_secs_f64());
}

//! Platform request metrics.

use metrics::{counter, histogram};

/// Metric name constants for consistency.
pub mod names {
    /// Platform HTTP requests by step and status.
    pub const REQUESTS_TOTAL: &str = "reposter_platform_requests_total";

    /// Platform request latency in seconds by step.
    pub const LATENCY_SECONDS: &str = "reposter_platform_latency_seconds";

    /// Feed retries by step.
    pub const RETRIES_TOTAL: &str = "reposter_platform_retries_total";
}

/// Record metrics for a completed platform request.
pub fn record_request(step: &str, status: u16, latency_ms: f64) {
    counter!(
        names::REQUESTS_TOTAL,
        "step" => step.to_string(),
        "status" => status.to_string()
    )
    .increment(1);

    histogram!(names::LATENCY_SECONDS, "step" => step.to_string()).record(latency_ms / 1000.0);
}

/// Record a retry attempt.
pub fn record_retry(step: &str) {
    counter!(names::RETRIES_TOTAL, "step" => step.to_string()).increment(1);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_recording_without_recorder_is_noop() {
        record_request("publish", 200, 12.5);
        record_retry("item_list");
    }
}

//! Poll loop metrics and the optional Prometheus exporter.

use std::net::SocketAddr;

use metrics::counter;
use metrics_exporter_prometheus::PrometheusBuilder;

use crate::error::{WorkerError, WorkerResult};

/// Metric names as constants for consistency.
pub mod names {
    pub const POLL_TICKS_TOTAL: &str = "reposter_poll_ticks_total";
    pub const VIDEOS_PROCESSED_TOTAL: &str = "reposter_videos_processed_total";
    pub const PUBLISH_FAILURES_TOTAL: &str = "reposter_publish_failures_total";
    pub const SLIDESHOWS_SKIPPED_TOTAL: &str = "reposter_slideshows_skipped_total";
    pub const UNLISTED_SKIPPED_TOTAL: &str = "reposter_unlisted_skipped_total";
}

/// Serve `/metrics` on `addr`.
pub fn install_exporter(addr: SocketAddr) -> WorkerResult<()> {
    PrometheusBuilder::new()
        .with_http_listener(addr)
        .install()
        .map_err(|e| WorkerError::config_error(format!("metrics exporter: {}", e)))
}

/// Record a poll tick by plan (`up_to_date`, `deleted`, `process`) or `failed`.
pub fn record_tick(plan: &str) {
    counter!(names::POLL_TICKS_TOTAL, "plan" => plan.to_string()).increment(1);
}

/// Record one video leaving the pipeline with `outcome`.
pub fn record_video(outcome: &str) {
    counter!(names::VIDEOS_PROCESSED_TOTAL, "outcome" => outcome.to_string()).increment(1);
}

pub fn record_publish_failure(reason: &str) {
    counter!(names::PUBLISH_FAILURES_TOTAL, "reason" => reason.to_string()).increment(1);
}

pub fn record_slideshow_skipped() {
    counter!(names::SLIDESHOWS_SKIPPED_TOTAL).increment(1);
}

/// Record uploads stepped over because the listing left them out.
pub fn record_unlisted(count: u64) {
    counter!(names::UNLISTED_SKIPPED_TOTAL).increment(count);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_recording_without_recorder_is_noop() {
        record_tick("process");
        record_video("published");
        record_publish_failure("credential_expired");
        record_slideshow_skipped();
        record_unlisted(2);
    }
}

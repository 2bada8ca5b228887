//! Task metrics.
//!
//! Recorded through the `metrics` facade; the binary installs the exporter.

use metrics::{counter, histogram};
use std::time::Duration;

use crate::error::ErrorKind;

/// Metric names as constants for consistency.
pub mod names {
    pub const TASKS_COMPLETED_TOTAL: &str = "vfetch_tasks_completed_total";
    pub const TASKS_FAILED_TOTAL: &str = "vfetch_tasks_failed_total";
    pub const FETCH_DURATION_SECONDS: &str = "vfetch_fetch_duration_seconds";
    pub const TRANSCODE_DURATION_SECONDS: &str = "vfetch_transcode_duration_seconds";
}

pub fn record_task_completed() {
    counter!(names::TASKS_COMPLETED_TOTAL).increment(1);
}

pub fn record_task_failed(kind: ErrorKind) {
    counter!(names::TASKS_FAILED_TOTAL, "kind" => kind.as_str()).increment(1);
}

/// Time spent resolving the source and downloading its streams.
pub fn record_fetch_duration(elapsed: Duration) {
    histogram!(names::FETCH_DURATION_SECONDS).record(elapsed.as_secs_f64());
}

pub fn record_transcode_duration(elapsed: Duration) {
    histogram!(names::TRANSCODE_DURATION_SECONDS).record(elapsed.as_secs_f64());
}

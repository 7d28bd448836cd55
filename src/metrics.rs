//! Operation metrics.
//!
//! Handlers record through the `metrics` facade unconditionally; without an
//! installed recorder the calls are no-ops.  [`init_metrics`] installs the
//! Prometheus recorder used by the CLI's `--metrics` output.

use std::sync::OnceLock;
use std::time::Duration;

use anyhow::Context;
use metrics::{counter, describe_counter, describe_histogram, histogram};
use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};

use crate::operations::BlobOperation;

// -- Metric name constants ----------------------------------------------------

/// Total blob operations (counter). Labels: operation, status.
pub const BLOB_OPERATIONS_TOTAL: &str = "blobgate_operations_total";

/// Blob operation duration in seconds (histogram). Labels: operation.
pub const BLOB_OPERATION_DURATION_SECONDS: &str = "blobgate_operation_duration_seconds";

/// Not-found results treated as empty (counter). Labels: operation.
pub const NOT_FOUND_AS_EMPTY_TOTAL: &str = "blobgate_not_found_as_empty_total";

/// Total bytes uploaded in request bodies (counter).
pub const BYTES_UPLOADED_TOTAL: &str = "blobgate_bytes_uploaded_total";

/// Total bytes downloaded from blobs (counter).
pub const BYTES_DOWNLOADED_TOTAL: &str = "blobgate_bytes_downloaded_total";

// -- Global recorder installation ---------------------------------------------

static PROMETHEUS_HANDLE: OnceLock<PrometheusHandle> = OnceLock::new();

/// Install the global Prometheus recorder. Idempotent.
pub fn init_metrics() -> anyhow::Result<&'static PrometheusHandle> {
    if let Some(handle) = PROMETHEUS_HANDLE.get() {
        return Ok(handle);
    }
    let handle = PrometheusBuilder::new()
        .install_recorder()
        .context("failed to install Prometheus recorder")?;
    Ok(PROMETHEUS_HANDLE.get_or_init(|| handle))
}

/// Register metric descriptions with the global recorder. Call once after
/// `init_metrics()`.
pub fn describe_metrics() {
    describe_counter!(BLOB_OPERATIONS_TOTAL, "Total blob operations by type");
    describe_histogram!(
        BLOB_OPERATION_DURATION_SECONDS,
        "Blob operation duration in seconds"
    );
    describe_counter!(
        NOT_FOUND_AS_EMPTY_TOTAL,
        "Not-found listings reported as empty results"
    );
    describe_counter!(BYTES_UPLOADED_TOTAL, "Total bytes uploaded");
    describe_counter!(BYTES_DOWNLOADED_TOTAL, "Total bytes downloaded");
}

/// Prometheus exposition text, or `None` before `init_metrics()`.
pub fn render() -> Option<String> {
    PROMETHEUS_HANDLE.get().map(|handle| handle.render())
}

// -- Recording helpers --------------------------------------------------------

/// Record one finished operation.
pub fn record_operation(operation: BlobOperation, status: &'static str, elapsed: Duration) {
    counter!(BLOB_OPERATIONS_TOTAL, "operation" => operation.as_str(), "status" => status)
        .increment(1);
    histogram!(BLOB_OPERATION_DURATION_SECONDS, "operation" => operation.as_str())
        .record(elapsed.as_secs_f64());
}

pub fn record_not_found_as_empty(operation: &'static str) {
    counter!(NOT_FOUND_AS_EMPTY_TOTAL, "operation" => operation).increment(1);
}

pub fn record_uploaded(bytes: usize) {
    counter!(BYTES_UPLOADED_TOTAL).increment(bytes as u64);
}

pub fn record_downloaded(bytes: usize) {
    counter!(BYTES_DOWNLOADED_TOTAL).increment(bytes as u64);
}

// -- Tests --------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_metric_names_share_prefix() {
        for name in [
            BLOB_OPERATIONS_TOTAL,
            BLOB_OPERATION_DURATION_SECONDS,
            NOT_FOUND_AS_EMPTY_TOTAL,
            BYTES_UPLOADED_TOTAL,
            BYTES_DOWNLOADED_TOTAL,
        ] {
            assert!(name.starts_with("blobgate_"), "{name}");
        }
    }

    #[test]
    fn test_init_is_idempotent_and_renders() {
        let first = init_metrics().unwrap() as *const PrometheusHandle;
        let second = init_metrics().unwrap() as *const PrometheusHandle;
        assert_eq!(first, second);
        describe_metrics();
        record_operation(
            BlobOperation::ListBlobs,
            "ok",
            Duration::from_millis(3),
        );
        let text = render().unwrap();
        assert!(text.contains(BLOB_OPERATIONS_TOTAL));
    }

    #[test]
    fn test_recording_without_recorder_is_noop() {
        record_not_found_as_empty("listBlobs");
        record_uploaded(10);
        record_downloaded(10);
    }
}

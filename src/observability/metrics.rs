//! Metrics for the scraper run.
//!
//! Recording goes through the `metrics` facade and is a no-op until a recorder
//! is installed. The binary installs a Prometheus recorder when asked to and
//! writes the rendered text to a file at the end of the run.

use crate::error::{Result, ScraperError};
use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};
use std::fs;
use std::path::Path;

/// Every metric name used by the pipeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MetricName {
    SourcesRequestsSuccess,
    SourcesRequestsError,
    SourcesFetchFailures,
    SourcesPayloadBytes,

    StoreWrites,
    StoreBackups,
    StoreRejected,

    ExtractTablesWritten,
    ExtractSchemaMismatch,

    RunLockHeld,
}

impl MetricName {
    pub fn as_str(&self) -> &'static str {
        match self {
            MetricName::SourcesRequestsSuccess => "healthstat_sources_requests_success_total",
            MetricName::SourcesRequestsError => "healthstat_sources_requests_error_total",
            MetricName::SourcesFetchFailures => "healthstat_sources_fetch_failures_total",
            MetricName::SourcesPayloadBytes => "healthstat_sources_payload_bytes",
            MetricName::StoreWrites => "healthstat_store_writes_total",
            MetricName::StoreBackups => "healthstat_store_backups_total",
            MetricName::StoreRejected => "healthstat_store_rejected_total",
            MetricName::ExtractTablesWritten => "healthstat_extract_tables_written_total",
            MetricName::ExtractSchemaMismatch => "healthstat_extract_schema_mismatch_total",
            MetricName::RunLockHeld => "healthstat_run_lock_held_total",
        }
    }
}

/// Install the Prometheus recorder as the global `metrics` recorder.
pub fn install() -> Result<PrometheusHandle> {
    PrometheusBuilder::new()
        .install_recorder()
        .map_err(|e| ScraperError::Config(format!("Failed to install Prometheus recorder: {}", e)))
}

/// Render everything recorded so far into `path` (Prometheus text format).
pub fn write_snapshot(handle: &PrometheusHandle, path: &Path) -> Result<()> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent)?;
        }
    }
    fs::write(path, handle.render())?;
    Ok(())
}

pub mod sources {
    use super::MetricName;

    pub fn request_success(url: &str) {
        ::metrics::counter!(MetricName::SourcesRequestsSuccess.as_str(), "url" => url.to_string())
            .increment(1);
    }

    pub fn request_error(url: &str) {
        ::metrics::counter!(MetricName::SourcesRequestsError.as_str(), "url" => url.to_string())
            .increment(1);
    }

    pub fn fetch_failure(source: &str) {
        let source = source.to_string();
        ::metrics::counter!(MetricName::SourcesFetchFailures.as_str(), "source" => source)
            .increment(1);
    }

    pub fn payload_bytes(source: &str, bytes: usize) {
        let source = source.to_string();
        ::metrics::histogram!(MetricName::SourcesPayloadBytes.as_str(), "source" => source)
            .record(bytes as f64);
    }
}

pub mod store {
    use super::MetricName;

    pub fn write() {
        ::metrics::counter!(MetricName::StoreWrites.as_str()).increment(1);
    }

    pub fn backup() {
        ::metrics::counter!(MetricName::StoreBackups.as_str()).increment(1);
    }

    pub fn rejected() {
        ::metrics::counter!(MetricName::StoreRejected.as_str()).increment(1);
    }
}

pub mod extract {
    use super::MetricName;

    pub fn table_written() {
        ::metrics::counter!(MetricName::ExtractTablesWritten.as_str()).increment(1);
    }

    pub fn schema_mismatch() {
        ::metrics::counter!(MetricName::ExtractSchemaMismatch.as_str()).increment(1);
    }
}

pub fn lock_held() {
    ::metrics::counter!(MetricName::RunLockHeld.as_str()).increment(1);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn metric_names_are_unique_and_prefixed() {
        let all = [
            MetricName::SourcesRequestsSuccess,
            MetricName::SourcesRequestsError,
            MetricName::SourcesFetchFailures,
            MetricName::SourcesPayloadBytes,
            MetricName::StoreWrites,
            MetricName::StoreBackups,
            MetricName::StoreRejected,
            MetricName::ExtractTablesWritten,
            MetricName::ExtractSchemaMismatch,
            MetricName::RunLockHeld,
        ];
        let names: std::collections::HashSet<_> = all.iter().map(|m| m.as_str()).collect();
        assert_eq!(names.len(), all.len());
        assert!(names.iter().all(|n| n.starts_with("healthstat_")));
    }
}

//! Prometheus metrics for the ETL pipeline
//!
//! Recording functions are grouped by pipeline phase. They are no-ops until
//! `init` installs the recorder, so library code can call them freely.

use std::fmt;
use std::sync::OnceLock;

use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};
use tracing::info;

/// Every metric name used in the system
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MetricName {
    // Sources
    SourcesRequestsSuccess,
    SourcesRequestsError,
    SourcesRequestRetries,
    SourcesRequestDuration,

    // Ingest
    IngestRunsSuccess,
    IngestRunsError,
    IngestRecords,
    IngestDuplicates,
    IngestDuration,

    // Quality
    QualityScore,
    QualityInvalidRecords,

    // Export
    ExportRowsSent,
    ExportErrors,
}

impl fmt::Display for MetricName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl MetricName {
    pub fn as_str(&self) -> &'static str {
        match self {
            MetricName::SourcesRequestsSuccess => "etl_sources_requests_success_total",
            MetricName::SourcesRequestsError => "etl_sources_requests_error_total",
            MetricName::SourcesRequestRetries => "etl_sources_request_retries_total",
            MetricName::SourcesRequestDuration => "etl_sources_request_duration_seconds",

            MetricName::IngestRunsSuccess => "etl_ingest_runs_success_total",
            MetricName::IngestRunsError => "etl_ingest_runs_error_total",
            MetricName::IngestRecords => "etl_ingest_records_total",
            MetricName::IngestDuplicates => "etl_ingest_duplicates_total",
            MetricName::IngestDuration => "etl_ingest_duration_seconds",

            MetricName::QualityScore => "etl_quality_score",
            MetricName::QualityInvalidRecords => "etl_quality_invalid_records_total",

            MetricName::ExportRowsSent => "etl_export_rows_sent_total",
            MetricName::ExportErrors => "etl_export_errors_total",
        }
    }

    pub fn all_metrics() -> impl Iterator<Item = MetricName> {
        use MetricName::*;
        [
            SourcesRequestsSuccess,
            SourcesRequestsError,
            SourcesRequestRetries,
            SourcesRequestDuration,
            IngestRunsSuccess,
            IngestRunsError,
            IngestRecords,
            IngestDuplicates,
            IngestDuration,
            QualityScore,
            QualityInvalidRecords,
            ExportRowsSent,
            ExportErrors,
        ]
        .into_iter()
    }
}

static METRICS_HANDLE: OnceLock<PrometheusHandle> = OnceLock::new();

/// Install the Prometheus recorder. Calling it again is a no-op.
pub fn init() -> anyhow::Result<()> {
    if METRICS_HANDLE.get().is_some() {
        return Ok(());
    }
    let handle = PrometheusBuilder::new()
        .install_recorder()
        .map_err(|e| anyhow::anyhow!("Failed to install Prometheus recorder: {}", e))?;
    METRICS_HANDLE.set(handle).ok();
    info!("Metrics system initialized");
    Ok(())
}

/// Text exposition of all metrics, if the recorder is installed
pub fn render() -> Option<String> {
    METRICS_HANDLE.get().map(|handle| handle.render())
}

// ============================================================================
// Sources Metrics
// ============================================================================

pub mod sources {
    use super::MetricName;

    pub fn request_success(source: &'static str) {
        ::metrics::counter!(MetricName::SourcesRequestsSuccess.as_str(), "source" => source).increment(1);
    }

    pub fn request_error(source: &'static str) {
        ::metrics::counter!(MetricName::SourcesRequestsError.as_str(), "source" => source).increment(1);
    }

    pub fn request_retry(source: &'static str) {
        ::metrics::counter!(MetricName::SourcesRequestRetries.as_str(), "source" => source).increment(1);
    }

    pub fn request_duration(source: &'static str, secs: f64) {
        ::metrics::histogram!(MetricName::SourcesRequestDuration.as_str(), "source" => source).record(secs);
    }
}

// ============================================================================
// Ingest Metrics
// ============================================================================

pub mod ingest {
    use super::MetricName;

    pub fn run_success(secs: f64) {
        ::metrics::counter!(MetricName::IngestRunsSuccess.as_str()).increment(1);
        ::metrics::histogram!(MetricName::IngestDuration.as_str()).record(secs);
    }

    pub fn run_error() {
        ::metrics::counter!(MetricName::IngestRunsError.as_str()).increment(1);
    }

    /// Surviving and duplicate record counts for one batch kind (`ads` or `crm`)
    pub fn batch_stored(kind: &'static str, records: usize, duplicates: usize) {
        ::metrics::counter!(MetricName::IngestRecords.as_str(), "kind" => kind).increment(records as u64);
        ::metrics::counter!(MetricName::IngestDuplicates.as_str(), "kind" => kind).increment(duplicates as u64);
    }
}

// ============================================================================
// Quality Metrics
// ============================================================================

pub mod quality {
    use super::MetricName;
    use crate::domain::QualitySummary;

    pub fn summary_recorded(summary: &QualitySummary) {
        ::metrics::histogram!(MetricName::QualityScore.as_str(), "kind" => "overall")
            .record(summary.overall_quality_score);
        ::metrics::histogram!(MetricName::QualityScore.as_str(), "kind" => "ads").record(summary.ads_quality_score);
        ::metrics::histogram!(MetricName::QualityScore.as_str(), "kind" => "crm").record(summary.crm_quality_score);

        let invalid_ads = summary.total_ads_records - summary.valid_ads_records;
        let invalid_crm = summary.total_crm_records - summary.valid_crm_records;
        ::metrics::counter!(MetricName::QualityInvalidRecords.as_str(), "kind" => "ads").increment(invalid_ads as u64);
        ::metrics::counter!(MetricName::QualityInvalidRecords.as_str(), "kind" => "crm").increment(invalid_crm as u64);
    }
}

// ============================================================================
// Export Metrics
// ============================================================================

pub mod export {
    use super::MetricName;

    pub fn rows_sent(count: usize) {
        ::metrics::counter!(MetricName::ExportRowsSent.as_str()).increment(count as u64);
    }

    pub fn error() {
        ::metrics::counter!(MetricName::ExportErrors.as_str()).increment(1);
    }
}

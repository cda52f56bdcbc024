use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::quality::RecordQuality;

/// Dataset-level scores for one quality report
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct QualitySummary {
    pub total_ads_records: usize,
    pub valid_ads_records: usize,
    pub ads_quality_score: f64,
    pub total_crm_records: usize,
    pub valid_crm_records: usize,
    pub crm_quality_score: f64,
    pub overall_quality_score: f64,
    /// Failure descriptions seen more than once, most frequent first
    pub common_issues: Vec<String>,
    /// Records dropped by deduplication; not part of the totals above
    pub duplicate_ads_records: usize,
    pub duplicate_crm_records: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DataQualityReport {
    pub summary: QualitySummary,
    pub ads_quality: Vec<RecordQuality>,
    pub crm_quality: Vec<RecordQuality>,
    pub ads_duplicates: Vec<RecordQuality>,
    pub crm_duplicates: Vec<RecordQuality>,
    pub timestamp: DateTime<Utc>,
}

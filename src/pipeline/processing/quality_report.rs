use chrono::Utc;
use std::collections::HashMap;

use crate::domain::{DataQualityReport, NormalizedAdsRecord, NormalizedCrmRecord, QualitySummary, RecordQuality};

/// The batches a report is built from: dedup survivors plus dropped duplicates
#[derive(Debug, Clone, Copy, Default)]
pub struct QualityInputs<'a> {
    pub ads: &'a [NormalizedAdsRecord],
    pub crm: &'a [NormalizedCrmRecord],
    pub ads_duplicates: &'a [RecordQuality],
    pub crm_duplicates: &'a [RecordQuality],
}

/// Configuration for dataset-level quality reporting
#[derive(Debug, Clone)]
pub struct QualityReportConfig {
    /// A failure description must occur at least this often to be a common issue
    pub min_issue_occurrences: usize,
}

impl Default for QualityReportConfig {
    fn default() -> Self {
        Self { min_issue_occurrences: 2 }
    }
}

/// Rolls per-record verdicts up into dataset scores
#[derive(Debug, Clone, Default)]
pub struct QualityReporter {
    pub config: QualityReportConfig,
}

impl QualityReporter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_config(config: QualityReportConfig) -> Self {
        Self { config }
    }

    /// Scores cover surviving records only; duplicates are counted on the side.
    pub fn summarize(&self, inputs: QualityInputs<'_>) -> QualitySummary {
        let total_ads = inputs.ads.len();
        let total_crm = inputs.crm.len();
        let valid_ads = inputs.ads.iter().filter(|r| r.quality.is_valid).count();
        let valid_crm = inputs.crm.iter().filter(|r| r.quality.is_valid).count();

        let qualities = inputs
            .ads
            .iter()
            .map(|r| &r.quality)
            .chain(inputs.crm.iter().map(|r| &r.quality));

        QualitySummary {
            total_ads_records: total_ads,
            valid_ads_records: valid_ads,
            ads_quality_score: quality_score(valid_ads, total_ads),
            total_crm_records: total_crm,
            valid_crm_records: valid_crm,
            crm_quality_score: quality_score(valid_crm, total_crm),
            overall_quality_score: quality_score(valid_ads + valid_crm, total_ads + total_crm),
            common_issues: self.common_issues(qualities),
            duplicate_ads_records: inputs.ads_duplicates.len(),
            duplicate_crm_records: inputs.crm_duplicates.len(),
        }
    }

    pub fn generate(&self, inputs: QualityInputs<'_>) -> DataQualityReport {
        DataQualityReport {
            summary: self.summarize(inputs),
            ads_quality: inputs.ads.iter().map(|r| r.quality.clone()).collect(),
            crm_quality: inputs.crm.iter().map(|r| r.quality.clone()).collect(),
            ads_duplicates: inputs.ads_duplicates.to_vec(),
            crm_duplicates: inputs.crm_duplicates.to_vec(),
            timestamp: Utc::now(),
        }
    }

    /// Tally failure descriptions, most frequent first, ties broken alphabetically.
    pub fn common_issues<'a>(&self, qualities: impl Iterator<Item = &'a RecordQuality>) -> Vec<String> {
        let mut counts: HashMap<&str, usize> = HashMap::new();
        for quality in qualities {
            for description in quality.failed_descriptions() {
                *counts.entry(description).or_insert(0) += 1;
            }
        }

        let mut recurring: Vec<(&str, usize)> = counts
            .into_iter()
            .filter(|(_, n)| *n >= self.config.min_issue_occurrences)
            .collect();
        recurring.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(b.0)));

        recurring
            .into_iter()
            .map(|(issue, n)| format!("{} (occurs {} times)", issue, n))
            .collect()
    }
}

/// Percentage of valid records; 0 for an empty set
pub fn quality_score(valid: usize, total: usize) -> f64 {
    if total == 0 {
        return 0.0;
    }
    valid as f64 / total as f64 * 100.0
}

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::sync::Arc;
use std::time::Instant;
use tracing::{error, info, warn};
use uuid::Uuid;

use crate::app::ports::SourcePort;
use crate::domain::{NormalizedAdsRecord, NormalizedCrmRecord, QualitySummary, RecordQuality};
use crate::error::Result;
use crate::observability::metrics;
use crate::pipeline::processing::{
    deduplicate, normalize_ads_batch, normalize_crm_batch, DefaultNormalizer, Normalizer, QualityInputs,
    QualityReporter,
};
use crate::pipeline::storage::{BatchSnapshot, Storage};

pub const INGEST_MESSAGE: &str = "Data ingested and processed with quality validation";

/// Outcome of one ingest run
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IngestSummary {
    pub run_id: Uuid,
    pub status: String,
    pub ads_records: usize,
    pub crm_records: usize,
    pub processed_at: DateTime<Utc>,
    pub message: String,
    pub quality_summary: QualitySummary,
}

/// Fetch, normalize, dedup, score and store both batches
pub struct IngestUseCase {
    source: Arc<dyn SourcePort>,
    storage: Arc<dyn Storage>,
    normalizer: Box<dyn Normalizer + Send + Sync>,
    reporter: QualityReporter,
}

impl IngestUseCase {
    pub fn new(source: Arc<dyn SourcePort>, storage: Arc<dyn Storage>) -> Self {
        Self {
            source,
            storage,
            normalizer: Box::new(DefaultNormalizer),
            reporter: QualityReporter::new(),
        }
    }

    pub fn with_normalizer(mut self, normalizer: Box<dyn Normalizer + Send + Sync>) -> Self {
        self.normalizer = normalizer;
        self
    }

    /// Run one ingest. Nothing is stored unless both fetches succeed.
    ///
    /// With `since`, ads dated before it and CRM records created before it are dropped
    /// after dedup, from the survivors and from the reported duplicates alike.
    pub async fn run(&self, since: Option<NaiveDate>) -> Result<IngestSummary> {
        let run_id = Uuid::new_v4();
        let started = Instant::now();
        info!(%run_id, since = ?since, "starting ingest");

        let (raw_ads, raw_crm) = match tokio::try_join!(self.source.fetch_ads(), self.source.fetch_crm()) {
            Ok(batches) => batches,
            Err(e) => {
                error!(%run_id, error = %e, "ingest fetch failed");
                metrics::ingest::run_error();
                return Err(e);
            }
        };

        let ads_batch = normalize_ads_batch(self.normalizer.as_ref(), &raw_ads);
        let crm_batch = normalize_crm_batch(self.normalizer.as_ref(), &raw_crm);
        let too_early = since
            .map(|day| ids_dated_before(&ads_batch, &crm_batch, day))
            .unwrap_or_default();

        let mut ads = deduplicate(ads_batch);
        let mut crm = deduplicate(crm_batch);
        retain_in_range(&mut ads.duplicates, &too_early);
        retain_in_range(&mut crm.duplicates, &too_early);

        let (ads_records, crm_records) = match since {
            Some(day) => filter_since(ads.records, crm.records, day),
            None => (ads.records, crm.records),
        };

        let summary = self.reporter.summarize(QualityInputs {
            ads: &ads_records,
            crm: &crm_records,
            ads_duplicates: &ads.duplicates,
            crm_duplicates: &crm.duplicates,
        });

        metrics::ingest::batch_stored("ads", ads_records.len(), ads.duplicates.len());
        metrics::ingest::batch_stored("crm", crm_records.len(), crm.duplicates.len());
        metrics::quality::summary_recorded(&summary);

        let ads_count = ads_records.len();
        let crm_count = crm_records.len();
        let processed_at = Utc::now();
        self.storage
            .store_batches(BatchSnapshot {
                ads: ads_records,
                crm: crm_records,
                ads_duplicates: ads.duplicates,
                crm_duplicates: crm.duplicates,
                ingested_at: processed_at,
            })
            .await?;

        let elapsed = started.elapsed();
        metrics::ingest::run_success(elapsed.as_secs_f64());
        info!(
            %run_id,
            ads_records = ads_count,
            crm_records = crm_count,
            duplicate_ads = summary.duplicate_ads_records,
            duplicate_crm = summary.duplicate_crm_records,
            duration_ms = elapsed.as_millis() as u64,
            quality_score = summary.overall_quality_score,
            valid_ads = summary.valid_ads_records,
            valid_crm = summary.valid_crm_records,
            "data ingestion completed with quality validation"
        );
        if !summary.common_issues.is_empty() {
            warn!(%run_id, common_issues = ?summary.common_issues, "data quality issues detected");
        }

        Ok(IngestSummary {
            run_id,
            status: "success".to_string(),
            ads_records: ads_count,
            crm_records: crm_count,
            processed_at,
            message: INGEST_MESSAGE.to_string(),
            quality_summary: summary,
        })
    }
}

fn filter_since(
    ads: Vec<NormalizedAdsRecord>,
    crm: Vec<NormalizedCrmRecord>,
    since: NaiveDate,
) -> (Vec<NormalizedAdsRecord>, Vec<NormalizedCrmRecord>) {
    let ads = ads.into_iter().filter(|r| r.date >= since).collect();
    let crm = crm.into_iter().filter(|r| r.created_day() >= since).collect();
    (ads, crm)
}

/// Record ids (unique across both batches) of records dated before `since`
fn ids_dated_before(
    ads: &[NormalizedAdsRecord],
    crm: &[NormalizedCrmRecord],
    since: NaiveDate,
) -> HashSet<String> {
    let ads = ads.iter().filter(|r| r.date < since).map(|r| r.quality.record_id.clone());
    let crm = crm
        .iter()
        .filter(|r| r.created_day() < since)
        .map(|r| r.quality.record_id.clone());
    ads.chain(crm).collect()
}

fn retain_in_range(duplicates: &mut Vec<RecordQuality>, too_early: &HashSet<String>) {
    if !too_early.is_empty() {
        duplicates.retain(|q| !too_early.contains(&q.record_id));
    }
}

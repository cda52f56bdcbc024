use chrono::NaiveDate;
use std::sync::Arc;

use crate::domain::{ChannelMetrics, DataQualityReport, FunnelMetrics, NormalizedAdsRecord, NormalizedCrmRecord};
use crate::error::{EtlError, Result};
use crate::pipeline::processing::{channel_metrics, funnel_metrics, QualityInputs, QualityReporter};
use crate::pipeline::storage::Storage;

/// Inclusive day range applied to stored records before aggregation
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DateRange {
    pub from: NaiveDate,
    pub to: NaiveDate,
}

/// Read side over the stored batches. Everything is recomputed per call.
pub struct QueryUseCase {
    storage: Arc<dyn Storage>,
    reporter: QualityReporter,
}

impl QueryUseCase {
    pub fn new(storage: Arc<dyn Storage>) -> Self {
        Self {
            storage,
            reporter: QualityReporter::new(),
        }
    }

    pub async fn quality_report(&self) -> Result<DataQualityReport> {
        let ads = self.storage.get_ads().await?;
        let crm = self.storage.get_crm().await?;
        if ads.is_empty() && crm.is_empty() {
            return Err(EtlError::NoData(
                "No data available for quality analysis. Please run ingestion first.".to_string(),
            ));
        }
        let (ads_duplicates, crm_duplicates) = self.storage.get_duplicates().await?;
        Ok(self.reporter.generate(QualityInputs {
            ads: &ads,
            crm: &crm,
            ads_duplicates: &ads_duplicates,
            crm_duplicates: &crm_duplicates,
        }))
    }

    pub async fn channel_metrics(&self, range: Option<DateRange>, channel: Option<&str>) -> Result<Vec<ChannelMetrics>> {
        let (ads, crm) = self.records(range).await?;
        Ok(channel_metrics(&ads, &crm, channel))
    }

    pub async fn funnel_metrics(&self, range: Option<DateRange>, utm_campaign: Option<&str>) -> Result<Vec<FunnelMetrics>> {
        let (ads, crm) = self.records(range).await?;
        Ok(funnel_metrics(&ads, &crm, utm_campaign))
    }

    async fn records(&self, range: Option<DateRange>) -> Result<(Vec<NormalizedAdsRecord>, Vec<NormalizedCrmRecord>)> {
        match range {
            Some(DateRange { from, to }) => Ok((
                self.storage.get_ads_by_date_range(from, to).await?,
                self.storage.get_crm_by_date_range(from, to).await?,
            )),
            None => Ok((self.storage.get_ads().await?, self.storage.get_crm().await?)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::AdsRecord;
    use crate::pipeline::processing::{DefaultNormalizer, Normalizer};
    use crate::pipeline::storage::{BatchSnapshot, InMemoryStorage};
    use chrono::Utc;

    async fn storage_with(dates: &[&str]) -> Arc<InMemoryStorage> {
        let ads = dates
            .iter()
            .enumerate()
            .map(|(i, d)| {
                DefaultNormalizer.normalize_ads(
                    i,
                    &AdsRecord {
                        date: d.to_string(),
                        campaign_id: format!("C{}", i),
                        channel: "google_ads".to_string(),
                        utm_campaign: "summer".to_string(),
                        ..AdsRecord::default()
                    },
                )
            })
            .collect();
        let storage = Arc::new(InMemoryStorage::new());
        storage
            .store_batches(BatchSnapshot {
                ads,
                crm: vec![],
                ads_duplicates: vec![],
                crm_duplicates: vec![],
                ingested_at: Utc::now(),
            })
            .await
            .unwrap();
        storage
    }

    #[tokio::test]
    async fn test_empty_store_has_no_report() {
        let uc = QueryUseCase::new(Arc::new(InMemoryStorage::new()));
        assert!(matches!(uc.quality_report().await, Err(EtlError::NoData(_))));
    }

    #[tokio::test]
    async fn test_report_from_stored_batches() {
        let uc = QueryUseCase::new(storage_with(&["2025-08-01", "2025-08-02"]).await);
        let report = uc.quality_report().await.unwrap();
        assert_eq!(report.summary.total_ads_records, 2);
        assert_eq!(report.ads_quality.len(), 2);
    }

    #[tokio::test]
    async fn test_range_limits_channel_rows() {
        let uc = QueryUseCase::new(storage_with(&["2025-08-01", "2025-08-02", "2025-08-03"]).await);
        let range = DateRange {
            from: NaiveDate::from_ymd_opt(2025, 8, 2).unwrap(),
            to: NaiveDate::from_ymd_opt(2025, 8, 3).unwrap(),
        };
        assert_eq!(uc.channel_metrics(Some(range), None).await.unwrap().len(), 2);
        assert_eq!(uc.channel_metrics(None, None).await.unwrap().len(), 3);
        assert_eq!(uc.funnel_metrics(None, Some("summer")).await.unwrap().len(), 1);
    }
}

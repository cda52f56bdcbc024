use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::debug;

use super::{BatchSnapshot, Storage};
use crate::domain::{NormalizedAdsRecord, NormalizedCrmRecord, RecordQuality};
use crate::error::Result;

#[derive(Debug, Default)]
struct Inner {
    ads: Vec<NormalizedAdsRecord>,
    crm: Vec<NormalizedCrmRecord>,
    ads_duplicates: Vec<RecordQuality>,
    crm_duplicates: Vec<RecordQuality>,
    last_ingest: Option<DateTime<Utc>>,
}

/// In-memory storage; reads hand out clones so callers never hold the lock
#[derive(Debug, Clone, Default)]
pub struct InMemoryStorage {
    inner: Arc<RwLock<Inner>>,
}

impl InMemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl Storage for InMemoryStorage {
    async fn store_batches(&self, snapshot: BatchSnapshot) -> Result<()> {
        let mut inner = self.inner.write().await;
        debug!(
            ads = snapshot.ads.len(),
            crm = snapshot.crm.len(),
            ads_duplicates = snapshot.ads_duplicates.len(),
            crm_duplicates = snapshot.crm_duplicates.len(),
            "storing batches"
        );
        *inner = Inner {
            ads: snapshot.ads,
            crm: snapshot.crm,
            ads_duplicates: snapshot.ads_duplicates,
            crm_duplicates: snapshot.crm_duplicates,
            last_ingest: Some(snapshot.ingested_at),
        };
        Ok(())
    }

    async fn get_ads(&self) -> Result<Vec<NormalizedAdsRecord>> {
        Ok(self.inner.read().await.ads.clone())
    }

    async fn get_crm(&self) -> Result<Vec<NormalizedCrmRecord>> {
        Ok(self.inner.read().await.crm.clone())
    }

    async fn get_ads_by_date_range(&self, from: NaiveDate, to: NaiveDate) -> Result<Vec<NormalizedAdsRecord>> {
        let inner = self.inner.read().await;
        Ok(inner
            .ads
            .iter()
            .filter(|r| r.date >= from && r.date <= to)
            .cloned()
            .collect())
    }

    async fn get_crm_by_date_range(&self, from: NaiveDate, to: NaiveDate) -> Result<Vec<NormalizedCrmRecord>> {
        let inner = self.inner.read().await;
        Ok(inner
            .crm
            .iter()
            .filter(|r| {
                let day = r.created_day();
                day >= from && day <= to
            })
            .cloned()
            .collect())
    }

    async fn get_duplicates(&self) -> Result<(Vec<RecordQuality>, Vec<RecordQuality>)> {
        let inner = self.inner.read().await;
        Ok((inner.ads_duplicates.clone(), inner.crm_duplicates.clone()))
    }

    async fn last_ingest(&self) -> Result<Option<DateTime<Utc>>> {
        Ok(self.inner.read().await.last_ingest)
    }

    async fn has_data(&self) -> Result<bool> {
        let inner = self.inner.read().await;
        Ok(!inner.ads.is_empty() && !inner.crm.is_empty())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{AdsRecord, CrmRecord};
    use crate::pipeline::processing::normalize::{DefaultNormalizer, Normalizer};

    fn ads_on(date: &str) -> NormalizedAdsRecord {
        DefaultNormalizer.normalize_ads(
            0,
            &AdsRecord {
                date: date.to_string(),
                ..AdsRecord::default()
            },
        )
    }

    fn crm_at(created_at: &str) -> NormalizedCrmRecord {
        DefaultNormalizer.normalize_crm(
            0,
            &CrmRecord {
                created_at: created_at.to_string(),
                ..CrmRecord::default()
            },
        )
    }

    fn snapshot(ads: Vec<NormalizedAdsRecord>, crm: Vec<NormalizedCrmRecord>) -> BatchSnapshot {
        BatchSnapshot {
            ads,
            crm,
            ads_duplicates: Vec::new(),
            crm_duplicates: Vec::new(),
            ingested_at: Utc::now(),
        }
    }

    fn day(s: &str) -> NaiveDate {
        NaiveDate::parse_from_str(s, "%Y-%m-%d").unwrap()
    }

    #[tokio::test]
    async fn test_empty_store() {
        let store = InMemoryStorage::new();
        assert!(!store.has_data().await.unwrap());
        assert!(store.last_ingest().await.unwrap().is_none());
        assert!(store.get_ads().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_has_data_needs_both_batches() {
        let store = InMemoryStorage::new();
        store.store_batches(snapshot(vec![ads_on("2025-08-01")], vec![])).await.unwrap();
        assert!(!store.has_data().await.unwrap());
        assert!(store.last_ingest().await.unwrap().is_some());

        store
            .store_batches(snapshot(vec![ads_on("2025-08-01")], vec![crm_at("2025-08-01T00:00:00Z")]))
            .await
            .unwrap();
        assert!(store.has_data().await.unwrap());
    }

    #[tokio::test]
    async fn test_store_replaces_previous_run() {
        let store = InMemoryStorage::new();
        store
            .store_batches(snapshot(vec![ads_on("2025-08-01"), ads_on("2025-08-02")], vec![]))
            .await
            .unwrap();
        store.store_batches(snapshot(vec![ads_on("2025-08-03")], vec![])).await.unwrap();
        let ads = store.get_ads().await.unwrap();
        assert_eq!(ads.len(), 1);
        assert_eq!(ads[0].date, day("2025-08-03"));
    }

    #[tokio::test]
    async fn test_date_range_is_inclusive_by_day() {
        let store = InMemoryStorage::new();
        store
            .store_batches(snapshot(
                vec![ads_on("2025-07-31"), ads_on("2025-08-01"), ads_on("2025-08-02"), ads_on("2025-08-03")],
                vec![
                    crm_at("2025-08-01T00:00:00Z"),
                    crm_at("2025-08-02T23:59:59Z"),
                    crm_at("2025-08-03T00:00:00Z"),
                ],
            ))
            .await
            .unwrap();

        let ads = store.get_ads_by_date_range(day("2025-08-01"), day("2025-08-02")).await.unwrap();
        assert_eq!(ads.len(), 2);
        let crm = store.get_crm_by_date_range(day("2025-08-01"), day("2025-08-02")).await.unwrap();
        assert_eq!(crm.len(), 2);
    }
}

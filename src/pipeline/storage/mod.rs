// Storage for the most recent processed batches

pub mod in_memory;

pub use in_memory::InMemoryStorage;

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};

use crate::domain::{NormalizedAdsRecord, NormalizedCrmRecord, RecordQuality};
use crate::error::Result;

/// Everything one ingest run produces
#[derive(Debug, Clone)]
pub struct BatchSnapshot {
    pub ads: Vec<NormalizedAdsRecord>,
    pub crm: Vec<NormalizedCrmRecord>,
    pub ads_duplicates: Vec<RecordQuality>,
    pub crm_duplicates: Vec<RecordQuality>,
    pub ingested_at: DateTime<Utc>,
}

/// Storage trait for processed batches. Each store replaces the previous run.
#[async_trait]
pub trait Storage: Send + Sync {
    async fn store_batches(&self, snapshot: BatchSnapshot) -> Result<()>;

    async fn get_ads(&self) -> Result<Vec<NormalizedAdsRecord>>;
    async fn get_crm(&self) -> Result<Vec<NormalizedCrmRecord>>;

    /// Inclusive on both ends, by calendar day
    async fn get_ads_by_date_range(&self, from: NaiveDate, to: NaiveDate) -> Result<Vec<NormalizedAdsRecord>>;
    /// Inclusive on both ends, by the day `created_at` falls on
    async fn get_crm_by_date_range(&self, from: NaiveDate, to: NaiveDate) -> Result<Vec<NormalizedCrmRecord>>;

    /// `(ads, crm)` duplicates dropped by the last run
    async fn get_duplicates(&self) -> Result<(Vec<RecordQuality>, Vec<RecordQuality>)>;

    async fn last_ingest(&self) -> Result<Option<DateTime<Utc>>>;

    /// True only when both batches are non-empty
    async fn has_data(&self) -> Result<bool>;
}

use async_trait::async_trait;

use crate::domain::{AdsRecord, CrmRecord};
use crate::error::Result;

/// Upstream sources of raw batches
#[async_trait]
pub trait SourcePort: Send + Sync {
    async fn fetch_ads(&self) -> Result<Vec<AdsRecord>>;
    async fn fetch_crm(&self) -> Result<Vec<CrmRecord>>;
}

/// Destination for signed export rows
#[async_trait]
pub trait ExportSinkPort: Send + Sync {
    /// Where rows go, for reporting back to callers
    fn url(&self) -> &str;
    /// POST a JSON body with its `X-Signature` header value
    async fn post_signed(&self, body: Vec<u8>, signature: &str) -> Result<()>;
}

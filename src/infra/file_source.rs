use async_trait::async_trait;
use std::path::PathBuf;
use tracing::info;

use crate::app::ports::SourcePort;
use crate::domain::{AdsRecord, AdsResponse, CrmRecord, CrmResponse};
use crate::error::{EtlError, Result};

/// Reads ads and CRM envelopes from local JSON files
pub struct FileSource {
    ads_path: PathBuf,
    crm_path: PathBuf,
}

impl FileSource {
    pub fn new(ads_path: impl Into<PathBuf>, crm_path: impl Into<PathBuf>) -> Self {
        Self {
            ads_path: ads_path.into(),
            crm_path: crm_path.into(),
        }
    }
}

async fn read(path: &PathBuf) -> Result<Vec<u8>> {
    tokio::fs::read(path).await.map_err(|e| {
        EtlError::Io(std::io::Error::new(e.kind(), format!("{}: {}", path.display(), e)))
    })
}

#[async_trait]
impl SourcePort for FileSource {
    async fn fetch_ads(&self) -> Result<Vec<AdsRecord>> {
        let response: AdsResponse = serde_json::from_slice(&read(&self.ads_path).await?)?;
        let records = response.into_records();
        info!(path = %self.ads_path.display(), records = records.len(), "loaded ads file");
        Ok(records)
    }

    async fn fetch_crm(&self) -> Result<Vec<CrmRecord>> {
        let response: CrmResponse = serde_json::from_slice(&read(&self.crm_path).await?)?;
        let records = response.into_records();
        info!(path = %self.crm_path.display(), records = records.len(), "loaded CRM file");
        Ok(records)
    }
}

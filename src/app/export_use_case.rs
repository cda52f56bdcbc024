use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{error, info};

use crate::app::ports::ExportSinkPort;
use crate::domain::ExportRecord;
use crate::error::{EtlError, Result};
use crate::infra::signer::sign_payload;
use crate::observability::metrics;
use crate::pipeline::processing::{channel_metrics, to_export_records};
use crate::pipeline::storage::Storage;

/// Response body for one export run
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExportSummary {
    pub status: String,
    pub date: NaiveDate,
    pub records_count: usize,
    pub exported_at: DateTime<Utc>,
    pub sink_url: Option<String>,
    pub data: Vec<ExportRecord>,
}

/// A sink plus the secret rows are signed with
pub struct SignedSink {
    pub sink: Arc<dyn ExportSinkPort>,
    pub secret: String,
}

/// Compute one day's channel rows and push each one, signed, to the sink
pub struct ExportUseCase {
    storage: Arc<dyn Storage>,
    sink: Option<SignedSink>,
}

impl ExportUseCase {
    /// With no sink the rows are computed and returned but not sent anywhere.
    pub fn new(storage: Arc<dyn Storage>, sink: Option<SignedSink>) -> Self {
        Self { storage, sink }
    }

    pub async fn run(&self, date: NaiveDate) -> Result<ExportSummary> {
        let ads = self.storage.get_ads_by_date_range(date, date).await?;
        if ads.is_empty() {
            return Err(EtlError::NoData(format!("No data found for {}", date)));
        }
        let crm = self.storage.get_crm_by_date_range(date, date).await?;

        let rows = to_export_records(&channel_metrics(&ads, &crm, None));

        if let Some(signed) = &self.sink {
            for row in &rows {
                let body = serde_json::to_vec(row)?;
                let signature = sign_payload(signed.secret.as_bytes(), &body);
                if let Err(e) = signed.sink.post_signed(body, &signature).await {
                    error!(error = %e, date = %row.date, channel = %row.channel, "failed to export record");
                    metrics::export::error();
                    return Err(EtlError::Export(e.to_string()));
                }
                info!(date = %row.date, channel = %row.channel, campaign_id = %row.campaign_id, "exported record");
            }
            metrics::export::rows_sent(rows.len());
        }

        Ok(ExportSummary {
            status: "success".to_string(),
            date,
            records_count: rows.len(),
            exported_at: Utc::now(),
            sink_url: self.sink.as_ref().map(|s| s.sink.url().to_string()),
            data: rows,
        })
    }
}

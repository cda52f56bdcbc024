use tracing::debug;

use crate::constants::{ADS_RECORD_PREFIX, CRM_RECORD_PREFIX};
use crate::domain::{utm_key, AdsRecord, CrmRecord, NormalizedAdsRecord, NormalizedCrmRecord};
use crate::pipeline::processing::validate::*;

/// Trait for turning raw source rows into validated, quality-tagged records.
///
/// Implementations must be total: every raw row yields exactly one
/// normalized record, with problems captured in its quality verdict.
pub trait Normalizer {
    fn normalize_ads(&self, index: usize, record: &AdsRecord) -> NormalizedAdsRecord;
    fn normalize_crm(&self, index: usize, record: &CrmRecord) -> NormalizedCrmRecord;
}

/// Normalizer applying the standard field validators in a fixed order
#[derive(Debug, Default, Clone, Copy)]
pub struct DefaultNormalizer;

impl Normalizer for DefaultNormalizer {
    fn normalize_ads(&self, index: usize, record: &AdsRecord) -> NormalizedAdsRecord {
        let mut q = QualityBuilder::new(format!("{}_{}", ADS_RECORD_PREFIX, index));

        let date = validate_date(&record.date, "date", &mut q);
        let campaign_id = validate_campaign_id(&record.campaign_id, "campaign_id", &mut q);
        let channel = validate_channel(&record.channel, "channel", &mut q);
        let clicks = validate_clicks(record.clicks, "clicks", &mut q);
        let impressions = validate_impressions(record.impressions, "impressions", &mut q);
        let cost = validate_cost(record.cost, "cost", &mut q);
        let utm_campaign = validate_utm_campaign(&record.utm_campaign, "utm_campaign", &mut q);
        let utm_source = validate_utm_source(record.utm_source.as_deref(), "utm_source", &mut q);
        let utm_medium = validate_utm_medium(record.utm_medium.as_deref(), "utm_medium", &mut q);

        NormalizedAdsRecord {
            utm_key: utm_key(&utm_campaign, &utm_source, &utm_medium),
            date,
            campaign_id,
            channel,
            clicks,
            impressions,
            cost,
            utm_campaign,
            utm_source,
            utm_medium,
            quality: q.finish(),
        }
    }

    fn normalize_crm(&self, index: usize, record: &CrmRecord) -> NormalizedCrmRecord {
        let mut q = QualityBuilder::new(format!("{}_{}", CRM_RECORD_PREFIX, index));

        let opportunity_id = validate_opportunity_id(&record.opportunity_id, "opportunity_id", &mut q);
        let contact_email = validate_email(&record.contact_email, "contact_email", &mut q);
        let stage = validate_stage(&record.stage, "stage", &mut q);
        let amount = validate_amount(record.amount, "amount", &mut q);
        let created_at = validate_datetime(&record.created_at, "created_at", &mut q);
        let utm_campaign = validate_utm_campaign(&record.utm_campaign, "utm_campaign", &mut q);
        let utm_source = validate_utm_source(record.utm_source.as_deref(), "utm_source", &mut q);
        let utm_medium = validate_utm_medium(record.utm_medium.as_deref(), "utm_medium", &mut q);

        NormalizedCrmRecord {
            utm_key: utm_key(&utm_campaign, &utm_source, &utm_medium),
            opportunity_id,
            contact_email,
            stage,
            amount,
            created_at,
            utm_campaign,
            utm_source,
            utm_medium,
            quality: q.finish(),
        }
    }
}

/// Normalize a whole ads batch, preserving input order
pub fn normalize_ads_batch(normalizer: &dyn Normalizer, records: &[AdsRecord]) -> Vec<NormalizedAdsRecord> {
    let normalized: Vec<_> = records
        .iter()
        .enumerate()
        .map(|(i, r)| normalizer.normalize_ads(i, r))
        .collect();
    debug!(
        records = normalized.len(),
        invalid = normalized.iter().filter(|r| !r.quality.is_valid).count(),
        "normalized ads batch"
    );
    normalized
}

/// Normalize a whole CRM batch, preserving input order
pub fn normalize_crm_batch(normalizer: &dyn Normalizer, records: &[CrmRecord]) -> Vec<NormalizedCrmRecord> {
    let normalized: Vec<_> = records
        .iter()
        .enumerate()
        .map(|(i, r)| normalizer.normalize_crm(i, r))
        .collect();
    debug!(
        records = normalized.len(),
        invalid = normalized.iter().filter(|r| !r.quality.is_valid).count(),
        "normalized crm batch"
    );
    normalized
}

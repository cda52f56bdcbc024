use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use tracing::debug;

use crate::constants::DAY_FORMAT;
use crate::domain::{NormalizedAdsRecord, NormalizedCrmRecord, RecordQuality};

/// Records that can be deduplicated by a business key
pub trait BusinessKey {
    fn business_key(&self) -> String;
    /// Description attached to a dropped duplicate of the record at `original_index`
    fn duplicate_description(original_index: usize) -> String;
    fn quality_mut(&mut self) -> &mut RecordQuality;
}

impl BusinessKey for NormalizedAdsRecord {
    fn business_key(&self) -> String {
        format!("{}|{}|{}", self.date.format(DAY_FORMAT), self.campaign_id, self.channel)
    }

    fn duplicate_description(original_index: usize) -> String {
        format!("Duplicate record found (original at index {})", original_index)
    }

    fn quality_mut(&mut self) -> &mut RecordQuality {
        &mut self.quality
    }
}

impl BusinessKey for NormalizedCrmRecord {
    fn business_key(&self) -> String {
        self.opportunity_id.clone()
    }

    fn duplicate_description(original_index: usize) -> String {
        format!("Duplicate opportunity ID found (original at index {})", original_index)
    }

    fn quality_mut(&mut self) -> &mut RecordQuality {
        &mut self.quality
    }
}

/// Result of one dedup pass: survivors plus the verdicts of what was dropped
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Deduplicated<T> {
    pub records: Vec<T>,
    pub duplicates: Vec<RecordQuality>,
}

/// Keep the first record per business key, in input order.
///
/// Later records sharing a key are removed from `records`; their quality gets
/// a failed `duplicate` entry and is returned in `duplicates`.
pub fn deduplicate<T: BusinessKey>(records: Vec<T>) -> Deduplicated<T> {
    let mut seen: HashMap<String, usize> = HashMap::new();
    let mut unique = Vec::with_capacity(records.len());
    let mut duplicates = Vec::new();

    for (i, mut record) in records.into_iter().enumerate() {
        let key = record.business_key();
        match seen.get(&key).copied() {
            None => {
                seen.insert(key, i);
                unique.push(record);
            }
            Some(original) => {
                let quality = record.quality_mut();
                quality.mark_duplicate(T::duplicate_description(original), &key);
                debug!(record_id = %quality.record_id, key = %key, original, "dropping duplicate");
                duplicates.push(quality.clone());
            }
        }
    }

    Deduplicated { records: unique, duplicates }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{AdsRecord, CrmRecord};
    use crate::pipeline::processing::normalize::{normalize_ads_batch, normalize_crm_batch, DefaultNormalizer};

    fn ads(date: &str, campaign: &str, channel: &str, clicks: i64) -> AdsRecord {
        AdsRecord {
            date: date.to_string(),
            campaign_id: campaign.to_string(),
            channel: channel.to_string(),
            clicks,
            impressions: 10,
            cost: 1.0,
            utm_campaign: "c".to_string(),
            utm_source: Some("s".to_string()),
            utm_medium: Some("m".to_string()),
        }
    }

    #[test]
    fn test_second_ads_record_with_same_key_is_dropped() {
        let batch = normalize_ads_batch(
            &DefaultNormalizer,
            &[
                ads("2025-08-01", "C1", "google_ads", 100),
                ads("2025-08-01", "C1", "google_ads", 999),
            ],
        );
        let out = deduplicate(batch);

        assert_eq!(out.records.len(), 1);
        assert_eq!(out.records[0].clicks, 100);
        assert!(out.records[0].quality.is_valid);
        assert!(!out.records[0].quality.field_errors.contains_key("duplicate"));

        assert_eq!(out.duplicates.len(), 1);
        let dup = &out.duplicates[0];
        assert_eq!(dup.record_id, "ads_1");
        assert!(!dup.is_valid);
        assert_eq!(dup.error_count, 1);
        assert_eq!(
            dup.field_errors["duplicate"].description,
            "Duplicate record found (original at index 0)"
        );
    }

    #[test]
    fn test_slash_and_dash_dates_share_a_key() {
        let batch = normalize_ads_batch(
            &DefaultNormalizer,
            &[
                ads("2025-08-01", "C1", "google_ads", 1),
                ads("2025/08/01", "C1", "google_ads", 2),
                ads("2025-08-01", "C1", "facebook_ads", 3),
            ],
        );
        let out = deduplicate(batch);
        let clicks: Vec<_> = out.records.iter().map(|r| r.clicks).collect();
        assert_eq!(clicks, [1, 3]);
    }

    #[test]
    fn test_crm_dedup_by_opportunity_id_is_stable() {
        let raw: Vec<CrmRecord> = ["O1", "O2", "O1", "O3", "O2"]
            .iter()
            .map(|id| CrmRecord {
                opportunity_id: id.to_string(),
                ..CrmRecord::default()
            })
            .collect();
        let out = deduplicate(normalize_crm_batch(&DefaultNormalizer, &raw));

        let ids: Vec<_> = out.records.iter().map(|r| r.opportunity_id.as_str()).collect();
        assert_eq!(ids, ["O1", "O2", "O3"]);
        assert_eq!(out.duplicates.len(), 2);
        assert_eq!(
            out.duplicates[1].field_errors["duplicate"].description,
            "Duplicate opportunity ID found (original at index 1)"
        );
    }

    #[test]
    fn test_dedup_is_idempotent() {
        let batch = normalize_ads_batch(
            &DefaultNormalizer,
            &[
                ads("2025-08-01", "C1", "google_ads", 1),
                ads("2025-08-02", "C1", "google_ads", 2),
                ads("2025-08-01", "C1", "google_ads", 3),
                ads("", "", "", 4),
                ads("", "", "", 5),
            ],
        );
        let once = deduplicate(batch);
        let twice = deduplicate(once.records.clone());
        assert_eq!(twice.records, once.records);
        assert!(twice.duplicates.is_empty());
    }
}

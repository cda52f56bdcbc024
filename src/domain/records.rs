use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use std::fmt;

use super::quality::RecordQuality;
use crate::constants::UNKNOWN;

/// Treat an explicit JSON `null` the same as a missing field.
fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Option::<T>::deserialize(deserializer).map(Option::unwrap_or_default)
}

/// One advertising performance row as delivered by the ads source
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AdsRecord {
    #[serde(deserialize_with = "null_as_default")]
    pub date: String,
    #[serde(deserialize_with = "null_as_default")]
    pub campaign_id: String,
    #[serde(deserialize_with = "null_as_default")]
    pub channel: String,
    #[serde(deserialize_with = "null_as_default")]
    pub clicks: i64,
    #[serde(deserialize_with = "null_as_default")]
    pub impressions: i64,
    #[serde(deserialize_with = "null_as_default")]
    pub cost: f64,
    #[serde(deserialize_with = "null_as_default")]
    pub utm_campaign: String,
    pub utm_source: Option<String>,
    pub utm_medium: Option<String>,
}

/// One CRM opportunity row as delivered by the CRM source
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CrmRecord {
    #[serde(deserialize_with = "null_as_default")]
    pub opportunity_id: String,
    #[serde(deserialize_with = "null_as_default")]
    pub contact_email: String,
    #[serde(deserialize_with = "null_as_default")]
    pub stage: String,
    #[serde(deserialize_with = "null_as_default")]
    pub amount: f64,
    #[serde(deserialize_with = "null_as_default")]
    pub created_at: String,
    #[serde(deserialize_with = "null_as_default")]
    pub utm_campaign: String,
    pub utm_source: Option<String>,
    pub utm_medium: Option<String>,
}

/// `{"external":{"ads":{"performance":[...]}}}`
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AdsResponse {
    pub external: AdsExternal,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AdsExternal {
    pub ads: AdsSection,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AdsSection {
    pub performance: Vec<AdsRecord>,
}

impl AdsResponse {
    pub fn into_records(self) -> Vec<AdsRecord> {
        self.external.ads.performance
    }
}

/// `{"external":{"crm":{"opportunities":[...]}}}`
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct CrmResponse {
    pub external: CrmExternal,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct CrmExternal {
    pub crm: CrmSection,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct CrmSection {
    pub opportunities: Vec<CrmRecord>,
}

impl CrmResponse {
    pub fn into_records(self) -> Vec<CrmRecord> {
        self.external.crm.opportunities
    }
}

/// CRM pipeline stage. Anything outside the known set is carried verbatim.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum Stage {
    Lead,
    Opportunity,
    ClosedWon,
    ClosedLost,
    Other(String),
}

impl Stage {
    pub fn as_str(&self) -> &str {
        match self {
            Stage::Lead => "lead",
            Stage::Opportunity => "opportunity",
            Stage::ClosedWon => "closed_won",
            Stage::ClosedLost => "closed_lost",
            Stage::Other(s) => s,
        }
    }

    pub fn is_known(&self) -> bool {
        !matches!(self, Stage::Other(_))
    }

    pub fn unknown() -> Self {
        Stage::Other(UNKNOWN.to_string())
    }
}

impl From<&str> for Stage {
    fn from(value: &str) -> Self {
        match value {
            "lead" => Stage::Lead,
            "opportunity" => Stage::Opportunity,
            "closed_won" => Stage::ClosedWon,
            "closed_lost" => Stage::ClosedLost,
            other => Stage::Other(other.to_string()),
        }
    }
}

impl From<String> for Stage {
    fn from(value: String) -> Self {
        Stage::from(value.as_str())
    }
}

impl From<Stage> for String {
    fn from(value: Stage) -> Self {
        match value {
            Stage::Other(s) => s,
            known => known.as_str().to_string(),
        }
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Advertising row after validation and coercion
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NormalizedAdsRecord {
    pub date: NaiveDate,
    pub campaign_id: String,
    pub channel: String,
    pub clicks: u64,
    pub impressions: u64,
    pub cost: f64,
    pub utm_campaign: String,
    pub utm_source: String,
    pub utm_medium: String,
    /// `campaign|source|medium`
    pub utm_key: String,
    pub quality: RecordQuality,
}

/// CRM opportunity after validation and coercion
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NormalizedCrmRecord {
    pub opportunity_id: String,
    pub contact_email: String,
    pub stage: Stage,
    pub amount: f64,
    pub created_at: DateTime<Utc>,
    pub utm_campaign: String,
    pub utm_source: String,
    pub utm_medium: String,
    pub utm_key: String,
    pub quality: RecordQuality,
}

impl NormalizedCrmRecord {
    /// Calendar day the opportunity was created on (UTC)
    pub fn created_day(&self) -> NaiveDate {
        self.created_at.date_naive()
    }
}

/// Build the attribution key joining ad spend to CRM outcomes.
pub fn utm_key(campaign: &str, source: &str, medium: &str) -> String {
    let campaign = if campaign.trim().is_empty() { UNKNOWN } else { campaign };
    format!("{}|{}|{}", campaign, source, medium)
}

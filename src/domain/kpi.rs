use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// Raw counts and derived ratios shared by every metrics row
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Kpis {
    pub clicks: u64,
    pub impressions: u64,
    pub cost: f64,
    pub leads: u64,
    /// Records that ever reached opportunity stage, won ones included
    pub opportunities: u64,
    pub closed_won: u64,
    pub revenue: f64,
    pub cpc: f64,
    pub cpa: f64,
    pub cvr_lead_to_opp: f64,
    pub cvr_opp_to_won: f64,
    pub roas: f64,
}

/// Share of valid records among those that fed one metrics row
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct GroupQuality {
    pub quality_score: f64,
    pub total_records: usize,
    pub valid_records: usize,
}

/// KPIs for one (date, channel) group
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChannelMetrics {
    pub channel: String,
    pub date: NaiveDate,
    #[serde(flatten)]
    pub kpis: Kpis,
    #[serde(flatten)]
    pub quality: GroupQuality,
}

/// KPIs for one attribution key
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FunnelMetrics {
    pub utm_campaign: String,
    pub utm_source: String,
    pub utm_medium: String,
    #[serde(flatten)]
    pub kpis: Kpis,
    #[serde(flatten)]
    pub quality: GroupQuality,
}

/// Denormalized row pushed to the export sink
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExportRecord {
    pub date: NaiveDate,
    pub channel: String,
    pub campaign_id: String,
    pub clicks: u64,
    pub impressions: u64,
    pub cost: f64,
    pub leads: u64,
    pub opportunities: u64,
    pub closed_won: u64,
    pub revenue: f64,
    pub cpc: f64,
    pub cpa: f64,
    pub cvr_lead_to_opp: f64,
    pub cvr_opp_to_won: f64,
    pub roas: f64,
}

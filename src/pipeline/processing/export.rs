use crate::constants::AGGREGATED_CAMPAIGN_ID;
use crate::domain::{ChannelMetrics, ExportRecord};

/// Flatten channel metrics into sink rows, one per (date, channel).
pub fn to_export_records(metrics: &[ChannelMetrics]) -> Vec<ExportRecord> {
    metrics
        .iter()
        .map(|m| ExportRecord {
            date: m.date,
            channel: m.channel.clone(),
            campaign_id: AGGREGATED_CAMPAIGN_ID.to_string(),
            clicks: m.kpis.clicks,
            impressions: m.kpis.impressions,
            cost: m.kpis.cost,
            leads: m.kpis.leads,
            opportunities: m.kpis.opportunities,
            closed_won: m.kpis.closed_won,
            revenue: m.kpis.revenue,
            cpc: m.kpis.cpc,
            cpa: m.kpis.cpa,
            cvr_lead_to_opp: m.kpis.cvr_lead_to_opp,
            cvr_opp_to_won: m.kpis.cvr_opp_to_won,
            roas: m.kpis.roas,
        })
        .collect()
}

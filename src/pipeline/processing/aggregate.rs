use chrono::NaiveDate;
use std::collections::{BTreeMap, HashSet};

use crate::domain::{
    ChannelMetrics, FunnelMetrics, GroupQuality, Kpis, NormalizedAdsRecord, NormalizedCrmRecord, Stage,
};
use crate::pipeline::processing::quality_report::quality_score;

/// How a CRM stage feeds the funnel counters
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StageOutcome {
    Lead,
    Opportunity,
    Won,
    Ignored,
}

impl StageOutcome {
    /// `closed_lost` still counts as an opportunity that was reached.
    pub fn classify(stage: &Stage) -> Self {
        match stage {
            Stage::Lead => StageOutcome::Lead,
            Stage::Opportunity | Stage::ClosedLost => StageOutcome::Opportunity,
            Stage::ClosedWon => StageOutcome::Won,
            Stage::Other(_) => StageOutcome::Ignored,
        }
    }
}

/// `numerator / denominator` rounded to 3 decimals; 0 when the result would be undefined.
pub fn safe_divide(numerator: f64, denominator: f64) -> f64 {
    if denominator == 0.0 {
        return 0.0;
    }
    let ratio = numerator / denominator;
    if !ratio.is_finite() {
        return 0.0;
    }
    let rounded = (ratio * 1000.0).round() / 1000.0;
    if rounded.is_finite() {
        rounded
    } else {
        0.0
    }
}

#[derive(Debug, Default)]
struct Tally {
    clicks: u64,
    impressions: u64,
    cost: f64,
    leads: u64,
    opportunities: u64,
    closed_won: u64,
    revenue: f64,
    total_records: usize,
    valid_records: usize,
}

impl Tally {
    fn add_ads(&mut self, record: &NormalizedAdsRecord) {
        self.clicks = self.clicks.saturating_add(record.clicks);
        self.impressions = self.impressions.saturating_add(record.impressions);
        self.cost += record.cost;
        self.count(record.quality.is_valid);
    }

    fn add_crm(&mut self, record: &NormalizedCrmRecord) {
        match StageOutcome::classify(&record.stage) {
            StageOutcome::Lead => self.leads = self.leads.saturating_add(1),
            StageOutcome::Opportunity => self.opportunities = self.opportunities.saturating_add(1),
            StageOutcome::Won => {
                self.closed_won = self.closed_won.saturating_add(1);
                self.revenue += record.amount;
            }
            StageOutcome::Ignored => {}
        }
        self.count(record.quality.is_valid);
    }

    fn count(&mut self, valid: bool) {
        self.total_records += 1;
        if valid {
            self.valid_records += 1;
        }
    }

    fn finish(self) -> (Kpis, GroupQuality) {
        let reached_opportunity = self.opportunities.saturating_add(self.closed_won);
        let kpis = Kpis {
            clicks: self.clicks,
            impressions: self.impressions,
            cost: self.cost,
            leads: self.leads,
            opportunities: reached_opportunity,
            closed_won: self.closed_won,
            revenue: self.revenue,
            cpc: safe_divide(self.cost, self.clicks as f64),
            cpa: safe_divide(self.cost, self.leads as f64),
            cvr_lead_to_opp: safe_divide(reached_opportunity as f64, self.leads as f64),
            cvr_opp_to_won: safe_divide(self.closed_won as f64, reached_opportunity as f64),
            roas: safe_divide(self.revenue, self.cost),
        };
        let quality = GroupQuality {
            quality_score: quality_score(self.valid_records, self.total_records),
            total_records: self.total_records,
            valid_records: self.valid_records,
        };
        (kpis, quality)
    }
}

/// KPIs per (date, channel), sorted by date then channel.
///
/// A CRM record joins a group when it was created on the group's date and
/// its utm_key appears among the group's ads records.
pub fn channel_metrics(
    ads: &[NormalizedAdsRecord],
    crm: &[NormalizedCrmRecord],
    channel: Option<&str>,
) -> Vec<ChannelMetrics> {
    let mut groups: BTreeMap<(NaiveDate, String), (Tally, HashSet<&str>)> = BTreeMap::new();

    for record in ads.iter().filter(|r| channel.map_or(true, |c| r.channel == c)) {
        let (tally, keys) = groups.entry((record.date, record.channel.clone())).or_default();
        tally.add_ads(record);
        keys.insert(record.utm_key.as_str());
    }

    groups
        .into_iter()
        .map(|((date, channel), (mut tally, keys))| {
            for record in crm
                .iter()
                .filter(|r| r.created_day() == date && keys.contains(r.utm_key.as_str()))
            {
                tally.add_crm(record);
            }
            let (kpis, quality) = tally.finish();
            ChannelMetrics { channel, date, kpis, quality }
        })
        .collect()
}

/// KPIs per attribution key, sorted by utm_key. No date constraint on the join.
pub fn funnel_metrics(
    ads: &[NormalizedAdsRecord],
    crm: &[NormalizedCrmRecord],
    utm_campaign: Option<&str>,
) -> Vec<FunnelMetrics> {
    let mut groups: BTreeMap<&str, (Tally, &NormalizedAdsRecord)> = BTreeMap::new();

    for record in ads
        .iter()
        .filter(|r| utm_campaign.map_or(true, |c| r.utm_campaign == c))
    {
        groups
            .entry(record.utm_key.as_str())
            .or_insert_with(|| (Tally::default(), record))
            .0
            .add_ads(record);
    }

    groups
        .into_iter()
        .map(|(key, (mut tally, first))| {
            for record in crm.iter().filter(|r| r.utm_key == key) {
                tally.add_crm(record);
            }
            let (kpis, quality) = tally.finish();
            FunnelMetrics {
                utm_campaign: first.utm_campaign.clone(),
                utm_source: first.utm_source.clone(),
                utm_medium: first.utm_medium.clone(),
                kpis,
                quality,
            }
        })
        .collect()
}

// Domain data shapes shared across layers

pub mod kpi;
pub mod quality;
pub mod records;
pub mod report;

pub use kpi::{ChannelMetrics, ExportRecord, FunnelMetrics, GroupQuality, Kpis};
pub use quality::{FieldQuality, RawValue, RecordQuality};
pub use records::{
    utm_key, AdsRecord, AdsResponse, CrmRecord, CrmResponse, NormalizedAdsRecord,
    NormalizedCrmRecord, Stage,
};
pub use report::{DataQualityReport, QualitySummary};

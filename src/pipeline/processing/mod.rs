// Pure record processing: validate, normalize, dedup, score, aggregate

pub mod aggregate;
pub mod dedup;
pub mod export;
pub mod normalize;
pub mod quality_report;
pub mod validate;

pub use aggregate::{channel_metrics, funnel_metrics, safe_divide, StageOutcome};
pub use dedup::{deduplicate, BusinessKey, Deduplicated};
pub use export::to_export_records;
pub use normalize::{normalize_ads_batch, normalize_crm_batch, DefaultNormalizer, Normalizer};
pub use quality_report::{quality_score, QualityInputs, QualityReportConfig, QualityReporter};

/// Shared constants for validation rules and record identifiers
/// These keep the accepted vocabularies in one place across the codebase

/// Fallback value written into identifier and attribution fields that are missing
pub const UNKNOWN: &str = "unknown";

// Advertising channels accepted by the channel validator
pub const GOOGLE_ADS: &str = "google_ads";
pub const FACEBOOK_ADS: &str = "facebook_ads";
pub const TIKTOK_ADS: &str = "tiktok_ads";
pub const LINKEDIN_ADS: &str = "linkedin_ads";
pub const TWITTER_ADS: &str = "twitter_ads";

pub const VALID_CHANNELS: [&str; 5] = [GOOGLE_ADS, FACEBOOK_ADS, TIKTOK_ADS, LINKEDIN_ADS, TWITTER_ADS];

// CRM stages accepted by the stage validator
pub const VALID_STAGES: [&str; 4] = ["lead", "opportunity", "closed_won", "closed_lost"];

/// Calendar date layouts, tried in order
pub const DATE_FORMATS: [&str; 2] = ["%Y-%m-%d", "%Y/%m/%d"];

/// Naive timestamp layouts tried after RFC 3339, read as UTC
pub const DATETIME_FORMATS: [&str; 3] = ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S", "%Y/%m/%d %H:%M:%S"];

/// Layout of dates inside business keys, query params, and exports
pub const DAY_FORMAT: &str = "%Y-%m-%d";

// Record id prefixes (`ads_0`, `crm_3`, ...)
pub const ADS_RECORD_PREFIX: &str = "ads";
pub const CRM_RECORD_PREFIX: &str = "crm";

/// Campaign id written on channel-level export rows
pub const AGGREGATED_CAMPAIGN_ID: &str = "aggregated";

pub const SERVICE_NAME: &str = "marketing-etl";

/// Check whether a channel name belongs to the supported set
pub fn is_supported_channel(channel: &str) -> bool {
    VALID_CHANNELS.contains(&channel)
}

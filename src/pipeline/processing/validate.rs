//! Field validators.
//!
//! Every validator takes the raw value, the field name, and the builder for
//! the record being normalized. It always writes exactly one verdict for the
//! field and returns the value to store: the input when valid, a fallback
//! when it is not. None of them can fail.

use chrono::{DateTime, NaiveDate, NaiveDateTime, NaiveTime, TimeZone, Utc};
use once_cell::sync::Lazy;
use regex::Regex;
use std::collections::BTreeMap;

use crate::constants::{DATETIME_FORMATS, DATE_FORMATS, UNKNOWN, VALID_STAGES};
use crate::domain::{FieldQuality, RawValue, RecordQuality, Stage};

static EMAIL_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^[a-zA-Z0-9._%+-]+@[a-zA-Z0-9.-]+\.[a-zA-Z]{2,}$").expect("email pattern compiles")
});

/// Accumulates field verdicts for one record; consumed by [`QualityBuilder::finish`].
#[derive(Debug)]
pub struct QualityBuilder {
    record_id: String,
    field_errors: BTreeMap<String, FieldQuality>,
    error_count: usize,
}

impl QualityBuilder {
    pub fn new(record_id: impl Into<String>) -> Self {
        Self {
            record_id: record_id.into(),
            field_errors: BTreeMap::new(),
            error_count: 0,
        }
    }

    pub fn pass(&mut self, field: &str, description: impl Into<String>, original: impl Into<RawValue>) {
        self.record(field, true, description.into(), original.into());
    }

    pub fn fail(&mut self, field: &str, description: impl Into<String>, original: impl Into<RawValue>) {
        self.record(field, false, description.into(), original.into());
        self.error_count += 1;
    }

    fn record(&mut self, field: &str, is_valid: bool, description: String, original_value: RawValue) {
        self.field_errors.insert(
            field.to_string(),
            FieldQuality { is_valid, description, original_value },
        );
    }

    pub fn error_count(&self) -> usize {
        self.error_count
    }

    pub fn finish(self) -> RecordQuality {
        RecordQuality {
            record_id: self.record_id,
            is_valid: self.error_count == 0,
            field_errors: self.field_errors,
            error_count: self.error_count,
        }
    }
}

/// Date used in place of an unparseable or missing date (0001-01-01)
pub fn zero_date() -> NaiveDate {
    NaiveDate::from_ymd_opt(1, 1, 1).unwrap_or(NaiveDate::MIN)
}

/// Timestamp used in place of an unparseable or missing datetime
pub fn zero_datetime() -> DateTime<Utc> {
    Utc.from_utc_datetime(&zero_date().and_time(NaiveTime::default()))
}

fn is_blank(s: &str) -> bool {
    s.trim().is_empty()
}

// Dates

/// `YYYY-MM-DD` or `YYYY/MM/DD` with zero-padded fields. chrono alone accepts
/// unpadded fields, a sign, and leading whitespace.
fn has_day_shape(b: &[u8]) -> bool {
    let digits = |r: std::ops::Range<usize>| b[r].iter().all(u8::is_ascii_digit);
    b.len() >= 10
        && digits(0..4)
        && digits(5..7)
        && digits(8..10)
        && matches!(b[4], b'-' | b'/')
        && b[7] == b[4]
}

/// A padded day followed by `T` or a space and `HH:MM:SS`
fn has_naive_datetime_shape(b: &[u8]) -> bool {
    let digits = |r: std::ops::Range<usize>| b[r].iter().all(u8::is_ascii_digit);
    b.len() >= 19
        && has_day_shape(b)
        && matches!(b[10], b'T' | b' ')
        && digits(11..13)
        && b[13] == b':'
        && digits(14..16)
        && b[16] == b':'
        && digits(17..19)
}

pub fn validate_date(raw: &str, field: &str, q: &mut QualityBuilder) -> NaiveDate {
    if is_blank(raw) {
        q.fail(field, "Missing - Date field is empty", raw);
        return zero_date();
    }

    let parsed = if raw.len() == 10 && has_day_shape(raw.as_bytes()) {
        DATE_FORMATS
            .iter()
            .find_map(|fmt| NaiveDate::parse_from_str(raw, fmt).ok())
    } else {
        None
    };
    if let Some(date) = parsed {
        q.pass(field, "Valid date", raw);
        return date;
    }

    q.fail(field, "Invalid date format - Expected YYYY-MM-DD or YYYY/MM/DD", raw);
    zero_date()
}

fn parse_datetime(raw: &str) -> Option<DateTime<Utc>> {
    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return Some(dt.with_timezone(&Utc));
    }
    if !has_naive_datetime_shape(raw.as_bytes()) {
        return None;
    }
    DATETIME_FORMATS
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(raw, fmt).ok())
        .map(|ndt| Utc.from_utc_datetime(&ndt))
}

pub fn validate_datetime(raw: &str, field: &str, q: &mut QualityBuilder) -> DateTime<Utc> {
    if is_blank(raw) {
        q.fail(field, "Missing - DateTime field is empty", raw);
        return zero_datetime();
    }

    match parse_datetime(raw) {
        Some(dt) => {
            q.pass(field, "Valid datetime", raw);
            dt
        }
        None => {
            q.fail(field, "Invalid datetime format - Expected ISO format or YYYY-MM-DD HH:MM:SS", raw);
            zero_datetime()
        }
    }
}

// Identifiers

fn validate_identifier(raw: &str, field: &str, missing: &str, valid: &str, q: &mut QualityBuilder) -> String {
    if is_blank(raw) {
        q.fail(field, missing, raw);
        return UNKNOWN.to_string();
    }
    q.pass(field, valid, raw);
    raw.to_string()
}

pub fn validate_campaign_id(raw: &str, field: &str, q: &mut QualityBuilder) -> String {
    validate_identifier(raw, field, "Missing - Campaign ID is empty, using 'unknown'", "Valid campaign ID", q)
}

pub fn validate_opportunity_id(raw: &str, field: &str, q: &mut QualityBuilder) -> String {
    validate_identifier(raw, field, "Missing - Opportunity ID is empty", "Valid opportunity ID", q)
}

// Vocabularies

/// Unknown channels fail but are kept as-is so they still group on their own.
pub fn validate_channel(raw: &str, field: &str, q: &mut QualityBuilder) -> String {
    if is_blank(raw) {
        q.fail(field, "Missing - Channel is empty", raw);
        return UNKNOWN.to_string();
    }
    if crate::constants::is_supported_channel(raw) {
        q.pass(field, "Valid channel", raw);
    } else {
        q.fail(field, format!("Unknown channel type: {}", raw), raw);
    }
    raw.to_string()
}

pub fn validate_stage(raw: &str, field: &str, q: &mut QualityBuilder) -> Stage {
    if is_blank(raw) {
        q.fail(field, "Missing - Stage is empty", raw);
        return Stage::unknown();
    }
    if VALID_STAGES.contains(&raw) {
        q.pass(field, "Valid stage", raw);
    } else {
        q.fail(field, format!("Unknown stage: {}", raw), raw);
    }
    Stage::from(raw)
}

// Numbers

fn validate_non_negative_int(raw: i64, field: &str, label: &str, valid: &str, q: &mut QualityBuilder) -> u64 {
    match u64::try_from(raw) {
        Ok(v) => {
            q.pass(field, valid, raw);
            v
        }
        Err(_) => {
            q.fail(field, format!("Invalid - {} cannot be negative, setting to 0", label), raw);
            0
        }
    }
}

fn validate_non_negative_float(raw: f64, field: &str, label: &str, valid: &str, q: &mut QualityBuilder) -> f64 {
    if !raw.is_finite() {
        q.fail(field, format!("Invalid - {} is not a finite number, setting to 0", label), raw);
        return 0.0;
    }
    if raw < 0.0 {
        q.fail(field, format!("Invalid - {} cannot be negative, setting to 0", label), raw);
        return 0.0;
    }
    q.pass(field, valid, raw);
    raw
}

pub fn validate_clicks(raw: i64, field: &str, q: &mut QualityBuilder) -> u64 {
    validate_non_negative_int(raw, field, "Clicks", "Valid clicks count", q)
}

pub fn validate_impressions(raw: i64, field: &str, q: &mut QualityBuilder) -> u64 {
    validate_non_negative_int(raw, field, "Impressions", "Valid impressions count", q)
}

pub fn validate_cost(raw: f64, field: &str, q: &mut QualityBuilder) -> f64 {
    validate_non_negative_float(raw, field, "Cost", "Valid cost amount", q)
}

pub fn validate_amount(raw: f64, field: &str, q: &mut QualityBuilder) -> f64 {
    validate_non_negative_float(raw, field, "Amount", "Valid amount", q)
}

// Contact

/// Invalid emails are flagged but never replaced.
pub fn validate_email(raw: &str, field: &str, q: &mut QualityBuilder) -> String {
    if is_blank(raw) {
        q.fail(field, "Missing - Email is empty", raw);
    } else if !EMAIL_RE.is_match(raw) {
        q.fail(field, "Invalid email format", raw);
    } else {
        q.pass(field, "Valid email", raw);
    }
    raw.to_string()
}

// Attribution

pub fn validate_utm_campaign(raw: &str, field: &str, q: &mut QualityBuilder) -> String {
    if is_blank(raw) {
        q.fail(field, "Missing - UTM Campaign is empty, using 'unknown'", raw);
        return UNKNOWN.to_string();
    }
    q.pass(field, "Valid UTM campaign", raw);
    raw.to_string()
}

fn validate_optional_utm(raw: Option<&str>, field: &str, label: &str, q: &mut QualityBuilder) -> String {
    match raw {
        Some(value) if !is_blank(value) => {
            q.pass(field, format!("Valid UTM {}", label.to_lowercase()), value);
            value.trim().to_string()
        }
        _ => {
            q.fail(field, format!("Missing - UTM {} is null or empty, using 'unknown'", label), raw);
            UNKNOWN.to_string()
        }
    }
}

pub fn validate_utm_source(raw: Option<&str>, field: &str, q: &mut QualityBuilder) -> String {
    validate_optional_utm(raw, field, "Source", q)
}

pub fn validate_utm_medium(raw: Option<&str>, field: &str, q: &mut QualityBuilder) -> String {
    validate_optional_utm(raw, field, "Medium", q)
}

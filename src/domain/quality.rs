use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// The raw input a field was validated from, kept for audit even when the
/// normalized value was coerced.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(untagged)]
pub enum RawValue {
    Text(String),
    Integer(i64),
    Float(f64),
    Boolean(bool),
    #[default]
    Absent,
}

impl RawValue {
    pub fn is_absent(&self) -> bool {
        matches!(self, RawValue::Absent)
    }
}

impl From<&str> for RawValue {
    fn from(value: &str) -> Self {
        RawValue::Text(value.to_string())
    }
}

impl From<String> for RawValue {
    fn from(value: String) -> Self {
        RawValue::Text(value)
    }
}

impl From<i64> for RawValue {
    fn from(value: i64) -> Self {
        RawValue::Integer(value)
    }
}

impl From<f64> for RawValue {
    fn from(value: f64) -> Self {
        RawValue::Float(value)
    }
}

impl From<bool> for RawValue {
    fn from(value: bool) -> Self {
        RawValue::Boolean(value)
    }
}

impl<T: Into<RawValue>> From<Option<T>> for RawValue {
    fn from(value: Option<T>) -> Self {
        value.map(Into::into).unwrap_or(RawValue::Absent)
    }
}

/// Verdict for a single validated field
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FieldQuality {
    pub is_valid: bool,
    /// Human-readable explanation of the verdict
    pub description: String,
    #[serde(default, skip_serializing_if = "RawValue::is_absent")]
    pub original_value: RawValue,
}

/// Per-record roll-up of every field verdict
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RecordQuality {
    pub record_id: String,
    pub is_valid: bool,
    pub field_errors: BTreeMap<String, FieldQuality>,
    pub error_count: usize,
}

/// Field key used for the verdict appended to discarded duplicates
pub const DUPLICATE_FIELD: &str = "duplicate";

impl RecordQuality {
    /// Record a failed `duplicate` verdict on this record and invalidate it.
    pub fn mark_duplicate(&mut self, description: String, business_key: &str) {
        self.field_errors.insert(
            DUPLICATE_FIELD.to_string(),
            FieldQuality {
                is_valid: false,
                description,
                original_value: RawValue::from(business_key),
            },
        );
        self.error_count += 1;
        self.is_valid = false;
    }

    /// Iterate over the descriptions of every failed field
    pub fn failed_descriptions(&self) -> impl Iterator<Item = &str> {
        self.field_errors
            .values()
            .filter(|fq| !fq.is_valid)
            .map(|fq| fq.description.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn raw_value_serializes_untagged() {
        assert_eq!(serde_json::to_value(RawValue::from("abc")).unwrap(), json!("abc"));
        assert_eq!(serde_json::to_value(RawValue::from(-3i64)).unwrap(), json!(-3));
        assert_eq!(serde_json::to_value(RawValue::from(1.5f64)).unwrap(), json!(1.5));
        assert_eq!(serde_json::to_value(RawValue::Absent).unwrap(), json!(null));
    }

    #[test]
    fn absent_original_value_is_omitted() {
        let fq = FieldQuality {
            is_valid: false,
            description: "Missing".to_string(),
            original_value: RawValue::from(None::<String>),
        };
        let v = serde_json::to_value(&fq).unwrap();
        assert!(v.get("original_value").is_none());
    }

    #[test]
    fn mark_duplicate_invalidates_record() {
        let mut q = RecordQuality {
            record_id: "ads_1".to_string(),
            is_valid: true,
            field_errors: BTreeMap::new(),
            error_count: 0,
        };
        q.mark_duplicate("Duplicate record found (original at index 0)".to_string(), "k");
        assert!(!q.is_valid);
        assert_eq!(q.error_count, 1);
        assert_eq!(q.field_errors[DUPLICATE_FIELD].original_value, RawValue::from("k"));
        assert_eq!(q.failed_descriptions().count(), 1);
    }
}

//! Health records as served by the backend.
//!
//! The engagement engine only reads `recorded_at`; the vital measurements
//! are carried so that records and stats round-trip through the same types
//! the backend uses.

use chrono::{DateTime, NaiveDateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};

/// Vital measurements attached to a record. Every field is optional.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Vitals {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub systolic_bp: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub diastolic_bp: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub blood_sugar: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub weight: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub temperature: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub heart_rate: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
}

impl Vitals {
    /// True when no measurement is present.
    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }
}

/// A single logged health record.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct HealthRecord {
    #[serde(default)]
    pub id: String,
    /// When the measurement was taken. `None` when the backend sent a
    /// missing or unparseable timestamp.
    #[serde(default, deserialize_with = "lenient_timestamp")]
    pub recorded_at: Option<DateTime<Utc>>,
    #[serde(flatten)]
    pub vitals: Vitals,
}

impl HealthRecord {
    pub fn new(id: impl Into<String>, recorded_at: DateTime<Utc>) -> Self {
        Self {
            id: id.into(),
            recorded_at: Some(recorded_at),
            vitals: Vitals::default(),
        }
    }

    pub fn with_vitals(mut self, vitals: Vitals) -> Self {
        self.vitals = vitals;
        self
    }
}

/// Parse an ISO-8601 timestamp. Offset-less values are taken as UTC, which
/// is how the backend stores them.
pub fn parse_timestamp(raw: &str) -> Option<DateTime<Utc>> {
    let raw = raw.trim();
    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return Some(dt.with_timezone(&Utc));
    }
    NaiveDateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M:%S%.f")
        .ok()
        .map(|naive| naive.and_utc())
}

fn lenient_timestamp<'de, D>(deserializer: D) -> Result<Option<DateTime<Utc>>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = Option::<serde_json::Value>::deserialize(deserializer)?;
    Ok(match raw {
        Some(serde_json::Value::String(s)) => parse_timestamp(&s),
        _ => None,
    })
}

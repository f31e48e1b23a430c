use std::collections::BTreeSet;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::slot::TimeSlot;
use crate::error::ValidationError;

/// A medication as served by the backend.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Medication {
    pub id: String,
    pub name: String,
    pub dosage: String,
    #[serde(default)]
    pub frequency: String,
    pub time_of_day: Vec<TimeSlot>,
    pub start_date: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub end_date: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
    #[serde(default = "default_active")]
    pub active: bool,
}

fn default_active() -> bool {
    true
}

impl Medication {
    pub fn new(
        id: impl Into<String>,
        name: impl Into<String>,
        dosage: impl Into<String>,
        time_of_day: impl IntoIterator<Item = TimeSlot>,
    ) -> Self {
        let time_of_day: Vec<TimeSlot> = time_of_day.into_iter().collect();
        Self {
            id: id.into(),
            name: name.into(),
            dosage: dosage.into(),
            frequency: format!("{}x daily", time_of_day.len()),
            time_of_day,
            start_date: Utc::now(),
            end_date: None,
            notes: None,
            active: true,
        }
    }

    /// Configured slots with duplicates removed, in day order.
    pub fn slots(&self) -> BTreeSet<TimeSlot> {
        self.time_of_day.iter().copied().collect()
    }

    /// Reject medications the scheduler cannot serve.
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.time_of_day.is_empty() {
            return Err(ValidationError::EmptyTimeOfDay {
                medication_id: self.id.clone(),
            });
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn deserializes_backend_medication() {
        let json = r#"{
            "id": "m1",
            "user_id": "u1",
            "name": "Metformin",
            "dosage": "500mg",
            "frequency": "Twice daily",
            "time_of_day": ["Morning", "Night"],
            "start_date": "2024-01-01T00:00:00Z",
            "end_date": null,
            "active": true,
            "created_at": "2024-01-01T00:00:00Z"
        }"#;
        let med: Medication = serde_json::from_str(json).unwrap();
        assert_eq!(med.name, "Metformin");
        assert_eq!(med.time_of_day, vec![TimeSlot::Morning, TimeSlot::Night]);
        assert!(med.active);
        assert!(med.end_date.is_none());
    }

    #[test]
    fn active_defaults_to_true() {
        let json = r#"{"id": "m2", "name": "A", "dosage": "1", "time_of_day": ["Evening"],
            "start_date": "2024-01-01T00:00:00Z"}"#;
        let med: Medication = serde_json::from_str(json).unwrap();
        assert!(med.active);
    }

    #[test]
    fn slots_are_deduplicated_and_ordered() {
        let med = Medication::new(
            "m1",
            "A",
            "1",
            [TimeSlot::Night, TimeSlot::Morning, TimeSlot::Night],
        );
        let slots: Vec<_> = med.slots().into_iter().collect();
        assert_eq!(slots, vec![TimeSlot::Morning, TimeSlot::Night]);
    }

    #[test]
    fn empty_time_of_day_is_rejected() {
        let med = Medication::new("m1", "A", "1", Vec::new());
        assert_eq!(
            med.validate(),
            Err(ValidationError::EmptyTimeOfDay {
                medication_id: "m1".into()
            })
        );
        assert!(Medication::new("m2", "B", "1", [TimeSlot::Morning])
            .validate()
            .is_ok());
    }
}

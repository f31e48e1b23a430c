//! Read-only views of the backend's data.
//!
//! The engagement engine and the scheduler consume records, statistics and
//! medications through these traits. The backend transport is not part of
//! this crate; [`SnapshotFile`] serves the same shapes from a JSON export.

use std::path::{Path, PathBuf};

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

use crate::engagement::StatsSnapshot;
use crate::error::SourceError;
use crate::records::HealthRecord;
use crate::reminders::Medication;

pub trait RecordSource {
    /// Records from the last `window_days` days.
    fn fetch_recent_records(&self, window_days: u32) -> Result<Vec<HealthRecord>, SourceError>;
}

pub trait StatsSource {
    fn fetch_stats(&self) -> Result<StatsSnapshot, SourceError>;
}

pub trait MedicationSource {
    fn fetch_active_medications(&self) -> Result<Vec<Medication>, SourceError>;
}

/// The JSON export layout.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Snapshot {
    #[serde(default)]
    pub records: Vec<HealthRecord>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stats: Option<StatsSnapshot>,
    #[serde(default)]
    pub medications: Vec<Medication>,
}

/// Serves records, stats and medications from a JSON snapshot on disk.
#[derive(Debug, Clone)]
pub struct SnapshotFile {
    path: PathBuf,
    snapshot: Snapshot,
    as_of: Option<DateTime<Utc>>,
}

impl SnapshotFile {
    /// Read and decode the snapshot at `path`.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or is not a valid
    /// snapshot.
    pub fn open(path: impl AsRef<Path>) -> Result<Self, SourceError> {
        let path = path.as_ref().to_path_buf();
        let content = std::fs::read_to_string(&path).map_err(|source| SourceError::ReadFailed {
            path: path.clone(),
            source,
        })?;
        let snapshot = serde_json::from_str(&content).map_err(|source| SourceError::Malformed {
            path: path.clone(),
            source,
        })?;
        Ok(Self {
            path,
            snapshot,
            as_of: None,
        })
    }

    pub fn from_snapshot(snapshot: Snapshot) -> Self {
        Self {
            path: PathBuf::new(),
            snapshot,
            as_of: None,
        }
    }

    /// Measure the record window from `as_of` instead of the current time.
    pub fn as_of(mut self, as_of: DateTime<Utc>) -> Self {
        self.as_of = Some(as_of);
        self
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn snapshot(&self) -> &Snapshot {
        &self.snapshot
    }
}

impl RecordSource for SnapshotFile {
    fn fetch_recent_records(&self, window_days: u32) -> Result<Vec<HealthRecord>, SourceError> {
        let now = self.as_of.unwrap_or_else(Utc::now);
        let cutoff = now - Duration::days(i64::from(window_days));
        Ok(self
            .snapshot
            .records
            .iter()
            .filter(|r| r.recorded_at.is_some_and(|at| at >= cutoff))
            .cloned()
            .collect())
    }
}

impl StatsSource for SnapshotFile {
    /// The exported stats, or counts derived from the snapshot when the
    /// export carries none.
    fn fetch_stats(&self) -> Result<StatsSnapshot, SourceError> {
        if let Some(stats) = &self.snapshot.stats {
            return Ok(stats.clone());
        }
        let count = |n: usize| u32::try_from(n).unwrap_or(u32::MAX);
        let active = self.snapshot.medications.iter().filter(|m| m.active).count();
        Ok(StatsSnapshot::new(
            count(self.snapshot.records.len()),
            count(active),
            0,
        ))
    }
}

impl MedicationSource for SnapshotFile {
    fn fetch_active_medications(&self) -> Result<Vec<Medication>, SourceError> {
        Ok(self
            .snapshot
            .medications
            .iter()
            .filter(|m| m.active)
            .cloned()
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use tempfile::TempDir;

    const EXPORT: &str = r#"{
        "records": [
            {"id": "r1", "recorded_at": "2024-01-03T09:00:00+00:00", "weight": 71.5},
            {"id": "r2", "recorded_at": "2023-11-01T09:00:00+00:00"},
            {"id": "r3", "recorded_at": "garbage"}
        ],
        "medications": [
            {"id": "m1", "name": "A", "dosage": "1", "time_of_day": ["Morning"],
             "start_date": "2024-01-01T00:00:00Z"},
            {"id": "m2", "name": "B", "dosage": "2", "time_of_day": ["Night"],
             "start_date": "2024-01-01T00:00:00Z", "active": false}
        ]
    }"#;

    fn write_export(dir: &TempDir, content: &str) -> PathBuf {
        let path = dir.path().join("export.json");
        std::fs::write(&path, content).unwrap();
        path
    }

    #[test]
    fn window_filters_old_and_undated_records() {
        let dir = TempDir::new().unwrap();
        let source = SnapshotFile::open(write_export(&dir, EXPORT))
            .unwrap()
            .as_of(Utc.with_ymd_and_hms(2024, 1, 3, 20, 0, 0).unwrap());

        assert!(source.path().ends_with("export.json"));

        let recent = source.fetch_recent_records(30).unwrap();
        let ids: Vec<_> = recent.iter().map(|r| r.id.as_str()).collect();
        assert_eq!(ids, vec!["r1"]);
        assert_eq!(recent[0].vitals.weight, Some(71.5));
    }

    #[test]
    fn derived_stats_when_export_has_none() {
        let dir = TempDir::new().unwrap();
        let source = SnapshotFile::open(write_export(&dir, EXPORT)).unwrap();
        assert_eq!(source.fetch_stats().unwrap(), StatsSnapshot::new(3, 1, 0));
    }

    #[test]
    fn exported_stats_win() {
        let snapshot = Snapshot {
            stats: Some(StatsSnapshot::new(42, 3, 0)),
            ..Default::default()
        };
        let source = SnapshotFile::from_snapshot(snapshot);
        assert_eq!(source.fetch_stats().unwrap().total_records, 42);
    }

    #[test]
    fn only_active_medications() {
        let dir = TempDir::new().unwrap();
        let source = SnapshotFile::open(write_export(&dir, EXPORT)).unwrap();
        let meds = source.fetch_active_medications().unwrap();
        assert_eq!(meds.len(), 1);
        assert_eq!(meds[0].id, "m1");
    }

    #[test]
    fn missing_file_is_read_error() {
        let dir = TempDir::new().unwrap();
        let err = SnapshotFile::open(dir.path().join("nope.json")).unwrap_err();
        assert!(matches!(err, SourceError::ReadFailed { .. }));
    }

    #[test]
    fn malformed_file_is_decode_error() {
        let dir = TempDir::new().unwrap();
        let err = SnapshotFile::open(write_export(&dir, "{\"records\": 7}")).unwrap_err();
        assert!(matches!(err, SourceError::Malformed { .. }));
    }
}

//! # HealthPulse Core Library
//!
//! This library provides the engagement and reminder engine behind the
//! HealthPulse health tracker. Recording vitals, storing medications and
//! rendering charts belong to the backend and the UI; this crate owns the
//! parts whose correctness depends on calendar arithmetic and timers.
//!
//! ## Architecture
//!
//! - **Calendar**: midnight alignment and calendar-day distance that stay
//!   exact across daylight-saving transitions
//! - **Engagement**: consecutive-day streaks, the achievement catalog and
//!   motivational messages, all pure functions of their inputs
//! - **Reminders**: a per-medication, per-slot timer table that re-arms
//!   itself every day and delivers through an injected notification sink
//! - **Sources**: read-only traits for records, stats and medications
//! - **Storage**: TOML-based configuration
//!
//! ## Key Components
//!
//! - [`compute_streak`]: Streak over a record history
//! - [`unlocked_achievements`]: Achievement evaluation
//! - [`ReminderScheduler`]: Medication reminder timers
//! - [`NotificationSink`]: Notification delivery boundary
//! - [`Config`]: Application configuration management

pub mod calendar;
pub mod clock;
pub mod engagement;
pub mod error;
pub mod records;
pub mod reminders;
pub mod sources;
pub mod storage;

pub use clock::{AnchoredClock, Clock, SystemClock};
pub use engagement::{
    achievement_statuses, compute_streak, motivational_message,
    unlocked_achievements, Achievement, AchievementStatus, EngagementReport, StatsSnapshot,
};
pub use error::{ConfigError, CoreError, SchedulerError, SourceError, ValidationError};
pub use records::{HealthRecord, Vitals};
pub use reminders::{
    DedupKey, MemorySink, Medication, Notification, NotificationSink, Permission,
    ReminderScheduler, ScheduledReminder, SchedulerOptions, SlotTimes, TimeSlot,
};
pub use sources::{MedicationSource, RecordSource, Snapshot, SnapshotFile, StatsSource};
pub use storage::Config;

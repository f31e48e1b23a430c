//! Dashboard view of engagement: streak, message and achievements.

use chrono::{DateTime, TimeZone};
use serde::Serialize;

use super::achievements::{achievement_statuses, motivational_message, AchievementStatus, StatsSnapshot};
use super::streak::compute_streak;
use crate::error::Result;
use crate::records::HealthRecord;
use crate::sources::{RecordSource, StatsSource};

/// Everything the dashboard shows about engagement.
#[derive(Debug, Clone, Serialize)]
pub struct EngagementReport {
    pub streak: u32,
    pub message: String,
    pub unlocked: Vec<&'static str>,
    pub achievements: Vec<AchievementStatus>,
    pub stats: StatsSnapshot,
}

impl EngagementReport {
    /// Recompute the streak from `records`, fold it into `stats` and
    /// evaluate the catalog against the result.
    pub fn build<Tz: TimeZone>(
        records: &[HealthRecord],
        stats: StatsSnapshot,
        now: &DateTime<Tz>,
    ) -> Self {
        let streak = compute_streak(records, now);
        let stats = stats.with_streak(streak);
        let achievements = achievement_statuses(&stats);
        let unlocked = achievements
            .iter()
            .filter(|s| s.unlocked)
            .map(|s| s.achievement.id)
            .collect();

        Self {
            streak,
            message: motivational_message(streak),
            unlocked,
            achievements,
            stats,
        }
    }

    /// Pull the record window and stats from their sources, then build.
    ///
    /// # Errors
    ///
    /// Returns an error if either source fails.
    pub fn from_sources<Tz: TimeZone>(
        records: &impl RecordSource,
        stats: &impl StatsSource,
        window_days: u32,
        now: &DateTime<Tz>,
    ) -> Result<Self> {
        let history = records.fetch_recent_records(window_days)?;
        let snapshot = stats.fetch_stats()?;
        Ok(Self::build(&history, snapshot, now))
    }
}

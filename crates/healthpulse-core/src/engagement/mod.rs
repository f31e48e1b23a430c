//! Engagement cues: consecutive-day streaks, achievement unlocks and the
//! motivational message shown next to the streak.
//!
//! Everything here is a pure function of its inputs. Nothing is cached or
//! persisted between calls.

mod achievements;
mod report;
mod streak;

pub use achievements::{
    achievement_statuses, find_achievement, motivational_message, unlocked_achievements,
    Achievement, AchievementStatus, Condition, StatsSnapshot, CATALOG,
};
pub use report::EngagementReport;
pub use streak::compute_streak;

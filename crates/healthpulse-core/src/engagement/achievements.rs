//! Achievement catalog and unlock evaluation.
//!
//! The catalog is fixed. Unlocks are re-evaluated from a fresh
//! [`StatsSnapshot`] on every call; there is no "already unlocked" state.

use serde::{Deserialize, Deserializer, Serialize};

use crate::records::Vitals;

/// Aggregate statistics as reported by the backend, plus the streak.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct StatsSnapshot {
    #[serde(default)]
    pub total_records: u32,
    #[serde(default)]
    pub active_medications: u32,
    /// Not sent by the backend; filled in from the record history.
    #[serde(default)]
    pub streak: u32,
    #[serde(default, deserialize_with = "empty_as_none")]
    pub latest_vitals: Option<Vitals>,
}

impl StatsSnapshot {
    pub fn new(total_records: u32, active_medications: u32, streak: u32) -> Self {
        Self {
            total_records,
            active_medications,
            streak,
            latest_vitals: None,
        }
    }

    pub fn with_streak(mut self, streak: u32) -> Self {
        self.streak = streak;
        self
    }
}

/// The backend sends `{}` when there is no latest record.
fn empty_as_none<'de, D>(deserializer: D) -> Result<Option<Vitals>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = Option::<serde_json::Value>::deserialize(deserializer)?;
    match raw {
        None | Some(serde_json::Value::Null) => Ok(None),
        Some(serde_json::Value::Object(map)) if map.is_empty() => Ok(None),
        Some(value) => {
            let vitals: Vitals =
                serde_json::from_value(value).map_err(<D::Error as serde::de::Error>::custom)?;
            Ok((!vitals.is_empty()).then_some(vitals))
        }
    }
}

/// Unlock condition. Every condition is a lower bound on one statistic, so
/// raising any statistic never re-locks an achievement.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "stat", content = "at_least", rename_all = "snake_case")]
pub enum Condition {
    TotalRecords(u32),
    ActiveMedications(u32),
    Streak(u32),
}

impl Condition {
    pub fn is_met(&self, stats: &StatsSnapshot) -> bool {
        match *self {
            Condition::TotalRecords(n) => stats.total_records >= n,
            Condition::ActiveMedications(n) => stats.active_medications >= n,
            Condition::Streak(n) => stats.streak >= n,
        }
    }
}

/// A catalog entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Achievement {
    pub id: &'static str,
    pub title: &'static str,
    pub description: &'static str,
    pub icon: &'static str,
    pub condition: Condition,
}

impl Achievement {
    pub fn is_unlocked(&self, stats: &StatsSnapshot) -> bool {
        self.condition.is_met(stats)
    }
}

pub static CATALOG: [Achievement; 6] = [
    Achievement {
        id: "first_record",
        title: "Getting Started",
        description: "Log your first health record",
        icon: "🎯",
        condition: Condition::TotalRecords(1),
    },
    Achievement {
        id: "week_streak",
        title: "Week Warrior",
        description: "Log records for 7 consecutive days",
        icon: "🔥",
        condition: Condition::Streak(7),
    },
    Achievement {
        id: "month_streak",
        title: "Monthly Master",
        description: "Log records for 30 consecutive days",
        icon: "⭐",
        condition: Condition::Streak(30),
    },
    Achievement {
        id: "ten_records",
        title: "Health Enthusiast",
        description: "Log 10 health records",
        icon: "💪",
        condition: Condition::TotalRecords(10),
    },
    Achievement {
        id: "first_medication",
        title: "Medication Manager",
        description: "Add your first medication",
        icon: "💊",
        condition: Condition::ActiveMedications(1),
    },
    Achievement {
        id: "consistent_tracker",
        title: "Consistency Champion",
        description: "Log records for 14 consecutive days",
        icon: "🏆",
        condition: Condition::Streak(14),
    },
];

/// Look up a catalog entry by id.
pub fn find_achievement(id: &str) -> Option<&'static Achievement> {
    CATALOG.iter().find(|a| a.id == id)
}

/// Every catalog entry whose condition holds, in catalog order.
pub fn unlocked_achievements(stats: &StatsSnapshot) -> Vec<&'static Achievement> {
    CATALOG.iter().filter(|a| a.is_unlocked(stats)).collect()
}

/// An achievement together with whether `stats` unlocks it.
#[derive(Debug, Clone, Copy, Serialize)]
pub struct AchievementStatus {
    #[serde(flatten)]
    pub achievement: &'static Achievement,
    pub unlocked: bool,
}

/// The whole catalog, locked entries included.
pub fn achievement_statuses(stats: &StatsSnapshot) -> Vec<AchievementStatus> {
    CATALOG
        .iter()
        .map(|achievement| AchievementStatus {
            achievement,
            unlocked: achievement.is_unlocked(stats),
        })
        .collect()
}

/// Tiered encouragement for a streak length.
///
/// Breakpoints 0, 1, 7, 14 and 30 have their own milestone message; values
/// in between embed the day count.
pub fn motivational_message(streak: u32) -> String {
    match streak {
        0 => "Start your health journey today! 🌟".to_string(),
        1 => "Great start! Keep going! 💪".to_string(),
        2..=6 => format!("{streak} days strong! Don't break the chain! 🔥"),
        7 => "One week streak! Amazing commitment! 🎉".to_string(),
        8..=13 => format!("{streak} days in a row! You're unstoppable! 🚀"),
        14 => "Two weeks! You're a health champion! 🏆".to_string(),
        15..=29 => format!("{streak} day streak! Incredible dedication! ⭐"),
        30 => "30 days! You've built a solid habit! 🌟".to_string(),
        _ => format!("{streak} days! You're an inspiration! 👑"),
    }
}

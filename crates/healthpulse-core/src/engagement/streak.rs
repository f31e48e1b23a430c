//! Consecutive-day streak over a record history.
//!
//! A streak is the number of consecutive calendar days that carry at least
//! one record, counted back from today. Every record day is measured from
//! today's midnight; a day exactly `streak` days back extends the chain.
//! Logging today alone gives 1, and a history whose newest day is yesterday
//! gives 0 until today is logged.

use chrono::{DateTime, TimeZone};

use crate::calendar::{day_distance, start_of_day};
use crate::records::HealthRecord;

/// Compute the streak as of `now`, reading days in `now`'s time zone.
///
/// Records without a usable `recorded_at` are ignored. Order and same-day
/// duplicates do not affect the result.
pub fn compute_streak<Tz: TimeZone>(records: &[HealthRecord], now: &DateTime<Tz>) -> u32 {
    let tz = now.timezone();
    let mut days: Vec<DateTime<Tz>> = records
        .iter()
        .filter_map(|r| r.recorded_at)
        .map(|at| start_of_day(&at.with_timezone(&tz)))
        .collect();
    days.sort_by(|a, b| b.cmp(a));

    let mut streak: u32 = 0;
    let today = start_of_day(now);

    for day in days {
        let gap = day_distance(&today, &day);
        if gap == i64::from(streak) {
            streak += 1;
        } else if gap > i64::from(streak) {
            break;
        }
        // gap < streak: a day already counted, or a future-dated record
    }

    streak
}

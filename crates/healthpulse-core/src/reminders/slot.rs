//! Named time-of-day slots and their clock times.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Duration, NaiveTime, TimeZone};
use serde::{Deserialize, Serialize};

use crate::calendar::at_local_time;
use crate::error::ValidationError;

/// A named time-of-day bucket a medication is taken in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum TimeSlot {
    #[serde(alias = "morning")]
    Morning,
    #[serde(alias = "afternoon")]
    Afternoon,
    #[serde(alias = "evening")]
    Evening,
    #[serde(alias = "night")]
    Night,
}

impl TimeSlot {
    pub const ALL: [TimeSlot; 4] = [
        TimeSlot::Morning,
        TimeSlot::Afternoon,
        TimeSlot::Evening,
        TimeSlot::Night,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            TimeSlot::Morning => "Morning",
            TimeSlot::Afternoon => "Afternoon",
            TimeSlot::Evening => "Evening",
            TimeSlot::Night => "Night",
        }
    }
}

impl fmt::Display for TimeSlot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TimeSlot {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        TimeSlot::ALL
            .into_iter()
            .find(|slot| slot.as_str().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| ValidationError::UnknownSlot(s.to_string()))
    }
}

/// Parse an `HH:MM` clock time.
pub fn parse_clock_time(raw: &str) -> Result<NaiveTime, ValidationError> {
    NaiveTime::parse_from_str(raw.trim(), "%H:%M")
        .map_err(|_| ValidationError::InvalidClockTime(raw.to_string()))
}

/// Clock time for each slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SlotTimes {
    pub morning: NaiveTime,
    pub afternoon: NaiveTime,
    pub evening: NaiveTime,
    pub night: NaiveTime,
}

impl Default for SlotTimes {
    fn default() -> Self {
        let hm = |h, m| NaiveTime::from_hms_opt(h, m, 0).unwrap_or(NaiveTime::MIN);
        Self {
            morning: hm(8, 0),
            afternoon: hm(14, 0),
            evening: hm(18, 0),
            night: hm(21, 0),
        }
    }
}

impl SlotTimes {
    pub fn time_for(&self, slot: TimeSlot) -> NaiveTime {
        match slot {
            TimeSlot::Morning => self.morning,
            TimeSlot::Afternoon => self.afternoon,
            TimeSlot::Evening => self.evening,
            TimeSlot::Night => self.night,
        }
    }

    /// The next time `slot` comes round strictly after `now`: today's slot
    /// time if it is still ahead, otherwise tomorrow's.
    pub fn next_occurrence<Tz: TimeZone>(&self, slot: TimeSlot, now: &DateTime<Tz>) -> DateTime<Tz> {
        let tz = now.timezone();
        let time = self.time_for(slot);
        let today = now.date_naive();

        let candidate = at_local_time(&tz, today, time);
        if candidate > *now {
            return candidate;
        }

        let mut day = today;
        loop {
            day += Duration::days(1);
            let candidate = at_local_time(&tz, day, time);
            if candidate > *now {
                return candidate;
            }
        }
    }
}

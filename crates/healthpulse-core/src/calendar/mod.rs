//! Calendar-day arithmetic.
//!
//! All day boundaries are computed on the local calendar of the instant's
//! time zone, never by dividing elapsed milliseconds by 24h. A day that is
//! 23 or 25 hours long because of a daylight-saving transition still counts
//! as exactly one day.

use chrono::{DateTime, Duration, NaiveDate, NaiveTime, TimeZone};

/// How far forward (in 15-minute steps) to probe when a local time falls in
/// a daylight-saving gap. Real-world gaps are at most a few hours.
const GAP_PROBE_STEPS: i64 = 4 * 24;

/// Resolve a local wall-clock time on `date` in `tz`.
///
/// Ambiguous times (clocks turned back) resolve to the earlier instant.
/// Non-existent times (clocks turned forward) resolve to the first valid
/// local time after the gap.
pub fn at_local_time<Tz: TimeZone>(tz: &Tz, date: NaiveDate, time: NaiveTime) -> DateTime<Tz> {
    let naive = date.and_time(time);
    if let Some(dt) = tz.from_local_datetime(&naive).earliest() {
        return dt;
    }

    (1..=GAP_PROBE_STEPS)
        .find_map(|step| {
            tz.from_local_datetime(&(naive + Duration::minutes(15 * step)))
                .earliest()
        })
        .unwrap_or_else(|| tz.from_utc_datetime(&naive))
}

/// Truncate an instant to the start of its local calendar day.
pub fn start_of_day<Tz: TimeZone>(instant: &DateTime<Tz>) -> DateTime<Tz> {
    at_local_time(&instant.timezone(), instant.date_naive(), NaiveTime::MIN)
}

/// Number of calendar days from `b` to `a`, in `a`'s time zone.
///
/// Positive when `a` is on a later day than `b`; zero on the same day.
pub fn day_distance<Tz: TimeZone, Tz2: TimeZone>(a: &DateTime<Tz>, b: &DateTime<Tz2>) -> i64 {
    let a_day = a.date_naive();
    let b_day = b.with_timezone(&a.timezone()).date_naive();
    a_day.signed_duration_since(b_day).num_days()
}

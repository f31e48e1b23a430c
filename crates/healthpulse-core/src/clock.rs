//! Wall-clock sources.
//!
//! The reminder scheduler reads wall-clock time through [`Clock`] so that it
//! can be driven by the real local clock in production and by the async
//! runtime's (possibly paused) clock in tests and simulations.

use chrono::{DateTime, Local, TimeZone};

/// A source of "now" in some time zone.
pub trait Clock: Send + Sync + 'static {
    type Tz: TimeZone;

    fn now(&self) -> DateTime<Self::Tz>;
}

/// The system's local wall clock.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    type Tz = Local;

    fn now(&self) -> DateTime<Local> {
        Local::now()
    }
}

/// A wall clock pinned to `anchor` at construction and advanced by the
/// runtime's monotonic clock.
///
/// Under a paused tokio runtime, time only moves when the runtime advances
/// it, so timers and wall-clock reads stay consistent with each other.
#[derive(Debug, Clone)]
pub struct AnchoredClock<Tz: TimeZone> {
    anchor: DateTime<Tz>,
    started: tokio::time::Instant,
}

impl<Tz: TimeZone> AnchoredClock<Tz> {
    pub fn new(anchor: DateTime<Tz>) -> Self {
        Self {
            anchor,
            started: tokio::time::Instant::now(),
        }
    }
}

impl<Tz> Clock for AnchoredClock<Tz>
where
    Tz: TimeZone + Send + Sync + 'static,
    Tz::Offset: Send + Sync,
{
    type Tz = Tz;

    fn now(&self) -> DateTime<Tz> {
        let elapsed =
            chrono::Duration::from_std(self.started.elapsed()).unwrap_or(chrono::Duration::zero());
        self.anchor.clone() + elapsed
    }
}

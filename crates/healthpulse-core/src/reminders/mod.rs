//! Medication reminders: slot times, the notification boundary and the
//! in-memory scheduler.

mod medication;
mod scheduler;
mod sink;
mod slot;

pub use medication::Medication;
pub use scheduler::{ReminderScheduler, ScheduledReminder, SchedulerOptions, DEFAULT_MAX_PENDING};
pub use sink::{DedupKey, MemorySink, Notification, NotificationAction, NotificationSink, Permission};
pub use slot::{parse_clock_time, SlotTimes, TimeSlot};

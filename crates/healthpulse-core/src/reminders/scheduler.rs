//! Medication reminder scheduler.
//!
//! Each `(medication, slot)` pair owns at most one pending timer task. A
//! timer sleeps until its slot time, emits a notification through the
//! injected [`NotificationSink`], then registers a fresh timer for the next
//! day and exits. Reminders therefore repeat for as long as the scheduler
//! lives.
//!
//! ## Timer lifecycle
//!
//! ```text
//! Unscheduled -> Pending -> Fired -> Pending (next day) -> ...
//!                   |
//!                   +-> cancelled (cancel_all / reschedule / shutdown)
//! ```
//!
//! Every timer carries a liveness flag. Replacing or cancelling a timer
//! clears the flag and aborts the task under the table lock; the task
//! re-checks the flag under the same lock before acting, so a cancelled
//! reminder never fires even if its deadline already passed.
//!
//! Timers are held in memory only. Nothing survives a restart.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use chrono::{DateTime, Utc};
use serde::Serialize;
use tokio::runtime::Handle;
use tokio::task::JoinHandle;
use tracing::{debug, info, trace, warn};

use super::medication::Medication;
use super::sink::{DedupKey, Notification, NotificationSink, Permission};
use super::slot::{SlotTimes, TimeSlot};
use crate::clock::Clock;
use crate::error::SchedulerError;

/// Default ceiling on simultaneously pending timers.
pub const DEFAULT_MAX_PENDING: usize = 1024;

/// A pending reminder, as seen from outside the scheduler.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ScheduledReminder {
    pub medication_id: String,
    pub slot: TimeSlot,
    pub fires_at: DateTime<Utc>,
}

/// Tunables for a [`ReminderScheduler`].
#[derive(Debug, Clone)]
pub struct SchedulerOptions {
    pub slot_times: SlotTimes,
    /// Registration fails with [`SchedulerError::CapacityExhausted`] once
    /// this many timers are pending.
    pub max_pending: usize,
}

impl Default for SchedulerOptions {
    fn default() -> Self {
        Self {
            slot_times: SlotTimes::default(),
            max_pending: DEFAULT_MAX_PENDING,
        }
    }
}

struct PendingTimer {
    reminder: ScheduledReminder,
    medication: Arc<Medication>,
    live: Arc<AtomicBool>,
    handle: JoinHandle<()>,
}

impl PendingTimer {
    fn invalidate(self) {
        self.live.store(false, Ordering::Release);
        self.handle.abort();
    }
}

#[derive(Default)]
struct TimerTable {
    timers: HashMap<DedupKey, PendingTimer>,
    shut_down: bool,
}

struct Shared<C: Clock> {
    clock: C,
    sink: Arc<dyn NotificationSink>,
    options: SchedulerOptions,
    table: Mutex<TimerTable>,
}

/// Schedules one repeating notification per medication slot.
///
/// Timer tasks are spawned on the tokio runtime current at registration.
/// Dropping the scheduler cancels every pending timer.
pub struct ReminderScheduler<C: Clock> {
    shared: Arc<Shared<C>>,
}

impl<C: Clock> ReminderScheduler<C> {
    pub fn new(clock: C, sink: Arc<dyn NotificationSink>) -> Self {
        Self::with_options(clock, sink, SchedulerOptions::default())
    }

    pub fn with_options(clock: C, sink: Arc<dyn NotificationSink>, options: SchedulerOptions) -> Self {
        Self {
            shared: Arc::new(Shared {
                clock,
                sink,
                options,
                table: Mutex::new(TimerTable::default()),
            }),
        }
    }

    /// Ask the sink for permission. Pending timers are kept either way;
    /// they start delivering as soon as permission is granted.
    pub fn request_permission(&self) -> bool {
        let granted = self.shared.sink.request_permission();
        debug!(granted, "notification permission requested");
        granted
    }

    /// Register a timer for every slot of every active medication.
    ///
    /// Each timer targets the slot's next occurrence strictly after now.
    /// An already pending timer for the same `(medication, slot)` is
    /// replaced, so calling this twice does not double reminders.
    ///
    /// Returns the number of timers registered. On error, timers registered
    /// before the failure stay pending.
    ///
    /// # Errors
    ///
    /// Returns an error if no tokio runtime is current, the pending-timer
    /// ceiling is reached, or the scheduler was shut down.
    pub fn schedule_all(&self, medications: &[Medication]) -> Result<usize, SchedulerError> {
        let now = self.shared.clock.now();
        let mut table = self.shared.lock_table();
        let mut scheduled = 0;

        for medication in medications {
            if !medication.active {
                debug!(medication = %medication.id, "skipping inactive medication");
                continue;
            }
            let medication = Arc::new(medication.clone());
            for slot in medication.slots() {
                let fires_at = self
                    .shared
                    .options
                    .slot_times
                    .next_occurrence(slot, &now)
                    .with_timezone(&Utc);
                if let Err(err) =
                    self.shared
                        .register(&mut table, Arc::clone(&medication), slot, fires_at)
                {
                    warn!(medication = %medication.id, %slot, error = %err, "failed to register reminder");
                    return Err(err);
                }
                scheduled += 1;
            }
        }

        debug!(scheduled, pending = table.timers.len(), "reminders scheduled");
        Ok(scheduled)
    }

    /// Cancel every pending timer of `medication_id`. Returns how many were
    /// cancelled; zero is not an error.
    pub fn cancel_all(&self, medication_id: &str) -> usize {
        let mut table = self.shared.lock_table();
        let keys: Vec<DedupKey> = table
            .timers
            .keys()
            .filter(|key| key.medication_id == medication_id)
            .cloned()
            .collect();

        for key in &keys {
            if let Some(timer) = table.timers.remove(key) {
                timer.invalidate();
            }
        }

        debug!(medication = medication_id, cancelled = keys.len(), "reminders cancelled");
        keys.len()
    }

    /// Pending reminders ordered by firing time.
    pub fn pending(&self) -> Vec<ScheduledReminder> {
        let table = self.shared.lock_table();
        let mut pending: Vec<ScheduledReminder> =
            table.timers.values().map(|t| t.reminder.clone()).collect();
        pending.sort_by(|a, b| {
            a.fires_at
                .cmp(&b.fires_at)
                .then_with(|| a.medication_id.cmp(&b.medication_id))
                .then_with(|| a.slot.cmp(&b.slot))
        });
        pending
    }

    pub fn pending_for(&self, medication_id: &str) -> Vec<ScheduledReminder> {
        self.pending()
            .into_iter()
            .filter(|r| r.medication_id == medication_id)
            .collect()
    }

    pub fn pending_count(&self) -> usize {
        self.shared.lock_table().timers.len()
    }

    /// Cancel everything and refuse further registrations.
    pub fn shutdown(&self) {
        let mut table = self.shared.lock_table();
        if table.shut_down {
            return;
        }
        table.shut_down = true;
        let cancelled = table.timers.len();
        for (_, timer) in table.timers.drain() {
            timer.invalidate();
        }
        debug!(cancelled, "reminder scheduler shut down");
    }

    pub fn is_shut_down(&self) -> bool {
        self.shared.lock_table().shut_down
    }
}

impl<C: Clock> Drop for ReminderScheduler<C> {
    fn drop(&mut self) {
        self.shutdown();
    }
}

impl<C: Clock> Shared<C> {
    fn lock_table(&self) -> MutexGuard<'_, TimerTable> {
        self.table.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn now_utc(&self) -> DateTime<Utc> {
        self.clock.now().with_timezone(&Utc)
    }

    /// Next occurrence of `slot` strictly after `after`, read on the
    /// clock's local calendar.
    fn next_fire_after(&self, slot: TimeSlot, after: DateTime<Utc>) -> DateTime<Utc> {
        let local = after.with_timezone(&self.clock.now().timezone());
        self.options
            .slot_times
            .next_occurrence(slot, &local)
            .with_timezone(&Utc)
    }

    /// Time left until `at`, or `None` once it has arrived.
    fn until(&self, at: DateTime<Utc>) -> Option<std::time::Duration> {
        (at - self.now_utc())
            .to_std()
            .ok()
            .filter(|remaining| !remaining.is_zero())
    }

    /// Register a timer, replacing any pending one for the same key.
    /// Must be called with the table lock held.
    fn register(
        self: &Arc<Self>,
        table: &mut TimerTable,
        medication: Arc<Medication>,
        slot: TimeSlot,
        fires_at: DateTime<Utc>,
    ) -> Result<(), SchedulerError> {
        if table.shut_down {
            return Err(SchedulerError::ShutDown);
        }
        let runtime = Handle::try_current()?;

        let key = DedupKey::new(medication.id.clone(), slot);
        let limit = self.options.max_pending;
        if !table.timers.contains_key(&key) && table.timers.len() >= limit {
            return Err(SchedulerError::CapacityExhausted { limit });
        }

        if let Some(previous) = table.timers.remove(&key) {
            trace!(%key, "replacing pending reminder");
            previous.invalidate();
        }

        let live = Arc::new(AtomicBool::new(true));
        let handle = runtime.spawn(Arc::clone(self).run_timer(
            key.clone(),
            Arc::clone(&live),
            fires_at,
        ));

        debug!(%key, %fires_at, "reminder registered");
        table.timers.insert(
            key,
            PendingTimer {
                reminder: ScheduledReminder {
                    medication_id: medication.id.clone(),
                    slot,
                    fires_at,
                },
                medication,
                live,
                handle,
            },
        );
        Ok(())
    }

    async fn run_timer(self: Arc<Self>, key: DedupKey, live: Arc<AtomicBool>, fires_at: DateTime<Utc>) {
        // Re-read the wall clock after every wake: it may have been set back
        // while the sleep was pending.
        while let Some(remaining) = self.until(fires_at) {
            tokio::time::sleep(remaining).await;
        }
        self.fire(&key, &live);
    }

    fn fire(self: &Arc<Self>, key: &DedupKey, live: &Arc<AtomicBool>) {
        let notification = {
            let mut table = self.lock_table();

            let is_current = live.load(Ordering::Acquire)
                && table
                    .timers
                    .get(key)
                    .is_some_and(|timer| Arc::ptr_eq(&timer.live, live));
            if !is_current {
                trace!(%key, "stale reminder timer ignored");
                return;
            }
            let Some(fired) = table.timers.remove(key) else {
                return;
            };
            fired.live.store(false, Ordering::Release);
            // This task is the fired timer; dropping its handle just detaches it.
            let PendingTimer {
                reminder, medication, ..
            } = fired;

            let after = reminder.fires_at.max(self.now_utc());
            let next = self.next_fire_after(reminder.slot, after);
            if let Err(err) = self.register(&mut table, Arc::clone(&medication), reminder.slot, next) {
                warn!(%key, error = %err, "failed to reschedule reminder");
            }

            Notification::medication_reminder(&medication, reminder.slot)
        };

        self.dispatch(notification);
    }

    fn dispatch(&self, notification: Notification) {
        let permission = self.sink.permission();
        if permission != Permission::Granted {
            warn!(key = %notification.dedup_key, ?permission, "reminder due, notifications not permitted");
            return;
        }

        info!(key = %notification.dedup_key, "medication reminder fired");
        let sink = Arc::clone(&self.sink);
        // Detached so a slow sink cannot hold up other timers.
        tokio::task::spawn_blocking(move || sink.emit(notification));
    }
}

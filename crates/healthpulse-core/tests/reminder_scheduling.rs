//! Integration tests for the medication reminder scheduler.
//!
//! All tests run on a paused tokio clock; `AnchoredClock` derives wall time
//! from the same clock, so advancing it moves both the timers and "now".

use std::sync::{mpsc, Arc, Mutex};
use std::time::Duration as StdDuration;

use chrono::{DateTime, FixedOffset, TimeZone, Utc};
use healthpulse_core::{
    AnchoredClock, DedupKey, Medication, MemorySink, Notification, NotificationSink, Permission,
    ReminderScheduler, SchedulerError, SchedulerOptions, TimeSlot,
};

const HOUR: u64 = 3600;

fn utc(s: &str) -> DateTime<Utc> {
    DateTime::parse_from_rfc3339(s).unwrap().with_timezone(&Utc)
}

fn clock_at(s: &str) -> AnchoredClock<Utc> {
    AnchoredClock::new(utc(s))
}

fn scheduler_at(s: &str, sink: Arc<MemorySink>) -> ReminderScheduler<AnchoredClock<Utc>> {
    ReminderScheduler::new(clock_at(s), sink)
}

async fn advance_hours(hours: u64) {
    tokio::time::advance(StdDuration::from_secs(hours * HOUR)).await;
    settle().await;
}

/// Let woken timer tasks run to completion.
async fn settle() {
    for _ in 0..16 {
        tokio::task::yield_now().await;
    }
}

#[tokio::test(start_paused = true)]
async fn targets_next_occurrence_of_each_slot() {
    let sink = Arc::new(MemorySink::granted());
    let scheduler = scheduler_at("2024-01-03T10:00:00Z", sink);
    let med = Medication::new("m1", "Metformin", "500mg", [TimeSlot::Morning, TimeSlot::Night]);

    assert_eq!(scheduler.schedule_all(&[med]), Ok(2));

    let pending = scheduler.pending();
    assert_eq!(pending.len(), 2);
    assert_eq!(pending[0].slot, TimeSlot::Night);
    assert_eq!(pending[0].fires_at, utc("2024-01-03T21:00:00Z"));
    assert_eq!(pending[1].slot, TimeSlot::Morning);
    assert_eq!(pending[1].fires_at, utc("2024-01-04T08:00:00Z"));
}

#[tokio::test(start_paused = true)]
async fn slot_time_equal_to_now_goes_to_tomorrow() {
    let scheduler = scheduler_at("2024-01-03T08:00:00Z", Arc::new(MemorySink::granted()));
    let med = Medication::new("m1", "A", "1", [TimeSlot::Morning]);
    scheduler.schedule_all(&[med]).unwrap();
    assert_eq!(scheduler.pending()[0].fires_at, utc("2024-01-04T08:00:00Z"));
}

#[tokio::test(start_paused = true)]
async fn fired_reminder_rearms_for_next_day() {
    let sink = Arc::new(MemorySink::granted());
    let scheduler = scheduler_at("2024-01-03T10:00:00Z", Arc::clone(&sink));
    let med = Medication::new("m1", "Metformin", "500mg", [TimeSlot::Night]);
    scheduler.schedule_all(&[med]).unwrap();

    advance_hours(11).await;
    sink.wait_for_deliveries(1).await;

    let pending = scheduler.pending();
    assert_eq!(pending.len(), 1);
    assert_eq!(pending[0].fires_at, utc("2024-01-04T21:00:00Z"));

    let visible = sink.visible();
    assert_eq!(visible.len(), 1);
    assert_eq!(visible[0].body, "Time to take Metformin (500mg)");
    assert_eq!(visible[0].dedup_key.to_string(), "med-m1-Night");

    // And again the following evening.
    advance_hours(24).await;
    sink.wait_for_deliveries(2).await;
    assert_eq!(scheduler.pending()[0].fires_at, utc("2024-01-05T21:00:00Z"));
    // Same key, so the second notification replaced the first.
    assert_eq!(sink.visible().len(), 1);
}

#[tokio::test(start_paused = true)]
async fn scheduling_twice_does_not_double_reminders() {
    let sink = Arc::new(MemorySink::granted());
    let scheduler = scheduler_at("2024-01-03T10:00:00Z", Arc::clone(&sink));
    let med = Medication::new("m1", "A", "1", [TimeSlot::Evening, TimeSlot::Evening]);

    assert_eq!(scheduler.schedule_all(std::slice::from_ref(&med)), Ok(1));
    assert_eq!(scheduler.schedule_all(&[med]), Ok(1));
    assert_eq!(scheduler.pending_count(), 1);

    advance_hours(8).await;
    sink.wait_for_deliveries(1).await;
    settle().await;
    assert_eq!(sink.delivered(), 1);
    assert_eq!(scheduler.pending_count(), 1);
}

#[tokio::test(start_paused = true)]
async fn cancel_only_touches_one_medication() {
    let sink = Arc::new(MemorySink::granted());
    let scheduler = scheduler_at("2024-01-03T10:00:00Z", Arc::clone(&sink));
    let a = Medication::new("a", "A", "1", [TimeSlot::Morning, TimeSlot::Evening]);
    let b = Medication::new("b", "B", "2", [TimeSlot::Evening]);
    scheduler.schedule_all(&[a, b]).unwrap();

    assert_eq!(scheduler.cancel_all("a"), 2);
    assert_eq!(scheduler.cancel_all("a"), 0);
    assert!(scheduler.pending_for("a").is_empty());
    assert_eq!(scheduler.pending_for("b").len(), 1);

    advance_hours(8).await;
    sink.wait_for_deliveries(1).await;
    settle().await;

    let keys: Vec<_> = sink.visible().into_iter().map(|n| n.dedup_key).collect();
    assert_eq!(keys, vec![DedupKey::new("b", TimeSlot::Evening)]);
}

#[tokio::test(start_paused = true)]
async fn cancelled_reminder_never_fires() {
    let sink = Arc::new(MemorySink::granted());
    let scheduler = scheduler_at("2024-01-03T10:00:00Z", Arc::clone(&sink));
    let med = Medication::new("m1", "A", "1", [TimeSlot::Afternoon]);
    scheduler.schedule_all(&[med]).unwrap();

    assert_eq!(scheduler.cancel_all("m1"), 1);
    advance_hours(48).await;

    assert_eq!(sink.delivered(), 0);
    assert_eq!(scheduler.pending_count(), 0);
}

#[tokio::test(start_paused = true)]
async fn timers_survive_until_permission_is_granted() {
    let sink = Arc::new(MemorySink::with_permission(Permission::Default));
    let scheduler = scheduler_at("2024-01-03T10:00:00Z", Arc::clone(&sink));
    let med = Medication::new("m1", "A", "1", [TimeSlot::Morning, TimeSlot::Night]);
    scheduler.schedule_all(&[med]).unwrap();

    // Night fires without permission: nothing shown, timer re-armed.
    advance_hours(11).await;
    assert_eq!(sink.delivered(), 0);
    let pending = scheduler.pending();
    assert_eq!(pending.len(), 2);
    assert_eq!(pending[0].slot, TimeSlot::Morning);
    assert_eq!(pending[1].fires_at, utc("2024-01-04T21:00:00Z"));

    sink.set_permission(Permission::Granted);
    advance_hours(11).await;
    sink.wait_for_deliveries(1).await;
    assert_eq!(
        sink.visible()[0].dedup_key,
        DedupKey::new("m1", TimeSlot::Morning)
    );
}

#[tokio::test(start_paused = true)]
async fn request_permission_goes_through_sink() {
    let sink = Arc::new(MemorySink::with_permission(Permission::Default).answer_prompt_with(true));
    let scheduler = scheduler_at("2024-01-03T10:00:00Z", Arc::clone(&sink));
    assert!(scheduler.request_permission());
    assert_eq!(sink.permission(), Permission::Granted);

    let denied = Arc::new(MemorySink::with_permission(Permission::Denied).answer_prompt_with(true));
    let scheduler = scheduler_at("2024-01-03T10:00:00Z", denied);
    assert!(!scheduler.request_permission());
}

#[tokio::test(start_paused = true)]
async fn capacity_limit_keeps_earlier_registrations() {
    let options = SchedulerOptions {
        max_pending: 1,
        ..Default::default()
    };
    let scheduler = ReminderScheduler::with_options(
        clock_at("2024-01-03T10:00:00Z"),
        Arc::new(MemorySink::granted()),
        options,
    );
    let med = Medication::new("m1", "A", "1", [TimeSlot::Night, TimeSlot::Morning]);

    assert_eq!(
        scheduler.schedule_all(std::slice::from_ref(&med)),
        Err(SchedulerError::CapacityExhausted { limit: 1 })
    );
    let pending = scheduler.pending();
    assert_eq!(pending.len(), 1);
    assert_eq!(pending[0].slot, TimeSlot::Morning);

    // Replacing an existing key does not count against the limit.
    let morning_only = Medication::new("m1", "A", "1", [TimeSlot::Morning]);
    assert_eq!(scheduler.schedule_all(&[morning_only]), Ok(1));
}

#[tokio::test(start_paused = true)]
async fn dropping_scheduler_cancels_timers() {
    let sink = Arc::new(MemorySink::granted());
    let scheduler = scheduler_at("2024-01-03T10:00:00Z", Arc::clone(&sink));
    let med = Medication::new("m1", "A", "1", [TimeSlot::Evening]);
    scheduler.schedule_all(&[med]).unwrap();
    drop(scheduler);

    advance_hours(24).await;
    assert_eq!(sink.delivered(), 0);
}

#[tokio::test(start_paused = true)]
async fn slot_times_follow_the_clock_zone() {
    let plus_five = FixedOffset::east_opt(5 * 3600).unwrap();
    let anchor = plus_five.with_ymd_and_hms(2024, 1, 3, 10, 0, 0).unwrap();
    let scheduler = ReminderScheduler::new(
        AnchoredClock::new(anchor),
        Arc::new(MemorySink::granted()),
    );
    let med = Medication::new("m1", "A", "1", [TimeSlot::Morning, TimeSlot::Night]);
    scheduler.schedule_all(&[med]).unwrap();

    let pending = scheduler.pending();
    assert_eq!(pending[0].fires_at, utc("2024-01-03T16:00:00Z"));
    assert_eq!(pending[1].fires_at, utc("2024-01-04T03:00:00Z"));
}

/// Sink whose `emit` for one medication blocks until released.
struct GatedSink {
    slow_medication: &'static str,
    gate: Mutex<mpsc::Receiver<()>>,
    emitted: Mutex<mpsc::Sender<DedupKey>>,
}

impl NotificationSink for GatedSink {
    fn permission(&self) -> Permission {
        Permission::Granted
    }

    fn request_permission(&self) -> bool {
        true
    }

    fn emit(&self, notification: Notification) {
        if notification.dedup_key.medication_id == self.slow_medication {
            let _ = self.gate.lock().unwrap().recv();
        }
        let _ = self.emitted.lock().unwrap().send(notification.dedup_key);
    }
}

#[tokio::test(start_paused = true)]
async fn slow_sink_does_not_stall_other_timers() {
    let (gate_tx, gate_rx) = mpsc::channel();
    let (emitted_tx, emitted_rx) = mpsc::channel();
    let sink = Arc::new(GatedSink {
        slow_medication: "slow",
        gate: Mutex::new(gate_rx),
        emitted: Mutex::new(emitted_tx),
    });
    let scheduler = ReminderScheduler::new(clock_at("2024-01-03T10:00:00Z"), sink);
    let slow = Medication::new("slow", "A", "1", [TimeSlot::Evening]);
    let fast = Medication::new("fast", "B", "2", [TimeSlot::Night]);
    scheduler.schedule_all(&[slow, fast]).unwrap();

    // Evening fires; its emit is now stuck on the gate.
    advance_hours(8).await;
    assert_eq!(
        scheduler.pending_for("slow")[0].fires_at,
        utc("2024-01-04T18:00:00Z")
    );

    // Night still fires and re-arms while the slow emit is blocked.
    advance_hours(3).await;
    let first = emitted_rx.recv_timeout(StdDuration::from_secs(5)).unwrap();
    assert_eq!(first, DedupKey::new("fast", TimeSlot::Night));
    assert_eq!(
        scheduler.pending_for("fast")[0].fires_at,
        utc("2024-01-04T21:00:00Z")
    );

    gate_tx.send(()).unwrap();
    let second = emitted_rx.recv_timeout(StdDuration::from_secs(5)).unwrap();
    assert_eq!(second, DedupKey::new("slow", TimeSlot::Evening));
    drop(gate_tx);
}

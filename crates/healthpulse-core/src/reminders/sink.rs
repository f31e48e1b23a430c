//! Notification delivery boundary.
//!
//! The scheduler never talks to a notification host directly. It hands
//! finished [`Notification`]s to a [`NotificationSink`], which owns the
//! permission state and the actual delivery.

use std::fmt;
use std::sync::Mutex;

use serde::{Deserialize, Serialize};
use tokio::sync::Notify;

use super::medication::Medication;
use super::slot::TimeSlot;

/// Permission state of the notification host.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Permission {
    /// The user has not been asked yet.
    #[default]
    Default,
    Granted,
    Denied,
}

/// Identity of one logical reminder: a medication's slot.
///
/// Sinks use it to replace rather than stack repeated alerts.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct DedupKey {
    pub medication_id: String,
    pub slot: TimeSlot,
}

impl DedupKey {
    pub fn new(medication_id: impl Into<String>, slot: TimeSlot) -> Self {
        Self {
            medication_id: medication_id.into(),
            slot,
        }
    }
}

impl fmt::Display for DedupKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "med-{}-{}", self.medication_id, self.slot)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct NotificationAction {
    pub action: &'static str,
    pub title: &'static str,
}

/// A notification ready for delivery.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Notification {
    pub title: String,
    pub body: String,
    pub dedup_key: DedupKey,
    /// Stay on screen until the user acts on it.
    pub require_interaction: bool,
    pub actions: Vec<NotificationAction>,
}

impl Notification {
    pub fn medication_reminder(medication: &Medication, slot: TimeSlot) -> Self {
        Self {
            title: "💊 Medication Reminder".to_string(),
            body: format!("Time to take {} ({})", medication.name, medication.dosage),
            dedup_key: DedupKey::new(medication.id.clone(), slot),
            require_interaction: true,
            actions: vec![
                NotificationAction {
                    action: "taken",
                    title: "Taken",
                },
                NotificationAction {
                    action: "snooze",
                    title: "Snooze 10min",
                },
            ],
        }
    }
}

/// Capability to ask for permission and show notifications.
///
/// `emit` is fire-and-forget and must silently drop the notification when
/// permission is not granted.
pub trait NotificationSink: Send + Sync + 'static {
    fn permission(&self) -> Permission;

    /// Prompt the user if they have not been asked yet. Returns whether
    /// permission is granted afterwards.
    fn request_permission(&self) -> bool;

    fn emit(&self, notification: Notification);
}

#[derive(Debug, Default)]
struct MemorySinkState {
    permission: Permission,
    grant_on_request: bool,
    /// Currently visible notifications, at most one per dedup key.
    visible: Vec<Notification>,
    delivered: usize,
    dropped: usize,
}

/// In-process notification center.
///
/// Behaves like a desktop notification area: a new notification with the
/// same dedup key replaces the visible one instead of stacking.
#[derive(Debug, Default)]
pub struct MemorySink {
    state: Mutex<MemorySinkState>,
    delivered_signal: Notify,
}

impl MemorySink {
    /// A sink whose user has already granted permission.
    pub fn granted() -> Self {
        Self::with_permission(Permission::Granted)
    }

    pub fn with_permission(permission: Permission) -> Self {
        Self {
            state: Mutex::new(MemorySinkState {
                permission,
                grant_on_request: true,
                ..Default::default()
            }),
            delivered_signal: Notify::new(),
        }
    }

    /// Decide how the simulated user answers the permission prompt.
    pub fn answer_prompt_with(self, grant: bool) -> Self {
        self.lock().grant_on_request = grant;
        self
    }

    pub fn set_permission(&self, permission: Permission) {
        self.lock().permission = permission;
    }

    /// Visible notifications, oldest first.
    pub fn visible(&self) -> Vec<Notification> {
        self.lock().visible.clone()
    }

    /// Total notifications accepted, replacements included.
    pub fn delivered(&self) -> usize {
        self.lock().delivered
    }

    /// Notifications dropped for lack of permission.
    pub fn dropped(&self) -> usize {
        self.lock().dropped
    }

    /// Remove a visible notification, as when the user clicks it.
    pub fn dismiss(&self, key: &DedupKey) -> bool {
        let mut state = self.lock();
        let before = state.visible.len();
        state.visible.retain(|n| n.dedup_key != *key);
        state.visible.len() != before
    }

    /// Wait until at least `count` notifications have been delivered.
    pub async fn wait_for_deliveries(&self, count: usize) {
        loop {
            let signal = self.delivered_signal.notified();
            if self.delivered() >= count {
                return;
            }
            signal.await;
        }
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, MemorySinkState> {
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

impl NotificationSink for MemorySink {
    fn permission(&self) -> Permission {
        self.lock().permission
    }

    fn request_permission(&self) -> bool {
        let mut state = self.lock();
        if state.permission == Permission::Default {
            state.permission = if state.grant_on_request {
                Permission::Granted
            } else {
                Permission::Denied
            };
        }
        state.permission == Permission::Granted
    }

    fn emit(&self, notification: Notification) {
        {
            let mut state = self.lock();
            if state.permission != Permission::Granted {
                state.dropped += 1;
                tracing::debug!(key = %notification.dedup_key, "notification dropped, permission not granted");
                return;
            }
            state.visible.retain(|n| n.dedup_key != notification.dedup_key);
            state.visible.push(notification);
            state.delivered += 1;
        }
        self.delivered_signal.notify_waiters();
    }
}

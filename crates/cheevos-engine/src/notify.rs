//! User-facing notifications
//!
//! Pushed to the host UI fire-and-forget. Nothing waits for them to be shown.

use std::time::Duration;

#[derive(Debug, Clone, PartialEq)]
pub enum Notification {
    /// An achievement was unlocked locally
    AchievementUnlocked {
        id: u32,
        title: String,
        description: String,
        badge: String,
        duration: Duration,
    },
    /// Game summary after definitions and unlocks were loaded
    Summary {
        title: String,
        message: String,
        icon: String,
        duration: Duration,
    },
    PresenceChanged {
        text: String,
    },
    Error {
        message: String,
        duration: Duration,
    },
    /// Game context, achievement list or session changed
    Refreshed,
}

/// Receives notifications from the engine
pub trait Notifier: Send + Sync {
    fn notify(&self, notification: Notification);
}

impl<F> Notifier for F
where
    F: Fn(Notification) + Send + Sync,
{
    fn notify(&self, notification: Notification) {
        self(notification)
    }
}

/// Discards every notification
#[derive(Debug, Default, Clone, Copy)]
pub struct NullNotifier;

impl Notifier for NullNotifier {
    fn notify(&self, _notification: Notification) {}
}

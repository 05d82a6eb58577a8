//! User-facing notifications raised by the client.

use chrono::{DateTime, Utc};
use parking_lot::RwLock;
use serde::Serialize;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

pub const ERROR_DURATION: Duration = Duration::from_secs(4);
pub const SUCCESS_DURATION: Duration = Duration::from_secs(2);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum NotificationLevel {
    Success,
    Error,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Notification {
    pub id: u64,
    pub level: NotificationLevel,
    pub message: String,
    pub duration: Duration,
    pub created_at: DateTime<Utc>,
}

impl Notification {
    pub fn is_visible_at(&self, now: DateTime<Utc>) -> bool {
        let age = now.signed_duration_since(self.created_at);
        age.to_std().map_or(true, |age| age < self.duration)
    }
}

/// Shared notification log.
#[derive(Clone, Default)]
pub struct Notifier {
    entries: Arc<RwLock<Vec<Notification>>>,
    next_id: Arc<AtomicU64>,
}

impl Notifier {
    pub fn new() -> Self {
        Self::default()
    }

    fn push(&self, level: NotificationLevel, message: String, duration: Duration) -> u64 {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        self.entries.write().push(Notification {
            id,
            level,
            message,
            duration,
            created_at: Utc::now(),
        });
        id
    }

    /// Records `Error: {message}` for four seconds.
    pub fn error(&self, message: &str) -> u64 {
        tracing::warn!(error = %message, "client call failed");
        self.push(NotificationLevel::Error, format!("Error: {}", message), ERROR_DURATION)
    }

    pub fn success(&self, message: &str) -> u64 {
        self.push(NotificationLevel::Success, message.to_string(), SUCCESS_DURATION)
    }

    pub fn notifications(&self) -> Vec<Notification> {
        self.entries.read().clone()
    }

    pub fn visible(&self, now: DateTime<Utc>) -> Vec<Notification> {
        self.entries
            .read()
            .iter()
            .filter(|n| n.is_visible_at(now))
            .cloned()
            .collect()
    }

    pub fn dismiss(&self, id: u64) {
        self.entries.write().retain(|n| n.id != id);
    }

    pub fn clear(&self) {
        self.entries.write().clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_format_and_duration() {
        let notifier = Notifier::new();
        let id = notifier.error("Failed to get task");
        let all = notifier.notifications();
        assert_eq!(all.len(), 1);
        assert_eq!(all[0].id, id);
        assert_eq!(all[0].message, "Error: Failed to get task");
        assert_eq!(all[0].duration, Duration::from_secs(4));
        assert_eq!(all[0].level, NotificationLevel::Error);
    }

    #[test]
    fn test_visibility_expires() {
        let notifier = Notifier::new();
        notifier.error("boom");
        let created = notifier.notifications()[0].created_at;
        assert_eq!(notifier.visible(created + chrono::Duration::seconds(3)).len(), 1);
        assert!(notifier.visible(created + chrono::Duration::seconds(5)).is_empty());
    }

    #[test]
    fn test_dismiss() {
        let notifier = Notifier::new();
        let first = notifier.success("Project updated!");
        notifier.error("boom");
        notifier.dismiss(first);
        assert_eq!(notifier.notifications().len(), 1);
        notifier.clear();
        assert!(notifier.notifications().is_empty());
    }
}

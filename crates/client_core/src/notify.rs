//! Dismissible, auto-expiring error notifications.

use std::time::{Duration, Instant};

use chrono::{DateTime, Utc};

use crate::error::RequestError;

pub const DEFAULT_NOTIFICATION_TTL: Duration = Duration::from_secs(30);

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notification {
    pub id: u64,
    pub title: String,
    pub message: String,
    pub stack: Option<String>,
    pub raised_at: DateTime<Utc>,
    expires_at: Instant,
}

impl Notification {
    pub fn is_expired_at(&self, now: Instant) -> bool {
        now >= self.expires_at
    }
}

#[derive(Debug)]
pub struct NotificationCenter {
    ttl: Duration,
    next_id: u64,
    active: Vec<Notification>,
}

impl NotificationCenter {
    pub fn new(ttl: Duration) -> Self {
        Self {
            ttl,
            next_id: 1,
            active: Vec::new(),
        }
    }

    pub fn raise(&mut self, title: impl Into<String>, error: &RequestError) -> Notification {
        let notification = Notification {
            id: self.next_id,
            title: title.into(),
            message: error.user_message(),
            stack: error.stack().map(str::to_string),
            raised_at: Utc::now(),
            expires_at: Instant::now() + self.ttl,
        };
        self.next_id += 1;
        self.active.push(notification.clone());
        notification
    }

    pub fn dismiss(&mut self, id: u64) -> bool {
        let before = self.active.len();
        self.active.retain(|notification| notification.id != id);
        self.active.len() != before
    }

    /// Drops expired notifications and returns the rest, oldest first.
    pub fn active(&mut self) -> &[Notification] {
        let now = Instant::now();
        self.active
            .retain(|notification| !notification.is_expired_at(now));
        &self.active
    }
}

impl Default for NotificationCenter {
    fn default() -> Self {
        Self::new(DEFAULT_NOTIFICATION_TTL)
    }
}

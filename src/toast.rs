//! Transient notifications.
//!
//! Every notification lives for [`NOTIFICATION_TTL`] on its own timer.
//! Nothing is queued, merged or capped; simultaneous notifications stack.

use std::time::{Duration, Instant};

/// How long a notification stays visible.
pub const NOTIFICATION_TTL: Duration = Duration::from_secs(10);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ToastLevel {
    Info,
    Warning,
    Error,
}

impl ToastLevel {
    pub const fn prefix(self) -> &'static str {
        match self {
            Self::Info => "[info]",
            Self::Warning => "[warn]",
            Self::Error => "[error]",
        }
    }
}

/// Receiver of user-visible alerts.
pub trait NotificationSink {
    fn show(&mut self, message: &str, level: ToastLevel, now: Instant);

    /// Advance the sink's clock, dismissing anything that has expired.
    fn tick(&mut self, _now: Instant) {}
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Toast {
    pub message: String,
    pub level: ToastLevel,
    pub expires_at: Instant,
}

impl Toast {
    /// Message with its level prefix, as shown to the user.
    pub fn label(&self) -> String {
        format!("{} {}", self.level.prefix(), self.message)
    }
}

/// A stack of independently expiring notifications.
#[derive(Debug, Clone)]
pub struct ToastStack {
    toasts: Vec<Toast>,
    ttl: Duration,
}

impl Default for ToastStack {
    fn default() -> Self {
        Self::new()
    }
}

impl ToastStack {
    pub const fn new() -> Self {
        Self::with_ttl(NOTIFICATION_TTL)
    }

    pub const fn with_ttl(ttl: Duration) -> Self {
        Self {
            toasts: Vec::new(),
            ttl,
        }
    }

    pub fn push(&mut self, level: ToastLevel, message: impl Into<String>, now: Instant) {
        self.toasts.push(Toast {
            level,
            message: message.into(),
            expires_at: now + self.ttl,
        });
    }

    /// Remove every notification due at `now`. Returns how many were removed.
    pub fn expire(&mut self, now: Instant) -> usize {
        let before = self.toasts.len();
        self.toasts.retain(|toast| toast.expires_at > now);
        before - self.toasts.len()
    }

    /// Visible notifications, oldest first.
    pub fn visible(&self) -> &[Toast] {
        &self.toasts
    }

    pub fn len(&self) -> usize {
        self.toasts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.toasts.is_empty()
    }
}

impl NotificationSink for ToastStack {
    fn show(&mut self, message: &str, level: ToastLevel, now: Instant) {
        self.push(level, message, now);
    }

    fn tick(&mut self, now: Instant) {
        self.expire(now);
    }
}

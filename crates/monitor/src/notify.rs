//! Notification sink for human-readable refill events.

use std::{fmt, sync::Arc};
use store::Phase;
use tracing::{error, info};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Level {
    Info,
    Success,
    Error,
}

/// A fire-and-forget event about the refill request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notification {
    pub level: Level,
    /// Phase the event refers to, if any
    pub phase: Option<Phase>,
    pub message: String,
}

impl Notification {
    pub fn phase_completed(phase: Phase, detail: Option<String>) -> Self {
        let message = match detail {
            Some(detail) => format!("{}: {}", phase.description(), detail),
            None => phase.description().to_string(),
        };

        Self {
            level: Level::Info,
            phase: Some(phase),
            message,
        }
    }

    pub fn success(message: impl Into<String>) -> Self {
        Self {
            level: Level::Success,
            phase: Some(Phase::InboundReceived),
            message: message.into(),
        }
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self {
            level: Level::Error,
            phase: None,
            message: message.into(),
        }
    }

    pub fn info(message: impl Into<String>) -> Self {
        Self {
            level: Level::Info,
            phase: None,
            message: message.into(),
        }
    }
}

impl fmt::Display for Notification {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.message)
    }
}

/// Receives notifications. Implementations must not block.
pub trait Notifier: Send + Sync {
    fn notify(&self, notification: &Notification);
}

/// Writes notifications to the tracing log.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingNotifier;

impl Notifier for TracingNotifier {
    fn notify(&self, notification: &Notification) {
        match notification.level {
            Level::Error => error!(message = %notification.message, "Refill failed"),
            Level::Success => info!(message = %notification.message, "Refill complete"),
            Level::Info => info!(
                phase = ?notification.phase,
                message = %notification.message,
                "Refill update"
            ),
        }
    }
}

/// Fan-out to every registered observer.
#[derive(Clone, Default)]
pub struct Notifiers {
    observers: Vec<Arc<dyn Notifier>>,
}

impl Notifiers {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, observer: Arc<dyn Notifier>) {
        self.observers.push(observer);
    }

    pub fn with(mut self, observer: Arc<dyn Notifier>) -> Self {
        self.register(observer);
        self
    }
}

impl Notifier for Notifiers {
    fn notify(&self, notification: &Notification) {
        for observer in &self.observers {
            observer.notify(notification);
        }
    }
}

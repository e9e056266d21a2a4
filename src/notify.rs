//! User-facing notification channel.
//!
//! Orchestrators report outcomes through a [`NotificationSink`]. Delivery is
//! fire-and-forget: sinks never fail and never block the caller.
use std::sync::Mutex;
use tokio::sync::mpsc;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Severity {
    Info,
    Warning,
    Error,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notification {
    pub severity: Severity,
    pub text: String,
}

pub trait NotificationSink: Send + Sync {
    fn notify(&self, severity: Severity, text: String);

    fn info(&self, text: &str) {
        self.notify(Severity::Info, text.to_owned());
    }

    fn warning(&self, text: &str) {
        self.notify(Severity::Warning, text.to_owned());
    }

    fn error(&self, text: &str) {
        self.notify(Severity::Error, text.to_owned());
    }
}

/// Writes notifications to the tracing log. Used by the CLI.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingSink;

impl NotificationSink for TracingSink {
    fn notify(&self, severity: Severity, text: String) {
        match severity {
            Severity::Info => tracing::info!(notification = %text),
            Severity::Warning => tracing::warn!(notification = %text),
            Severity::Error => tracing::error!(notification = %text),
        }
    }
}

/// Forwards notifications to a UI event loop.
#[derive(Debug, Clone)]
pub struct ChannelSink {
    tx: mpsc::UnboundedSender<Notification>,
}

impl ChannelSink {
    pub fn new() -> (Self, mpsc::UnboundedReceiver<Notification>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { tx }, rx)
    }
}

impl NotificationSink for ChannelSink {
    fn notify(&self, severity: Severity, text: String) {
        if self.tx.send(Notification { severity, text }).is_err() {
            tracing::debug!("Notification dropped (receiver closed)");
        }
    }
}

/// Collects notifications in memory.
#[derive(Debug, Default)]
pub struct MemorySink {
    received: Mutex<Vec<Notification>>,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Everything received so far, oldest first.
    pub fn notifications(&self) -> Vec<Notification> {
        self.received
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .clone()
    }

    pub fn take(&self) -> Vec<Notification> {
        std::mem::take(
            &mut *self
                .received
                .lock()
                .unwrap_or_else(|poisoned| poisoned.into_inner()),
        )
    }
}

impl NotificationSink for MemorySink {
    fn notify(&self, severity: Severity, text: String) {
        self.received
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .push(Notification { severity, text });
    }
}

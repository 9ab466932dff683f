//! # Notifications
//!
//! User-visible notices about reconciliation: failed pushes and pulls,
//! safety blocks. Fire-and-forget; nothing depends on delivery.

use std::fmt;
use tracing::{error, info, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Severity {
    Info,
    Warning,
    Error,
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Severity::Info => write!(f, "info"),
            Severity::Warning => write!(f, "warning"),
            Severity::Error => write!(f, "error"),
        }
    }
}

/// Receives notices for the user (a toast, a status line, a log).
pub trait NotificationSink: Send + Sync {
    fn notify(&self, title: &str, message: &str, severity: Severity);
}

/// Writes notices to the log. Used by the headless station.
pub struct TracingNotifier;

impl NotificationSink for TracingNotifier {
    fn notify(&self, title: &str, message: &str, severity: Severity) {
        match severity {
            Severity::Info => info!(title, message, "Notification"),
            Severity::Warning => warn!(title, message, "Notification"),
            Severity::Error => error!(title, message, "Notification"),
        }
    }
}

/// Drops every notice.
pub struct NoOpNotifier;

impl NotificationSink for NoOpNotifier {
    fn notify(&self, _title: &str, _message: &str, _severity: Severity) {}
}

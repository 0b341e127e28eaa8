use std::sync::Mutex;
use std::time::Duration;

/// Visual weight of a transient notification.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Severity {
    Info,
    Success,
    Error,
}

/// Sink for transient, auto-dismissing user notifications.
///
/// The flow controller only emits through this trait; how a front end
/// renders (toast, status line, nothing) is its own business.
pub trait NotificationSink: Send + Sync {
    fn notify(&self, severity: Severity, message: &str, duration: Duration);
}

/// Discards every notification. Default for headless use.
#[derive(Debug, Clone, Copy, Default)]
pub struct NullNotifier;

impl NotificationSink for NullNotifier {
    fn notify(&self, _severity: Severity, _message: &str, _duration: Duration) {}
}

/// Collects notifications in memory for assertions in tests.
#[derive(Debug, Default)]
pub struct RecordingNotifier {
    messages: Mutex<Vec<(Severity, String)>>,
}

impl RecordingNotifier {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// All notifications seen so far, oldest first.
    #[must_use]
    pub fn messages(&self) -> Vec<(Severity, String)> {
        self.messages
            .lock()
            .map(|guard| guard.clone())
            .unwrap_or_default()
    }
}

impl NotificationSink for RecordingNotifier {
    fn notify(&self, severity: Severity, message: &str, _duration: Duration) {
        if let Ok(mut guard) = self.messages.lock() {
            guard.push((severity, message.to_string()));
        }
    }
}

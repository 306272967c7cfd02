//! Captured notifications for assertions.

use std::sync::Mutex;

use hordebond_core::Notifier;

/// Severity of one captured message.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Level {
    Info,
    Warn,
    Error,
}

/// [`Notifier`] that records every message instead of displaying it.
#[derive(Debug, Default)]
pub struct RecordingNotifier {
    messages: Mutex<Vec<(Level, String)>>,
}

impl RecordingNotifier {
    pub fn new() -> Self {
        Self::default()
    }

    /// Every captured message, oldest first.
    pub fn messages(&self) -> Vec<(Level, String)> {
        self.lock().clone()
    }

    /// True when any message at `level` contains `needle`.
    pub fn contains(&self, level: Level, needle: &str) -> bool {
        self.lock()
            .iter()
            .any(|(l, m)| *l == level && m.contains(needle))
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    pub fn clear(&self) {
        self.lock().clear();
    }

    fn record(&self, level: Level, message: &str) {
        self.lock().push((level, message.to_owned()));
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Vec<(Level, String)>> {
        self.messages
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

impl Notifier for RecordingNotifier {
    fn info(&self, message: &str) {
        self.record(Level::Info, message);
    }

    fn warn(&self, message: &str) {
        self.record(Level::Warn, message);
    }

    fn error(&self, message: &str) {
        self.record(Level::Error, message);
    }
}

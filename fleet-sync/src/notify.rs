use std::sync::{Mutex, MutexGuard, PoisonError};

/// Severity of a notification.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Level {
    Info,
    Success,
    Warning,
    Error,
}

/// Transient message for the user, the console's toast.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notification {
    pub level: Level,
    pub message: String,
    pub detail: String,
}

impl Notification {
    pub fn info(message: impl Into<String>) -> Self {
        Self::new(Level::Info, message)
    }
    pub fn success(message: impl Into<String>) -> Self {
        Self::new(Level::Success, message)
    }
    pub fn warning(message: impl Into<String>) -> Self {
        Self::new(Level::Warning, message)
    }
    pub fn error(message: impl Into<String>) -> Self {
        Self::new(Level::Error, message)
    }

    fn new(level: Level, message: impl Into<String>) -> Self {
        Self {
            level,
            message: message.into(),
            detail: String::new(),
        }
    }

    /// Attach a second line of detail.
    pub fn with_detail(mut self, detail: impl Into<String>) -> Self {
        self.detail = detail.into();
        self
    }
}

/// Receives every notification raised by the data access layer and the sync workflows.
pub trait Notifier: Send + Sync {
    fn notify(&self, notification: Notification);
}

/// Prints notifications on the terminal.
#[derive(Debug, Default, Clone, Copy)]
pub struct ConsoleNotifier;

impl Notifier for ConsoleNotifier {
    fn notify(&self, notification: Notification) {
        let Notification {
            level,
            message,
            detail,
        } = notification;
        match level {
            Level::Info => console_logger::info(&message, &detail),
            Level::Success => console_logger::success(&message, &detail),
            Level::Warning => console_logger::warn(&message, &detail),
            Level::Error => console_logger::error(&message, &detail),
        }
    }
}

/// Keeps notifications in memory, for embedding and tests.
#[derive(Debug, Default)]
pub struct MemoryNotifier {
    received: Mutex<Vec<Notification>>,
}

impl MemoryNotifier {
    /// Every notification received so far.
    pub fn received(&self) -> Vec<Notification> {
        self.lock().clone()
    }

    fn lock(&self) -> MutexGuard<'_, Vec<Notification>> {
        self.received.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Levels of the notifications received so far.
    pub fn levels(&self) -> Vec<Level> {
        self.received().into_iter().map(|n| n.level).collect()
    }
}

impl Notifier for MemoryNotifier {
    fn notify(&self, notification: Notification) {
        self.lock().push(notification);
    }
}

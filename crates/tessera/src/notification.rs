//! User-facing notifications.
//!
//! Editing actions never fail loudly: errors are reported through a
//! [`NotificationSink`] and the action is skipped. A sink itself never fails.

use std::cell::RefCell;

use log::{error, info};

/// Receives success and error messages for the user.
pub trait NotificationSink {
    fn success(&self, message: &str);

    fn error(&self, message: &str);
}

impl<T: NotificationSink + ?Sized> NotificationSink for &T {
    fn success(&self, message: &str) {
        (**self).success(message);
    }

    fn error(&self, message: &str) {
        (**self).error(message);
    }
}

/// Forwards notifications to the `log` facade.
#[derive(Debug, Clone, Copy, Default)]
pub struct LogNotifications;

impl NotificationSink for LogNotifications {
    fn success(&self, message: &str) {
        info!(notification = message; "Action succeeded");
    }

    fn error(&self, message: &str) {
        error!(notification = message; "Action failed");
    }
}

/// A notification recorded by [`NotificationLog`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Notification {
    Success(String),
    Error(String),
}

impl Notification {
    pub fn message(&self) -> &str {
        match self {
            Notification::Success(message) | Notification::Error(message) => message,
        }
    }

    pub fn is_error(&self) -> bool {
        matches!(self, Notification::Error(_))
    }
}

/// Records every notification in order.
///
/// Useful in tests and in front ends that display notifications after the
/// action returns.
#[derive(Debug, Default)]
pub struct NotificationLog {
    entries: RefCell<Vec<Notification>>,
}

impl NotificationLog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns a snapshot of the recorded notifications.
    pub fn entries(&self) -> Vec<Notification> {
        self.entries.borrow().clone()
    }

    pub fn errors(&self) -> Vec<String> {
        self.entries
            .borrow()
            .iter()
            .filter(|n| n.is_error())
            .map(|n| n.message().to_string())
            .collect()
    }

    pub fn clear(&self) {
        self.entries.borrow_mut().clear();
    }
}

impl NotificationSink for NotificationLog {
    fn success(&self, message: &str) {
        self.entries
            .borrow_mut()
            .push(Notification::Success(message.to_string()));
    }

    fn error(&self, message: &str) {
        self.entries
            .borrow_mut()
            .push(Notification::Error(message.to_string()));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn notify_twice(sink: impl NotificationSink) {
        sink.success("saved");
        sink.error("missing model");
    }

    #[test]
    fn test_log_records_in_order() {
        let log = NotificationLog::new();
        notify_twice(&log);

        assert_eq!(
            log.entries(),
            vec![
                Notification::Success("saved".to_string()),
                Notification::Error("missing model".to_string()),
            ]
        );
        assert_eq!(log.errors(), vec!["missing model".to_string()]);

        log.clear();
        assert!(log.entries().is_empty());
    }
}

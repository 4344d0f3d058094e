//! User-facing notices (save succeeded, save failed, ...).
//!
//! Services receive a `Notifier` explicitly instead of reaching for a global
//! toast queue.

use tracing::{error, info};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NoticeLevel {
    Success,
    Error,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notice {
    pub level: NoticeLevel,
    pub title: String,
    pub message: String,
}

impl Notice {
    #[must_use]
    pub fn success(title: impl Into<String>, message: impl Into<String>) -> Self {
        Self { level: NoticeLevel::Success, title: title.into(), message: message.into() }
    }

    #[must_use]
    pub fn error(title: impl Into<String>, message: impl Into<String>) -> Self {
        Self { level: NoticeLevel::Error, title: title.into(), message: message.into() }
    }
}

pub trait Notifier: Send + Sync {
    fn notify(&self, notice: Notice);
}

/// Writes notices to the log.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingNotifier;

impl Notifier for TracingNotifier {
    fn notify(&self, notice: Notice) {
        match notice.level {
            NoticeLevel::Success => info!(title = %notice.title, message = %notice.message, "notice"),
            NoticeLevel::Error => error!(title = %notice.title, message = %notice.message, "notice"),
        }
    }
}

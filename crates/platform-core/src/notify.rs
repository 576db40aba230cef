//! User-facing notifications.

use std::time::Duration;

/// How long a notice stays visible unless overridden.
pub const DEFAULT_NOTICE_TIMEOUT: Duration = Duration::from_secs(8);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NoticeLevel {
    Info,
    Warning,
}

/// A transient notification.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notice {
    pub level: NoticeLevel,
    pub text: String,
    /// `None` keeps the notice until dismissed.
    pub timeout: Option<Duration>,
}

impl Notice {
    pub fn info(text: impl Into<String>) -> Self {
        Self {
            level: NoticeLevel::Info,
            text: text.into(),
            timeout: Some(DEFAULT_NOTICE_TIMEOUT),
        }
    }

    pub fn warning(text: impl Into<String>) -> Self {
        Self {
            level: NoticeLevel::Warning,
            text: text.into(),
            timeout: Some(DEFAULT_NOTICE_TIMEOUT),
        }
    }
}

/// Surfaces notices and the "recording" marker to the user.
pub trait Notifier: Send + Sync {
    fn notify(&self, notice: Notice);

    /// The composed output started or stopped being recorded.
    fn recording_changed(&self, recording: bool);
}

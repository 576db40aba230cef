//! Terminal notifier.

use convulse_platform_core::{Notice, NoticeLevel, Notifier};

/// Status line shown when recording starts or stops.
pub fn status_line(recording: bool) -> &'static str {
    if recording {
        "Convulse: recording"
    } else {
        "Convulse: stopped"
    }
}

/// Prints notices to stdout and mirrors them into the log.
#[derive(Debug, Clone, Copy, Default)]
pub struct ConsoleNotifier;

impl Notifier for ConsoleNotifier {
    fn notify(&self, notice: Notice) {
        match notice.level {
            NoticeLevel::Info => tracing::info!(text = %notice.text, "Notice"),
            NoticeLevel::Warning => tracing::warn!(text = %notice.text, "Notice"),
        }
        println!("» {}", notice.text);
    }

    fn recording_changed(&self, recording: bool) {
        tracing::debug!(recording, "Recording indicator changed");
        println!("[{}]", status_line(recording));
    }
}

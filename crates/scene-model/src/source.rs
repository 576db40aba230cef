//! The two visual sources a composition is built from.

use serde::{Deserialize, Serialize};

/// One of the two independent visual sources.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SourceKind {
    /// Camera capture (carries the microphone audio).
    Webcam,
    /// Screen/window capture (video only).
    Desktop,
}

impl SourceKind {
    /// Layer order on the canvas: earlier entries are drawn first and are
    /// occluded by later ones where they overlap.
    pub const DRAW_ORDER: [SourceKind; 2] = [SourceKind::Desktop, SourceKind::Webcam];

    /// Stable lowercase name, used for logs and preference keys.
    pub fn as_str(self) -> &'static str {
        match self {
            SourceKind::Webcam => "webcam",
            SourceKind::Desktop => "desktop",
        }
    }

    /// Whether the capture request for this source asks for audio.
    pub fn wants_audio(self) -> bool {
        matches!(self, SourceKind::Webcam)
    }

    /// Preference key for this source's size fraction.
    pub fn size_key(self) -> &'static str {
        match self {
            SourceKind::Webcam => "webcam_size",
            SourceKind::Desktop => "desktop_size",
        }
    }

    /// Preference key for this source's position index.
    pub fn position_key(self) -> &'static str {
        match self {
            SourceKind::Webcam => "webcam_pos",
            SourceKind::Desktop => "desktop_pos",
        }
    }
}

impl std::fmt::Display for SourceKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_webcam_is_drawn_last() {
        assert_eq!(SourceKind::DRAW_ORDER.last(), Some(&SourceKind::Webcam));
        assert_eq!(SourceKind::DRAW_ORDER.first(), Some(&SourceKind::Desktop));
    }

    #[test]
    fn test_only_webcam_requests_audio() {
        assert!(SourceKind::Webcam.wants_audio());
        assert!(!SourceKind::Desktop.wants_audio());
    }
}

//! Per-source layout settings adjusted at runtime.

use serde::{Deserialize, Serialize};

use crate::layout::{PositionIndex, SizeFraction};
use crate::source::SourceKind;

/// Size and anchor of one source.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SourceLayout {
    pub size: SizeFraction,
    pub position: PositionIndex,
}

impl SourceLayout {
    /// Startup layout for a source when no preference is stored.
    pub fn default_for(kind: SourceKind) -> Self {
        match kind {
            // Small picture-in-picture in the top-right corner.
            SourceKind::Webcam => Self {
                size: SizeFraction::new(0.3).unwrap_or(SizeFraction::FULL),
                position: PositionIndex::TOP_RIGHT,
            },
            SourceKind::Desktop => Self {
                size: SizeFraction::FULL,
                position: PositionIndex::TOP_LEFT,
            },
        }
    }
}

/// Layout of both sources.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LayoutSettings {
    pub webcam: SourceLayout,
    pub desktop: SourceLayout,
}

impl Default for LayoutSettings {
    fn default() -> Self {
        Self {
            webcam: SourceLayout::default_for(SourceKind::Webcam),
            desktop: SourceLayout::default_for(SourceKind::Desktop),
        }
    }
}

impl LayoutSettings {
    /// Layout of one source.
    pub fn get(&self, kind: SourceKind) -> SourceLayout {
        match kind {
            SourceKind::Webcam => self.webcam,
            SourceKind::Desktop => self.desktop,
        }
    }

    fn get_mut(&mut self, kind: SourceKind) -> &mut SourceLayout {
        match kind {
            SourceKind::Webcam => &mut self.webcam,
            SourceKind::Desktop => &mut self.desktop,
        }
    }

    /// Advance a source's anchor by one cell (mod 9) and return the new index.
    pub fn cycle_position(&mut self, kind: SourceKind) -> PositionIndex {
        let layout = self.get_mut(kind);
        layout.position = layout.position.cycled();
        layout.position
    }

    /// Set a source's size fraction. Non-finite input is rejected and the
    /// previous value kept; returns the stored value on success.
    pub fn set_size(&mut self, kind: SourceKind, value: f64) -> Option<SizeFraction> {
        let size = SizeFraction::new(value)?;
        self.get_mut(kind).size = size;
        Some(size)
    }

    /// Replace a source's anchor.
    pub fn set_position(&mut self, kind: SourceKind, position: PositionIndex) {
        self.get_mut(kind).position = position;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_put_webcam_top_right_over_full_desktop() {
        let settings = LayoutSettings::default();
        assert_eq!(settings.webcam.position, PositionIndex::TOP_RIGHT);
        assert!((settings.webcam.size.get() - 0.3).abs() < 1e-12);
        assert_eq!(settings.desktop.position, PositionIndex::TOP_LEFT);
        assert_eq!(settings.desktop.size, SizeFraction::FULL);
    }

    #[test]
    fn test_cycling_one_source_leaves_the_other_alone() {
        let mut settings = LayoutSettings::default();
        assert_eq!(settings.cycle_position(SourceKind::Desktop).get(), 1);
        assert_eq!(settings.webcam.position, PositionIndex::TOP_RIGHT);
    }

    #[test]
    fn test_rejected_size_keeps_previous_value() {
        let mut settings = LayoutSettings::default();
        assert!(settings.set_size(SourceKind::Webcam, f64::NAN).is_none());
        assert!((settings.webcam.size.get() - 0.3).abs() < 1e-12);

        let stored = settings.set_size(SourceKind::Webcam, 1.7).unwrap();
        assert_eq!(stored, SizeFraction::FULL);
    }
}

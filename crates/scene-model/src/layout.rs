//! Placement of a source on the canvas.
//!
//! A source is scaled so its rendered height is a fraction of the canvas
//! height (aspect ratio preserved), then anchored to one of nine points of
//! a 3x3 grid:
//!
//! ```text
//!  0 ─── 1 ─── 2
//!  │           │
//!  3     4     5
//!  │           │
//!  6 ─── 7 ─── 8
//! ```

use serde::{Deserialize, Serialize};

/// Number of anchor cells on the placement grid.
pub const POSITION_COUNT: u8 = 9;

/// Index into the 3x3 anchor grid, always in `0..9`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(from = "u32", into = "u32")]
pub struct PositionIndex(u8);

impl PositionIndex {
    /// Top-left anchor.
    pub const TOP_LEFT: PositionIndex = PositionIndex(0);
    /// Top-right anchor.
    pub const TOP_RIGHT: PositionIndex = PositionIndex(2);
    /// Center anchor.
    pub const CENTER: PositionIndex = PositionIndex(4);
    /// Bottom-right anchor.
    pub const BOTTOM_RIGHT: PositionIndex = PositionIndex(8);

    /// Create an index, wrapping any integer modulo 9.
    pub fn new(index: u32) -> Self {
        Self((index % POSITION_COUNT as u32) as u8)
    }

    /// The raw index.
    pub fn get(self) -> u8 {
        self.0
    }

    /// The next anchor in the cycle (8 wraps back to 0).
    pub fn cycled(self) -> Self {
        Self((self.0 + 1) % POSITION_COUNT)
    }

    /// Grid row (0 = top, 2 = bottom).
    pub fn row(self) -> u8 {
        self.0 / 3
    }

    /// Grid column (0 = left, 2 = right).
    pub fn col(self) -> u8 {
        self.0 % 3
    }

    /// Anchor fractions `(row_frac, col_frac)`, each in `{0, 0.5, 1}`.
    pub fn anchor(self) -> (f64, f64) {
        (self.row() as f64 / 2.0, self.col() as f64 / 2.0)
    }
}

impl From<u32> for PositionIndex {
    fn from(value: u32) -> Self {
        Self::new(value)
    }
}

impl From<PositionIndex> for u32 {
    fn from(value: PositionIndex) -> Self {
        value.0 as u32
    }
}

impl std::fmt::Display for PositionIndex {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Rendered height as a fraction of canvas height, in `[0.0, 1.0]`.
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd, Serialize, Deserialize)]
#[serde(try_from = "f64", into = "f64")]
pub struct SizeFraction(f64);

impl SizeFraction {
    /// Full canvas height.
    pub const FULL: SizeFraction = SizeFraction(1.0);

    /// Create a size fraction, clamping into `[0.0, 1.0]`.
    /// Returns `None` for NaN or infinite input.
    pub fn new(value: f64) -> Option<Self> {
        if !value.is_finite() {
            return None;
        }
        Some(Self(value.clamp(0.0, 1.0)))
    }

    /// The fraction as a float.
    pub fn get(self) -> f64 {
        self.0
    }
}

impl TryFrom<f64> for SizeFraction {
    type Error = String;

    fn try_from(value: f64) -> Result<Self, Self::Error> {
        Self::new(value).ok_or_else(|| format!("size fraction must be finite, got {value}"))
    }
}

impl From<SizeFraction> for f64 {
    fn from(value: SizeFraction) -> Self {
        value.0
    }
}

impl std::fmt::Display for SizeFraction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Where and how large a source is drawn, in canvas pixels.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Placement {
    /// Left edge.
    pub x: f64,
    /// Top edge.
    pub y: f64,
    /// Rendered width.
    pub width: f64,
    /// Rendered height.
    pub height: f64,
}

impl Placement {
    /// Right edge.
    pub fn right(&self) -> f64 {
        self.x + self.width
    }

    /// Bottom edge.
    pub fn bottom(&self) -> f64 {
        self.y + self.height
    }
}

/// Compute where a source with the given aspect ratio lands on the canvas.
///
/// Returns `None` when the aspect ratio is not a finite number (e.g. a
/// frame reported a zero height): the source is skipped for that frame.
pub fn placement(
    source_aspect: f64,
    size: SizeFraction,
    position: PositionIndex,
    canvas_width: u32,
    canvas_height: u32,
) -> Option<Placement> {
    if !source_aspect.is_finite() {
        return None;
    }

    let height = canvas_height as f64 * size.get();
    let width = height * source_aspect;
    let (row_frac, col_frac) = position.anchor();

    Some(Placement {
        x: (canvas_width as f64 - width) * col_frac,
        y: (canvas_height as f64 - height) * row_frac,
        width,
        height,
    })
}

/// Aspect ratio of a frame, `width / height`.
///
/// A zero height yields a non-finite ratio, which `placement` rejects.
pub fn aspect_ratio(width: u32, height: u32) -> f64 {
    width as f64 / height as f64
}

#[cfg(test)]
mod tests {
    use super::*;

    fn size(v: f64) -> SizeFraction {
        SizeFraction::new(v).unwrap()
    }

    #[test]
    fn test_anchor_corners_and_center() {
        assert_eq!(PositionIndex::new(0).anchor(), (0.0, 0.0));
        assert_eq!(PositionIndex::new(4).anchor(), (0.5, 0.5));
        assert_eq!(PositionIndex::new(8).anchor(), (1.0, 1.0));
        assert_eq!(PositionIndex::new(2).anchor(), (0.0, 1.0));
        assert_eq!(PositionIndex::new(6).anchor(), (1.0, 0.0));
    }

    #[test]
    fn test_position_wraps_modulo_nine() {
        assert_eq!(PositionIndex::new(9).get(), 0);
        assert_eq!(PositionIndex::new(13).get(), 4);
        assert_eq!(PositionIndex::BOTTOM_RIGHT.cycled(), PositionIndex::TOP_LEFT);
    }

    #[test]
    fn test_top_left_placement() {
        let p = placement(16.0 / 9.0, SizeFraction::FULL, PositionIndex::TOP_LEFT, 1920, 1080)
            .unwrap();
        assert_eq!(p.x, 0.0);
        assert_eq!(p.y, 0.0);
        assert_eq!(p.height, 1080.0);
        assert!((p.width - 1920.0).abs() < 1e-9);
    }

    #[test]
    fn test_bottom_right_webcam() {
        // 4:3 camera at 30% of a 1080p canvas.
        let p = placement(4.0 / 3.0, size(0.3), PositionIndex::BOTTOM_RIGHT, 1920, 1080).unwrap();
        assert!((p.height - 324.0).abs() < 1e-9);
        assert!((p.width - 432.0).abs() < 1e-9);
        assert!((p.right() - 1920.0).abs() < 1e-9);
        assert!((p.bottom() - 1080.0).abs() < 1e-9);
    }

    #[test]
    fn test_center_placement() {
        let p = placement(1.0, size(0.5), PositionIndex::CENTER, 1000, 1000).unwrap();
        assert_eq!((p.x, p.y, p.width, p.height), (250.0, 250.0, 500.0, 500.0));
    }

    #[test]
    fn test_oversized_source_gets_negative_origin() {
        // Wider than the canvas: centered horizontally means a negative x.
        let p = placement(3.0, SizeFraction::FULL, PositionIndex::new(1), 1920, 1080).unwrap();
        assert!(p.x < 0.0);
        assert_eq!(p.y, 0.0);
    }

    #[test]
    fn test_non_finite_aspect_is_skipped() {
        assert!(placement(f64::NAN, size(0.3), PositionIndex::CENTER, 1920, 1080).is_none());
        assert!(placement(aspect_ratio(640, 0), size(0.3), PositionIndex::CENTER, 1920, 1080)
            .is_none());
    }

    #[test]
    fn test_size_fraction_clamps_and_rejects_non_finite() {
        assert_eq!(SizeFraction::new(2.0), Some(SizeFraction::FULL));
        assert_eq!(SizeFraction::new(-0.5).map(SizeFraction::get), Some(0.0));
        assert!(SizeFraction::new(f64::INFINITY).is_none());
        assert!(SizeFraction::new(f64::NAN).is_none());
    }

    #[test]
    fn test_conversions_wrap_position_and_reject_nan_size() {
        assert_eq!(PositionIndex::from(11).get(), 2);
        assert_eq!(u32::from(PositionIndex::new(7)), 7);
        assert!(SizeFraction::try_from(f64::NAN).is_err());
    }
}

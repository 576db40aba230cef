//! Frame compositor: paints the two sources onto the canvas.
//!
//! Each invocation clears the canvas, then draws the desktop and finally
//! the webcam on top. A source is drawn only once it has a decoded frame;
//! a frame whose aspect ratio is not finite is skipped for that invocation.

use convulse_capture_engine::CaptureSourceManager;
use convulse_scene_model::{aspect_ratio, placement, LayoutSettings, Placement, SourceKind};

use crate::canvas::DrawSurface;

/// What one compositor invocation drew.
#[derive(Debug, Clone, PartialEq)]
pub struct FrameComposition {
    /// Invocation counter.
    pub frame_index: u64,

    /// Layers in the order they were painted.
    pub layers: Vec<LayerPlacement>,
}

impl FrameComposition {
    pub fn layer(&self, kind: SourceKind) -> Option<&LayerPlacement> {
        self.layers.iter().find(|l| l.kind == kind)
    }

    pub fn is_empty(&self) -> bool {
        self.layers.is_empty()
    }
}

/// One painted source.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LayerPlacement {
    pub kind: SourceKind,
    pub placement: Placement,
}

/// Paints sources onto a surface in a fixed order.
#[derive(Debug, Default)]
pub struct Compositor {
    frame_index: u64,
}

impl Compositor {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of invocations so far.
    pub fn frames_rendered(&self) -> u64 {
        self.frame_index
    }

    /// Clear the surface and draw every ready source.
    pub fn render<S: DrawSurface>(
        &mut self,
        surface: &mut S,
        sources: &CaptureSourceManager,
        settings: &LayoutSettings,
    ) -> FrameComposition {
        surface.clear();
        let (canvas_width, canvas_height) = (surface.width(), surface.height());
        let mut layers = Vec::with_capacity(SourceKind::DRAW_ORDER.len());

        for kind in SourceKind::DRAW_ORDER {
            let Some(frame) = sources.source(kind).decoded_frame() else {
                continue;
            };
            let layout = settings.get(kind);
            let Some(dest) = placement(
                aspect_ratio(frame.width(), frame.height()),
                layout.size,
                layout.position,
                canvas_width,
                canvas_height,
            ) else {
                tracing::trace!(%kind, "Skipping source with non-finite aspect ratio");
                continue;
            };

            surface.draw_frame(frame, &dest);
            layers.push(LayerPlacement {
                kind,
                placement: dest,
            });
        }

        let composition = FrameComposition {
            frame_index: self.frame_index,
            layers,
        };
        self.frame_index += 1;
        composition
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::canvas::Canvas;
    use convulse_platform_core::{CaptureStream, Notice, Notifier, VideoFrame};
    use std::sync::Arc;
    use tokio::sync::watch;

    struct SilentNotifier;

    impl Notifier for SilentNotifier {
        fn notify(&self, _notice: Notice) {}
        fn recording_changed(&self, _recording: bool) {}
    }

    /// Records draw calls instead of painting.
    #[derive(Default)]
    struct TraceSurface {
        ops: Vec<String>,
    }

    impl DrawSurface for TraceSurface {
        fn width(&self) -> u32 {
            1920
        }

        fn height(&self) -> u32 {
            1080
        }

        fn clear(&mut self) {
            self.ops.push("clear".to_string());
        }

        fn draw_frame(&mut self, frame: &VideoFrame, _dest: &Placement) {
            self.ops.push(format!("draw {}x{}", frame.width(), frame.height()));
        }
    }

    fn live(manager: &mut CaptureSourceManager, kind: SourceKind, frame: VideoFrame) {
        let (tx, rx) = watch::channel(Some(Arc::new(frame)));
        let stream = CaptureStream::new(kind, rx).with_keepalive(tx);
        manager.on_acquired(kind, Ok(stream), &SilentNotifier);
    }

    #[test]
    fn test_desktop_is_drawn_before_webcam() {
        let mut sources = CaptureSourceManager::new();
        live(&mut sources, SourceKind::Webcam, VideoFrame::solid(640, 480, [1, 1, 1, 255]));
        live(&mut sources, SourceKind::Desktop, VideoFrame::solid(1920, 1080, [2, 2, 2, 255]));

        let mut surface = TraceSurface::default();
        let composition =
            Compositor::new().render(&mut surface, &sources, &LayoutSettings::default());

        assert_eq!(surface.ops, vec!["clear", "draw 1920x1080", "draw 640x480"]);
        let kinds: Vec<_> = composition.layers.iter().map(|l| l.kind).collect();
        assert_eq!(kinds, vec![SourceKind::Desktop, SourceKind::Webcam]);
    }

    #[test]
    fn test_undecoded_sources_are_not_drawn() {
        let mut sources = CaptureSourceManager::new();
        live(&mut sources, SourceKind::Webcam, VideoFrame::solid(0, 0, [0; 4]));

        let mut surface = TraceSurface::default();
        let composition =
            Compositor::new().render(&mut surface, &sources, &LayoutSettings::default());

        assert_eq!(surface.ops, vec!["clear"]);
        assert!(composition.is_empty());
    }

    #[test]
    fn test_webcam_lands_on_configured_anchor() {
        let mut sources = CaptureSourceManager::new();
        live(&mut sources, SourceKind::Webcam, VideoFrame::solid(4, 3, [5, 6, 7, 255]));

        let mut canvas = Canvas::new(400, 300);
        let composition =
            Compositor::new().render(&mut canvas, &sources, &LayoutSettings::default());

        // Default webcam: 30% height, top-right.
        let layer = composition.layer(SourceKind::Webcam).unwrap();
        assert!((layer.placement.height - 90.0).abs() < 1e-9);
        assert!((layer.placement.right() - 400.0).abs() < 1e-9);
        assert_eq!(canvas.pixel(399, 0), Some([5, 6, 7, 255]));
        assert_eq!(canvas.pixel(0, 299), Some([0, 0, 0, 255]));
    }

    #[test]
    fn test_frame_index_advances_per_invocation() {
        let sources = CaptureSourceManager::new();
        let mut compositor = Compositor::new();
        let mut canvas = Canvas::new(2, 2);
        let settings = LayoutSettings::default();

        assert_eq!(compositor.render(&mut canvas, &sources, &settings).frame_index, 0);
        assert_eq!(compositor.render(&mut canvas, &sources, &settings).frame_index, 1);
        assert_eq!(compositor.frames_rendered(), 2);
    }
}

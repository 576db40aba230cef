//! Drawing surface the compositor paints onto.

use std::sync::Arc;

use convulse_platform_core::{VideoFrame, BYTES_PER_PIXEL};
use convulse_scene_model::Placement;

/// A 2D raster target.
pub trait DrawSurface {
    fn width(&self) -> u32;

    fn height(&self) -> u32;

    /// Fill the whole surface with opaque black.
    fn clear(&mut self);

    /// Draw `frame` scaled into `dest`. Parts outside the surface are clipped.
    fn draw_frame(&mut self, frame: &VideoFrame, dest: &Placement);
}

/// RGBA canvas in memory.
#[derive(Debug, Clone)]
pub struct Canvas {
    width: u32,
    height: u32,
    pixels: Vec<u8>,
}

const BLACK: [u8; 4] = [0, 0, 0, 255];

impl Canvas {
    pub fn new(width: u32, height: u32) -> Self {
        let mut canvas = Self {
            width,
            height,
            pixels: vec![0; width as usize * height as usize * BYTES_PER_PIXEL],
        };
        canvas.clear();
        canvas
    }

    pub fn pixel(&self, x: u32, y: u32) -> Option<[u8; 4]> {
        if x >= self.width || y >= self.height {
            return None;
        }
        let i = self.offset(x, y);
        let mut px = [0; 4];
        px.copy_from_slice(&self.pixels[i..i + BYTES_PER_PIXEL]);
        Some(px)
    }

    /// Copy of the current contents as a frame.
    pub fn snapshot(&self) -> Arc<VideoFrame> {
        Arc::new(
            VideoFrame::from_rgba(self.width, self.height, self.pixels.clone())
                .unwrap_or_else(|_| VideoFrame::solid(self.width, self.height, BLACK)),
        )
    }

    fn offset(&self, x: u32, y: u32) -> usize {
        (y as usize * self.width as usize + x as usize) * BYTES_PER_PIXEL
    }
}

impl DrawSurface for Canvas {
    fn width(&self) -> u32 {
        self.width
    }

    fn height(&self) -> u32 {
        self.height
    }

    fn clear(&mut self) {
        for px in self.pixels.chunks_exact_mut(BYTES_PER_PIXEL) {
            px.copy_from_slice(&BLACK);
        }
    }

    fn draw_frame(&mut self, frame: &VideoFrame, dest: &Placement) {
        if !frame.is_decoded() || dest.width <= 0.0 || dest.height <= 0.0 {
            return;
        }

        // Canvas pixels whose centers fall inside the destination rectangle.
        let x_start = dest.x.floor().max(0.0) as u32;
        let y_start = dest.y.floor().max(0.0) as u32;
        let x_end = dest.right().ceil().min(self.width as f64).max(0.0) as u32;
        let y_end = dest.bottom().ceil().min(self.height as f64).max(0.0) as u32;

        let sx_scale = frame.width() as f64 / dest.width;
        let sy_scale = frame.height() as f64 / dest.height;

        for cy in y_start..y_end {
            let center_y = cy as f64 + 0.5;
            if center_y < dest.y || center_y >= dest.bottom() {
                continue;
            }
            let sy = (((center_y - dest.y) * sy_scale) as u32).min(frame.height() - 1);

            for cx in x_start..x_end {
                let center_x = cx as f64 + 0.5;
                if center_x < dest.x || center_x >= dest.right() {
                    continue;
                }
                let sx = (((center_x - dest.x) * sx_scale) as u32).min(frame.width() - 1);

                if let Some(px) = frame.pixel(sx, sy) {
                    let i = self.offset(cx, cy);
                    self.pixels[i..i + BYTES_PER_PIXEL].copy_from_slice(&px);
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rect(x: f64, y: f64, width: f64, height: f64) -> Placement {
        Placement {
            x,
            y,
            width,
            height,
        }
    }

    #[test]
    fn test_new_canvas_is_black() {
        let canvas = Canvas::new(4, 4);
        assert_eq!(canvas.pixel(0, 0), Some(BLACK));
        assert_eq!(canvas.pixel(3, 3), Some(BLACK));
        assert_eq!(canvas.pixel(4, 0), None);
    }

    #[test]
    fn test_draw_scales_into_destination() {
        let mut canvas = Canvas::new(10, 10);
        let red = VideoFrame::solid(2, 2, [255, 0, 0, 255]);
        canvas.draw_frame(&red, &rect(2.0, 2.0, 4.0, 4.0));

        assert_eq!(canvas.pixel(2, 2), Some([255, 0, 0, 255]));
        assert_eq!(canvas.pixel(5, 5), Some([255, 0, 0, 255]));
        assert_eq!(canvas.pixel(6, 6), Some(BLACK));
        assert_eq!(canvas.pixel(1, 1), Some(BLACK));
    }

    #[test]
    fn test_draw_clips_to_canvas() {
        let mut canvas = Canvas::new(4, 4);
        let green = VideoFrame::solid(1, 1, [0, 255, 0, 255]);
        canvas.draw_frame(&green, &rect(-10.0, -10.0, 100.0, 100.0));
        assert_eq!(canvas.pixel(0, 0), Some([0, 255, 0, 255]));
        assert_eq!(canvas.pixel(3, 3), Some([0, 255, 0, 255]));
    }

    #[test]
    fn test_nearest_neighbor_keeps_halves_apart() {
        // Left column white, right column blue.
        let mut data = Vec::new();
        data.extend_from_slice(&[255, 255, 255, 255]);
        data.extend_from_slice(&[0, 0, 255, 255]);
        let frame = VideoFrame::from_rgba(2, 1, data).unwrap();

        let mut canvas = Canvas::new(8, 2);
        canvas.draw_frame(&frame, &rect(0.0, 0.0, 8.0, 2.0));
        assert_eq!(canvas.pixel(3, 1), Some([255, 255, 255, 255]));
        assert_eq!(canvas.pixel(4, 1), Some([0, 0, 255, 255]));
    }

    #[test]
    fn test_clear_resets_previous_drawing() {
        let mut canvas = Canvas::new(2, 2);
        canvas.draw_frame(&VideoFrame::solid(1, 1, [9, 9, 9, 255]), &rect(0.0, 0.0, 2.0, 2.0));
        canvas.clear();
        assert_eq!(canvas.pixel(1, 1), Some(BLACK));
        assert_eq!(canvas.snapshot().pixel(1, 1), Some(BLACK));
    }
}

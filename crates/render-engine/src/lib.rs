//! Convulse Render Engine
//!
//! Live composition of the capture sources and export of finished
//! recordings.
//!
//! # Pipeline Architecture
//!
//! ```text
//! desktop frame ──┐
//!                 ├── Compositor (clear, desktop, webcam) ──► Canvas
//! webcam frame ───┘                                            │
//!                                                 snapshot @ capture_fps
//!                                                              ▼
//!                                                       ComposedStream
//!
//! FinishedRecording ──► Exporter (concat + name) ──► SaveTrigger
//! ```

pub mod canvas;
pub mod compositor;
pub mod export;
pub mod frame_loop;

pub use canvas::{Canvas, DrawSurface};
pub use compositor::{Compositor, FrameComposition, LayerPlacement};
pub use export::*;
pub use frame_loop::FrameScheduler;

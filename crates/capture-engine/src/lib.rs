//! Convulse Capture Engine
//!
//! Everything between the devices and the recorded bytes:
//!
//! ```text
//! ┌──────────────────────┐        ┌──────────────────────────┐
//! │ CaptureSourceManager │        │   RecordingController    │
//! │  webcam   desktop    │        │  idle ⇄ recording        │
//! └────┬─────────┬───────┘        └──────────┬───────────────┘
//!      │         │                           │ binds
//!      ▼         ▼                           ▼
//! ┌──────────────────────┐        ┌──────────────────────────┐
//! │   GstCaptureDevice   │        │     GstEncoderSink       │
//! │ v4l2src  pipewiresrc │        │ appsrc ─► mux ─► appsink │
//! └──────────────────────┘        └──────────────────────────┘
//! ```

pub mod device;
pub mod encoder;
pub mod pipeline;
pub mod session;
pub mod sources;

pub use device::GstCaptureDevice;
pub use encoder::{Container, GstEncoderFactory};
pub use session::*;
pub use sources::*;

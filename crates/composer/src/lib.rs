//! Convulse Composer
//!
//! The live session tying capture, composition and recording together.
//!
//! ```text
//!            ┌──────────── Composer event loop ─────────────┐
//! commands ─►│ toggle / cycle / resize / shutdown           │
//! capture  ─►│ on_acquired ─► CaptureSourceManager          │
//! frames   ─►│ step: absorb segments, render, publish       │─► ComposedStream ─► encoder
//!            └──────────────────────────────────────────────┘
//!                                │ stop
//!                                ▼
//!                         Exporter ─► SaveTrigger
//! ```

pub mod composer;
pub mod notify;
pub mod preferences;

pub use composer::*;
pub use notify::ConsoleNotifier;
pub use preferences::JsonFilePreferenceStore;

//! Convulse Scene Model
//!
//! Pure data and computation for placing the two visual sources on the
//! composed canvas:
//! - **Source:** Which source a layer comes from (webcam or desktop)
//! - **Layout:** Size fraction, 3x3 position index, and the placement rectangle
//! - **Settings:** The per-source layout pair the composer adjusts at runtime
//!
//! This crate has no I/O and no platform dependencies.

pub mod layout;
pub mod settings;
pub mod source;

pub use layout::*;
pub use settings::*;
pub use source::*;

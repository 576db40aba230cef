//! Convulse platform core contracts.
//!
//! The capabilities the composer depends on, kept free of any concrete
//! device, encoder, or desktop integration so every one of them can be
//! substituted:
//!
//! - [`CaptureDevice`]: `request(kind, wants_audio) -> CaptureStream`
//! - [`EncoderFactory`] / [`EncoderSink`]: bind to the composed stream and
//!   emit buffered data segments at a fixed interval
//! - [`SaveTrigger`]: persist a finished artifact for the user
//! - [`PreferenceStore`]: key/value store for layout preferences
//! - [`Notifier`]: transient user notifications and the recording marker

pub mod capture;
pub mod composed;
pub mod encoder;
pub mod frame;
pub mod notify;
pub mod storage;

pub use capture::*;
pub use composed::*;
pub use encoder::*;
pub use frame::*;
pub use notify::*;
pub use storage::*;

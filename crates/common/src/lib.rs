//! Convulse Common Utilities
//!
//! Shared infrastructure for all Convulse crates:
//! - Error types and result aliases
//! - Clock and rate utilities for the frame loop and recordings
//! - Tracing/logging initialization
//! - Configuration loading

pub mod clock;
pub mod config;
pub mod error;
pub mod logging;

pub use clock::*;
pub use config::*;
pub use error::*;

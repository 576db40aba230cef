//! Convulse Linux Platform Integration
//!
//! Platform-specific pieces for Linux:
//! - **XDG Desktop Portal:** Screen capture negotiation via DBus
//! - **Display Detection:** Wayland vs X11
//! - **Permissions:** Capability detection and user guidance

pub mod display;
pub mod permissions;
pub mod portal;

pub use display::*;

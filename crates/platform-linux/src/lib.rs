//! screenrec Linux Platform Integration
//!
//! Platform-specific implementations for Linux:
//! - **Display Detection:** RandR output and window-manager client enumeration
//! - **Permissions:** Capability detection and user guidance

pub mod display;
pub mod permissions;

pub use display::*;

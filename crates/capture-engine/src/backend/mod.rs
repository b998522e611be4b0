//! Platform capture backends.
//!
//! A backend knows how to enumerate capturable displays and windows on one
//! platform and how to turn a [`CaptureTarget`] into the engine source that
//! captures it. Exactly one real backend is compiled in per target.

use screenrec_platform_core::{CaptureTarget, DisplayInfo, DisplayServer, WindowInfo};

use crate::engine::{Engine, ObjectId, SourceSpec};
use crate::error::SessionError;

/// Engine name given to every capture source.
pub const CAPTURE_SOURCE_NAME: &str = "screenrec_capture";

/// Abstract interface for platform-specific capture capabilities.
pub trait CaptureBackend: Send + Sync {
    /// Display server / platform family this backend captures from.
    fn display_server(&self) -> DisplayServer;

    /// Snapshot of active displays. Empty when enumeration is unavailable.
    fn list_displays(&self) -> Vec<DisplayInfo>;

    /// Snapshot of named top-level windows. Empty when enumeration is
    /// unavailable.
    fn list_windows(&self) -> Vec<WindowInfo>;

    /// Pick the platform source kind and settings for `target`.
    fn resolve_source(&self, target: &CaptureTarget) -> Result<SourceSpec, SessionError>;

    /// Create the capture source for `target` on `engine`.
    fn create_source(
        &self,
        engine: &dyn Engine,
        target: &CaptureTarget,
    ) -> Result<ObjectId, SessionError> {
        let spec = self.resolve_source(target)?;
        tracing::debug!(kind = %spec.kind, settings = %spec.settings, "Creating capture source");
        engine
            .create_source(&spec)
            .map_err(|e| SessionError::source(e.to_string()))
    }
}

pub mod fake;
pub mod linux;
pub mod macos;
pub mod windows;

pub use fake::FakeBackend;
pub use linux::LinuxBackend;
pub use macos::MacOSBackend;
pub use windows::WindowsBackend;

/// Get the platform-specific backend.
pub fn get_backend() -> Box<dyn CaptureBackend> {
    #[cfg(target_os = "windows")]
    {
        Box::new(WindowsBackend::new())
    }
    #[cfg(target_os = "macos")]
    {
        Box::new(MacOSBackend::new())
    }
    #[cfg(not(any(target_os = "windows", target_os = "macos")))]
    {
        Box::new(LinuxBackend::new())
    }
}

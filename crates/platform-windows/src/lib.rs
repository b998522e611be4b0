//! Windows platform integration.
//!
//! Monitors come from `EnumDisplayMonitors`, windows from `EnumWindows`.
//! On other targets every query returns an empty listing so the crate can
//! stay a workspace member everywhere.

use screenrec_common::error::ScreenrecResult;
use screenrec_platform_core::{DisplayInfo, NativeId, WindowInfo};

#[cfg(target_os = "windows")]
mod win32;

/// A monitor attached to the desktop.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Monitor {
    /// `HMONITOR` value. Only valid until the display configuration changes.
    pub handle: isize,
    /// GDI device name, e.g. `\\.\DISPLAY1`.
    pub device: String,
    pub width: u32,
    pub height: u32,
    pub primary: bool,
}

/// Enumerate monitors with the primary monitor first.
///
/// The index of a monitor in the returned vector is its display id.
pub fn detect_monitors() -> ScreenrecResult<Vec<Monitor>> {
    #[cfg(target_os = "windows")]
    {
        let mut monitors = win32::enumerate_monitors()?;
        // Stable sort keeps GDI order among secondaries.
        monitors.sort_by_key(|m| !m.primary);
        Ok(monitors)
    }
    #[cfg(not(target_os = "windows"))]
    {
        Err(screenrec_common::error::ScreenrecError::unsupported(
            "Win32 monitor enumeration is only available on Windows",
        ))
    }
}

/// List active displays. Empty when enumeration fails.
pub fn list_displays() -> Vec<DisplayInfo> {
    match detect_monitors() {
        Ok(monitors) => monitors
            .into_iter()
            .enumerate()
            .map(|(idx, monitor)| DisplayInfo {
                id: NativeId::Numeric(idx as u64),
                name: Some(monitor.device),
                width: monitor.width,
                height: monitor.height,
            })
            .collect(),
        Err(e) => {
            tracing::debug!(error = %e, "Display enumeration unavailable");
            Vec::new()
        }
    }
}

/// List visible, titled, non-minimized top-level windows in Z order.
pub fn list_windows() -> Vec<WindowInfo> {
    #[cfg(target_os = "windows")]
    {
        match win32::enumerate_windows() {
            Ok(windows) => windows,
            Err(e) => {
                tracing::debug!(error = %e, "Window enumeration unavailable");
                Vec::new()
            }
        }
    }
    #[cfg(not(target_os = "windows"))]
    {
        Vec::new()
    }
}

/// Desktop duplication needs no user consent on Windows.
pub fn check_screen_permission() -> bool {
    true
}

pub fn request_screen_permission() -> bool {
    check_screen_permission()
}

//! macOS platform integration.
//!
//! Displays are identified by their CoreGraphics UUID string, which survives
//! reconnection, rather than by the volatile `CGDirectDisplayID`.

use screenrec_common::error::ScreenrecResult;
use screenrec_platform_core::{DisplayInfo, NativeId, WindowInfo};

#[cfg(target_os = "macos")]
mod quartz;

/// An active CoreGraphics display.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Display {
    /// `CGDirectDisplayID`.
    pub cg_id: u32,
    /// Position in the active display list, as used by `avfvideosrc`.
    pub index: usize,
    pub uuid: Option<String>,
    pub width: u32,
    pub height: u32,
    pub main: bool,
}

impl Display {
    /// The identifier handed out to callers.
    pub fn native_id(&self) -> NativeId {
        match &self.uuid {
            Some(uuid) => NativeId::Opaque(uuid.clone()),
            None => NativeId::Numeric(self.cg_id as u64),
        }
    }

    /// Whether `id` addresses this display. Numeric `0` means the main display.
    pub fn matches(&self, id: &NativeId) -> bool {
        match id {
            NativeId::Opaque(uuid) => self
                .uuid
                .as_deref()
                .is_some_and(|own| own.eq_ignore_ascii_case(uuid)),
            NativeId::Numeric(0) => self.main,
            NativeId::Numeric(n) => self.cg_id as u64 == *n,
        }
    }
}

/// Enumerate active displays.
pub fn detect_displays() -> ScreenrecResult<Vec<Display>> {
    #[cfg(target_os = "macos")]
    {
        quartz::active_displays()
    }
    #[cfg(not(target_os = "macos"))]
    {
        Err(screenrec_common::error::ScreenrecError::unsupported(
            "CoreGraphics display enumeration is only available on macOS",
        ))
    }
}

/// List active displays. Empty when enumeration fails.
pub fn list_displays() -> Vec<DisplayInfo> {
    match detect_displays() {
        Ok(displays) => displays
            .iter()
            .map(|display| DisplayInfo {
                id: display.native_id(),
                name: Some(if display.main {
                    "Main Display".to_string()
                } else {
                    format!("Display {}", display.index + 1)
                }),
                width: display.width,
                height: display.height,
            })
            .collect(),
        Err(e) => {
            tracing::debug!(error = %e, "Display enumeration unavailable");
            Vec::new()
        }
    }
}

/// List on-screen, named, normal-layer windows front to back.
///
/// Window titles are only visible to processes holding screen recording
/// access; without it every window is unnamed and the list is empty.
pub fn list_windows() -> Vec<WindowInfo> {
    #[cfg(target_os = "macos")]
    {
        quartz::on_screen_windows()
    }
    #[cfg(not(target_os = "macos"))]
    {
        Vec::new()
    }
}

/// Whether screen recording access has been granted. Never prompts.
pub fn check_screen_permission() -> bool {
    #[cfg(target_os = "macos")]
    {
        quartz::preflight_screen_capture()
    }
    #[cfg(not(target_os = "macos"))]
    {
        false
    }
}

/// Ask for screen recording access, showing the system prompt at most once
/// per process. Returns the resulting authorization.
pub fn request_screen_permission() -> bool {
    #[cfg(target_os = "macos")]
    {
        quartz::request_screen_capture()
    }
    #[cfg(not(target_os = "macos"))]
    {
        false
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn display(cg_id: u32, main: bool) -> Display {
        Display {
            cg_id,
            index: 0,
            uuid: Some("37D8832A-2D66-02CA-B9F7-8F30A301B230".to_string()),
            width: 2880,
            height: 1800,
            main,
        }
    }

    #[test]
    fn zero_addresses_the_main_display() {
        assert!(display(69732928, true).matches(&NativeId::Numeric(0)));
        assert!(!display(69732928, false).matches(&NativeId::Numeric(0)));
    }

    #[test]
    fn uuid_match_is_case_insensitive() {
        let d = display(1, false);
        assert!(d.matches(&NativeId::Opaque(
            "37d8832a-2d66-02ca-b9f7-8f30a301b230".to_string()
        )));
        assert_eq!(
            d.native_id(),
            NativeId::Opaque("37D8832A-2D66-02CA-B9F7-8F30A301B230".to_string())
        );
    }
}

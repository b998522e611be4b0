use screenrec_platform_core::{CaptureTarget, DisplayInfo, DisplayServer, NativeId, WindowInfo};
use screenrec_platform_macos as platform_macos;
use screenrec_platform_macos::Display;
use serde_json::json;

use crate::backend::{CaptureBackend, CAPTURE_SOURCE_NAME};
use crate::engine::{SourceKind, SourceSpec};
use crate::error::SessionError;

/// CoreGraphics display capture addressed by display UUID. Windows are
/// listed but not capturable.
pub struct MacOSBackend;

impl MacOSBackend {
    pub fn new() -> Self {
        Self
    }
}

impl Default for MacOSBackend {
    fn default() -> Self {
        Self::new()
    }
}

impl CaptureBackend for MacOSBackend {
    fn display_server(&self) -> DisplayServer {
        DisplayServer::MacOS
    }

    fn list_displays(&self) -> Vec<DisplayInfo> {
        platform_macos::list_displays()
    }

    fn list_windows(&self) -> Vec<WindowInfo> {
        platform_macos::list_windows()
    }

    fn resolve_source(&self, target: &CaptureTarget) -> Result<SourceSpec, SessionError> {
        match target {
            CaptureTarget::Display(id) => {
                let displays = platform_macos::detect_displays()
                    .map_err(|e| SessionError::source(e.to_string()))?;
                resolve_display(id, &displays)
            }
            CaptureTarget::Window(id) => resolve_window(id),
        }
    }
}

/// `avfvideosrc` captures whole screens only; window targets are refused
/// before any engine object exists.
fn resolve_window(id: &NativeId) -> Result<SourceSpec, SessionError> {
    Err(SessionError::source(format!(
        "window capture is not supported on macOS (window {id}); record a display instead"
    )))
}

fn resolve_display(id: &NativeId, displays: &[Display]) -> Result<SourceSpec, SessionError> {
    let display = displays
        .iter()
        .find(|d| d.matches(id))
        .ok_or_else(|| SessionError::source(format!("display {id} not found")))?;

    Ok(SourceSpec {
        name: CAPTURE_SOURCE_NAME.to_string(),
        kind: SourceKind::DisplayCapture,
        settings: json!({
            "display_uuid": display.uuid,
            "display_id": display.cg_id,
            "device_index": display.index,
        }),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn displays() -> Vec<Display> {
        vec![
            Display {
                cg_id: 1,
                index: 0,
                uuid: Some("37D8832A-2D66-02CA-B9F7-8F30A301B230".into()),
                width: 2880,
                height: 1800,
                main: true,
            },
            Display {
                cg_id: 2,
                index: 1,
                uuid: Some("9C5A1E21-0000-4000-8000-1A2B3C4D5E6F".into()),
                width: 1920,
                height: 1080,
                main: false,
            },
        ]
    }

    #[test]
    fn uuid_selects_display() {
        let spec = resolve_display(
            &NativeId::Opaque("9c5a1e21-0000-4000-8000-1a2b3c4d5e6f".into()),
            &displays(),
        )
        .unwrap();
        assert_eq!(spec.kind, SourceKind::DisplayCapture);
        assert_eq!(spec.setting_u64("device_index"), Some(1));
    }

    #[test]
    fn window_targets_are_refused() {
        let err = MacOSBackend::new()
            .resolve_source(&CaptureTarget::Window(NativeId::Numeric(812)))
            .unwrap_err();
        assert_eq!(err.kind(), crate::error::SessionErrorKind::SourceCreateFailed);
        assert!(err.to_string().contains("not supported on macOS"));
    }

    #[test]
    fn zero_selects_main_display() {
        let spec = resolve_display(&NativeId::Numeric(0), &displays()).unwrap();
        assert_eq!(
            spec.setting_str("display_uuid"),
            Some("37D8832A-2D66-02CA-B9F7-8F30A301B230")
        );
    }

    #[test]
    fn unknown_uuid_fails() {
        assert!(resolve_display(&NativeId::Opaque("nope".into()), &displays()).is_err());
    }
}

use screenrec_platform_core::{CaptureTarget, DisplayInfo, DisplayServer, NativeId, WindowInfo};
use screenrec_platform_linux::{
    detect_display_server, detect_outputs, list_displays, list_windows, x11_available,
    RandrOutput,
};
use serde_json::json;

use crate::backend::{CaptureBackend, CAPTURE_SOURCE_NAME};
use crate::engine::{SourceKind, SourceSpec};
use crate::error::SessionError;

/// X11 capture through shared-memory screen grabs and composited windows.
pub struct LinuxBackend {
    display_server: DisplayServer,
    x11_available: bool,
}

impl LinuxBackend {
    pub fn new() -> Self {
        let backend = Self::with_session(detect_display_server(), x11_available());
        tracing::info!(
            display_server = ?backend.display_server,
            x11_available = backend.x11_available,
            "Detected display server on Linux backend"
        );
        if backend.display_server == DisplayServer::Wayland && backend.x11_available {
            tracing::warn!("Wayland session detected; capturing through XWayland");
        }
        backend
    }

    /// A backend for an explicit session; `x11_available` follows the same
    /// rule as the screen permission check.
    pub fn with_session(display_server: DisplayServer, x11_available: bool) -> Self {
        Self {
            display_server,
            x11_available,
        }
    }
}

impl Default for LinuxBackend {
    fn default() -> Self {
        Self::new()
    }
}

impl CaptureBackend for LinuxBackend {
    fn display_server(&self) -> DisplayServer {
        self.display_server
    }

    fn list_displays(&self) -> Vec<DisplayInfo> {
        list_displays()
    }

    fn list_windows(&self) -> Vec<WindowInfo> {
        list_windows()
    }

    fn resolve_source(&self, target: &CaptureTarget) -> Result<SourceSpec, SessionError> {
        if !self.x11_available {
            return Err(SessionError::source(
                "no X display available (DISPLAY is not set)",
            ));
        }

        match target {
            CaptureTarget::Display(id) => {
                let outputs = detect_outputs().unwrap_or_else(|e| {
                    tracing::warn!(error = %e, "RandR query failed; falling back to full screen");
                    Vec::new()
                });
                resolve_display(id, &outputs)
            }
            CaptureTarget::Window(id) => resolve_window(id, &list_windows()),
        }
    }
}

/// An xshm source for output `id`, cropped to that output's region.
///
/// Display 0 with no RandR information captures the whole X screen.
fn resolve_display(id: &NativeId, outputs: &[RandrOutput]) -> Result<SourceSpec, SessionError> {
    let index = id
        .as_u64()
        .ok_or_else(|| SessionError::source(format!("X11 display ids are numeric, got '{id}'")))?;

    let settings = match usize::try_from(index).ok().and_then(|i| outputs.get(i)) {
        Some(output) => json!({
            "screen": 0,
            "output": output.name,
            "x": output.x,
            "y": output.y,
            "width": output.width,
            "height": output.height,
        }),
        None if index == 0 && outputs.is_empty() => json!({ "screen": 0 }),
        None => {
            return Err(SessionError::source(format!(
                "display {index} not found. Available displays: {}",
                output_list_for_error(outputs)
            )))
        }
    };

    Ok(SourceSpec {
        name: CAPTURE_SOURCE_NAME.to_string(),
        kind: SourceKind::XshmInput,
        settings,
    })
}

/// A composite source for window `id`.
///
/// When the window manager lists windows, the id must be among them; an
/// empty listing means no EWMH manager answered and the id is trusted.
fn resolve_window(id: &NativeId, windows: &[WindowInfo]) -> Result<SourceSpec, SessionError> {
    let xid = id
        .as_u64()
        .ok_or_else(|| SessionError::source(format!("X11 window ids are numeric, got '{id}'")))?;

    if !windows.is_empty() && !windows.iter().any(|w| w.id == *id) {
        return Err(SessionError::source(format!("window {id} not found")));
    }

    Ok(SourceSpec {
        name: CAPTURE_SOURCE_NAME.to_string(),
        kind: SourceKind::XcompositeInput,
        settings: json!({ "window": xid }),
    })
}

fn output_list_for_error(outputs: &[RandrOutput]) -> String {
    if outputs.is_empty() {
        return "none".to_string();
    }
    outputs
        .iter()
        .enumerate()
        .map(|(idx, output)| {
            format!(
                "{idx}:{}({}x{}@{},{}{})",
                output.name,
                output.width,
                output.height,
                output.x,
                output.y,
                if output.primary { ",primary" } else { "" }
            )
        })
        .collect::<Vec<_>>()
        .join(", ")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn outputs() -> Vec<RandrOutput> {
        vec![
            RandrOutput {
                name: "eDP-1".into(),
                width: 1920,
                height: 1080,
                x: 0,
                y: 0,
                primary: true,
            },
            RandrOutput {
                name: "HDMI-1".into(),
                width: 2560,
                height: 1440,
                x: 1920,
                y: 0,
                primary: false,
            },
        ]
    }

    #[test]
    fn display_index_selects_output_region() {
        let spec = resolve_display(&NativeId::Numeric(1), &outputs()).unwrap();
        assert_eq!(spec.kind, SourceKind::XshmInput);
        assert_eq!(spec.setting_i64("x"), Some(1920));
        assert_eq!(spec.setting_u64("width"), Some(2560));
        assert_eq!(spec.setting_str("output"), Some("HDMI-1"));
    }

    #[test]
    fn primary_display_without_randr_captures_whole_screen() {
        let spec = resolve_display(&NativeId::Numeric(0), &[]).unwrap();
        assert_eq!(spec.settings, json!({ "screen": 0 }));
    }

    #[test]
    fn unknown_display_lists_alternatives() {
        let err = resolve_display(&NativeId::Numeric(5), &outputs()).unwrap_err();
        let msg = err.to_string();
        assert!(msg.contains("display 5 not found"));
        assert!(msg.contains("0:eDP-1(1920x1080@0,0,primary)"));
    }

    #[test]
    fn opaque_ids_are_rejected() {
        let err = resolve_display(&NativeId::Opaque("abc".into()), &outputs()).unwrap_err();
        assert!(err.to_string().contains("numeric"));
    }

    #[test]
    fn xwayland_session_resolves_sources() {
        let backend = LinuxBackend::with_session(DisplayServer::Wayland, true);
        let spec = backend
            .resolve_source(&CaptureTarget::primary_display())
            .expect("XWayland display resolves");
        assert_eq!(spec.kind, SourceKind::XshmInput);
    }

    #[test]
    fn wayland_without_x_server_is_rejected() {
        let backend = LinuxBackend::with_session(DisplayServer::Wayland, false);
        let err = backend
            .resolve_source(&CaptureTarget::primary_display())
            .unwrap_err();
        assert!(err.to_string().contains("DISPLAY is not set"));
    }

    #[test]
    fn window_must_be_listed_when_listing_available() {
        let windows = vec![WindowInfo {
            id: NativeId::Numeric(0x3a0000b),
            name: Some("Terminal".into()),
            width: 800,
            height: 600,
            owner: None,
        }];
        let spec = resolve_window(&NativeId::Numeric(0x3a0000b), &windows).unwrap();
        assert_eq!(spec.kind, SourceKind::XcompositeInput);
        assert_eq!(spec.setting_u64("window"), Some(0x3a0000b));

        assert!(resolve_window(&NativeId::Numeric(7), &windows).is_err());
        assert!(resolve_window(&NativeId::Numeric(7), &[]).is_ok());
    }
}

use screenrec_platform_core::{CaptureTarget, DisplayInfo, DisplayServer, NativeId, WindowInfo};
use screenrec_platform_windows as platform_windows;
use screenrec_platform_windows::Monitor;
use serde_json::json;

use crate::backend::{CaptureBackend, CAPTURE_SOURCE_NAME};
use crate::engine::{SourceKind, SourceSpec};
use crate::error::SessionError;

/// Desktop duplication per monitor, Windows Graphics Capture per window.
pub struct WindowsBackend;

impl WindowsBackend {
    pub fn new() -> Self {
        Self
    }
}

impl Default for WindowsBackend {
    fn default() -> Self {
        Self::new()
    }
}

impl CaptureBackend for WindowsBackend {
    fn display_server(&self) -> DisplayServer {
        DisplayServer::Windows
    }

    fn list_displays(&self) -> Vec<DisplayInfo> {
        platform_windows::list_displays()
    }

    fn list_windows(&self) -> Vec<WindowInfo> {
        platform_windows::list_windows()
    }

    fn resolve_source(&self, target: &CaptureTarget) -> Result<SourceSpec, SessionError> {
        match target {
            CaptureTarget::Display(id) => {
                let monitors = platform_windows::detect_monitors()
                    .map_err(|e| SessionError::source(e.to_string()))?;
                resolve_monitor(id, &monitors)
            }
            CaptureTarget::Window(id) => {
                let hwnd = id.as_u64().ok_or_else(|| {
                    SessionError::source(format!("window handles are numeric, got '{id}'"))
                })?;
                Ok(SourceSpec {
                    name: CAPTURE_SOURCE_NAME.to_string(),
                    kind: SourceKind::WindowCapture,
                    settings: json!({ "window": hwnd }),
                })
            }
        }
    }
}

/// Monitor `id` is an index into the primary-first monitor list.
fn resolve_monitor(id: &NativeId, monitors: &[Monitor]) -> Result<SourceSpec, SessionError> {
    let index = id
        .as_u64()
        .ok_or_else(|| SessionError::source(format!("monitor ids are numeric, got '{id}'")))?;
    let monitor = usize::try_from(index)
        .ok()
        .and_then(|i| monitors.get(i))
        .ok_or_else(|| {
            SessionError::source(format!(
                "monitor {index} not found ({} attached)",
                monitors.len()
            ))
        })?;

    Ok(SourceSpec {
        name: CAPTURE_SOURCE_NAME.to_string(),
        kind: SourceKind::MonitorCapture,
        settings: json!({
            "monitor_index": index,
            "monitor_handle": monitor.handle as i64,
            "device": monitor.device,
        }),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn monitor_index_maps_to_handle() {
        let monitors = vec![
            Monitor {
                handle: 65537,
                device: r"\\.\DISPLAY1".into(),
                width: 1920,
                height: 1080,
                primary: true,
            },
            Monitor {
                handle: 65539,
                device: r"\\.\DISPLAY2".into(),
                width: 1280,
                height: 1024,
                primary: false,
            },
        ];
        let spec = resolve_monitor(&NativeId::Numeric(1), &monitors).unwrap();
        assert_eq!(spec.kind, SourceKind::MonitorCapture);
        assert_eq!(spec.setting_i64("monitor_handle"), Some(65539));
        assert!(resolve_monitor(&NativeId::Numeric(2), &monitors).is_err());
    }
}

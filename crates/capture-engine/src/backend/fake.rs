use screenrec_platform_core::{CaptureTarget, DisplayInfo, DisplayServer, NativeId, WindowInfo};
use serde_json::json;

use crate::backend::{CaptureBackend, CAPTURE_SOURCE_NAME};
use crate::engine::{SourceKind, SourceSpec};
use crate::error::SessionError;

/// Backend over a fixed display and window list.
///
/// Displays resolve to xshm sources and windows to composite sources; ids
/// not in the lists fail with `SourceCreateFailed`.
#[derive(Debug, Clone, Default)]
pub struct FakeBackend {
    displays: Vec<DisplayInfo>,
    windows: Vec<WindowInfo>,
}

impl FakeBackend {
    /// No displays, no windows.
    pub fn headless() -> Self {
        Self::default()
    }

    /// One 1920x1080 display with id 0 and one window with id 42.
    pub fn single_display() -> Self {
        Self::default()
            .with_display(DisplayInfo {
                id: NativeId::Numeric(0),
                name: Some("Fake Display".to_string()),
                width: 1920,
                height: 1080,
            })
            .with_window(WindowInfo {
                id: NativeId::Numeric(42),
                name: Some("Fake Window".to_string()),
                width: 800,
                height: 600,
                owner: Some("fake".to_string()),
            })
    }

    pub fn with_display(mut self, display: DisplayInfo) -> Self {
        self.displays.push(display);
        self
    }

    pub fn with_window(mut self, window: WindowInfo) -> Self {
        self.windows.push(window);
        self
    }
}

impl CaptureBackend for FakeBackend {
    fn display_server(&self) -> DisplayServer {
        DisplayServer::Unknown
    }

    fn list_displays(&self) -> Vec<DisplayInfo> {
        self.displays.clone()
    }

    fn list_windows(&self) -> Vec<WindowInfo> {
        self.windows.clone()
    }

    fn resolve_source(&self, target: &CaptureTarget) -> Result<SourceSpec, SessionError> {
        let (kind, settings) = match target {
            CaptureTarget::Display(id) => {
                let display = self
                    .displays
                    .iter()
                    .find(|d| d.id == *id)
                    .ok_or_else(|| SessionError::source(format!("display {id} not found")))?;
                (
                    SourceKind::XshmInput,
                    json!({
                        "display": id,
                        "width": display.width,
                        "height": display.height,
                    }),
                )
            }
            CaptureTarget::Window(id) => {
                if !self.windows.iter().any(|w| w.id == *id) {
                    return Err(SessionError::source(format!("window {id} not found")));
                }
                (SourceKind::XcompositeInput, json!({ "window": id }))
            }
        };

        Ok(SourceSpec {
            name: CAPTURE_SOURCE_NAME.to_string(),
            kind,
            settings,
        })
    }
}

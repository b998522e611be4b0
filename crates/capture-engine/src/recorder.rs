//! Process-level recording facade.
//!
//! [`Recorder`] bundles the capability gate, engine lifecycle, capture backend
//! and session controller behind the handful of operations a binding or CLI
//! needs.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use screenrec_common::config::{AppConfig, RecordingDefaults};
use screenrec_platform_core::{CaptureTarget, DisplayInfo, NativeId, WindowInfo};
use serde::{Deserialize, Serialize};

use crate::backend::{get_backend, CaptureBackend};
use crate::engine::{Engine, GstEngine};
use crate::error::SessionError;
use crate::lifecycle::EngineLifecycle;
use crate::permission::{PermissionGate, SystemPermissions};
use crate::pipeline::PipelineBuilder;
use crate::session::{SessionConfig, SessionController, SessionState};

/// Caller-facing recording options. Omitted fields take the configured
/// defaults.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct RecordOptions {
    pub width: Option<u32>,
    pub height: Option<u32>,
    pub fps: Option<u32>,
    /// Numeric handle or opaque identifier, depending on the platform.
    pub display_id: Option<NativeId>,
    /// Selects window capture. Takes precedence over `display_id`.
    pub window_id: Option<NativeId>,
}

impl RecordOptions {
    /// The session configuration these options describe.
    pub fn resolve(&self, output_path: &Path, defaults: &RecordingDefaults) -> SessionConfig {
        let target = match (&self.window_id, &self.display_id) {
            (Some(window), _) => CaptureTarget::Window(window.clone()),
            (None, Some(display)) => CaptureTarget::Display(display.clone()),
            (None, None) => CaptureTarget::primary_display(),
        };
        SessionConfig {
            output_path: output_path.to_path_buf(),
            width: self.width.unwrap_or(defaults.width),
            height: self.height.unwrap_or(defaults.height),
            fps: self.fps.unwrap_or(defaults.fps),
            target,
        }
    }
}

/// Snapshot of the recorder.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RecorderStatus {
    pub engine_initialized: bool,
    pub recording: bool,
    pub output_path: Option<PathBuf>,
    pub elapsed_secs: Option<f64>,
}

pub struct Recorder {
    lifecycle: EngineLifecycle,
    session: SessionController,
    backend: Arc<dyn CaptureBackend>,
    permissions: Box<dyn PermissionGate>,
    defaults: RecordingDefaults,
}

impl Recorder {
    pub fn new(
        engine: Arc<dyn Engine>,
        backend: Arc<dyn CaptureBackend>,
        permissions: Box<dyn PermissionGate>,
        config: &AppConfig,
    ) -> Self {
        let builder = PipelineBuilder::new(
            Arc::clone(&engine),
            Arc::clone(&backend),
            config.encoding.clone(),
        );
        Self {
            lifecycle: EngineLifecycle::new(engine),
            session: SessionController::new(builder),
            backend,
            permissions,
            defaults: config.recording.clone(),
        }
    }

    /// GStreamer engine, this platform's backend and permission service.
    pub fn with_system_defaults(config: &AppConfig) -> Self {
        Self::new(
            Arc::new(GstEngine::new()),
            Arc::from(get_backend()),
            Box::new(SystemPermissions),
            config,
        )
    }

    pub fn engine_version(&self) -> String {
        self.lifecycle
            .engine()
            .version()
            .unwrap_or_else(|| "unknown".to_string())
    }

    pub fn check_permission(&self) -> bool {
        self.permissions.check()
    }

    pub fn request_permission(&self) -> bool {
        self.permissions.request()
    }

    pub fn engine_init(&mut self) -> Result<(), SessionError> {
        self.lifecycle.init().map_err(|e| {
            tracing::error!(error = %e, "Engine initialization failed");
            SessionError::engine_startup(e)
        })
    }

    /// Stop any recording, then shut the engine down.
    pub fn engine_shutdown(&mut self) {
        self.session.stop();
        self.lifecycle.shutdown();
    }

    pub fn start_recording(
        &mut self,
        output_path: impl AsRef<Path>,
        options: &RecordOptions,
    ) -> Result<(), SessionError> {
        if !self.lifecycle.is_initialized() {
            return Err(SessionError::NotInitialized);
        }
        if self.session.is_recording() {
            return Ok(());
        }
        let config = options.resolve(output_path.as_ref(), &self.defaults);
        config.validate()?;
        if self.defaults.require_permission && !self.permissions.check() {
            tracing::warn!("Screen recording permission not granted");
            return Err(SessionError::PermissionDenied);
        }
        self.session.start(&self.lifecycle, &config)
    }

    pub fn stop_recording(&mut self) {
        self.session.stop();
    }

    pub fn list_displays(&self) -> Vec<DisplayInfo> {
        self.backend.list_displays()
    }

    pub fn list_windows(&self) -> Vec<WindowInfo> {
        self.backend.list_windows()
    }

    pub fn state(&self) -> SessionState {
        self.session.state()
    }

    pub fn status(&self) -> RecorderStatus {
        RecorderStatus {
            engine_initialized: self.lifecycle.is_initialized(),
            recording: self.session.is_recording(),
            output_path: self
                .session
                .active_config()
                .map(|config| config.output_path.clone()),
            elapsed_secs: self.session.elapsed_secs(),
        }
    }
}

impl Drop for Recorder {
    fn drop(&mut self) {
        self.engine_shutdown();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn options_parse_numeric_or_string_display_ids() {
        let numeric: RecordOptions =
            serde_json::from_str(r#"{"width":640,"displayId":2}"#).unwrap();
        assert_eq!(numeric.width, Some(640));
        assert_eq!(numeric.display_id, Some(NativeId::Numeric(2)));

        let uuid: RecordOptions =
            serde_json::from_str(r#"{"displayId":"37D8832A-2D66-02CA-B9F7-8F30A301B230"}"#)
                .unwrap();
        assert_eq!(
            uuid.display_id,
            Some(NativeId::Opaque(
                "37D8832A-2D66-02CA-B9F7-8F30A301B230".to_string()
            ))
        );
    }

    #[test]
    fn window_id_takes_precedence() {
        let options = RecordOptions {
            display_id: Some(NativeId::Numeric(1)),
            window_id: Some(NativeId::Numeric(42)),
            ..RecordOptions::default()
        };
        let config = options.resolve(Path::new("/tmp/out.mp4"), &RecordingDefaults::default());
        assert_eq!(config.target, CaptureTarget::Window(NativeId::Numeric(42)));
    }

    #[test]
    fn omitted_options_use_defaults() {
        let config =
            RecordOptions::default().resolve(Path::new("/tmp/out.mp4"), &RecordingDefaults::default());
        assert_eq!((config.width, config.height, config.fps), (1280, 720, 30));
        assert_eq!(config.target, CaptureTarget::primary_display());
    }
}

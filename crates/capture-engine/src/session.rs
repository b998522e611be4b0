//! Recording session management.

use std::path::PathBuf;

use screenrec_common::clock::RecordingClock;
use screenrec_platform_core::CaptureTarget;

use crate::error::SessionError;
use crate::lifecycle::EngineLifecycle;
use crate::pipeline::{PipelineBuilder, PipelineObjects};

/// Configuration for starting a new recording session.
#[derive(Debug, Clone, PartialEq)]
pub struct SessionConfig {
    /// Media file to write. The container follows the extension.
    pub output_path: PathBuf,

    /// Output resolution in pixels.
    pub width: u32,
    pub height: u32,

    /// Target frames per second.
    pub fps: u32,

    /// What to capture.
    pub target: CaptureTarget,
}

impl SessionConfig {
    pub fn new(output_path: impl Into<PathBuf>) -> Self {
        Self {
            output_path: output_path.into(),
            ..Self::default()
        }
    }

    /// Reject configurations no engine could honor.
    pub fn validate(&self) -> Result<(), SessionError> {
        if self.output_path.as_os_str().is_empty() {
            return Err(SessionError::invalid_config("output path is empty"));
        }
        if self.width == 0 || self.height == 0 {
            return Err(SessionError::invalid_config(format!(
                "resolution must be positive, got {}x{}",
                self.width, self.height
            )));
        }
        if self.fps == 0 {
            return Err(SessionError::invalid_config("fps must be positive"));
        }
        Ok(())
    }
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            output_path: PathBuf::new(),
            width: 1280,
            height: 720,
            fps: 30,
            target: CaptureTarget::primary_display(),
        }
    }
}

/// State of a recording session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    /// No recording in progress.
    Idle,
    /// Output running.
    Recording,
}

struct ActiveSession {
    objects: PipelineObjects,
    config: SessionConfig,
    clock: RecordingClock,
}

/// Owns at most one running recording and its engine objects.
///
/// Not internally synchronized; callers serialize `start` and `stop`.
pub struct SessionController {
    builder: PipelineBuilder,
    active: Option<ActiveSession>,
}

impl SessionController {
    pub fn new(builder: PipelineBuilder) -> Self {
        Self {
            builder,
            active: None,
        }
    }

    /// Current session state.
    pub fn state(&self) -> SessionState {
        if self.active.is_some() {
            SessionState::Recording
        } else {
            SessionState::Idle
        }
    }

    pub fn is_recording(&self) -> bool {
        self.active.is_some()
    }

    /// Configuration of the running recording.
    pub fn active_config(&self) -> Option<&SessionConfig> {
        self.active.as_ref().map(|session| &session.config)
    }

    /// Seconds since the running recording started.
    pub fn elapsed_secs(&self) -> Option<f64> {
        self.active
            .as_ref()
            .map(|session| session.clock.elapsed_secs())
    }

    /// Start recording.
    ///
    /// Starting while already recording is a successful no-op. On failure the
    /// session stays idle and no engine object survives the call.
    pub fn start(
        &mut self,
        lifecycle: &EngineLifecycle,
        config: &SessionConfig,
    ) -> Result<(), SessionError> {
        if !lifecycle.is_initialized() {
            return Err(SessionError::NotInitialized);
        }
        if let Some(active) = &self.active {
            tracing::debug!(
                path = %active.config.output_path.display(),
                "Already recording; start ignored"
            );
            return Ok(());
        }
        config.validate()?;

        tracing::info!(
            path = %config.output_path.display(),
            width = config.width,
            height = config.height,
            fps = config.fps,
            capture = ?config.target,
            "Starting recording"
        );

        let mut objects = self.builder.build(config).map_err(|e| {
            tracing::warn!(error = %e, "Pipeline construction failed; rolled back");
            e
        })?;
        // On failure `objects` is dropped here, releasing everything steps
        // 4 through 8 created.
        if let Err(e) = objects.start() {
            tracing::warn!(error = %e, "Output start failed; releasing pipeline");
            return Err(e);
        }

        let clock = RecordingClock::start();
        tracing::info!(started_at = clock.epoch_wall(), "Recording started");
        self.active = Some(ActiveSession {
            objects,
            config: config.clone(),
            clock,
        });
        Ok(())
    }

    /// Stop recording and release every engine object.
    ///
    /// Stop errors are logged and swallowed; release always runs. A no-op
    /// while idle.
    pub fn stop(&mut self) {
        let Some(mut active) = self.active.take() else {
            return;
        };

        tracing::info!(path = %active.config.output_path.display(), "Stopping recording");
        if let Err(e) = active.objects.stop() {
            tracing::warn!(error = %e, "Output stop failed; releasing anyway");
        }
        active.objects.release();

        tracing::info!(
            duration_secs = active.clock.elapsed_secs(),
            "Recording stopped"
        );
    }
}

impl Drop for SessionController {
    fn drop(&mut self) {
        self.stop();
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use screenrec_common::config::EncodingDefaults;
    use screenrec_platform_core::NativeId;

    use super::*;
    use crate::backend::FakeBackend;
    use crate::engine::{FailPoint, FakeEngine};

    fn setup() -> (Arc<FakeEngine>, EngineLifecycle, SessionController) {
        let engine = Arc::new(FakeEngine::new());
        let lifecycle = EngineLifecycle::new(engine.clone());
        let controller = SessionController::new(PipelineBuilder::new(
            engine.clone(),
            Arc::new(FakeBackend::single_display()),
            EncodingDefaults::default(),
        ));
        (engine, lifecycle, controller)
    }

    #[test]
    fn validate_rejects_empty_path_and_zero_sizes() {
        assert!(matches!(
            SessionConfig::default().validate(),
            Err(SessionError::InvalidConfig { .. })
        ));
        let zero_width = SessionConfig {
            width: 0,
            ..SessionConfig::new("/tmp/out.mp4")
        };
        assert!(zero_width.validate().is_err());
        let zero_fps = SessionConfig {
            fps: 0,
            ..SessionConfig::new("/tmp/out.mp4")
        };
        assert!(zero_fps.validate().is_err());
        assert!(SessionConfig::new("/tmp/out.mp4").validate().is_ok());
    }

    #[test]
    fn start_requires_initialized_engine() {
        let (engine, lifecycle, mut controller) = setup();
        let err = controller
            .start(&lifecycle, &SessionConfig::new("/tmp/never.mp4"))
            .unwrap_err();
        assert_eq!(err, SessionError::NotInitialized);
        assert!(engine.calls().is_empty());
    }

    #[test]
    fn second_start_is_a_no_op() {
        let (engine, mut lifecycle, mut controller) = setup();
        lifecycle.init().unwrap();
        let dir = tempfile::tempdir().unwrap();
        let first = SessionConfig::new(dir.path().join("a.mp4"));
        let second = SessionConfig::new(dir.path().join("b.mp4"));

        controller.start(&lifecycle, &first).unwrap();
        let live = engine.live_objects();
        controller.start(&lifecycle, &second).unwrap();

        assert_eq!(engine.live_objects(), live);
        assert_eq!(controller.active_config(), Some(&first));
        assert!(!second.output_path.exists());
    }

    #[test]
    fn stop_swallows_output_stop_failure() {
        let (engine, mut lifecycle, mut controller) = setup();
        lifecycle.init().unwrap();
        let dir = tempfile::tempdir().unwrap();
        controller
            .start(&lifecycle, &SessionConfig::new(dir.path().join("a.mp4")))
            .unwrap();

        engine.inject_failure(FailPoint::OutputStop);
        controller.stop();

        assert_eq!(controller.state(), SessionState::Idle);
        assert_eq!(engine.live_objects(), 0);
        assert_eq!(engine.running_outputs(), 0);
    }

    #[test]
    fn unknown_window_fails_at_source_step() {
        let (engine, mut lifecycle, mut controller) = setup();
        lifecycle.init().unwrap();
        let dir = tempfile::tempdir().unwrap();
        let config = SessionConfig {
            target: CaptureTarget::Window(NativeId::Numeric(7)),
            ..SessionConfig::new(dir.path().join("a.mp4"))
        };

        let err = controller.start(&lifecycle, &config).unwrap_err();
        assert!(matches!(err, SessionError::SourceCreateFailed { .. }));
        assert_eq!(controller.state(), SessionState::Idle);
        assert_eq!(engine.live_objects(), 0);
    }
}

//! Per-session engine object graph.
//!
//! Every engine object a session owns is wrapped in an [`EngineObject`]
//! guard that releases it on drop. [`PipelineBuilder::build`] fills a
//! [`PipelineObjects`] one step at a time and returns early with `?` on the
//! first failure; the partially filled value is dropped on that path, which
//! releases everything created so far in reverse order.

use std::fmt;
use std::sync::Arc;

use screenrec_common::config::EncodingDefaults;

use crate::backend::CaptureBackend;
use crate::engine::{
    AudioEncoderSpec, AudioSettings, Colorspace, Engine, EngineResult, ObjectId, OutputSpec,
    PixelFormat, RateControl, VideoEncoderSpec, VideoSettings,
};
use crate::error::SessionError;
use crate::session::SessionConfig;

const SCENE_NAME: &str = "screenrec_scene";
const VIDEO_ENCODER_NAME: &str = "screenrec_video";
const AUDIO_ENCODER_NAME: &str = "screenrec_audio";
const OUTPUT_NAME: &str = "screenrec_output";

/// Render channel the scene is assigned to.
pub const OUTPUT_CHANNEL: u32 = 0;
/// Audio mixer track shared by the encoder and the output.
pub const MIXER_TRACK: u32 = 0;
/// Seconds between keyframes.
pub const KEYFRAME_INTERVAL_SECS: u32 = 2;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ObjectRole {
    CaptureSource,
    Scene,
    VideoEncoder,
    AudioEncoder,
    FileOutput,
}

impl fmt::Display for ObjectRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ObjectRole::CaptureSource => "capture_source",
            ObjectRole::Scene => "scene",
            ObjectRole::VideoEncoder => "video_encoder",
            ObjectRole::AudioEncoder => "audio_encoder",
            ObjectRole::FileOutput => "file_output",
        };
        f.write_str(name)
    }
}

/// An engine object owned by one session. Released exactly once, on drop.
pub struct EngineObject {
    engine: Arc<dyn Engine>,
    id: ObjectId,
    role: ObjectRole,
}

impl EngineObject {
    fn acquire(engine: &Arc<dyn Engine>, id: ObjectId, role: ObjectRole) -> Self {
        tracing::debug!(object = %id, %role, "Acquired engine object");
        Self {
            engine: Arc::clone(engine),
            id,
            role,
        }
    }

    pub fn id(&self) -> ObjectId {
        self.id
    }

    pub fn role(&self) -> ObjectRole {
        self.role
    }
}

impl fmt::Debug for EngineObject {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EngineObject")
            .field("id", &self.id)
            .field("role", &self.role)
            .finish()
    }
}

impl Drop for EngineObject {
    fn drop(&mut self) {
        tracing::debug!(object = %self.id, role = %self.role, "Releasing engine object");
        self.engine.release(self.id);
    }
}

/// The engine objects of one recording session.
///
/// Each field is either absent or owned by this session. An output is only
/// ever started while every other field is present.
pub struct PipelineObjects {
    engine: Arc<dyn Engine>,
    capture_source: Option<EngineObject>,
    scene: Option<EngineObject>,
    /// Composite source of `scene`; owned by the scene, not by us.
    scene_source: Option<ObjectId>,
    video_encoder: Option<EngineObject>,
    audio_encoder: Option<EngineObject>,
    file_output: Option<EngineObject>,
    active_channel: Option<u32>,
    started: bool,
}

impl PipelineObjects {
    fn empty(engine: Arc<dyn Engine>) -> Self {
        Self {
            engine,
            capture_source: None,
            scene: None,
            scene_source: None,
            video_encoder: None,
            audio_encoder: None,
            file_output: None,
            active_channel: None,
            started: false,
        }
    }

    /// Whether every object of the graph is present.
    pub fn is_complete(&self) -> bool {
        self.capture_source.is_some()
            && self.scene.is_some()
            && self.scene_source.is_some()
            && self.video_encoder.is_some()
            && self.audio_encoder.is_some()
            && self.file_output.is_some()
    }

    pub fn is_started(&self) -> bool {
        self.started
    }

    /// Ids of the owned objects, in construction order.
    pub fn object_ids(&self) -> Vec<(ObjectRole, ObjectId)> {
        [
            &self.capture_source,
            &self.scene,
            &self.video_encoder,
            &self.audio_encoder,
            &self.file_output,
        ]
        .into_iter()
        .flatten()
        .map(|object| (object.role(), object.id()))
        .collect()
    }

    /// Step 10: start the file output.
    ///
    /// On failure the objects stay owned; the caller decides when to release
    /// them by dropping this value.
    pub fn start(&mut self) -> Result<(), SessionError> {
        if self.started {
            return Ok(());
        }
        let output = match (&self.file_output, self.is_complete()) {
            (Some(output), true) => output.id(),
            _ => {
                return Err(SessionError::OutputStartFailed {
                    reason: "pipeline is incomplete".to_string(),
                })
            }
        };
        tracing::debug!(output = %output, "Step 10: starting output");
        self.engine
            .start_output(output)
            .map_err(|e| SessionError::OutputStartFailed {
                reason: e.to_string(),
            })?;
        self.started = true;
        Ok(())
    }

    /// Stop the output if it was started.
    pub fn stop(&mut self) -> EngineResult<()> {
        if !self.started {
            return Ok(());
        }
        self.started = false;
        match &self.file_output {
            Some(output) => self.engine.stop_output(output.id()),
            None => Ok(()),
        }
    }

    /// Release every object, newest first. Safe to call repeatedly.
    pub fn release(&mut self) {
        if let (Some(channel), Some(source)) = (self.active_channel.take(), self.scene_source) {
            self.engine.deactivate_source(source, channel);
        }
        self.scene_source = None;
        self.started = false;
        // Dropping the guards releases them.
        self.file_output.take();
        self.audio_encoder.take();
        self.video_encoder.take();
        self.scene.take();
        self.capture_source.take();
    }
}

impl fmt::Debug for PipelineObjects {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PipelineObjects")
            .field("objects", &self.object_ids())
            .field("active_channel", &self.active_channel)
            .field("started", &self.started)
            .finish()
    }
}

impl Drop for PipelineObjects {
    fn drop(&mut self) {
        self.release();
    }
}

/// Builds the engine object graph for a session in the one order the engine
/// accepts.
pub struct PipelineBuilder {
    engine: Arc<dyn Engine>,
    backend: Arc<dyn CaptureBackend>,
    encoding: EncodingDefaults,
}

impl PipelineBuilder {
    pub fn new(
        engine: Arc<dyn Engine>,
        backend: Arc<dyn CaptureBackend>,
        encoding: EncodingDefaults,
    ) -> Self {
        Self {
            engine,
            backend,
            encoding,
        }
    }

    /// Steps 1 through 9. The returned graph is complete and rendering on
    /// [`OUTPUT_CHANNEL`] but its output is not started.
    ///
    /// Any failure releases whatever this call created before returning.
    pub fn build(&self, config: &SessionConfig) -> Result<PipelineObjects, SessionError> {
        let engine = &self.engine;
        let mut objects = PipelineObjects::empty(Arc::clone(engine));

        tracing::debug!(
            width = config.width,
            height = config.height,
            fps = config.fps,
            "Step 1: resetting video"
        );
        engine
            .reset_video(&VideoSettings {
                width: config.width,
                height: config.height,
                fps_num: config.fps,
                fps_den: 1,
                format: PixelFormat::Nv12,
                colorspace: Colorspace::Bt709,
            })
            .map_err(|e| SessionError::VideoResetFailed {
                reason: e.to_string(),
            })?;

        tracing::debug!(
            sample_rate = self.encoding.audio_sample_rate,
            channels = self.encoding.audio_channels,
            "Step 2: resetting audio"
        );
        engine
            .reset_audio(&AudioSettings {
                sample_rate: self.encoding.audio_sample_rate,
                channels: self.encoding.audio_channels,
            })
            .map_err(|e| SessionError::AudioResetFailed {
                reason: e.to_string(),
            })?;

        tracing::debug!("Step 3: loading modules");
        engine.load_modules();

        tracing::debug!(capture = ?config.target, "Step 4: creating capture source");
        let source = self.backend.create_source(engine.as_ref(), &config.target)?;
        let source = objects
            .capture_source
            .insert(EngineObject::acquire(engine, source, ObjectRole::CaptureSource))
            .id();

        tracing::debug!("Step 5: composing scene");
        let scene = engine.create_scene(SCENE_NAME);
        let scene = objects
            .scene
            .insert(EngineObject::acquire(engine, scene, ObjectRole::Scene))
            .id();
        engine.scene_add(scene, source);
        let scene_source = engine.scene_source(scene);
        objects.scene_source = Some(scene_source);

        tracing::debug!(
            bitrate_kbps = self.encoding.video_bitrate_kbps,
            "Step 6: creating video encoder"
        );
        let video_encoder = engine
            .create_video_encoder(&VideoEncoderSpec {
                name: VIDEO_ENCODER_NAME.to_string(),
                bitrate_kbps: self.encoding.video_bitrate_kbps,
                rate_control: RateControl::Cbr,
                keyint_secs: KEYFRAME_INTERVAL_SECS,
            })
            .map_err(|e| SessionError::VideoEncoderFailed {
                reason: e.to_string(),
            })?;
        let video_encoder = objects
            .video_encoder
            .insert(EngineObject::acquire(
                engine,
                video_encoder,
                ObjectRole::VideoEncoder,
            ))
            .id();

        tracing::debug!(
            bitrate_kbps = self.encoding.audio_bitrate_kbps,
            "Step 7: creating audio encoder"
        );
        let audio_encoder = engine
            .create_audio_encoder(&AudioEncoderSpec {
                name: AUDIO_ENCODER_NAME.to_string(),
                bitrate_kbps: self.encoding.audio_bitrate_kbps,
                mixer_track: MIXER_TRACK,
            })
            .map_err(|e| SessionError::AudioEncoderFailed {
                reason: e.to_string(),
            })?;
        let audio_encoder = objects
            .audio_encoder
            .insert(EngineObject::acquire(
                engine,
                audio_encoder,
                ObjectRole::AudioEncoder,
            ))
            .id();

        tracing::debug!(path = %config.output_path.display(), "Step 8: creating file output");
        let output = engine
            .create_output(&OutputSpec {
                name: OUTPUT_NAME.to_string(),
                path: config.output_path.clone(),
                video_encoder,
                audio_encoder,
                mixer_track: MIXER_TRACK,
            })
            .map_err(|e| SessionError::OutputCreateFailed {
                reason: e.to_string(),
            })?;
        objects.file_output = Some(EngineObject::acquire(engine, output, ObjectRole::FileOutput));

        tracing::debug!(source = %scene_source, channel = OUTPUT_CHANNEL, "Step 9: activating scene");
        engine.activate_source(scene_source, OUTPUT_CHANNEL);
        objects.active_channel = Some(OUTPUT_CHANNEL);

        Ok(objects)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::FakeBackend;
    use crate::engine::{FailPoint, FakeEngine};
    use screenrec_platform_core::{CaptureTarget, NativeId};

    fn builder(engine: &Arc<FakeEngine>) -> PipelineBuilder {
        engine.startup().unwrap();
        PipelineBuilder::new(
            engine.clone(),
            Arc::new(FakeBackend::single_display()),
            EncodingDefaults::default(),
        )
    }

    fn config(dir: &tempfile::TempDir) -> SessionConfig {
        SessionConfig {
            output_path: dir.path().join("out.mp4"),
            ..SessionConfig::default()
        }
    }

    #[test]
    fn build_runs_steps_in_engine_order() {
        let engine = Arc::new(FakeEngine::new());
        let builder = builder(&engine);
        let dir = tempfile::tempdir().unwrap();
        engine.clear_calls();

        let objects = builder.build(&config(&dir)).unwrap();
        assert!(objects.is_complete());
        assert!(!objects.is_started());
        assert_eq!(
            engine.calls(),
            vec![
                "reset_video",
                "reset_audio",
                "load_modules",
                "create_source",
                "create_scene",
                "scene_add",
                "scene_source",
                "create_video_encoder",
                "create_audio_encoder",
                "create_output",
                "activate_source",
            ]
        );
        assert_eq!(engine.live_objects(), 5);
    }

    #[test]
    fn dropping_objects_releases_newest_first() {
        let engine = Arc::new(FakeEngine::new());
        let builder = builder(&engine);
        let dir = tempfile::tempdir().unwrap();

        let objects = builder.build(&config(&dir)).unwrap();
        let mut expected: Vec<ObjectId> = objects.object_ids().into_iter().map(|(_, id)| id).collect();
        expected.reverse();
        engine.clear_calls();

        drop(objects);
        assert_eq!(engine.released(), expected);
        assert_eq!(engine.calls()[0], "deactivate_source");
        assert_eq!(engine.live_objects(), 0);
        assert_eq!(engine.channel_source(OUTPUT_CHANNEL), None);
        assert_eq!(engine.double_releases(), 0);
    }

    #[test]
    fn failure_mid_build_releases_earlier_objects() {
        let engine = Arc::new(FakeEngine::new());
        let builder = builder(&engine);
        let dir = tempfile::tempdir().unwrap();
        engine.inject_failure(FailPoint::AudioEncoder);

        let err = builder.build(&config(&dir)).unwrap_err();
        assert!(matches!(err, SessionError::AudioEncoderFailed { .. }));
        assert_eq!(engine.live_objects(), 0);
        assert_eq!(engine.double_releases(), 0);
    }

    #[test]
    fn unresolvable_target_fails_at_source_step() {
        let engine = Arc::new(FakeEngine::new());
        let builder = builder(&engine);
        let dir = tempfile::tempdir().unwrap();
        let config = SessionConfig {
            target: CaptureTarget::Display(NativeId::Numeric(9)),
            ..config(&dir)
        };

        let err = builder.build(&config).unwrap_err();
        assert!(matches!(err, SessionError::SourceCreateFailed { .. }));
        assert_eq!(engine.live_objects(), 0);
    }

    #[test]
    fn start_failure_leaves_objects_for_caller() {
        let engine = Arc::new(FakeEngine::new());
        let builder = builder(&engine);
        let dir = tempfile::tempdir().unwrap();
        engine.inject_failure(FailPoint::OutputStart);

        let mut objects = builder.build(&config(&dir)).unwrap();
        let err = objects.start().unwrap_err();
        assert!(matches!(err, SessionError::OutputStartFailed { .. }));
        assert_eq!(engine.live_objects(), 5);

        drop(objects);
        assert_eq!(engine.live_objects(), 0);
    }
}

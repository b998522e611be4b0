//! In-memory engine.
//!
//! Tracks every object it hands out so tests can assert that nothing leaks,
//! and supports one-shot failure injection at each construction step. A
//! started output creates an empty file at its path, so end-to-end flows
//! observe the same artifact a real engine leaves behind.

use std::collections::{BTreeMap, BTreeSet};
use std::fs::File;

use parking_lot::Mutex;

use super::{
    AudioEncoderSpec, AudioSettings, Engine, EngineError, EngineResult, ObjectId, OutputSpec,
    SourceSpec, VideoEncoderSpec, VideoSettings,
};

/// Engine operations that can be forced to fail.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum FailPoint {
    Startup,
    VideoReset,
    AudioReset,
    SourceCreate,
    VideoEncoder,
    AudioEncoder,
    OutputCreate,
    OutputStart,
    OutputStop,
}

impl FailPoint {
    /// Every step of pipeline construction, in build order.
    pub const PIPELINE: [FailPoint; 7] = [
        FailPoint::VideoReset,
        FailPoint::AudioReset,
        FailPoint::SourceCreate,
        FailPoint::VideoEncoder,
        FailPoint::AudioEncoder,
        FailPoint::OutputCreate,
        FailPoint::OutputStart,
    ];
}

#[derive(Debug, Clone, PartialEq)]
enum FakeObject {
    Source(SourceSpec),
    Scene { source: ObjectId, items: Vec<ObjectId> },
    VideoEncoder(VideoEncoderSpec),
    AudioEncoder(AudioEncoderSpec),
    Output(OutputSpec),
}

#[derive(Debug, Default)]
struct FakeState {
    started: bool,
    startups: u32,
    shutdowns: u32,
    next_id: u64,
    video: Option<VideoSettings>,
    audio: Option<AudioSettings>,
    objects: BTreeMap<ObjectId, FakeObject>,
    channels: BTreeMap<u32, ObjectId>,
    running: BTreeSet<ObjectId>,
    failures: BTreeSet<FailPoint>,
    calls: Vec<String>,
    released: Vec<ObjectId>,
    double_releases: u32,
}

impl FakeState {
    fn alloc(&mut self) -> ObjectId {
        self.next_id += 1;
        ObjectId(self.next_id)
    }

    fn take_failure(&mut self, point: FailPoint) -> bool {
        self.failures.remove(&point)
    }

    fn require_started(&self, operation: &'static str) -> EngineResult<()> {
        if self.started {
            Ok(())
        } else {
            Err(EngineError::rejected(operation, "engine not started"))
        }
    }
}

/// An engine that records calls instead of touching media.
#[derive(Debug, Default)]
pub struct FakeEngine {
    state: Mutex<FakeState>,
}

impl FakeEngine {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make the next call at `point` fail. The failure fires once.
    pub fn inject_failure(&self, point: FailPoint) {
        self.state.lock().failures.insert(point);
    }

    /// Objects created and not yet released.
    pub fn live_objects(&self) -> usize {
        self.state.lock().objects.len()
    }

    /// Outputs currently running.
    pub fn running_outputs(&self) -> usize {
        self.state.lock().running.len()
    }

    /// Source rendered on `channel`, if any.
    pub fn channel_source(&self, channel: u32) -> Option<ObjectId> {
        self.state.lock().channels.get(&channel).copied()
    }

    /// Number of `release` calls for ids that were not alive.
    pub fn double_releases(&self) -> u32 {
        self.state.lock().double_releases
    }

    pub fn is_started(&self) -> bool {
        self.state.lock().started
    }

    pub fn startup_count(&self) -> u32 {
        self.state.lock().startups
    }

    pub fn shutdown_count(&self) -> u32 {
        self.state.lock().shutdowns
    }

    pub fn video_settings(&self) -> Option<VideoSettings> {
        self.state.lock().video.clone()
    }

    pub fn audio_settings(&self) -> Option<AudioSettings> {
        self.state.lock().audio.clone()
    }

    /// Specs of all live capture sources.
    pub fn sources(&self) -> Vec<SourceSpec> {
        self.state
            .lock()
            .objects
            .values()
            .filter_map(|object| match object {
                FakeObject::Source(spec) => Some(spec.clone()),
                _ => None,
            })
            .collect()
    }

    /// Names of engine calls in invocation order.
    pub fn calls(&self) -> Vec<String> {
        self.state.lock().calls.clone()
    }

    /// Ids passed to `release`, in order.
    pub fn released(&self) -> Vec<ObjectId> {
        self.state.lock().released.clone()
    }

    pub fn clear_calls(&self) {
        let mut state = self.state.lock();
        state.calls.clear();
        state.released.clear();
    }
}

impl Engine for FakeEngine {
    fn version(&self) -> Option<String> {
        Some("fake 1.0.0".to_string())
    }

    fn startup(&self) -> EngineResult<()> {
        let mut state = self.state.lock();
        state.calls.push("startup".into());
        if state.take_failure(FailPoint::Startup) {
            return Err(EngineError::StartupFailed {
                reason: "injected startup failure".into(),
            });
        }
        state.started = true;
        state.startups += 1;
        Ok(())
    }

    fn shutdown(&self) {
        let mut state = self.state.lock();
        state.calls.push("shutdown".into());
        state.started = false;
        state.shutdowns += 1;
        state.objects.clear();
        state.channels.clear();
        state.running.clear();
        state.video = None;
        state.audio = None;
    }

    fn reset_video(&self, settings: &VideoSettings) -> EngineResult<()> {
        let mut state = self.state.lock();
        state.calls.push("reset_video".into());
        state.require_started("reset_video")?;
        if state.take_failure(FailPoint::VideoReset) {
            return Err(EngineError::rejected("reset_video", "injected failure"));
        }
        if !state.running.is_empty() {
            return Err(EngineError::rejected("reset_video", "video is active"));
        }
        state.video = Some(settings.clone());
        Ok(())
    }

    fn reset_audio(&self, settings: &AudioSettings) -> EngineResult<()> {
        let mut state = self.state.lock();
        state.calls.push("reset_audio".into());
        state.require_started("reset_audio")?;
        if state.take_failure(FailPoint::AudioReset) {
            return Err(EngineError::rejected("reset_audio", "injected failure"));
        }
        if !state.running.is_empty() {
            return Err(EngineError::rejected("reset_audio", "audio is active"));
        }
        state.audio = Some(settings.clone());
        Ok(())
    }

    fn load_modules(&self) {
        self.state.lock().calls.push("load_modules".into());
    }

    fn create_source(&self, spec: &SourceSpec) -> EngineResult<ObjectId> {
        let mut state = self.state.lock();
        state.calls.push("create_source".into());
        state.require_started("create_source")?;
        if state.take_failure(FailPoint::SourceCreate) {
            return Err(EngineError::rejected("create_source", "injected failure"));
        }
        let id = state.alloc();
        state.objects.insert(id, FakeObject::Source(spec.clone()));
        Ok(id)
    }

    fn create_scene(&self, _name: &str) -> ObjectId {
        let mut state = self.state.lock();
        state.calls.push("create_scene".into());
        let id = state.alloc();
        let source = state.alloc();
        state.objects.insert(
            id,
            FakeObject::Scene {
                source,
                items: Vec::new(),
            },
        );
        id
    }

    fn scene_add(&self, scene: ObjectId, source: ObjectId) {
        let mut state = self.state.lock();
        state.calls.push("scene_add".into());
        if let Some(FakeObject::Scene { items, .. }) = state.objects.get_mut(&scene) {
            items.push(source);
        }
    }

    fn scene_source(&self, scene: ObjectId) -> ObjectId {
        let mut state = self.state.lock();
        state.calls.push("scene_source".into());
        match state.objects.get(&scene) {
            Some(FakeObject::Scene { source, .. }) => *source,
            _ => scene,
        }
    }

    fn create_video_encoder(&self, spec: &VideoEncoderSpec) -> EngineResult<ObjectId> {
        let mut state = self.state.lock();
        state.calls.push("create_video_encoder".into());
        if state.take_failure(FailPoint::VideoEncoder) {
            return Err(EngineError::rejected("create_video_encoder", "injected failure"));
        }
        if state.video.is_none() {
            return Err(EngineError::rejected(
                "create_video_encoder",
                "video mix not configured",
            ));
        }
        let id = state.alloc();
        state.objects.insert(id, FakeObject::VideoEncoder(spec.clone()));
        Ok(id)
    }

    fn create_audio_encoder(&self, spec: &AudioEncoderSpec) -> EngineResult<ObjectId> {
        let mut state = self.state.lock();
        state.calls.push("create_audio_encoder".into());
        if state.take_failure(FailPoint::AudioEncoder) {
            return Err(EngineError::rejected("create_audio_encoder", "injected failure"));
        }
        if state.audio.is_none() {
            return Err(EngineError::rejected(
                "create_audio_encoder",
                "audio mix not configured",
            ));
        }
        let id = state.alloc();
        state.objects.insert(id, FakeObject::AudioEncoder(spec.clone()));
        Ok(id)
    }

    fn create_output(&self, spec: &OutputSpec) -> EngineResult<ObjectId> {
        let mut state = self.state.lock();
        state.calls.push("create_output".into());
        if state.take_failure(FailPoint::OutputCreate) {
            return Err(EngineError::rejected("create_output", "injected failure"));
        }
        let encoders_alive = matches!(
            state.objects.get(&spec.video_encoder),
            Some(FakeObject::VideoEncoder(_))
        ) && matches!(
            state.objects.get(&spec.audio_encoder),
            Some(FakeObject::AudioEncoder(_))
        );
        if !encoders_alive {
            return Err(EngineError::rejected("create_output", "encoder not found"));
        }
        let id = state.alloc();
        state.objects.insert(id, FakeObject::Output(spec.clone()));
        Ok(id)
    }

    fn activate_source(&self, source: ObjectId, channel: u32) {
        let mut state = self.state.lock();
        state.calls.push("activate_source".into());
        state.channels.insert(channel, source);
    }

    fn deactivate_source(&self, source: ObjectId, channel: u32) {
        let mut state = self.state.lock();
        state.calls.push("deactivate_source".into());
        if state.channels.get(&channel) == Some(&source) {
            state.channels.remove(&channel);
        }
    }

    fn start_output(&self, output: ObjectId) -> EngineResult<()> {
        let mut state = self.state.lock();
        state.calls.push("start_output".into());
        if state.take_failure(FailPoint::OutputStart) {
            return Err(EngineError::rejected("start_output", "injected failure"));
        }
        let Some(FakeObject::Output(spec)) = state.objects.get(&output) else {
            return Err(EngineError::UnknownObject(output));
        };
        let dependents_alive = state.objects.contains_key(&spec.video_encoder)
            && state.objects.contains_key(&spec.audio_encoder);
        if !dependents_alive {
            return Err(EngineError::rejected("start_output", "encoder released"));
        }
        if !state.channels.contains_key(&0) {
            return Err(EngineError::rejected("start_output", "nothing on channel 0"));
        }
        File::create(&spec.path).map_err(|e| {
            EngineError::rejected(
                "start_output",
                format!("cannot open {}: {e}", spec.path.display()),
            )
        })?;
        state.running.insert(output);
        Ok(())
    }

    fn stop_output(&self, output: ObjectId) -> EngineResult<()> {
        let mut state = self.state.lock();
        state.calls.push("stop_output".into());
        let was_running = state.running.remove(&output);
        if state.take_failure(FailPoint::OutputStop) {
            return Err(EngineError::rejected("stop_output", "injected failure"));
        }
        if !was_running {
            return Err(EngineError::rejected("stop_output", "output not running"));
        }
        Ok(())
    }

    fn release(&self, object: ObjectId) {
        let mut state = self.state.lock();
        state.calls.push("release".into());
        state.released.push(object);
        state.running.remove(&object);
        if state.objects.remove(&object).is_none() {
            state.double_releases += 1;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn source_spec() -> SourceSpec {
        SourceSpec {
            name: "capture".into(),
            kind: crate::engine::SourceKind::XshmInput,
            settings: json!({ "screen": 0 }),
        }
    }

    #[test]
    fn injected_failure_fires_once() {
        let engine = FakeEngine::new();
        engine.startup().unwrap();
        engine.inject_failure(FailPoint::SourceCreate);

        assert!(engine.create_source(&source_spec()).is_err());
        let id = engine.create_source(&source_spec()).unwrap();
        assert_eq!(engine.live_objects(), 1);

        engine.release(id);
        assert_eq!(engine.live_objects(), 0);
        assert_eq!(engine.double_releases(), 0);
    }

    #[test]
    fn releasing_twice_is_counted() {
        let engine = FakeEngine::new();
        engine.startup().unwrap();
        let id = engine.create_source(&source_spec()).unwrap();
        engine.release(id);
        engine.release(id);
        assert_eq!(engine.double_releases(), 1);
    }

    #[test]
    fn encoders_require_configured_mix() {
        let engine = FakeEngine::new();
        engine.startup().unwrap();
        let err = engine
            .create_video_encoder(&VideoEncoderSpec {
                name: "video".into(),
                bitrate_kbps: 2500,
                rate_control: crate::engine::RateControl::Cbr,
                keyint_secs: 2,
            })
            .unwrap_err();
        assert!(err.to_string().contains("video mix not configured"));
    }
}

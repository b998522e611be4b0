//! GStreamer-backed engine.
//!
//! Engine objects are plain records in a registry until an output starts.
//! Starting an output walks the graph (channel 0 → scene → capture source,
//! output → encoders) and assembles one launch pipeline from it:
//!
//! ```text
//! <capture src> ! queue ! videoconvert ! videoscale ! videorate ! caps ! x264enc ! h264parse ! mux.
//! audiotestsrc (silent mix) ! caps ! audioconvert ! audioresample ! <aac> ! aacparse ! mux.
//! <muxer> name=mux ! filesink
//! ```

use std::collections::HashMap;
use std::path::Path;
use std::sync::OnceLock;
use std::time::{Duration, Instant};

use gst::prelude::*;
use gstreamer as gst;
use parking_lot::Mutex;

use super::{
    AudioEncoderSpec, AudioSettings, Colorspace, Engine, EngineError, EngineResult, ObjectId,
    OutputSpec, PixelFormat, RateControl, SourceKind, SourceSpec, VideoEncoderSpec,
    VideoSettings,
};

const VIDEO_ENCODER_ELEMENT: &str = "x264enc";
const AAC_ENCODER_ELEMENTS: [&str; 3] = ["avenc_aac", "fdkaacenc", "voaacenc"];
const SUPPORTED_SAMPLE_RATES: [u32; 2] = [44_100, 48_000];
const STATE_CHANGE_TIMEOUT: Duration = Duration::from_secs(10);

/// Whether a pipeline that was asked to play got there within the timeout.
fn playing_reached(
    result: Result<gst::StateChangeSuccess, gst::StateChangeError>,
    current: gst::State,
) -> Result<(), String> {
    match (result, current) {
        (Ok(_), gst::State::Playing) => Ok(()),
        (Ok(_), state) => Err(format!(
            "still {state:?} after {}s",
            STATE_CHANGE_TIMEOUT.as_secs()
        )),
        (Err(e), _) => Err(format!("{e:?}")),
    }
}

/// A running launch pipeline.
struct GstCapturePipeline {
    name: String,
    pipeline: gst::Pipeline,
}

impl GstCapturePipeline {
    fn from_launch(name: impl Into<String>, launch: &str) -> EngineResult<Self> {
        let element = gst::parse::launch(launch)
            .map_err(|e| EngineError::rejected("start_output", format!("bad pipeline: {e}")))?;

        let pipeline = element.dynamic_cast::<gst::Pipeline>().map_err(|_| {
            EngineError::rejected("start_output", "launch string did not produce a pipeline")
        })?;

        Ok(Self {
            name: name.into(),
            pipeline,
        })
    }

    fn start(&self) -> EngineResult<()> {
        if let Err(e) = self.pipeline.set_state(gst::State::Playing) {
            let reason = self.bus_error().unwrap_or_else(|| format!("{e:?}"));
            return Err(self.abort(format!("{} refused to play: {reason}", self.name)));
        }

        // State changes are async; wait so a bad capture source or an
        // unwritable sink fails here instead of after we report success.
        let (result, current, _) = self
            .pipeline
            .state(gst::ClockTime::from_seconds(STATE_CHANGE_TIMEOUT.as_secs()));
        if let Err(reason) = playing_reached(result, current) {
            tracing::warn!(pipeline = %self.name, ?current, %reason, "Pipeline did not start");
            let reason = self.bus_error().unwrap_or(reason);
            return Err(self.abort(format!("{} failed to reach Playing: {reason}", self.name)));
        }
        Ok(())
    }

    /// Drop back to Null and build the `start_output` rejection.
    fn abort(&self, reason: String) -> EngineError {
        if let Err(e) = self.pipeline.set_state(gst::State::Null) {
            tracing::warn!(pipeline = %self.name, error = ?e, "Failed to reset pipeline to Null");
        }
        EngineError::rejected("start_output", reason)
    }

    /// First error message waiting on the bus, if any.
    fn bus_error(&self) -> Option<String> {
        let bus = self.pipeline.bus()?;
        while let Some(msg) = bus.pop() {
            if let gst::MessageView::Error(err) = msg.view() {
                return Some(err.error().to_string());
            }
        }
        None
    }

    fn stop(&self) -> EngineResult<()> {
        // EOS lets the encoder and muxer flush; without it the file tail is
        // truncated and mp4 loses its moov atom.
        if !self.pipeline.send_event(gst::event::Eos::new()) {
            tracing::warn!(pipeline = %self.name, "Failed to send EOS event; output may be truncated");
        } else if let Some(bus) = self.pipeline.bus() {
            let start = Instant::now();
            loop {
                let elapsed = start.elapsed();
                if elapsed >= STATE_CHANGE_TIMEOUT {
                    tracing::warn!(pipeline = %self.name, "EOS drain timed out");
                    break;
                }
                let remaining = STATE_CHANGE_TIMEOUT - elapsed;
                let timeout = gst::ClockTime::from_nseconds(remaining.as_nanos() as u64);
                match bus.timed_pop(timeout) {
                    Some(msg) => match msg.view() {
                        gst::MessageView::Eos(_) => {
                            tracing::debug!(pipeline = %self.name, "EOS received; pipeline drained");
                            break;
                        }
                        gst::MessageView::Error(e) => {
                            tracing::warn!(
                                pipeline = %self.name,
                                error = %e.error(),
                                "Pipeline error during EOS drain"
                            );
                            break;
                        }
                        _ => {}
                    },
                    None => {
                        tracing::warn!(pipeline = %self.name, "EOS drain timed out");
                        break;
                    }
                }
            }
        }

        self.pipeline.set_state(gst::State::Null).map_err(|e| {
            EngineError::rejected("stop_output", format!("{} refused to stop: {e:?}", self.name))
        })?;
        Ok(())
    }
}

enum GstObject {
    Source(SourceSpec),
    Scene {
        source: ObjectId,
        items: Vec<ObjectId>,
    },
    VideoEncoder(VideoEncoderSpec),
    AudioEncoder {
        spec: AudioEncoderSpec,
        element: &'static str,
    },
    Output {
        spec: OutputSpec,
        muxer: &'static str,
        pipeline: Option<GstCapturePipeline>,
    },
}

#[derive(Default)]
struct Registry {
    started: bool,
    modules_loaded: bool,
    next_id: u64,
    video: Option<VideoSettings>,
    audio: Option<AudioSettings>,
    objects: HashMap<ObjectId, GstObject>,
    /// Composite source id → owning scene.
    scene_sources: HashMap<ObjectId, ObjectId>,
    channels: HashMap<u32, ObjectId>,
}

impl Registry {
    fn alloc(&mut self) -> ObjectId {
        self.next_id += 1;
        ObjectId(self.next_id)
    }

    fn require_started(&self, operation: &'static str) -> EngineResult<()> {
        if self.started {
            Ok(())
        } else {
            Err(EngineError::rejected(operation, "engine not started"))
        }
    }

    fn any_output_running(&self) -> bool {
        self.objects.values().any(|object| {
            matches!(
                object,
                GstObject::Output {
                    pipeline: Some(_),
                    ..
                }
            )
        })
    }

    /// The capture source rendered on `channel`, looking through scenes.
    fn channel_capture_source(&self, channel: u32) -> EngineResult<&SourceSpec> {
        let mut id = *self
            .channels
            .get(&channel)
            .ok_or_else(|| EngineError::rejected("start_output", "nothing on channel 0"))?;
        if let Some(scene) = self.scene_sources.get(&id) {
            id = *scene;
        }
        match self.objects.get(&id) {
            Some(GstObject::Source(spec)) => Ok(spec),
            Some(GstObject::Scene { items, .. }) => items
                .iter()
                .find_map(|item| match self.objects.get(item) {
                    Some(GstObject::Source(spec)) => Some(spec),
                    _ => None,
                })
                .ok_or_else(|| EngineError::rejected("start_output", "scene has no sources")),
            _ => Err(EngineError::UnknownObject(id)),
        }
    }

    fn stop_pipeline(&mut self, output: ObjectId) -> EngineResult<bool> {
        match self.objects.get_mut(&output) {
            Some(GstObject::Output { pipeline, .. }) => match pipeline.take() {
                Some(running) => running.stop().map(|()| true),
                None => Ok(false),
            },
            _ => Err(EngineError::UnknownObject(output)),
        }
    }
}

/// Engine driving GStreamer launch pipelines.
#[derive(Default)]
pub struct GstEngine {
    registry: Mutex<Registry>,
}

impl GstEngine {
    pub fn new() -> Self {
        Self::default()
    }
}

impl std::fmt::Debug for GstEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let registry = self.registry.lock();
        f.debug_struct("GstEngine")
            .field("started", &registry.started)
            .field("objects", &registry.objects.len())
            .finish()
    }
}

impl Engine for GstEngine {
    fn version(&self) -> Option<String> {
        init_gstreamer().ok()?;
        Some(gst::version_string().to_string())
    }

    fn startup(&self) -> EngineResult<()> {
        init_gstreamer().map_err(|reason| EngineError::StartupFailed { reason })?;
        let mut registry = self.registry.lock();
        registry.started = true;
        tracing::debug!(version = %gst::version_string(), "GStreamer engine started");
        Ok(())
    }

    fn shutdown(&self) {
        let mut registry = self.registry.lock();
        let outputs: Vec<ObjectId> = registry.objects.keys().copied().collect();
        for id in outputs {
            if let Err(e) = registry.stop_pipeline(id) {
                if !matches!(e, EngineError::UnknownObject(_)) {
                    tracing::warn!(object = %id, error = %e, "Output stop failed during shutdown");
                }
            }
        }
        *registry = Registry::default();
    }

    fn reset_video(&self, settings: &VideoSettings) -> EngineResult<()> {
        let mut registry = self.registry.lock();
        registry.require_started("reset_video")?;
        if registry.any_output_running() {
            return Err(EngineError::rejected("reset_video", "video is active"));
        }
        if settings.width == 0 || settings.height == 0 {
            return Err(EngineError::rejected("reset_video", "zero-sized canvas"));
        }
        // 4:2:0 subsampling needs even dimensions.
        if settings.width % 2 != 0 || settings.height % 2 != 0 {
            return Err(EngineError::rejected(
                "reset_video",
                format!(
                    "{}x{} is not representable in 4:2:0",
                    settings.width, settings.height
                ),
            ));
        }
        if settings.fps_num == 0 || settings.fps_den == 0 {
            return Err(EngineError::rejected("reset_video", "invalid frame rate"));
        }
        registry.video = Some(settings.clone());
        Ok(())
    }

    fn reset_audio(&self, settings: &AudioSettings) -> EngineResult<()> {
        let mut registry = self.registry.lock();
        registry.require_started("reset_audio")?;
        if registry.any_output_running() {
            return Err(EngineError::rejected("reset_audio", "audio is active"));
        }
        if !SUPPORTED_SAMPLE_RATES.contains(&settings.sample_rate) {
            return Err(EngineError::rejected(
                "reset_audio",
                format!("unsupported sample rate {}", settings.sample_rate),
            ));
        }
        if !(1..=8).contains(&settings.channels) {
            return Err(EngineError::rejected(
                "reset_audio",
                format!("unsupported channel count {}", settings.channels),
            ));
        }
        registry.audio = Some(settings.clone());
        Ok(())
    }

    fn load_modules(&self) {
        let mut registry = self.registry.lock();
        if registry.modules_loaded {
            return;
        }
        // Loading the registry is enough; element lookups below pull in the
        // plugins they need.
        let registered = gst::Registry::get().plugins().len();
        tracing::debug!(plugins = registered, "GStreamer plugin registry loaded");
        registry.modules_loaded = true;
    }

    fn create_source(&self, spec: &SourceSpec) -> EngineResult<ObjectId> {
        let mut registry = self.registry.lock();
        registry.require_started("create_source")?;
        let element = source_element(spec.kind)?;
        require_element("create_source", element)?;
        let id = registry.alloc();
        registry.objects.insert(id, GstObject::Source(spec.clone()));
        tracing::debug!(source = %id, kind = %spec.kind, "Capture source registered");
        Ok(id)
    }

    fn create_scene(&self, name: &str) -> ObjectId {
        let mut registry = self.registry.lock();
        let id = registry.alloc();
        let source = registry.alloc();
        registry.objects.insert(
            id,
            GstObject::Scene {
                source,
                items: Vec::new(),
            },
        );
        registry.scene_sources.insert(source, id);
        tracing::debug!(scene = %id, name, "Scene created");
        id
    }

    fn scene_add(&self, scene: ObjectId, source: ObjectId) {
        let mut registry = self.registry.lock();
        match registry.objects.get_mut(&scene) {
            Some(GstObject::Scene { items, .. }) => items.push(source),
            _ => tracing::warn!(scene = %scene, "scene_add on unknown scene"),
        }
    }

    fn scene_source(&self, scene: ObjectId) -> ObjectId {
        let registry = self.registry.lock();
        match registry.objects.get(&scene) {
            Some(GstObject::Scene { source, .. }) => *source,
            _ => scene,
        }
    }

    fn create_video_encoder(&self, spec: &VideoEncoderSpec) -> EngineResult<ObjectId> {
        let mut registry = self.registry.lock();
        registry.require_started("create_video_encoder")?;
        if registry.video.is_none() {
            return Err(EngineError::rejected(
                "create_video_encoder",
                "video mix not configured",
            ));
        }
        require_element("create_video_encoder", VIDEO_ENCODER_ELEMENT)?;
        let id = registry.alloc();
        registry
            .objects
            .insert(id, GstObject::VideoEncoder(spec.clone()));
        Ok(id)
    }

    fn create_audio_encoder(&self, spec: &AudioEncoderSpec) -> EngineResult<ObjectId> {
        let mut registry = self.registry.lock();
        registry.require_started("create_audio_encoder")?;
        if registry.audio.is_none() {
            return Err(EngineError::rejected(
                "create_audio_encoder",
                "audio mix not configured",
            ));
        }
        let element = AAC_ENCODER_ELEMENTS
            .into_iter()
            .find(|name| gst::ElementFactory::find(name).is_some())
            .ok_or_else(|| {
                EngineError::rejected(
                    "create_audio_encoder",
                    format!("no AAC encoder available (tried {AAC_ENCODER_ELEMENTS:?})"),
                )
            })?;
        let id = registry.alloc();
        registry.objects.insert(
            id,
            GstObject::AudioEncoder {
                spec: spec.clone(),
                element,
            },
        );
        tracing::debug!(encoder = %id, element, "Audio encoder registered");
        Ok(id)
    }

    fn create_output(&self, spec: &OutputSpec) -> EngineResult<ObjectId> {
        let mut registry = self.registry.lock();
        registry.require_started("create_output")?;
        if !matches!(
            registry.objects.get(&spec.video_encoder),
            Some(GstObject::VideoEncoder(_))
        ) {
            return Err(EngineError::UnknownObject(spec.video_encoder));
        }
        if !matches!(
            registry.objects.get(&spec.audio_encoder),
            Some(GstObject::AudioEncoder { .. })
        ) {
            return Err(EngineError::UnknownObject(spec.audio_encoder));
        }
        let muxer = muxer_for_path(&spec.path)?;
        require_element("create_output", muxer)?;
        let id = registry.alloc();
        registry.objects.insert(
            id,
            GstObject::Output {
                spec: spec.clone(),
                muxer,
                pipeline: None,
            },
        );
        Ok(id)
    }

    fn activate_source(&self, source: ObjectId, channel: u32) {
        let mut registry = self.registry.lock();
        if let Some(previous) = registry.channels.insert(channel, source) {
            if previous != source {
                tracing::debug!(channel, previous = %previous, "Channel source replaced");
            }
        }
    }

    fn deactivate_source(&self, source: ObjectId, channel: u32) {
        let mut registry = self.registry.lock();
        if registry.channels.get(&channel) == Some(&source) {
            registry.channels.remove(&channel);
        }
    }

    fn start_output(&self, output: ObjectId) -> EngineResult<()> {
        let mut registry = self.registry.lock();
        registry.require_started("start_output")?;

        let launch = {
            let Some(GstObject::Output { spec, muxer, .. }) = registry.objects.get(&output) else {
                return Err(EngineError::UnknownObject(output));
            };
            let Some(GstObject::VideoEncoder(video_encoder)) =
                registry.objects.get(&spec.video_encoder)
            else {
                return Err(EngineError::UnknownObject(spec.video_encoder));
            };
            let Some(GstObject::AudioEncoder {
                spec: audio_encoder,
                element: aac_element,
            }) = registry.objects.get(&spec.audio_encoder)
            else {
                return Err(EngineError::UnknownObject(spec.audio_encoder));
            };
            let source = registry.channel_capture_source(0)?;
            let video = registry
                .video
                .as_ref()
                .ok_or_else(|| EngineError::rejected("start_output", "video mix not configured"))?;
            let audio = registry
                .audio
                .as_ref()
                .ok_or_else(|| EngineError::rejected("start_output", "audio mix not configured"))?;

            build_launch(&LaunchPlan {
                source,
                video,
                audio,
                video_encoder,
                audio_encoder,
                aac_element,
                muxer,
                path: &spec.path,
            })?
        };
        tracing::debug!(output = %output, launch = %launch, "Starting output pipeline");

        let running = GstCapturePipeline::from_launch(format!("output{output}"), &launch)?;
        running.start()?;

        if let Some(GstObject::Output { pipeline, .. }) = registry.objects.get_mut(&output) {
            *pipeline = Some(running);
        }
        Ok(())
    }

    fn stop_output(&self, output: ObjectId) -> EngineResult<()> {
        let mut registry = self.registry.lock();
        match registry.stop_pipeline(output)? {
            true => Ok(()),
            false => Err(EngineError::rejected("stop_output", "output not running")),
        }
    }

    fn release(&self, object: ObjectId) {
        let mut registry = self.registry.lock();
        if let Err(e) = registry.stop_pipeline(object) {
            if !matches!(e, EngineError::UnknownObject(_)) {
                tracing::warn!(object = %object, error = %e, "Output stop failed during release");
            }
        }
        match registry.objects.remove(&object) {
            Some(GstObject::Scene { source, .. }) => {
                registry.scene_sources.remove(&source);
                registry.channels.retain(|_, id| *id != source);
            }
            Some(_) => {
                registry.channels.retain(|_, id| *id != object);
            }
            None => tracing::warn!(object = %object, "Release of unknown engine object"),
        }
    }
}

fn init_gstreamer() -> Result<(), String> {
    static GST_INIT: OnceLock<Result<(), String>> = OnceLock::new();
    GST_INIT
        .get_or_init(|| gst::init().map_err(|e| e.to_string()))
        .clone()
        .map_err(|e| format!("failed to initialize GStreamer: {e}"))
}

fn require_element(operation: &'static str, name: &str) -> EngineResult<()> {
    if gst::ElementFactory::find(name).is_some() {
        Ok(())
    } else {
        Err(EngineError::rejected(
            operation,
            format!("GStreamer element '{name}' is not installed"),
        ))
    }
}

fn source_element(kind: SourceKind) -> EngineResult<&'static str> {
    match kind {
        SourceKind::XshmInput | SourceKind::XcompositeInput => Ok("ximagesrc"),
        SourceKind::MonitorCapture => Ok("d3d11screencapturesrc"),
        SourceKind::DisplayCapture => Ok("avfvideosrc"),
        SourceKind::WindowCapture if cfg!(target_os = "windows") => Ok("d3d11screencapturesrc"),
        SourceKind::WindowCapture => Err(EngineError::rejected(
            "create_source",
            "window capture is not available on this platform",
        )),
    }
}

fn muxer_for_path(path: &Path) -> EngineResult<&'static str> {
    let extension = path
        .extension()
        .and_then(|e| e.to_str())
        .map(str::to_ascii_lowercase);
    match extension.as_deref() {
        Some("mp4") => Ok("mp4mux"),
        Some("mov") => Ok("qtmux"),
        Some("mkv") => Ok("matroskamux"),
        Some("flv") => Ok("flvmux"),
        other => Err(EngineError::rejected(
            "create_output",
            format!("no muxer for extension {other:?}"),
        )),
    }
}

struct LaunchPlan<'a> {
    source: &'a SourceSpec,
    video: &'a VideoSettings,
    audio: &'a AudioSettings,
    video_encoder: &'a VideoEncoderSpec,
    audio_encoder: &'a AudioEncoderSpec,
    aac_element: &'a str,
    muxer: &'a str,
    path: &'a Path,
}

fn build_launch(plan: &LaunchPlan<'_>) -> EngineResult<String> {
    let source = source_fragment(plan.source)?;
    let video = plan.video;
    let format = match video.format {
        PixelFormat::Nv12 => "NV12",
        PixelFormat::I420 => "I420",
    };
    let colorimetry = match video.colorspace {
        Colorspace::Bt601 => "bt601",
        Colorspace::Bt709 => "bt709",
    };
    let fps_rounded = video.fps_num.div_ceil(video.fps_den).max(1);
    let keyint = plan
        .video_encoder
        .keyint_secs
        .saturating_mul(fps_rounded)
        .max(1);
    let pass = match plan.video_encoder.rate_control {
        RateControl::Cbr => "cbr",
    };
    let audio_bitrate = plan.audio_encoder.bitrate_kbps.saturating_mul(1000);
    let path = escape_path(plan.path);

    // queue elements decouple the capture source from the encoder so encoder
    // stalls don't drop frames at the source.
    Ok(format!(
        "{source} ! queue max-size-buffers=200 leaky=downstream ! videoconvert ! videoscale ! videorate \
         ! video/x-raw,format={format},width={w},height={h},framerate={num}/{den},colorimetry={colorimetry} \
         ! queue max-size-buffers=8 ! x264enc bitrate={vbitrate} pass={pass} tune=zerolatency speed-preset=veryfast key-int-max={keyint} \
         ! h264parse ! queue max-size-buffers=8 ! mux. \
         audiotestsrc is-live=true wave=silence ! audio/x-raw,rate={rate},channels={channels} \
         ! audioconvert ! audioresample ! {aac} bitrate={audio_bitrate} ! aacparse ! queue ! mux. \
         {muxer} name=mux ! filesink location=\"{path}\"",
        w = video.width,
        h = video.height,
        num = video.fps_num,
        den = video.fps_den,
        vbitrate = plan.video_encoder.bitrate_kbps,
        rate = plan.audio.sample_rate,
        channels = plan.audio.channels,
        aac = plan.aac_element,
        muxer = plan.muxer,
    ))
}

fn source_fragment(spec: &SourceSpec) -> EngineResult<String> {
    match spec.kind {
        SourceKind::XshmInput => {
            let region = match (
                spec.setting_i64("x"),
                spec.setting_i64("y"),
                spec.setting_u64("width"),
                spec.setting_u64("height"),
            ) {
                (Some(x), Some(y), Some(width), Some(height)) => {
                    x11_capture_region_fragment(Some((x, y, width, height)))?
                }
                _ => String::new(),
            };
            Ok(format!(
                "ximagesrc use-damage=false show-pointer=true{region}"
            ))
        }
        SourceKind::XcompositeInput => {
            let xid = spec
                .setting_u64("window")
                .ok_or_else(|| EngineError::rejected("start_output", "window source has no xid"))?;
            Ok(format!("ximagesrc use-damage=false show-pointer=true xid={xid}"))
        }
        SourceKind::MonitorCapture => match spec.setting_i64("monitor_handle") {
            Some(handle) => Ok(format!(
                "d3d11screencapturesrc show-cursor=true monitor-handle={handle}"
            )),
            None => Ok(format!(
                "d3d11screencapturesrc show-cursor=true monitor-index={}",
                spec.setting_u64("monitor_index").unwrap_or(0)
            )),
        },
        SourceKind::WindowCapture => {
            let window = spec.setting_u64("window").ok_or_else(|| {
                EngineError::rejected("start_output", "window source has no handle")
            })?;
            Ok(format!(
                "d3d11screencapturesrc capture-api=wgc show-cursor=true window-handle={window}"
            ))
        }
        SourceKind::DisplayCapture => Ok(format!(
            "avfvideosrc capture-screen=true capture-screen-cursor=true device-index={}",
            spec.setting_u64("device_index").unwrap_or(0)
        )),
    }
}

fn x11_capture_region_fragment(region: Option<(i64, i64, u64, u64)>) -> EngineResult<String> {
    let Some((x, y, width, height)) = region else {
        return Ok(String::new());
    };
    if width == 0 || height == 0 {
        return Err(EngineError::rejected(
            "start_output",
            format!("invalid X11 capture region {width}x{height} at ({x},{y})"),
        ));
    }
    let endx = i64::try_from(width)
        .ok()
        .and_then(|w| x.checked_add(w - 1))
        .ok_or_else(|| EngineError::rejected("start_output", "X11 capture region x-range overflow"))?;
    let endy = i64::try_from(height)
        .ok()
        .and_then(|h| y.checked_add(h - 1))
        .ok_or_else(|| EngineError::rejected("start_output", "X11 capture region y-range overflow"))?;
    Ok(format!(" startx={x} starty={y} endx={endx} endy={endy}"))
}

fn escape_path(path: &Path) -> String {
    path.to_string_lossy().replace('"', "\\\"")
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::path::PathBuf;

    fn video() -> VideoSettings {
        VideoSettings {
            width: 1280,
            height: 720,
            fps_num: 30,
            fps_den: 1,
            format: PixelFormat::I420,
            colorspace: Colorspace::Bt709,
        }
    }

    #[test]
    fn pipeline_must_reach_playing_to_count_as_started() {
        assert!(playing_reached(Ok(gst::StateChangeSuccess::Success), gst::State::Playing).is_ok());

        let stalled = playing_reached(Ok(gst::StateChangeSuccess::Async), gst::State::Paused)
            .unwrap_err();
        assert!(stalled.contains("still Paused"));

        assert!(playing_reached(Err(gst::StateChangeError), gst::State::Ready).is_err());
    }

    #[test]
    fn x11_region_fragment_uses_inclusive_end_coordinates() {
        let fragment = x11_capture_region_fragment(Some((2560, 0, 2560, 1440))).unwrap();
        assert_eq!(fragment, " startx=2560 starty=0 endx=5119 endy=1439");
    }

    #[test]
    fn x11_region_fragment_rejects_zero_size() {
        let err = x11_capture_region_fragment(Some((0, 0, 0, 1080))).unwrap_err();
        assert!(err.to_string().contains("invalid X11 capture region"));
    }

    #[test]
    fn muxer_follows_extension() {
        assert_eq!(muxer_for_path(Path::new("/tmp/a.MP4")).unwrap(), "mp4mux");
        assert_eq!(muxer_for_path(Path::new("a.mkv")).unwrap(), "matroskamux");
        assert!(muxer_for_path(Path::new("a.avi")).is_err());
        assert!(muxer_for_path(Path::new("noext")).is_err());
    }

    #[test]
    fn launch_wires_source_encoders_and_sink() {
        let source = SourceSpec {
            name: "capture".into(),
            kind: SourceKind::XshmInput,
            settings: json!({ "screen": 0, "x": 1920, "y": 0, "width": 1280, "height": 1024 }),
        };
        let path = PathBuf::from("/tmp/out \"1\".mp4");
        let launch = build_launch(&LaunchPlan {
            source: &source,
            video: &video(),
            audio: &AudioSettings {
                sample_rate: 48_000,
                channels: 2,
            },
            video_encoder: &VideoEncoderSpec {
                name: "video".into(),
                bitrate_kbps: 2500,
                rate_control: RateControl::Cbr,
                keyint_secs: 2,
            },
            audio_encoder: &AudioEncoderSpec {
                name: "audio".into(),
                bitrate_kbps: 160,
                mixer_track: 0,
            },
            aac_element: "avenc_aac",
            muxer: "mp4mux",
            path: &path,
        })
        .unwrap();

        assert!(launch.starts_with(
            "ximagesrc use-damage=false show-pointer=true startx=1920 starty=0 endx=3199 endy=1023"
        ));
        assert!(launch.contains("width=1280,height=720,framerate=30/1"));
        assert!(launch.contains("x264enc bitrate=2500 pass=cbr"));
        assert!(launch.contains("key-int-max=60"));
        assert!(launch.contains("avenc_aac bitrate=160000"));
        assert!(launch.contains("rate=48000,channels=2"));
        assert!(launch.ends_with("mp4mux name=mux ! filesink location=\"/tmp/out \\\"1\\\".mp4\""));
    }

    #[test]
    fn window_source_requires_handle() {
        let source = SourceSpec {
            name: "capture".into(),
            kind: SourceKind::XcompositeInput,
            settings: json!({}),
        };
        assert!(source_fragment(&source).is_err());
    }

    #[test]
    fn calls_before_startup_are_rejected() {
        let engine = GstEngine::new();
        let err = engine.reset_video(&video()).unwrap_err();
        assert_eq!(
            err,
            EngineError::rejected("reset_video", "engine not started")
        );
    }
}

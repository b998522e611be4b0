//! The media engine boundary.
//!
//! An [`Engine`] owns every native capture, encode and mux object and hands
//! out opaque [`ObjectId`]s. Callers never touch engine objects directly;
//! they create, wire, start and release them through this trait. Two
//! implementations ship with the crate: [`gst::GstEngine`] drives GStreamer,
//! [`fake::FakeEngine`] keeps everything in memory for tests and dry runs.

use std::fmt;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};

pub mod fake;
pub mod gst;

pub use fake::{FailPoint, FakeEngine};
pub use gst::GstEngine;

/// Handle to an engine-owned object.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ObjectId(pub u64);

impl fmt::Display for ObjectId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Failure reported by the engine.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum EngineError {
    #[error("engine startup failed: {reason}")]
    StartupFailed { reason: String },

    #[error("{operation} rejected: {reason}")]
    Rejected {
        operation: &'static str,
        reason: String,
    },

    #[error("unknown engine object {0}")]
    UnknownObject(ObjectId),
}

impl EngineError {
    pub fn rejected(operation: &'static str, reason: impl Into<String>) -> Self {
        Self::Rejected {
            operation,
            reason: reason.into(),
        }
    }
}

pub type EngineResult<T> = Result<T, EngineError>;

/// Raw frame layout of the global video mix.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PixelFormat {
    Nv12,
    I420,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Colorspace {
    Bt601,
    Bt709,
}

/// Parameters of the global video mix.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VideoSettings {
    pub width: u32,
    pub height: u32,
    pub fps_num: u32,
    pub fps_den: u32,
    pub format: PixelFormat,
    pub colorspace: Colorspace,
}

/// Parameters of the global audio mix.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AudioSettings {
    pub sample_rate: u32,
    pub channels: u32,
}

/// Engine-level source types.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SourceKind {
    /// Windows desktop duplication of one monitor.
    MonitorCapture,
    /// macOS capture of one display.
    DisplayCapture,
    /// X11 shared-memory capture of one screen region.
    XshmInput,
    /// X11 capture of one composited window.
    XcompositeInput,
    /// Windows or macOS capture of one window.
    WindowCapture,
}

impl SourceKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            SourceKind::MonitorCapture => "monitor_capture",
            SourceKind::DisplayCapture => "display_capture",
            SourceKind::XshmInput => "xshm_input",
            SourceKind::XcompositeInput => "xcomposite_input",
            SourceKind::WindowCapture => "window_capture",
        }
    }
}

impl fmt::Display for SourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Everything the engine needs to instantiate a capture source.
#[derive(Debug, Clone, PartialEq)]
pub struct SourceSpec {
    pub name: String,
    pub kind: SourceKind,
    /// Kind-specific settings, e.g. `{"screen": 1}` or `{"window": 1234}`.
    pub settings: serde_json::Value,
}

impl SourceSpec {
    pub fn setting_u64(&self, key: &str) -> Option<u64> {
        self.settings.get(key).and_then(serde_json::Value::as_u64)
    }

    pub fn setting_i64(&self, key: &str) -> Option<i64> {
        self.settings.get(key).and_then(serde_json::Value::as_i64)
    }

    pub fn setting_str(&self, key: &str) -> Option<&str> {
        self.settings.get(key).and_then(serde_json::Value::as_str)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RateControl {
    Cbr,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VideoEncoderSpec {
    pub name: String,
    pub bitrate_kbps: u32,
    pub rate_control: RateControl,
    /// Keyframe interval in seconds.
    pub keyint_secs: u32,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AudioEncoderSpec {
    pub name: String,
    pub bitrate_kbps: u32,
    /// Mixer track the encoder reads from.
    pub mixer_track: u32,
}

/// A file output fed by one video and one audio encoder.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutputSpec {
    pub name: String,
    pub path: PathBuf,
    pub video_encoder: ObjectId,
    pub audio_encoder: ObjectId,
    pub mixer_track: u32,
}

/// Object-handle API of the media engine.
///
/// Methods take `&self`; implementations serialize access internally. Every
/// id returned by a `create_*` call is owned by the caller and must be passed
/// to [`Engine::release`] exactly once. Scene sources obtained through
/// [`Engine::scene_source`] are borrowed from their scene and die with it.
pub trait Engine: Send + Sync {
    /// Human-readable engine version, if known.
    fn version(&self) -> Option<String>;

    fn startup(&self) -> EngineResult<()>;

    /// Tear down the engine, dropping every object still alive.
    fn shutdown(&self);

    fn reset_video(&self, settings: &VideoSettings) -> EngineResult<()>;

    fn reset_audio(&self, settings: &AudioSettings) -> EngineResult<()>;

    /// Load capture/encode modules. Repeated calls are no-ops.
    fn load_modules(&self);

    fn create_source(&self, spec: &SourceSpec) -> EngineResult<ObjectId>;

    fn create_scene(&self, name: &str) -> ObjectId;

    fn scene_add(&self, scene: ObjectId, source: ObjectId);

    /// The composite source rendering `scene`.
    fn scene_source(&self, scene: ObjectId) -> ObjectId;

    /// Create a video encoder bound to the global video mix.
    fn create_video_encoder(&self, spec: &VideoEncoderSpec) -> EngineResult<ObjectId>;

    /// Create an audio encoder bound to the global audio mix.
    fn create_audio_encoder(&self, spec: &AudioEncoderSpec) -> EngineResult<ObjectId>;

    fn create_output(&self, spec: &OutputSpec) -> EngineResult<ObjectId>;

    /// Mark `source` showing and active, and render it on output `channel`.
    fn activate_source(&self, source: ObjectId, channel: u32);

    /// Undo [`Engine::activate_source`].
    fn deactivate_source(&self, source: ObjectId, channel: u32);

    fn start_output(&self, output: ObjectId) -> EngineResult<()>;

    fn stop_output(&self, output: ObjectId) -> EngineResult<()>;

    fn release(&self, object: ObjectId);
}

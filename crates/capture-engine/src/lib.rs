//! screenrec Capture Engine
//!
//! Orchestrates a screen or window recording into a single media file. The
//! capture engine owns the engine lifecycle, builds the per-session engine
//! object graph in the order the engine requires, and unwinds it on any
//! failure so no native object outlives its session.
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────┐
//! │                    Recorder                      │
//! │  ┌────────────┐ ┌───────────┐ ┌───────────────┐  │
//! │  │ Permission │ │ Engine    │ │ Capture       │  │
//! │  │ Gate       │ │ Lifecycle │ │ Backend       │  │
//! │  └────────────┘ └─────┬─────┘ └───────┬───────┘  │
//! │                       │               │          │
//! │  ┌────────────────────▼───────────────▼───────┐  │
//! │  │ SessionController → PipelineBuilder        │  │
//! │  │ source → scene → encoders → file output    │  │
//! │  └────────────────────┬───────────────────────┘  │
//! │                       ▼                          │
//! │             Engine (GStreamer / fake)            │
//! └──────────────────────────────────────────────────┘
//! ```

pub mod backend;
pub mod engine;
pub mod error;
pub mod lifecycle;
pub mod permission;
pub mod pipeline;
pub mod recorder;
pub mod session;

pub use error::{SessionError, SessionErrorKind, SessionResult};
pub use lifecycle::EngineLifecycle;
pub use recorder::{RecordOptions, Recorder, RecorderStatus};
pub use session::*;

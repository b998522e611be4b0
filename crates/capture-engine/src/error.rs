//! Recording session errors.

use serde::Serialize;

use crate::engine::EngineError;

/// Why a recording could not be started.
///
/// Engine-derived variants carry the engine's diagnostic.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SessionError {
    #[error("screen recording permission denied")]
    PermissionDenied,

    #[error("engine not initialized")]
    NotInitialized,

    #[error("invalid recording config: {reason}")]
    InvalidConfig { reason: String },

    #[error("video reset failed: {reason}")]
    VideoResetFailed { reason: String },

    #[error("audio reset failed: {reason}")]
    AudioResetFailed { reason: String },

    #[error("capture source creation failed: {reason}")]
    SourceCreateFailed { reason: String },

    #[error("video encoder creation failed: {reason}")]
    VideoEncoderFailed { reason: String },

    #[error("audio encoder creation failed: {reason}")]
    AudioEncoderFailed { reason: String },

    #[error("file output creation failed: {reason}")]
    OutputCreateFailed { reason: String },

    #[error("file output failed to start: {reason}")]
    OutputStartFailed { reason: String },

    #[error("engine startup failed: {reason}")]
    EngineStartupFailed { reason: String },
}

/// The kind of a [`SessionError`], without its diagnostic.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionErrorKind {
    PermissionDenied,
    NotInitialized,
    InvalidConfig,
    VideoResetFailed,
    AudioResetFailed,
    SourceCreateFailed,
    VideoEncoderFailed,
    AudioEncoderFailed,
    OutputCreateFailed,
    OutputStartFailed,
    EngineStartupFailed,
}

impl SessionError {
    pub fn kind(&self) -> SessionErrorKind {
        match self {
            SessionError::PermissionDenied => SessionErrorKind::PermissionDenied,
            SessionError::NotInitialized => SessionErrorKind::NotInitialized,
            SessionError::InvalidConfig { .. } => SessionErrorKind::InvalidConfig,
            SessionError::VideoResetFailed { .. } => SessionErrorKind::VideoResetFailed,
            SessionError::AudioResetFailed { .. } => SessionErrorKind::AudioResetFailed,
            SessionError::SourceCreateFailed { .. } => SessionErrorKind::SourceCreateFailed,
            SessionError::VideoEncoderFailed { .. } => SessionErrorKind::VideoEncoderFailed,
            SessionError::AudioEncoderFailed { .. } => SessionErrorKind::AudioEncoderFailed,
            SessionError::OutputCreateFailed { .. } => SessionErrorKind::OutputCreateFailed,
            SessionError::OutputStartFailed { .. } => SessionErrorKind::OutputStartFailed,
            SessionError::EngineStartupFailed { .. } => SessionErrorKind::EngineStartupFailed,
        }
    }

    pub fn invalid_config(reason: impl Into<String>) -> Self {
        Self::InvalidConfig {
            reason: reason.into(),
        }
    }

    pub fn source(reason: impl Into<String>) -> Self {
        Self::SourceCreateFailed {
            reason: reason.into(),
        }
    }

    /// A failed `engine_init`. Construction steps map their own kinds.
    pub fn engine_startup(err: EngineError) -> Self {
        let reason = match err {
            EngineError::StartupFailed { reason } => reason,
            EngineError::Rejected { operation, reason } => {
                format!("startup rejected by {operation}: {reason}")
            }
            EngineError::UnknownObject(id) => format!("startup referenced unknown object {id}"),
        };
        Self::EngineStartupFailed { reason }
    }
}

pub type SessionResult<T> = Result<T, SessionError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn kind_strips_diagnostic() {
        let err = SessionError::VideoResetFailed {
            reason: "1281x720 is not representable in 4:2:0".into(),
        };
        assert_eq!(err.kind(), SessionErrorKind::VideoResetFailed);
        assert!(err.to_string().contains("1281x720"));
    }

    #[test]
    fn startup_failure_keeps_engine_reason() {
        let err = SessionError::engine_startup(EngineError::StartupFailed {
            reason: "no plugins".into(),
        });
        assert_eq!(
            err,
            SessionError::EngineStartupFailed {
                reason: "no plugins".into()
            }
        );
    }

    #[test]
    fn startup_rejection_names_the_operation() {
        let err = SessionError::engine_startup(EngineError::rejected("startup", "no display"));
        assert_eq!(err.kind(), SessionErrorKind::EngineStartupFailed);
        assert!(err.to_string().contains("startup rejected by startup: no display"));
    }
}

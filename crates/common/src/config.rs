//! Application configuration.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::error::{ScreenrecError, ScreenrecResult};

/// Global application configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    /// Default recording settings.
    pub recording: RecordingDefaults,

    /// Fixed encoder and audio bus parameters.
    pub encoding: EncodingDefaults,

    /// Logging configuration.
    pub logging: LoggingConfig,
}

/// Default recording parameters, applied when a caller omits an option.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RecordingDefaults {
    /// Output width in pixels.
    pub width: u32,

    /// Output height in pixels.
    pub height: u32,

    /// Frames per second.
    pub fps: u32,

    /// Refuse to start a recording while screen capture is unauthorized.
    pub require_permission: bool,
}

/// Encoder parameters. These are fixed for the lifetime of the process.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EncodingDefaults {
    /// Constant video bitrate in kbit/s.
    pub video_bitrate_kbps: u32,

    /// Constant audio bitrate in kbit/s.
    pub audio_bitrate_kbps: u32,

    /// Audio bus sample rate in Hz.
    pub audio_sample_rate: u32,

    /// Audio bus channel count.
    pub audio_channels: u32,
}

/// Logging configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Log level filter (e.g., "info", "debug", "screenrec=debug,warn").
    pub level: String,

    /// Whether to output structured JSON logs.
    pub json: bool,

    /// Optional log file path. Records are appended.
    pub file: Option<PathBuf>,
}

impl Default for RecordingDefaults {
    fn default() -> Self {
        Self {
            width: 1280,
            height: 720,
            fps: 30,
            require_permission: true,
        }
    }
}

impl Default for EncodingDefaults {
    fn default() -> Self {
        Self {
            video_bitrate_kbps: 2500,
            audio_bitrate_kbps: 160,
            audio_sample_rate: 48000,
            audio_channels: 2,
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            json: false,
            file: None,
        }
    }
}

impl AppConfig {
    /// Load config from the standard location, falling back to defaults.
    pub fn load() -> Self {
        let config_path = config_file_path();
        if !config_path.exists() {
            return Self::default();
        }
        match Self::load_from(&config_path) {
            Ok(config) => config,
            Err(e) => {
                tracing::warn!("Failed to load config at {:?}: {}", config_path, e);
                Self::default()
            }
        }
    }

    /// Load config from an explicit path.
    pub fn load_from(path: &Path) -> ScreenrecResult<Self> {
        if !path.exists() {
            return Err(ScreenrecError::FileNotFound {
                path: path.to_path_buf(),
            });
        }
        let content = std::fs::read_to_string(path)?;
        let config: Self = serde_json::from_str(&content)?;
        config.validate()?;
        Ok(config)
    }

    /// Reject values no encoder or audio bus could accept.
    pub fn validate(&self) -> ScreenrecResult<()> {
        let r = &self.recording;
        if r.width == 0 || r.height == 0 || r.fps == 0 {
            return Err(ScreenrecError::config(format!(
                "recording defaults must be positive, got {}x{}@{}",
                r.width, r.height, r.fps
            )));
        }
        let e = &self.encoding;
        if e.video_bitrate_kbps == 0 || e.audio_bitrate_kbps == 0 {
            return Err(ScreenrecError::config("encoder bitrates must be positive"));
        }
        if e.audio_sample_rate == 0 || !(1..=8).contains(&e.audio_channels) {
            return Err(ScreenrecError::config(format!(
                "unsupported audio layout: {} Hz, {} channels",
                e.audio_sample_rate, e.audio_channels
            )));
        }
        Ok(())
    }

    /// Save config to the standard location.
    pub fn save(&self) -> Result<(), std::io::Error> {
        let config_path = config_file_path();
        if let Some(parent) = config_path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let json = serde_json::to_string_pretty(self).map_err(std::io::Error::other)?;
        std::fs::write(config_path, json)
    }
}

/// Standard config file location.
pub fn config_file_path() -> PathBuf {
    let base = std::env::var("XDG_CONFIG_HOME")
        .map(PathBuf::from)
        .unwrap_or_else(|_| {
            let home = std::env::var("HOME").unwrap_or_else(|_| "/tmp".to_string());
            PathBuf::from(home).join(".config")
        });
    base.join("screenrec").join("config.json")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_recording_contract() {
        let config = AppConfig::default();
        assert_eq!(config.recording.width, 1280);
        assert_eq!(config.recording.height, 720);
        assert_eq!(config.recording.fps, 30);
        assert_eq!(config.encoding.audio_sample_rate, 48000);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn partial_file_fills_missing_sections_with_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");
        std::fs::write(&path, r#"{ "recording": { "fps": 60 } }"#).unwrap();

        let config = AppConfig::load_from(&path).unwrap();
        assert_eq!(config.recording.fps, 60);
        assert_eq!(config.recording.width, 1280);
        assert_eq!(config.logging.level, "info");
    }

    #[test]
    fn zero_fps_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");
        std::fs::write(&path, r#"{ "recording": { "fps": 0 } }"#).unwrap();

        let err = AppConfig::load_from(&path).unwrap_err();
        assert!(matches!(err, ScreenrecError::Config { .. }));
    }

    #[test]
    fn missing_file_is_reported() {
        let err = AppConfig::load_from(Path::new("/nonexistent/screenrec.json")).unwrap_err();
        assert!(matches!(err, ScreenrecError::FileNotFound { .. }));
    }
}

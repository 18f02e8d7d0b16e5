//! Configuration loading
//!
//! Settings live in a TOML file. Every section and field is optional and
//! falls back to the defaults below.

use crate::capture::{CameraFacing, CaptureOptions, FlashMode, VideoQuality};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Configuration errors
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read {path}: {source}")]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Invalid TOML in {path}: {source}")]
    Parse {
        path: PathBuf,
        source: toml::de::Error,
    },

    #[error("Failed to serialize configuration: {0}")]
    Serialize(#[from] toml::ser::Error),
}

/// Root configuration structure
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
#[serde(default)]
pub struct Config {
    pub capture: CaptureConfig,
    pub tools: ToolsConfig,
    pub pipeline: PipelineConfig,
    pub navigation: NavigationConfig,
}

/// Camera and recording session settings
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct CaptureConfig {
    pub quality: VideoQuality,
    pub video_bitrate: u64,
    pub max_duration_secs: u32,
    pub max_file_size_bytes: u64,
    /// Camera selected when a session opens
    pub facing: CameraFacing,
    pub flash: FlashMode,
    /// FFmpeg input format (v4l2, avfoundation, dshow)
    pub input_format: String,
    pub front_device: String,
    pub back_device: String,
    /// Where raw clips are written
    pub clips_dir: PathBuf,
}

/// External tool locations
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct ToolsConfig {
    pub ffmpeg: PathBuf,
    pub ffprobe: PathBuf,
}

/// Post-processing settings
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct PipelineConfig {
    /// x264 preset for the per-clip transcode
    pub preset: String,
    /// Where merged videos are written
    pub output_dir: PathBuf,
}

/// Navigation settings
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct NavigationConfig {
    pub preview_route: String,
}

fn data_dir() -> PathBuf {
    dirs::data_local_dir()
        .unwrap_or_else(std::env::temp_dir)
        .join("clipstitch")
}

impl Default for CaptureConfig {
    fn default() -> Self {
        let base = CaptureOptions::default();
        let (input_format, front_device, back_device) = default_input();
        Self {
            quality: base.quality,
            video_bitrate: base.video_bitrate,
            max_duration_secs: base.max_duration_secs,
            max_file_size_bytes: base.max_file_size_bytes,
            facing: base.facing,
            flash: base.flash,
            input_format: input_format.to_string(),
            front_device: front_device.to_string(),
            back_device: back_device.to_string(),
            clips_dir: data_dir().join("clips"),
        }
    }
}

fn default_input() -> (&'static str, &'static str, &'static str) {
    #[cfg(target_os = "macos")]
    {
        ("avfoundation", "1", "0")
    }

    #[cfg(target_os = "windows")]
    {
        ("dshow", "video=Front Camera", "video=Rear Camera")
    }

    #[cfg(not(any(target_os = "macos", target_os = "windows")))]
    {
        ("v4l2", "/dev/video1", "/dev/video0")
    }
}

impl Default for ToolsConfig {
    fn default() -> Self {
        Self {
            ffmpeg: PathBuf::from("ffmpeg"),
            ffprobe: PathBuf::from("ffprobe"),
        }
    }
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            preset: "ultrafast".to_string(),
            output_dir: data_dir().join("output"),
        }
    }
}

impl Default for NavigationConfig {
    fn default() -> Self {
        Self {
            preview_route: "preview".to_string(),
        }
    }
}

impl CaptureConfig {
    /// Base session options before facing/flash are applied
    pub fn base_options(&self) -> CaptureOptions {
        CaptureOptions {
            quality: self.quality,
            video_bitrate: self.video_bitrate,
            max_duration_secs: self.max_duration_secs,
            max_file_size_bytes: self.max_file_size_bytes,
            mirror_video: false,
            facing: self.facing,
            flash: self.flash,
        }
    }
}

impl Config {
    /// Default config file location (`<config dir>/clipstitch/config.toml`)
    pub fn default_path() -> Option<PathBuf> {
        dirs::config_dir().map(|dir| dir.join("clipstitch").join("config.toml"))
    }

    /// Load configuration from a TOML file
    ///
    /// Returns an error if the file contains invalid TOML.
    /// Missing fields will use default values.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        toml::from_str(&content).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Load from an explicit path, or from the default location if it exists.
    ///
    /// An explicit path must exist; a missing default file yields defaults.
    pub fn load_or_default(path: Option<&Path>) -> Result<Self, ConfigError> {
        if let Some(path) = path {
            return Self::load(path);
        }

        match Self::default_path() {
            Some(path) if path.exists() => {
                tracing::debug!("Loading configuration from {:?}", path);
                Self::load(&path)
            }
            _ => Ok(Self::default()),
        }
    }

    /// Render as TOML
    pub fn to_toml(&self) -> Result<String, ConfigError> {
        Ok(toml::to_string_pretty(self)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_partial_file_uses_defaults() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(
            file,
            "[capture]\nquality = \"1080p\"\nfacing = \"front\"\n\n[pipeline]\npreset = \"veryfast\""
        )
        .unwrap();

        let config = Config::load(file.path()).unwrap();
        assert_eq!(config.capture.quality, VideoQuality::P1080);
        assert_eq!(config.capture.facing, CameraFacing::Front);
        assert_eq!(config.capture.max_duration_secs, 60);
        assert_eq!(config.pipeline.preset, "veryfast");
        assert_eq!(config.navigation.preview_route, "preview");
        assert_eq!(config.tools.ffmpeg, PathBuf::from("ffmpeg"));
    }

    #[test]
    fn test_invalid_toml_is_an_error() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "[capture\nquality = ").unwrap();

        let err = Config::load(file.path()).unwrap_err();
        assert!(matches!(err, ConfigError::Parse { .. }));
    }

    #[test]
    fn test_missing_explicit_path_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let err = Config::load_or_default(Some(&dir.path().join("nope.toml"))).unwrap_err();
        assert!(matches!(err, ConfigError::Read { .. }));
    }

    #[test]
    fn test_round_trips_through_toml() {
        let config = Config::default();
        let rendered = config.to_toml().unwrap();
        let parsed: Config = toml::from_str(&rendered).unwrap();
        assert_eq!(parsed, config);
    }

    #[test]
    fn test_base_options_never_mirror() {
        let config = CaptureConfig {
            facing: CameraFacing::Front,
            ..CaptureConfig::default()
        };
        let options = config.base_options();
        assert!(!options.mirror_video);
        assert_eq!(options.facing, CameraFacing::Front);
    }
}

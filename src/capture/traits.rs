//! Capture trait definitions
//!
//! Platform-agnostic types and the trait every camera backend implements.

use crate::recorder::state::ClipRecord;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Which camera the session records from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CameraFacing {
    Front,
    #[default]
    Back,
}

impl CameraFacing {
    /// The opposite camera
    pub fn toggled(self) -> Self {
        match self {
            CameraFacing::Front => CameraFacing::Back,
            CameraFacing::Back => CameraFacing::Front,
        }
    }
}

/// Flash / torch behaviour during capture
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FlashMode {
    Off,
    #[default]
    On,
    Auto,
    Torch,
}

impl FlashMode {
    /// Next mode in the Off -> On -> Auto -> Torch cycle
    pub fn next(self) -> Self {
        match self {
            FlashMode::Off => FlashMode::On,
            FlashMode::On => FlashMode::Auto,
            FlashMode::Auto => FlashMode::Torch,
            FlashMode::Torch => FlashMode::Off,
        }
    }
}

/// Recording resolution presets
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum VideoQuality {
    #[serde(rename = "480p")]
    P480,
    #[default]
    #[serde(rename = "720p")]
    P720,
    #[serde(rename = "1080p")]
    P1080,
    #[serde(rename = "2160p")]
    P2160,
}

impl VideoQuality {
    /// Output frame size (width, height)
    pub fn dimensions(&self) -> (u32, u32) {
        match self {
            VideoQuality::P480 => (640, 480),
            VideoQuality::P720 => (1280, 720),
            VideoQuality::P1080 => (1920, 1080),
            VideoQuality::P2160 => (3840, 2160),
        }
    }
}

/// Options applied to a single recording session.
///
/// A copy is taken when the session starts, so changing facing or flash
/// mid-recording only affects the next session.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CaptureOptions {
    pub quality: VideoQuality,
    /// Target bitrate in bits per second
    pub video_bitrate: u64,
    /// Session stops on its own after this many seconds
    pub max_duration_secs: u32,
    /// Session stops on its own once the file reaches this size
    pub max_file_size_bytes: u64,
    /// Mirror the recording horizontally (front camera lens flip)
    pub mirror_video: bool,
    pub facing: CameraFacing,
    pub flash: FlashMode,
}

impl Default for CaptureOptions {
    fn default() -> Self {
        Self {
            quality: VideoQuality::P720,
            video_bitrate: 40 * 1000 * 1000,
            max_duration_secs: 60,
            max_file_size_bytes: 250 * (1 << 20),
            mirror_video: false,
            facing: CameraFacing::Back,
            flash: FlashMode::On,
        }
    }
}

impl CaptureOptions {
    /// Options for a session on the given camera. Mirroring follows the facing.
    pub fn for_facing(&self, facing: CameraFacing, flash: FlashMode) -> Self {
        Self {
            mirror_video: facing == CameraFacing::Front,
            facing,
            flash,
            ..self.clone()
        }
    }
}

/// Capture errors
#[derive(Error, Debug)]
pub enum CaptureError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Device not ready: {0}")]
    NotReady(String),

    #[error("Already recording")]
    AlreadyRecording,

    #[error("Not recording")]
    NotRecording,

    #[error("Recording session failed: {0}")]
    SessionFailed(String),
}

pub type CaptureResult<T> = Result<T, CaptureError>;

/// A camera that records one clip per session.
///
/// `record` resolves once the device has finished writing the clip, either
/// because `stop` was called or because a duration/size limit was reached.
#[async_trait]
pub trait CaptureDevice: Send + Sync {
    /// Stable identifier for logging
    fn id(&self) -> &str;

    /// Whether the device has finished initialising
    fn is_ready(&self) -> bool;

    /// Record a clip with the given options and wait for it to complete
    async fn record(&self, options: &CaptureOptions) -> CaptureResult<ClipRecord>;

    /// Ask the active session to finish
    async fn stop(&self) -> CaptureResult<()>;
}

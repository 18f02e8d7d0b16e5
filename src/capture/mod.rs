//! Camera capture
//!
//! The `CaptureDevice` trait plus the FFmpeg-backed implementation.

pub mod ffmpeg;
pub mod traits;

pub use ffmpeg::FfmpegCaptureDevice;
pub use traits::{
    CameraFacing, CaptureDevice, CaptureError, CaptureOptions, CaptureResult, FlashMode,
    VideoQuality,
};

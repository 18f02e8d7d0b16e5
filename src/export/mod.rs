//! Clip post-processing
//!
//! This module transcodes recorded clips, merges them into a single video
//! and validates the result.

pub mod ffmpeg;
pub mod pipeline;
pub mod traits;
pub mod types;

pub use ffmpeg::{FfmpegMerger, FfmpegTranscoder, FfprobeInspector};
pub use pipeline::PostProcessPipeline;
pub use traits::{MediaInspector, Merger, Transcoder};
pub use types::{
    ExportError, MergeOutcome, MergeProgress, PipelineError, PipelineOutput, PipelineProgress,
    TranscodeJob, VideoInfo,
};

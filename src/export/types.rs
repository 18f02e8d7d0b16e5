//! Export types
//!
//! Transcode jobs, merge results, probe metadata, pipeline progress and the
//! errors raised along the way.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Suffix appended to a clip's stem to name its transcoded output
pub const TRANSCODED_SUFFIX: &str = "_output.mov";

/// Name the transcoded output for a clip: `<dir>/<stem>_output.mov`
pub fn transcoded_output_path(input: &Path) -> PathBuf {
    let stem = input
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default();
    input.with_file_name(format!("{}{}", stem, TRANSCODED_SUFFIX))
}

/// One re-encode of a clip through the filter tool
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TranscodeJob {
    pub input: PathBuf,
    pub output: PathBuf,
    /// Apply a horizontal flip
    pub flip: bool,
    /// Encoder preset
    pub preset: String,
}

impl TranscodeJob {
    /// Job for the clip at `index`: odd positions are flipped
    pub fn for_clip(index: usize, input: &Path, preset: &str) -> Self {
        Self {
            input: input.to_path_buf(),
            output: transcoded_output_path(input),
            flip: index % 2 == 1,
            preset: preset.to_string(),
        }
    }

    /// Tool arguments: `-i <input> [-vf hflip] -preset <preset> <output>`
    pub fn args(&self) -> Vec<String> {
        let mut args = vec!["-i".to_string(), self.input.to_string_lossy().into_owned()];
        if self.flip {
            args.extend(["-vf".to_string(), "hflip".to_string()]);
        }
        args.extend([
            "-preset".to_string(),
            self.preset.clone(),
            self.output.to_string_lossy().into_owned(),
        ]);
        args
    }

    /// Arguments joined for logging
    pub fn command_line(&self) -> String {
        self.args().join(" ")
    }
}

/// Merge progress, parsed from `ffmpeg -progress`
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MergeProgress {
    /// Output time written so far (milliseconds)
    pub processed_ms: u64,
    /// FFmpeg reported `progress=end`
    pub finished: bool,
}

/// Result of a merge call
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MergeOutcome {
    /// Merged file, absent when the merge did not produce one
    pub output: Option<PathBuf>,
    /// Status lines reported by the merge tool
    pub log: Vec<String>,
}

/// Video metadata from the inspector
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VideoInfo {
    pub width: u32,
    pub height: u32,
    pub fps: f64,
    /// Container duration in seconds, if reported
    pub duration_secs: Option<f64>,
    pub codec: String,
}

impl VideoInfo {
    /// Duration, if present and strictly positive
    pub fn playable_duration(&self) -> Option<f64> {
        self.duration_secs.filter(|d| *d > 0.0)
    }
}

/// Pipeline progress stages
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", tag = "stage")]
pub enum PipelineProgress {
    /// Transcode of clip `index` (of `total`) started
    Transcoding { index: usize, total: usize },
    /// Transcode of clip `index` finished
    Transcoded { index: usize, output: PathBuf },
    /// Merge progress
    Merging(MergeProgress),
    /// Inspecting the merged file
    Inspecting { video: PathBuf },
}

/// Validated result of a pipeline run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PipelineOutput {
    pub video: PathBuf,
    pub duration_secs: f64,
    pub size_bytes: u64,
    /// Transcoded intermediates, in clip order
    pub transcoded: Vec<PathBuf>,
}

/// Export errors (tool invocation and probing)
#[derive(Error, Debug)]
pub enum ExportError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("FFmpeg error: {0}")]
    Ffmpeg(String),

    #[error("FFprobe error: {0}")]
    Probe(String),

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),
}

pub type ExportResult<T> = Result<T, ExportError>;

/// Reasons a pipeline run is abandoned
#[derive(Error, Debug)]
pub enum PipelineError {
    #[error("No clips to process")]
    NoClips,

    #[error("Transcode of clip {index} exited with code {code}")]
    TranscodeFailed { index: usize, code: i32 },

    #[error("Merge produced no output: {0}")]
    MergeFailed(String),

    #[error("Merged file {path:?} has no playable duration")]
    InvalidOutput { path: PathBuf },

    #[error(transparent)]
    Export(#[from] ExportError),
}

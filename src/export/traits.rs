//! Post-processing tool seams

use crate::export::types::{ExportResult, MergeOutcome, MergeProgress, TranscodeJob, VideoInfo};
use async_trait::async_trait;
use std::path::{Path, PathBuf};

/// Callback receiving merge progress updates
pub type MergeProgressFn<'a> = &'a (dyn Fn(MergeProgress) + Send + Sync);

/// Runs one transcode and reports the tool's completion code
#[async_trait]
pub trait Transcoder: Send + Sync {
    /// Returns the process exit code. `Err` means the tool could not be run.
    async fn execute(&self, job: &TranscodeJob) -> ExportResult<i32>;
}

/// Concatenates an ordered list of videos into one file
#[async_trait]
pub trait Merger: Send + Sync {
    async fn merge(
        &self,
        inputs: &[PathBuf],
        progress: MergeProgressFn<'_>,
    ) -> ExportResult<MergeOutcome>;
}

/// Reads metadata of a finished file
#[async_trait]
pub trait MediaInspector: Send + Sync {
    async fn video_info(&self, path: &Path) -> ExportResult<VideoInfo>;

    async fn file_size(&self, path: &Path) -> ExportResult<u64>;
}

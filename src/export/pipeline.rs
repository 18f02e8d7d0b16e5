//! Post-processing pipeline
//!
//! Transcodes every clip in order (odd positions flipped), merges the
//! results and validates the merged file.

use crate::config::{PipelineConfig, ToolsConfig};
use crate::export::ffmpeg::{FfmpegMerger, FfmpegTranscoder, FfprobeInspector};
use crate::export::traits::{MediaInspector, Merger, Transcoder};
use crate::export::types::{
    MergeProgress, PipelineError, PipelineOutput, PipelineProgress, TranscodeJob,
};
use crate::recorder::state::ClipRecord;
use std::path::PathBuf;
use std::sync::Arc;

/// Transcode-then-merge over an ordered clip sequence
pub struct PostProcessPipeline {
    transcoder: Arc<dyn Transcoder>,
    merger: Arc<dyn Merger>,
    inspector: Arc<dyn MediaInspector>,
    preset: String,
}

impl PostProcessPipeline {
    /// Create a new pipeline
    pub fn new(
        transcoder: Arc<dyn Transcoder>,
        merger: Arc<dyn Merger>,
        inspector: Arc<dyn MediaInspector>,
        preset: impl Into<String>,
    ) -> Self {
        Self {
            transcoder,
            merger,
            inspector,
            preset: preset.into(),
        }
    }

    /// Pipeline backed by the configured `ffmpeg`/`ffprobe` binaries
    pub fn from_config(pipeline: &PipelineConfig, tools: &ToolsConfig) -> Self {
        Self::new(
            Arc::new(FfmpegTranscoder::new(&tools.ffmpeg)),
            Arc::new(FfmpegMerger::new(&tools.ffmpeg, &pipeline.output_dir)),
            Arc::new(FfprobeInspector::new(&tools.ffprobe)),
            pipeline.preset.clone(),
        )
    }

    /// Run the pipeline over `clips`.
    ///
    /// Transcodes run one at a time in clip order; output names derive from
    /// the clip, and the merge must see them in the original order.
    pub async fn run<F>(
        &self,
        clips: &[ClipRecord],
        progress: F,
    ) -> Result<PipelineOutput, PipelineError>
    where
        F: Fn(PipelineProgress) + Send + Sync,
    {
        if clips.is_empty() {
            return Err(PipelineError::NoClips);
        }

        tracing::info!("Starting post-processing of {} clips", clips.len());

        // 1. Transcode
        let total = clips.len();
        let mut transcoded: Vec<PathBuf> = Vec::with_capacity(total);
        for (index, clip) in clips.iter().enumerate() {
            let job = TranscodeJob::for_clip(index, &clip.path(), &self.preset);
            progress(PipelineProgress::Transcoding { index, total });

            let code = self.transcoder.execute(&job).await?;
            tracing::info!("FFmpeg process exited with rc={}.", code);
            if code != 0 {
                return Err(PipelineError::TranscodeFailed { index, code });
            }

            progress(PipelineProgress::Transcoded {
                index,
                output: job.output.clone(),
            });
            transcoded.push(job.output);
        }

        // 2. Merge (only reached with an output for every clip)
        let on_merge = |update: MergeProgress| progress(PipelineProgress::Merging(update));
        let outcome = self.merger.merge(&transcoded, &on_merge).await?;
        tracing::debug!("Merge status: {:?}", outcome.log);
        let video = outcome
            .output
            .ok_or_else(|| PipelineError::MergeFailed(outcome.log.join("; ")))?;

        // 3. Validate
        progress(PipelineProgress::Inspecting {
            video: video.clone(),
        });
        let info = self.inspector.video_info(&video).await?;
        let size_bytes = self.inspector.file_size(&video).await?;

        let Some(duration_secs) = info.playable_duration() else {
            return Err(PipelineError::InvalidOutput { path: video });
        };

        tracing::info!(
            "Merged video {:?}: {:.2}s, {} bytes",
            video,
            duration_secs,
            size_bytes
        );

        Ok(PipelineOutput {
            video,
            duration_secs,
            size_bytes,
            transcoded,
        })
    }
}

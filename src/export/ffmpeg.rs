//! FFmpeg and FFprobe backed post-processing tools
//!
//! Each tool is invoked as an external process. Transcodes report the raw
//! exit code; merges use the concat demuxer with a temporary manifest.

use crate::export::traits::{MediaInspector, MergeProgressFn, Merger, Transcoder};
use crate::export::types::{
    ExportError, ExportResult, MergeOutcome, MergeProgress, TranscodeJob, VideoInfo,
};
use async_trait::async_trait;
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::process::Command;
use uuid::Uuid;

/// Re-encodes clips with the `ffmpeg` binary
pub struct FfmpegTranscoder {
    binary: PathBuf,
}

impl FfmpegTranscoder {
    pub fn new(binary: impl Into<PathBuf>) -> Self {
        Self {
            binary: binary.into(),
        }
    }
}

#[async_trait]
impl Transcoder for FfmpegTranscoder {
    async fn execute(&self, job: &TranscodeJob) -> ExportResult<i32> {
        tracing::debug!("Running FFmpeg transcode: {}", job.command_line());

        let output = Command::new(&self.binary)
            .args(["-y", "-hide_banner", "-loglevel", "error"])
            .args(job.args())
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::piped())
            .output()
            .await
            .map_err(|e| ExportError::Ffmpeg(format!("Failed to start FFmpeg: {}", e)))?;

        // Killed by a signal: no exit code
        let code = output.status.code().unwrap_or(-1);
        if code != 0 {
            tracing::warn!(
                "FFmpeg transcode of {:?} failed: {}",
                job.input,
                String::from_utf8_lossy(&output.stderr).trim()
            );
        }

        Ok(code)
    }
}

/// Concatenates videos with the FFmpeg concat demuxer (stream copy)
pub struct FfmpegMerger {
    binary: PathBuf,
    output_dir: PathBuf,
}

impl FfmpegMerger {
    pub fn new(binary: impl Into<PathBuf>, output_dir: impl Into<PathBuf>) -> Self {
        Self {
            binary: binary.into(),
            output_dir: output_dir.into(),
        }
    }
}

#[async_trait]
impl Merger for FfmpegMerger {
    async fn merge(
        &self,
        inputs: &[PathBuf],
        progress: MergeProgressFn<'_>,
    ) -> ExportResult<MergeOutcome> {
        if inputs.is_empty() {
            return Err(ExportError::InvalidConfig("No videos to merge".to_string()));
        }

        tokio::fs::create_dir_all(&self.output_dir).await?;

        // Manifest entries resolve relative to the manifest, so use absolute paths
        let mut absolute = Vec::with_capacity(inputs.len());
        for input in inputs {
            absolute.push(
                tokio::fs::canonicalize(input)
                    .await
                    .unwrap_or_else(|_| input.clone()),
            );
        }

        let manifest = tempfile::Builder::new()
            .prefix("concat-")
            .suffix(".txt")
            .tempfile_in(&self.output_dir)?;
        tokio::fs::write(manifest.path(), build_concat_manifest(&absolute)).await?;

        let output_path = self
            .output_dir
            .join(format!("merged-{}.mov", Uuid::new_v4()));

        tracing::info!(
            "Merging {} videos into {:?}",
            inputs.len(),
            output_path
        );

        let mut child = Command::new(&self.binary)
            .args([
                "-y",
                "-hide_banner",
                "-loglevel",
                "error",
                "-nostats",
                "-f",
                "concat",
                "-safe",
                "0",
                "-i",
            ])
            .arg(manifest.path())
            .args(["-c", "copy", "-progress", "pipe:1"])
            .arg(&output_path)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(|e| ExportError::Ffmpeg(format!("Failed to start FFmpeg: {}", e)))?;

        let stdout = child
            .stdout
            .take()
            .ok_or_else(|| ExportError::Ffmpeg("Failed to capture FFmpeg stdout".to_string()))?;
        let stderr = child
            .stderr
            .take()
            .ok_or_else(|| ExportError::Ffmpeg("Failed to capture FFmpeg stderr".to_string()))?;

        let stderr_task = tokio::spawn(async move {
            let mut lines = BufReader::new(stderr).lines();
            let mut collected = Vec::new();
            while let Ok(Some(line)) = lines.next_line().await {
                collected.push(line);
            }
            collected
        });

        let mut current = MergeProgress {
            processed_ms: 0,
            finished: false,
        };
        let mut lines = BufReader::new(stdout).lines();
        while let Some(line) = lines.next_line().await? {
            if let Some(update) = apply_progress_line(&mut current, &line) {
                progress(update);
            }
        }

        let status = child.wait().await?;
        let mut log = stderr_task.await.unwrap_or_default();

        if status.success() && output_path.exists() {
            log.push(format!("merged {} videos", inputs.len()));
            Ok(MergeOutcome {
                output: Some(output_path),
                log,
            })
        } else {
            log.push(format!("ffmpeg exited with {}", status));
            tracing::warn!("FFmpeg merge failed: {}", log.join("; "));
            Ok(MergeOutcome { output: None, log })
        }
    }
}

/// Build a concat demuxer manifest, one `file '<path>'` line per input
pub fn build_concat_manifest(inputs: &[PathBuf]) -> String {
    inputs
        .iter()
        .map(|p| format!("file '{}'", p.to_string_lossy().replace('\'', "'\\''")))
        .collect::<Vec<_>>()
        .join("\n")
}

/// Fold one `-progress` key=value line into `current`.
///
/// Returns an update when a `progress=` line closes a report block.
fn apply_progress_line(current: &mut MergeProgress, line: &str) -> Option<MergeProgress> {
    let (key, value) = line.trim().split_once('=')?;
    match key {
        // Both keys carry microseconds
        "out_time_us" | "out_time_ms" => {
            if let Ok(us) = value.parse::<u64>() {
                current.processed_ms = us / 1000;
            }
            None
        }
        "progress" => {
            current.finished = value == "end";
            Some(*current)
        }
        _ => None,
    }
}

/// Reads metadata with the `ffprobe` binary
pub struct FfprobeInspector {
    binary: PathBuf,
}

impl FfprobeInspector {
    pub fn new(binary: impl Into<PathBuf>) -> Self {
        Self {
            binary: binary.into(),
        }
    }
}

#[async_trait]
impl MediaInspector for FfprobeInspector {
    async fn video_info(&self, path: &Path) -> ExportResult<VideoInfo> {
        let output = Command::new(&self.binary)
            .args([
                "-v",
                "quiet",
                "-print_format",
                "json",
                "-show_streams",
                "-show_format",
                "-select_streams",
                "v:0",
            ])
            .arg(path)
            .stdin(Stdio::null())
            .output()
            .await
            .map_err(|e| ExportError::Probe(format!("Failed to run ffprobe: {}", e)))?;

        if !output.status.success() {
            return Err(ExportError::Probe(format!(
                "ffprobe failed for {:?}: {}",
                path,
                String::from_utf8_lossy(&output.stderr).trim()
            )));
        }

        parse_probe_output(&String::from_utf8_lossy(&output.stdout))
    }

    async fn file_size(&self, path: &Path) -> ExportResult<u64> {
        Ok(tokio::fs::metadata(path).await?.len())
    }
}

#[derive(Debug, Deserialize)]
struct ProbeOutput {
    #[serde(default)]
    streams: Vec<ProbeStream>,
    format: Option<ProbeFormat>,
}

#[derive(Debug, Deserialize)]
struct ProbeStream {
    width: Option<u32>,
    height: Option<u32>,
    codec_name: Option<String>,
    r_frame_rate: Option<String>,
    duration: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ProbeFormat {
    duration: Option<String>,
}

/// Parse `ffprobe -print_format json` output into `VideoInfo`
pub fn parse_probe_output(json: &str) -> ExportResult<VideoInfo> {
    let probe: ProbeOutput = serde_json::from_str(json)
        .map_err(|e| ExportError::Probe(format!("Failed to parse ffprobe output: {}", e)))?;

    let stream = probe
        .streams
        .into_iter()
        .next()
        .ok_or_else(|| ExportError::Probe("No video stream found".to_string()))?;

    // Format duration is more reliable than the stream's
    let duration_secs = probe
        .format
        .and_then(|f| f.duration)
        .or(stream.duration)
        .and_then(|d| d.parse::<f64>().ok());

    Ok(VideoInfo {
        width: stream.width.unwrap_or(0),
        height: stream.height.unwrap_or(0),
        fps: stream
            .r_frame_rate
            .as_deref()
            .map(parse_frame_rate)
            .unwrap_or(0.0),
        duration_secs,
        codec: stream.codec_name.unwrap_or_else(|| "unknown".to_string()),
    })
}

/// Parse a frame rate given as "30/1", "30000/1001" or "29.97"
fn parse_frame_rate(rate: &str) -> f64 {
    match rate.split_once('/') {
        Some((num, den)) => {
            let num: f64 = num.parse().unwrap_or(0.0);
            let den: f64 = den.parse().unwrap_or(1.0);
            if den > 0.0 {
                num / den
            } else {
                0.0
            }
        }
        None => rate.parse().unwrap_or(0.0),
    }
}

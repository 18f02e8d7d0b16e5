//! Command runners behind the CLI

use crate::capture::{CameraFacing, FfmpegCaptureDevice};
use crate::cli::{SessionCommand, SESSION_HELP};
use crate::config::Config;
use crate::export::{FfprobeInspector, MediaInspector, PipelineProgress, PostProcessPipeline};
use crate::navigation::ChannelNavigator;
use crate::recorder::{ClipRecord, RecordingOrchestrator, SessionEvent, SessionState};
use crate::utils::error::{AppError, AppResult, ErrorResponse};
use serde::Serialize;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::broadcast::error::RecvError;
use tokio::task::JoinHandle;

/// Writes results to stdout, as JSON lines or plain text
#[derive(Debug, Clone, Copy)]
pub struct Reporter {
    json: bool,
}

impl Reporter {
    pub fn new(json: bool) -> Self {
        Self { json }
    }

    fn print<T: Serialize>(&self, value: &T, text: impl FnOnce() -> String) {
        if self.json {
            match serde_json::to_string(value) {
                Ok(line) => println!("{}", line),
                Err(e) => tracing::error!("Failed to serialize output: {}", e),
            }
        } else {
            println!("{}", text());
        }
    }

    pub fn event(&self, event: &SessionEvent) {
        self.print(event, || describe(event));
    }

    pub fn error(&self, error: AppError) {
        if self.json {
            let response = ErrorResponse::from(error);
            self.print(&response, String::new);
        } else {
            eprintln!("error: {}", error);
        }
    }
}

/// Human-readable line for an event
pub fn describe(event: &SessionEvent) -> String {
    match event {
        SessionEvent::Started {
            facing,
            mirror_video,
        } => {
            let mirror = if *mirror_video { ", mirrored" } else { "" };
            format!("Recording ({:?} camera{})", facing, mirror)
        }
        SessionEvent::StartDeferred => "Camera not ready, recording will start shortly".to_string(),
        SessionEvent::StopRequested => "Stopping...".to_string(),
        SessionEvent::ClipCaptured { clip } => format!("Clip {}: {}", clip.index + 1, clip.uri),
        SessionEvent::RecordingFailed { message } => format!("Recording failed: {}", message),
        SessionEvent::FacingChanged {
            facing,
            mirror_video,
        } => format!("Camera: {:?} (mirror={})", facing, mirror_video),
        SessionEvent::FlashChanged { flash } => format!("Flash: {:?}", flash),
        SessionEvent::Processing { clips } => format!("Processing {} clips", clips),
        SessionEvent::Progress { progress } => describe_progress(progress),
        SessionEvent::Completed { output } => format!(
            "Merged video {} ({:.2}s, {} bytes)",
            output.video.display(),
            output.duration_secs,
            output.size_bytes
        ),
        SessionEvent::Failed { message } => {
            format!("Processing failed: {} (clips kept; retry or discard)", message)
        }
        SessionEvent::Discarded { clips } => format!("Discarded {} clips", clips),
    }
}

fn describe_progress(progress: &PipelineProgress) -> String {
    match progress {
        PipelineProgress::Transcoding { index, total } => {
            format!("  transcoding {}/{}", index + 1, total)
        }
        PipelineProgress::Transcoded { output, .. } => format!("  wrote {}", output.display()),
        PipelineProgress::Merging(update) if update.finished => "  merge finished".to_string(),
        PipelineProgress::Merging(update) => {
            format!("  merging {:.1}s", update.processed_ms as f64 / 1000.0)
        }
        PipelineProgress::Inspecting { video } => format!("  checking {}", video.display()),
    }
}

/// Interactive recording session
pub async fn run_record_command(mut config: Config, front: bool, reporter: Reporter) -> AppResult<()> {
    if front {
        config.capture.facing = CameraFacing::Front;
    }

    let device = Arc::new(FfmpegCaptureDevice::new(&config.capture, &config.tools));
    let pipeline = PostProcessPipeline::from_config(&config.pipeline, &config.tools);
    let (navigator, mut navigation) = ChannelNavigator::new();
    let orchestrator = RecordingOrchestrator::new(
        device.clone(),
        pipeline,
        Arc::new(navigator),
        config.capture.base_options(),
        config.navigation.preview_route.clone(),
    );

    let mut events = orchestrator.subscribe();
    tokio::spawn(async move {
        loop {
            match events.recv().await {
                Ok(event) => reporter.event(&event),
                Err(RecvError::Lagged(skipped)) => {
                    tracing::warn!("Dropped {} session events", skipped);
                }
                Err(RecvError::Closed) => break,
            }
        }
    });

    tokio::spawn(async move {
        while let Some(request) = navigation.recv().await {
            reporter.print(&request, || {
                format!("Preview ready: {}", request.params.video.display())
            });
        }
    });

    // Camera opens in the background; an early start waits for it
    let opener = orchestrator.clone();
    tokio::spawn(async move {
        match device.open().await {
            Ok(()) => {
                opener.on_device_ready().await;
            }
            Err(e) => reporter.error(e.into()),
        }
    });

    if !reporter.json {
        eprintln!("{}", SESSION_HELP);
    }

    let mut tasks: Vec<JoinHandle<()>> = Vec::new();
    let mut lines = BufReader::new(tokio::io::stdin()).lines();

    while let Some(line) = lines.next_line().await? {
        let Some(command) = SessionCommand::parse(&line) else {
            eprintln!("{}", SESSION_HELP);
            continue;
        };

        match command {
            SessionCommand::Toggle => {
                let orchestrator = orchestrator.clone();
                tasks.push(tokio::spawn(async move {
                    if let Err(e) = orchestrator.start_or_stop().await {
                        reporter.error(e);
                    }
                }));
            }
            SessionCommand::SwitchCamera => {
                orchestrator.switch_facing();
            }
            SessionCommand::CycleFlash => {
                orchestrator.cycle_flash_mode();
            }
            SessionCommand::Retry => {
                let orchestrator = orchestrator.clone();
                tasks.push(tokio::spawn(async move {
                    if let Err(e) = orchestrator.retry().await {
                        reporter.error(e);
                    }
                }));
            }
            SessionCommand::Discard => {
                if let Err(e) = orchestrator.discard() {
                    reporter.error(e);
                }
            }
            SessionCommand::Status => {
                let snapshot = orchestrator.snapshot();
                reporter.print(&snapshot, || {
                    format!(
                        "{:?}: {} clips, {:?} camera, flash {:?}",
                        snapshot.state,
                        snapshot.clips.len(),
                        snapshot.facing,
                        snapshot.flash
                    )
                });
            }
            SessionCommand::Quit => break,
        }
        tasks.retain(|task| !task.is_finished());
    }

    // Finish the active session and let its processing complete
    if orchestrator.state() == SessionState::Recording {
        if let Err(e) = orchestrator.start_or_stop().await {
            reporter.error(e);
        }
    }
    for task in tasks {
        if let Err(e) = task.await {
            tracing::error!("Session task failed: {}", e);
        }
    }

    Ok(())
}

/// Run the pipeline over clips already on disk
pub async fn run_process_command(config: Config, clips: Vec<PathBuf>, reporter: Reporter) -> AppResult<()> {
    let pipeline = PostProcessPipeline::from_config(&config.pipeline, &config.tools);
    let records: Vec<ClipRecord> = clips
        .iter()
        .enumerate()
        .map(|(index, path)| ClipRecord::new(path.to_string_lossy(), index))
        .collect();

    let output = pipeline
        .run(&records, |progress| {
            reporter.print(&progress, || describe_progress(&progress));
        })
        .await?;

    reporter.print(&output, || format!("{}", output.video.display()));
    Ok(())
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct ProbeReport {
    #[serde(flatten)]
    info: crate::export::VideoInfo,
    size_bytes: u64,
}

/// Print metadata for one video as JSON
pub async fn run_probe_command(config: Config, file: &Path) -> AppResult<()> {
    let inspector = FfprobeInspector::new(&config.tools.ffprobe);
    let info = inspector.video_info(file).await?;
    let size_bytes = inspector.file_size(file).await?;

    let report = ProbeReport { info, size_bytes };
    println!("{}", serde_json::to_string_pretty(&report)?);
    Ok(())
}

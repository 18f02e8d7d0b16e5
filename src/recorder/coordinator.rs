//! Recording orchestrator
//!
//! Drives capture sessions from user input and, once a session has produced
//! a clip, runs the post-processing pipeline and hands the merged video to
//! navigation.

use super::state::{ClipRecord, SessionContext, SessionSnapshot, SessionState};
use crate::capture::{CameraFacing, CaptureDevice, CaptureOptions, FlashMode};
use crate::export::{PipelineOutput, PipelineProgress, PostProcessPipeline};
use crate::navigation::{Navigator, PreviewParams};
use crate::utils::error::{AppError, AppResult};
use parking_lot::Mutex;
use serde::Serialize;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::sync::broadcast;

/// Events emitted during a session
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase", tag = "event")]
pub enum SessionEvent {
    /// Capture session started
    Started {
        facing: CameraFacing,
        mirror_video: bool,
    },
    /// Start requested before the device was ready
    StartDeferred,
    /// Stop requested from the device
    StopRequested,
    /// Capture session completed with a clip
    ClipCaptured { clip: ClipRecord },
    /// Capture session failed; no clip was added
    RecordingFailed { message: String },
    FacingChanged {
        facing: CameraFacing,
        mirror_video: bool,
    },
    FlashChanged { flash: FlashMode },
    /// Post-processing started
    Processing { clips: usize },
    /// Post-processing progress
    Progress { progress: PipelineProgress },
    /// Merged video validated and handed to navigation
    Completed { output: PipelineOutput },
    /// Post-processing failed; clips retained
    Failed { message: String },
    /// Retained clips dropped
    Discarded { clips: usize },
}

/// Result of a start/stop toggle
#[derive(Debug, Clone, PartialEq)]
pub enum ToggleOutcome {
    /// A session ran to completion. `preview` is set when the pipeline
    /// produced a merged video.
    Captured {
        clip: ClipRecord,
        preview: Option<PathBuf>,
    },
    /// Device not ready yet; recording starts on `on_device_ready`
    Deferred,
    /// A deferred start was cancelled before it reached the device
    PendingCancelled,
    /// The active session was asked to stop
    StopRequested,
    /// The session failed and was abandoned
    RecordingFailed,
}

struct Inner {
    device: Arc<dyn CaptureDevice>,
    pipeline: PostProcessPipeline,
    navigator: Arc<dyn Navigator>,
    preview_route: String,
    context: Mutex<SessionContext>,
    event_tx: broadcast::Sender<SessionEvent>,
}

/// Coordinates capture and post-processing for one screen's lifetime
#[derive(Clone)]
pub struct RecordingOrchestrator {
    inner: Arc<Inner>,
}

impl RecordingOrchestrator {
    /// Create a new orchestrator
    pub fn new(
        device: Arc<dyn CaptureDevice>,
        pipeline: PostProcessPipeline,
        navigator: Arc<dyn Navigator>,
        base_options: CaptureOptions,
        preview_route: impl Into<String>,
    ) -> Self {
        let (event_tx, _) = broadcast::channel(100);
        Self {
            inner: Arc::new(Inner {
                device,
                pipeline,
                navigator,
                preview_route: preview_route.into(),
                context: Mutex::new(SessionContext::new(base_options)),
                event_tx,
            }),
        }
    }

    /// Subscribe to session events
    pub fn subscribe(&self) -> broadcast::Receiver<SessionEvent> {
        self.inner.event_tx.subscribe()
    }

    /// Get the current session state
    pub fn state(&self) -> SessionState {
        self.inner.context.lock().state
    }

    /// Current state, camera settings and retained clips
    pub fn snapshot(&self) -> SessionSnapshot {
        SessionSnapshot::from(&*self.inner.context.lock())
    }

    fn emit(&self, event: SessionEvent) {
        let _ = self.inner.event_tx.send(event);
    }

    /// Start a session if none is active, otherwise stop the active one.
    ///
    /// Starting waits for the session to finish, appends the clip and runs
    /// post-processing before returning. Refused while processing.
    pub async fn start_or_stop(&self) -> AppResult<ToggleOutcome> {
        enum Action {
            Record(CaptureOptions),
            Defer,
            CancelPending,
            Stop,
        }

        let action = {
            let mut ctx = self.inner.context.lock();
            match ctx.state {
                SessionState::Processing => return Err(AppError::Busy),
                SessionState::Recording if ctx.pending_start => {
                    ctx.abandon_recording();
                    Action::CancelPending
                }
                SessionState::Recording => Action::Stop,
                SessionState::Idle | SessionState::Done | SessionState::Failed => {
                    let ready = self.inner.device.is_ready();
                    ctx.begin_recording(!ready);
                    if ready {
                        Action::Record(ctx.capture_options())
                    } else {
                        Action::Defer
                    }
                }
            }
        };

        match action {
            Action::Record(options) => Ok(self.capture(options).await),
            Action::Defer => {
                tracing::info!(
                    "Device {} not ready; recording will start when it is",
                    self.inner.device.id()
                );
                self.emit(SessionEvent::StartDeferred);
                Ok(ToggleOutcome::Deferred)
            }
            Action::CancelPending => {
                tracing::info!("Cancelled deferred recording");
                Ok(ToggleOutcome::PendingCancelled)
            }
            Action::Stop => {
                tracing::info!("Stopping recording");
                self.emit(SessionEvent::StopRequested);
                if let Err(e) = self.inner.device.stop().await {
                    tracing::warn!("Failed to stop capture session: {}", e);
                }
                Ok(ToggleOutcome::StopRequested)
            }
        }
    }

    /// Device finished initialising. Runs a start that was deferred.
    pub async fn on_device_ready(&self) -> Option<ToggleOutcome> {
        let options = {
            let mut ctx = self.inner.context.lock();
            if ctx.state != SessionState::Recording || !ctx.pending_start {
                return None;
            }
            ctx.pending_start = false;
            ctx.capture_options()
        };

        tracing::info!("Device {} ready, starting deferred recording", self.inner.device.id());
        Some(self.capture(options).await)
    }

    /// Toggle front/back camera. Takes effect on the next session.
    pub fn switch_facing(&self) -> CameraFacing {
        let (facing, mirror_video) = {
            let mut ctx = self.inner.context.lock();
            ctx.facing = ctx.facing.toggled();
            (ctx.facing, ctx.capture_options().mirror_video)
        };

        tracing::info!("Camera facing {:?} (mirror={})", facing, mirror_video);
        self.emit(SessionEvent::FacingChanged {
            facing,
            mirror_video,
        });
        facing
    }

    /// Advance the flash mode. Takes effect on the next session.
    pub fn cycle_flash_mode(&self) -> FlashMode {
        let flash = {
            let mut ctx = self.inner.context.lock();
            ctx.flash = ctx.flash.next();
            ctx.flash
        };

        tracing::info!("Flash mode {:?}", flash);
        self.emit(SessionEvent::FlashChanged { flash });
        flash
    }

    /// Re-run post-processing over retained clips after a failure
    pub async fn retry(&self) -> AppResult<Option<PathBuf>> {
        let clips = {
            let mut ctx = self.inner.context.lock();
            if ctx.state != SessionState::Failed || ctx.clips.is_empty() {
                return Err(AppError::InvalidState(ctx.state));
            }
            ctx.state = SessionState::Processing;
            ctx.clips.clone()
        };

        tracing::info!("Retrying post-processing of {} clips", clips.len());
        Ok(self.run_pipeline(clips).await)
    }

    /// Drop retained clips and return to idle
    pub fn discard(&self) -> AppResult<usize> {
        let dropped = {
            let mut ctx = self.inner.context.lock();
            if !ctx.state.can_discard() {
                return Err(AppError::InvalidState(ctx.state));
            }
            let dropped = ctx.clips.len();
            ctx.clips.clear();
            ctx.finished = false;
            ctx.state = SessionState::Idle;
            dropped
        };

        tracing::info!("Discarded {} clips", dropped);
        self.emit(SessionEvent::Discarded { clips: dropped });
        Ok(dropped)
    }

    /// Record one clip, then post-process if the session is ready
    async fn capture(&self, options: CaptureOptions) -> ToggleOutcome {
        tracing::info!(
            "Starting recording on {} ({:?}, mirror={})",
            self.inner.device.id(),
            options.facing,
            options.mirror_video
        );
        self.emit(SessionEvent::Started {
            facing: options.facing,
            mirror_video: options.mirror_video,
        });

        match self.inner.device.record(&options).await {
            Ok(record) => {
                let clip = self.inner.context.lock().push_clip(record.uri);
                tracing::info!("Captured clip {}: {}", clip.index, clip.uri);
                self.emit(SessionEvent::ClipCaptured { clip: clip.clone() });

                let preview = self.process_if_ready().await;
                ToggleOutcome::Captured { clip, preview }
            }
            Err(e) => {
                tracing::error!("Recording failed: {}", e);
                self.inner.context.lock().abandon_recording();
                self.emit(SessionEvent::RecordingFailed {
                    message: e.to_string(),
                });
                ToggleOutcome::RecordingFailed
            }
        }
    }

    async fn process_if_ready(&self) -> Option<PathBuf> {
        let clips = {
            let mut ctx = self.inner.context.lock();
            if !ctx.ready_to_process() {
                return None;
            }
            ctx.state = SessionState::Processing;
            ctx.clips.clone()
        };

        self.run_pipeline(clips).await
    }

    /// Run the pipeline. State must already be `Processing`.
    async fn run_pipeline(&self, clips: Vec<ClipRecord>) -> Option<PathBuf> {
        self.emit(SessionEvent::Processing { clips: clips.len() });

        let events = self.inner.event_tx.clone();
        let result = self
            .inner
            .pipeline
            .run(&clips, move |progress| {
                let _ = events.send(SessionEvent::Progress { progress });
            })
            .await;

        match result {
            Ok(output) => {
                self.inner.navigator.navigate(
                    &self.inner.preview_route,
                    PreviewParams {
                        video: output.video.clone(),
                    },
                );
                {
                    let mut ctx = self.inner.context.lock();
                    ctx.clips.clear();
                    ctx.finished = false;
                    ctx.state = SessionState::Done;
                }
                let video = output.video.clone();
                self.emit(SessionEvent::Completed { output });
                Some(video)
            }
            Err(e) => {
                tracing::error!("Post-processing failed: {}", e);
                self.inner.context.lock().state = SessionState::Failed;
                self.emit(SessionEvent::Failed {
                    message: e.to_string(),
                });
                None
            }
        }
    }
}

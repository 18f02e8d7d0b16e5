//! In-memory fakes for the capture and export seams

use crate::capture::{CaptureDevice, CaptureError, CaptureOptions, CaptureResult};
use crate::export::traits::{MediaInspector, MergeProgressFn, Merger, Transcoder};
use crate::export::types::{ExportResult, MergeOutcome, MergeProgress, TranscodeJob, VideoInfo};
use crate::recorder::state::ClipRecord;
use async_trait::async_trait;
use parking_lot::Mutex;
use std::collections::VecDeque;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use tokio::sync::Notify;

/// Records jobs; optionally fails one call with a non-zero code, or holds
/// each call until released
#[derive(Default)]
pub struct FakeTranscoder {
    jobs: Mutex<Vec<TranscodeJob>>,
    failure: Mutex<Option<(usize, i32)>>,
    gate: Option<Notify>,
    entered: Notify,
}

impl FakeTranscoder {
    /// Fail the `call`-th execution (0-based, across runs) once with `code`
    pub fn failing_at(call: usize, code: i32) -> Self {
        Self {
            failure: Mutex::new(Some((call, code))),
            ..Self::default()
        }
    }

    /// Each execution waits for `release` before finishing
    pub fn gated() -> Self {
        Self {
            gate: Some(Notify::new()),
            ..Self::default()
        }
    }

    pub fn jobs(&self) -> Vec<TranscodeJob> {
        self.jobs.lock().clone()
    }

    /// Wait until an execution is in flight
    pub async fn wait_entered(&self) {
        self.entered.notified().await;
    }

    /// Let one held execution finish
    pub fn release(&self) {
        if let Some(gate) = &self.gate {
            gate.notify_one();
        }
    }
}

#[async_trait]
impl Transcoder for FakeTranscoder {
    async fn execute(&self, job: &TranscodeJob) -> ExportResult<i32> {
        let code = {
            let mut jobs = self.jobs.lock();
            let call = jobs.len();
            jobs.push(job.clone());

            let mut failure = self.failure.lock();
            match *failure {
                Some((at, code)) if at == call => {
                    *failure = None;
                    code
                }
                _ => 0,
            }
        };

        self.entered.notify_one();
        if let Some(gate) = &self.gate {
            gate.notified().await;
        }
        Ok(code)
    }
}

/// Records merge inputs and returns a fixed output
pub struct FakeMerger {
    calls: Mutex<Vec<Vec<PathBuf>>>,
    output: Option<PathBuf>,
}

impl FakeMerger {
    pub fn producing(output: impl Into<PathBuf>) -> Self {
        Self {
            calls: Mutex::new(Vec::new()),
            output: Some(output.into()),
        }
    }

    pub fn without_output() -> Self {
        Self {
            calls: Mutex::new(Vec::new()),
            output: None,
        }
    }

    pub fn calls(&self) -> Vec<Vec<PathBuf>> {
        self.calls.lock().clone()
    }
}

#[async_trait]
impl Merger for FakeMerger {
    async fn merge(
        &self,
        inputs: &[PathBuf],
        progress: MergeProgressFn<'_>,
    ) -> ExportResult<MergeOutcome> {
        self.calls.lock().push(inputs.to_vec());
        progress(MergeProgress {
            processed_ms: 1000,
            finished: true,
        });
        Ok(MergeOutcome {
            output: self.output.clone(),
            log: vec!["fake merge".to_string()],
        })
    }
}

/// Reports a configurable duration
pub struct FakeInspector {
    duration: Mutex<Option<f64>>,
}

impl FakeInspector {
    pub fn with_duration(duration: Option<f64>) -> Self {
        Self {
            duration: Mutex::new(duration),
        }
    }

    pub fn set_duration(&self, duration: Option<f64>) {
        *self.duration.lock() = duration;
    }
}

#[async_trait]
impl MediaInspector for FakeInspector {
    async fn video_info(&self, _path: &Path) -> ExportResult<VideoInfo> {
        Ok(VideoInfo {
            width: 1280,
            height: 720,
            fps: 30.0,
            duration_secs: *self.duration.lock(),
            codec: "h264".to_string(),
        })
    }

    async fn file_size(&self, _path: &Path) -> ExportResult<u64> {
        Ok(1024)
    }
}

/// Camera whose sessions finish when `stop` is called
pub struct FakeCaptureDevice {
    ready: AtomicBool,
    uris: Mutex<VecDeque<String>>,
    options: Mutex<Vec<CaptureOptions>>,
    fail_next: AtomicBool,
    stops: AtomicUsize,
    started: Notify,
    stop_signal: Notify,
}

impl FakeCaptureDevice {
    pub fn new(uris: &[&str]) -> Self {
        Self {
            ready: AtomicBool::new(true),
            uris: Mutex::new(uris.iter().map(|u| u.to_string()).collect()),
            options: Mutex::new(Vec::new()),
            fail_next: AtomicBool::new(false),
            stops: AtomicUsize::new(0),
            started: Notify::new(),
            stop_signal: Notify::new(),
        }
    }

    pub fn set_ready(&self, ready: bool) {
        self.ready.store(ready, Ordering::SeqCst);
    }

    pub fn fail_next_session(&self) {
        self.fail_next.store(true, Ordering::SeqCst);
    }

    /// Options passed to each `record` call, in order
    pub fn recorded_options(&self) -> Vec<CaptureOptions> {
        self.options.lock().clone()
    }

    pub fn stop_count(&self) -> usize {
        self.stops.load(Ordering::SeqCst)
    }

    /// Wait until a `record` call is in flight
    pub async fn wait_started(&self) {
        self.started.notified().await;
    }
}

#[async_trait]
impl CaptureDevice for FakeCaptureDevice {
    fn id(&self) -> &str {
        "fake-camera"
    }

    fn is_ready(&self) -> bool {
        self.ready.load(Ordering::SeqCst)
    }

    async fn record(&self, options: &CaptureOptions) -> CaptureResult<ClipRecord> {
        let index = {
            let mut seen = self.options.lock();
            seen.push(options.clone());
            seen.len() - 1
        };
        self.started.notify_one();

        if self.fail_next.swap(false, Ordering::SeqCst) {
            return Err(CaptureError::SessionFailed("simulated failure".to_string()));
        }

        self.stop_signal.notified().await;

        let uri = self
            .uris
            .lock()
            .pop_front()
            .unwrap_or_else(|| format!("clip{}.mp4", index));
        Ok(ClipRecord::new(uri, index))
    }

    async fn stop(&self) -> CaptureResult<()> {
        self.stops.fetch_add(1, Ordering::SeqCst);
        self.stop_signal.notify_one();
        Ok(())
    }
}

/// Write an executable `/bin/sh` script standing in for an external tool
#[cfg(unix)]
pub fn write_tool_script(dir: &Path, name: &str, body: &str) -> PathBuf {
    use std::os::unix::fs::PermissionsExt;

    let path = dir.join(name);
    std::fs::write(&path, format!("#!/bin/sh\n{}\n", body)).expect("write tool script");
    std::fs::set_permissions(&path, std::fs::Permissions::from_mode(0o755))
        .expect("make tool script executable");
    path
}

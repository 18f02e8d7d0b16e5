//! Camera capture through FFmpeg
//!
//! Each session spawns one `ffmpeg` process reading from the platform
//! camera input (v4l2, avfoundation or dshow) and encoding to H.264.
//! Writing `q` to its stdin ends the session cleanly.

use crate::capture::traits::{
    CameraFacing, CaptureDevice, CaptureError, CaptureOptions, CaptureResult, FlashMode,
};
use crate::config::{CaptureConfig, ToolsConfig};
use crate::recorder::state::ClipRecord;
use async_trait::async_trait;
use parking_lot::Mutex;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use tokio::io::AsyncWriteExt;
use tokio::process::{ChildStdin, Command};

/// FFmpeg-backed camera
pub struct FfmpegCaptureDevice {
    id: String,
    ffmpeg: PathBuf,
    input_format: String,
    front_device: String,
    back_device: String,
    clips_dir: PathBuf,
    next_index: AtomicUsize,
    ready: AtomicBool,
    /// Stdin of the active session, used to stop it
    active: Mutex<Option<ChildStdin>>,
    /// Stop arrived before the session's process was running
    stop_requested: AtomicBool,
}

impl FfmpegCaptureDevice {
    pub fn new(capture: &CaptureConfig, tools: &ToolsConfig) -> Self {
        Self {
            id: format!("ffmpeg-{}", capture.input_format),
            ffmpeg: tools.ffmpeg.clone(),
            input_format: capture.input_format.clone(),
            front_device: capture.front_device.clone(),
            back_device: capture.back_device.clone(),
            clips_dir: capture.clips_dir.clone(),
            next_index: AtomicUsize::new(0),
            ready: AtomicBool::new(false),
            active: Mutex::new(None),
            stop_requested: AtomicBool::new(false),
        }
    }

    /// Prepare the clips directory and check that FFmpeg runs.
    ///
    /// The device reports ready only after this succeeds.
    pub async fn open(&self) -> CaptureResult<()> {
        tokio::fs::create_dir_all(&self.clips_dir).await?;

        let status = Command::new(&self.ffmpeg)
            .args(["-hide_banner", "-version"])
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .status()
            .await
            .map_err(|e| CaptureError::NotReady(format!("Failed to run {:?}: {}", self.ffmpeg, e)))?;

        if !status.success() {
            return Err(CaptureError::NotReady(format!(
                "{:?} -version exited with {}",
                self.ffmpeg, status
            )));
        }

        self.ready.store(true, Ordering::SeqCst);
        tracing::info!(
            "Capture device {} ready, clips in {:?}",
            self.id,
            self.clips_dir
        );
        Ok(())
    }

    /// Write `q` to the active session, if any
    async fn send_quit(&self) -> CaptureResult<()> {
        let stdin = self.active.lock().take();
        if let Some(mut stdin) = stdin {
            stdin.write_all(b"q").await?;
            stdin.flush().await?;
        }
        Ok(())
    }

    fn device_for(&self, facing: CameraFacing) -> &str {
        match facing {
            CameraFacing::Front => &self.front_device,
            CameraFacing::Back => &self.back_device,
        }
    }

    /// Arguments for one capture session writing to `output`
    pub fn build_args(&self, options: &CaptureOptions, output: &Path) -> Vec<String> {
        let (width, height) = options.quality.dimensions();

        let mut filters = vec![format!("scale={}:{}", width, height)];
        if options.mirror_video {
            filters.push("hflip".to_string());
        }

        let mut args = vec![
            "-y".to_string(),
            "-hide_banner".to_string(),
            "-loglevel".to_string(),
            "error".to_string(),
            "-f".to_string(),
            self.input_format.clone(),
            "-i".to_string(),
            self.device_for(options.facing).to_string(),
            "-t".to_string(),
            options.max_duration_secs.to_string(),
            "-fs".to_string(),
            options.max_file_size_bytes.to_string(),
            "-vf".to_string(),
            filters.join(","),
            "-c:v".to_string(),
            "libx264".to_string(),
            "-preset".to_string(),
            "veryfast".to_string(),
            "-b:v".to_string(),
            options.video_bitrate.to_string(),
            "-pix_fmt".to_string(),
            "yuv420p".to_string(),
        ];
        args.push(output.to_string_lossy().into_owned());
        args
    }
}

#[async_trait]
impl CaptureDevice for FfmpegCaptureDevice {
    fn id(&self) -> &str {
        &self.id
    }

    fn is_ready(&self) -> bool {
        self.ready.load(Ordering::SeqCst)
    }

    async fn record(&self, options: &CaptureOptions) -> CaptureResult<ClipRecord> {
        if !self.is_ready() {
            return Err(CaptureError::NotReady(self.id.clone()));
        }
        let busy = self.active.lock().is_some();
        if busy {
            return Err(CaptureError::AlreadyRecording);
        }

        let index = self.next_index.fetch_add(1, Ordering::SeqCst);
        let output = self.clips_dir.join(format!(
            "clip-{}-{}.mp4",
            chrono::Utc::now().format("%Y%m%d-%H%M%S"),
            index
        ));

        if options.flash != FlashMode::Off {
            tracing::debug!("Flash mode {:?} has no FFmpeg equivalent; ignored", options.flash);
        }

        let args = self.build_args(options, &output);
        tracing::debug!("Starting FFmpeg capture: {:?}", args);

        let mut child = Command::new(&self.ffmpeg)
            .args(&args)
            .stdin(Stdio::piped())
            .stdout(Stdio::null())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(|e| CaptureError::SessionFailed(format!("Failed to start FFmpeg: {}", e)))?;

        let stdin = child
            .stdin
            .take()
            .ok_or_else(|| CaptureError::SessionFailed("Failed to capture FFmpeg stdin".to_string()))?;
        // Stored and checked under one lock so a concurrent stop is never lost
        let stop_now = {
            let mut active = self.active.lock();
            *active = Some(stdin);
            self.stop_requested.swap(false, Ordering::SeqCst)
        };

        tracing::info!(
            "Recording {:?} camera to {:?} (mirror={})",
            options.facing,
            output,
            options.mirror_video
        );

        if stop_now {
            tracing::info!("Stop arrived before capture started; stopping now");
            if let Err(e) = self.send_quit().await {
                tracing::warn!("Failed to stop capture session: {}", e);
            }
        }

        let result = child.wait_with_output().await;
        self.active.lock().take();
        self.stop_requested.store(false, Ordering::SeqCst);
        let finished = result?;

        if !finished.status.success() {
            return Err(CaptureError::SessionFailed(format!(
                "FFmpeg capture exited with {}: {}",
                finished.status,
                String::from_utf8_lossy(&finished.stderr).trim()
            )));
        }

        let size = tokio::fs::metadata(&output).await.map(|m| m.len()).unwrap_or(0);
        if size == 0 {
            return Err(CaptureError::SessionFailed(format!(
                "No video written to {:?}",
                output
            )));
        }

        tracing::info!("Clip {:?} complete ({} bytes)", output, size);
        Ok(ClipRecord::new(output.to_string_lossy().into_owned(), index))
    }

    async fn stop(&self) -> CaptureResult<()> {
        if !self.is_ready() {
            return Err(CaptureError::NotRecording);
        }

        let running = {
            let active = self.active.lock();
            if active.is_none() {
                self.stop_requested.store(true, Ordering::SeqCst);
            }
            active.is_some()
        };

        if !running {
            tracing::debug!("Capture on {} not running yet; stop deferred", self.id);
            return Ok(());
        }

        tracing::info!("Stopping capture on {}", self.id);
        self.send_quit().await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::capture::VideoQuality;
    use std::sync::Arc;
    use std::time::Duration;

    fn device() -> FfmpegCaptureDevice {
        let capture = CaptureConfig {
            input_format: "v4l2".to_string(),
            front_device: "/dev/video1".to_string(),
            back_device: "/dev/video0".to_string(),
            clips_dir: PathBuf::from("/tmp/clips"),
            ..CaptureConfig::default()
        };
        FfmpegCaptureDevice::new(&capture, &ToolsConfig::default())
    }

    /// Answers `-version`; otherwise records until one byte arrives on stdin
    #[cfg(unix)]
    const CAPTURE_SCRIPT: &str = r#"for arg in "$@"; do
  if [ "$arg" = "-version" ]; then exit 0; fi
  out="$arg"
done
head -c 1 > /dev/null
printf 'frames' > "$out""#;

    #[cfg(unix)]
    async fn opened_device(dir: &Path, script: &str) -> Arc<FfmpegCaptureDevice> {
        let tools = ToolsConfig {
            ffmpeg: crate::testing::write_tool_script(dir, "ffmpeg", script),
            ..ToolsConfig::default()
        };
        let capture = CaptureConfig {
            clips_dir: dir.join("clips"),
            ..CaptureConfig::default()
        };
        let device = Arc::new(FfmpegCaptureDevice::new(&capture, &tools));
        device.open().await.unwrap();
        assert!(device.is_ready());
        device
    }

    #[cfg(unix)]
    async fn finish(
        session: tokio::task::JoinHandle<CaptureResult<ClipRecord>>,
    ) -> CaptureResult<ClipRecord> {
        tokio::time::timeout(Duration::from_secs(10), session)
            .await
            .expect("capture session did not finish")
            .unwrap()
    }

    fn value_after<'a>(args: &'a [String], flag: &str) -> &'a str {
        let pos = args.iter().position(|a| a == flag).unwrap();
        &args[pos + 1]
    }

    #[test]
    fn test_back_camera_args() {
        let options = CaptureOptions::default();
        let args = device().build_args(&options, Path::new("/tmp/clips/out.mp4"));

        assert_eq!(value_after(&args, "-f"), "v4l2");
        assert_eq!(value_after(&args, "-i"), "/dev/video0");
        assert_eq!(value_after(&args, "-t"), "60");
        assert_eq!(value_after(&args, "-fs"), "262144000");
        assert_eq!(value_after(&args, "-b:v"), "40000000");
        assert_eq!(value_after(&args, "-vf"), "scale=1280:720");
        assert_eq!(args.last().unwrap(), "/tmp/clips/out.mp4");
    }

    #[test]
    fn test_front_camera_mirrors() {
        let options = CaptureOptions {
            quality: VideoQuality::P1080,
            ..CaptureOptions::default()
        }
        .for_facing(CameraFacing::Front, FlashMode::Off);
        let args = device().build_args(&options, Path::new("out.mp4"));

        assert_eq!(value_after(&args, "-i"), "/dev/video1");
        assert_eq!(value_after(&args, "-vf"), "scale=1920:1080,hflip");
    }

    #[tokio::test]
    async fn test_not_ready_until_opened() {
        let device = device();
        assert!(!device.is_ready());
        let err = device.record(&CaptureOptions::default()).await.unwrap_err();
        assert!(matches!(err, CaptureError::NotReady(_)));
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_stop_writes_quit_to_running_session() {
        let dir = tempfile::tempdir().unwrap();
        let device = opened_device(dir.path(), CAPTURE_SCRIPT).await;

        let recorder = device.clone();
        let session =
            tokio::spawn(async move { recorder.record(&CaptureOptions::default()).await });
        while device.active.lock().is_none() {
            tokio::task::yield_now().await;
        }

        device.stop().await.unwrap();
        let clip = finish(session).await.unwrap();

        assert_eq!(std::fs::read_to_string(clip.path()).unwrap(), "frames");
        assert!(device.active.lock().is_none());
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_stop_before_process_starts_is_delivered() {
        let dir = tempfile::tempdir().unwrap();
        let device = opened_device(dir.path(), CAPTURE_SCRIPT).await;

        let recorder = device.clone();
        let session =
            tokio::spawn(async move { recorder.record(&CaptureOptions::default()).await });

        // The spawned session has not run yet on this runtime
        device.stop().await.unwrap();
        assert!(device.stop_requested.load(Ordering::SeqCst));

        let clip = finish(session).await.unwrap();
        assert!(clip.path().exists());
        assert!(!device.stop_requested.load(Ordering::SeqCst));
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_failed_capture_reports_stderr() {
        let dir = tempfile::tempdir().unwrap();
        let script = r#"for arg in "$@"; do
  if [ "$arg" = "-version" ]; then exit 0; fi
done
echo "camera busy" >&2
exit 1"#;
        let device = opened_device(dir.path(), script).await;

        let err = device.record(&CaptureOptions::default()).await.unwrap_err();
        match err {
            CaptureError::SessionFailed(message) => assert!(message.contains("camera busy")),
            other => panic!("unexpected error {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_stop_before_open_is_rejected() {
        let err = device().stop().await.unwrap_err();
        assert!(matches!(err, CaptureError::NotRecording));
    }
}

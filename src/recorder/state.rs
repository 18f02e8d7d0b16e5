//! Recording state management
//!
//! Defines the session state machine, captured clips and the session context.

use crate::capture::{CameraFacing, CaptureOptions, FlashMode};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Current state of the recording session
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SessionState {
    /// Nothing recording or processing
    #[default]
    Idle,
    /// A capture session is active (or waiting for the device)
    Recording,
    /// Clips are being transcoded and merged
    Processing,
    /// Last pipeline run produced a preview
    Done,
    /// Last pipeline run failed; clips are retained
    Failed,
}

impl SessionState {
    /// Whether retained clips may be dropped from this state
    pub fn can_discard(self) -> bool {
        matches!(self, Self::Idle | Self::Done | Self::Failed)
    }
}

/// A single completed recording segment
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClipRecord {
    /// File reference as reported by the device (plain path or `file://` URI)
    pub uri: String,

    /// Position in the clip sequence at capture time
    pub index: usize,

    /// When the device finished writing the clip
    pub captured_at: DateTime<Utc>,
}

impl ClipRecord {
    pub fn new(uri: impl Into<String>, index: usize) -> Self {
        Self {
            uri: uri.into(),
            index,
            captured_at: Utc::now(),
        }
    }

    /// Filesystem path for the clip, decoding `file://` URIs
    pub fn path(&self) -> PathBuf {
        match self.uri.strip_prefix("file://") {
            Some(rest) => match urlencoding::decode(rest) {
                Ok(decoded) => PathBuf::from(decoded.into_owned()),
                Err(_) => PathBuf::from(rest),
            },
            None => PathBuf::from(&self.uri),
        }
    }
}

/// Mutable state scoped to one orchestrator
#[derive(Debug, Clone)]
pub struct SessionContext {
    pub state: SessionState,
    pub clips: Vec<ClipRecord>,
    pub facing: CameraFacing,
    pub flash: FlashMode,
    /// Start was requested before the device became ready
    pub pending_start: bool,
    /// Last capture session completed and its clip was appended
    pub finished: bool,
    /// State to return to if a pending start is cancelled
    resume_state: SessionState,
    base_options: CaptureOptions,
}

impl SessionContext {
    pub fn new(base_options: CaptureOptions) -> Self {
        Self {
            state: SessionState::Idle,
            clips: Vec::new(),
            facing: base_options.facing,
            flash: base_options.flash,
            pending_start: false,
            finished: false,
            resume_state: SessionState::Idle,
            base_options,
        }
    }

    /// Options for a session starting now
    pub fn capture_options(&self) -> CaptureOptions {
        self.base_options.for_facing(self.facing, self.flash)
    }

    /// Enter `Recording`, remembering where to go back to
    pub fn begin_recording(&mut self, pending: bool) {
        self.resume_state = self.state;
        self.state = SessionState::Recording;
        self.pending_start = pending;
        self.finished = false;
    }

    /// Leave `Recording` without a clip, back to the state it was entered from.
    ///
    /// Used for a start cancelled before reaching the device and for a
    /// session that failed. Retained clips are untouched.
    pub fn abandon_recording(&mut self) {
        self.pending_start = false;
        self.state = self.resume_state;
    }

    /// Append a completed clip, mark the session finished and leave `Recording`
    pub fn push_clip(&mut self, uri: String) -> ClipRecord {
        let clip = ClipRecord::new(uri, self.clips.len());
        self.clips.push(clip.clone());
        self.finished = true;
        self.state = SessionState::Idle;
        clip
    }

    /// Recording inactive, finished flag set and clips present
    pub fn ready_to_process(&self) -> bool {
        self.state != SessionState::Recording
            && self.state != SessionState::Processing
            && self.finished
            && !self.clips.is_empty()
    }
}

/// Read-only view of the session for callers
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionSnapshot {
    pub state: SessionState,
    pub facing: CameraFacing,
    pub flash: FlashMode,
    pub mirror_video: bool,
    pub clips: Vec<ClipRecord>,
}

impl From<&SessionContext> for SessionSnapshot {
    fn from(ctx: &SessionContext) -> Self {
        Self {
            state: ctx.state,
            facing: ctx.facing,
            flash: ctx.flash,
            mirror_video: ctx.capture_options().mirror_video,
            clips: ctx.clips.clone(),
        }
    }
}

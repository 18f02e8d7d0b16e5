//! Recording session module
//!
//! - `SessionState` state machine and `SessionContext`
//! - `RecordingOrchestrator` driving capture and post-processing

pub mod coordinator;
pub mod state;

pub use coordinator::{RecordingOrchestrator, SessionEvent, ToggleOutcome};
pub use state::{ClipRecord, SessionContext, SessionSnapshot, SessionState};

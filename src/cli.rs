//! Command-line interface for clipstitch
//!
//! Provides argument parsing using clap derive macros.

use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// Record camera clips and stitch them into one video
#[derive(Parser, Debug)]
#[command(name = "clipstitch", version, about = "Record camera clips and stitch them into one video")]
pub struct Cli {
    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Commands,

    /// Path to configuration file
    #[arg(long, global = true, value_name = "PATH")]
    pub config: Option<PathBuf>,

    /// Print events and results as JSON lines
    #[arg(long, global = true)]
    pub json: bool,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Interactive recording session driven from stdin
    Record {
        /// Start with the front camera
        #[arg(long)]
        front: bool,
    },

    /// Transcode and merge existing clips
    Process {
        /// Clip files, in order
        #[arg(required = true, value_name = "CLIP")]
        clips: Vec<PathBuf>,
    },

    /// Print video metadata
    Probe {
        #[arg(value_name = "FILE")]
        file: PathBuf,
    },

    /// Print the effective configuration as TOML
    Config,
}

/// One line of input during `record`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionCommand {
    Toggle,
    SwitchCamera,
    CycleFlash,
    Retry,
    Discard,
    Status,
    Quit,
}

impl SessionCommand {
    /// Parse a line typed at the `record` prompt. Empty input toggles.
    pub fn parse(line: &str) -> Option<Self> {
        match line.trim().to_ascii_lowercase().as_str() {
            "" | "r" | "record" | "stop" => Some(Self::Toggle),
            "c" | "camera" => Some(Self::SwitchCamera),
            "f" | "flash" => Some(Self::CycleFlash),
            "retry" => Some(Self::Retry),
            "discard" => Some(Self::Discard),
            "s" | "status" => Some(Self::Status),
            "q" | "quit" | "exit" => Some(Self::Quit),
            _ => None,
        }
    }
}

pub const SESSION_HELP: &str =
    "<enter>/r start-stop, c camera, f flash, retry, discard, s status, q quit";

//! clipstitch - record camera clips and stitch them into one video.
//!
//! This is the library crate behind the `clipstitch` binary. It provides the
//! recording orchestrator, the FFmpeg-backed capture and post-processing
//! stages, and configuration.

pub mod app;
pub mod capture;
pub mod cli;
pub mod config;
pub mod export;
pub mod navigation;
pub mod recorder;
pub mod utils;

#[cfg(test)]
pub(crate) mod testing;

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Initialize tracing/logging. Honors `RUST_LOG`.
pub fn init_logging() {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "clipstitch=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    tracing::info!("Starting clipstitch v{}", env!("CARGO_PKG_VERSION"));
}

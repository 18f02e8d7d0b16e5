//! Screen navigation
//!
//! The orchestrator hands a finished video to a navigation collaborator and
//! does not wait for, or look at, the result.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use tokio::sync::mpsc;

/// Parameters passed to the preview route
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PreviewParams {
    pub video: PathBuf,
}

/// A request to show a route
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NavigationRequest {
    pub route: String,
    pub params: PreviewParams,
}

/// Fire-and-forget navigation
pub trait Navigator: Send + Sync {
    fn navigate(&self, route: &str, params: PreviewParams);
}

/// Delivers navigation requests over an unbounded channel
pub struct ChannelNavigator {
    tx: mpsc::UnboundedSender<NavigationRequest>,
}

impl ChannelNavigator {
    pub fn new() -> (Self, mpsc::UnboundedReceiver<NavigationRequest>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { tx }, rx)
    }
}

impl Navigator for ChannelNavigator {
    fn navigate(&self, route: &str, params: PreviewParams) {
        tracing::info!("Navigating to '{}' with {:?}", route, params.video);
        let request = NavigationRequest {
            route: route.to_string(),
            params,
        };
        if self.tx.send(request).is_err() {
            tracing::warn!("Navigation receiver dropped; request for '{}' lost", route);
        }
    }
}

use std::fmt::Debug;
use std::sync::Arc;

use tokio::sync::mpsc;
use tourism_core::SessionKind;
use tracing::{info, warn};

/// Where the UI goes after a forced logout.
pub trait Navigator: Send + Sync + Debug {
    fn navigate(&self, kind: SessionKind, surface: &str);
}

/// Type alias for Arc-wrapped Navigator trait objects
pub type NavigatorRef = Arc<dyn Navigator>;

/// Only records the redirect in the log.
#[derive(Debug, Default)]
pub struct TracingNavigator;

impl Navigator for TracingNavigator {
    fn navigate(&self, kind: SessionKind, surface: &str) {
        info!(%kind, surface, "Navigating to login surface");
    }
}

/// A redirect request delivered to a UI layer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Navigation {
    pub kind: SessionKind,
    pub surface: String,
}

/// Forwards redirects over a channel so a UI loop can react to them.
#[derive(Debug)]
pub struct ChannelNavigator {
    tx: mpsc::UnboundedSender<Navigation>,
}

impl ChannelNavigator {
    pub fn new() -> (Self, mpsc::UnboundedReceiver<Navigation>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { tx }, rx)
    }
}

impl Navigator for ChannelNavigator {
    fn navigate(&self, kind: SessionKind, surface: &str) {
        let navigation = Navigation {
            kind,
            surface: surface.to_string(),
        };
        if self.tx.send(navigation).is_err() {
            warn!(%kind, surface, "Navigation receiver dropped");
        }
    }
}

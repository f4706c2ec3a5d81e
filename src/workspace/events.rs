//! Workspace change notifications.
//!
//! The manager owns a broadcast channel and publishes an event after every
//! content mutation; observers (the auto-share loop) subscribe through
//! [`WorkspaceManager::subscribe`](super::WorkspaceManager::subscribe).
//! Undo/redo and reset intentionally stay silent: the share fingerprint
//! check absorbs reverts on the next change.

use tokio::sync::broadcast;

/// Buffered events per subscriber before the channel reports lag.
pub const EVENT_CHANNEL_CAPACITY: usize = 64;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WorkspaceEvent {
    FileAdded { path: String },
    FileDeleted { path: String },
    ContentChanged { path: String },
}

pub fn channel() -> broadcast::Sender<WorkspaceEvent> {
    broadcast::channel(EVENT_CHANNEL_CAPACITY).0
}

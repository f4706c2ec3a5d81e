//! Workspace Engine - versioned file packs with undo/redo
//!
//! This module provides:
//! - Per-context file-tree state with bounded history ([`state`])
//! - String-record persistence backends ([`store`])
//! - Change notifications for observers ([`events`])
//! - Context registry and orchestration ([`manager`])

pub mod events;
pub mod manager;
pub mod state;
pub mod store;

pub use events::WorkspaceEvent;
pub use manager::{Context, WorkspaceManager, DEFAULT_CONTEXT_ID};
pub use state::{History, Snapshot, WorkspaceState, HISTORY_MAX};
pub use store::{FileStore, MemoryStore, StateStore, StoreError};

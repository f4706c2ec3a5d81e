//! Auto-share - debounced publication of the active file set
//!
//! This module provides:
//! - The install-service HTTP collaborator ([`client`])
//! - The change-to-share state machine with debounce, fingerprint
//!   deduplication and retry ([`auto_share`])

pub mod auto_share;
pub mod client;

pub use auto_share::{
    fingerprint, install_command, AutoShareManager, ShareState, ShareTiming, ShareView,
    SharedWorkspace, SHARE_PLACEHOLDER,
};
pub use client::{HttpInstallClient, InstallClient, InstallError};

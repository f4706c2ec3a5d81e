//! AutoShare — 防抖自动分享同步器
//!
//! 订阅工作空间变更通知，在 500ms 防抖窗口内把连续编辑合并为一次远端
//! 同步；同步前做指纹比对，内容未变则直接跳过网络请求。`Syncing` 守卫
//! 加 pending 标记保证同一时刻最多一个在途请求，同时让最后一次编辑
//! 总能被尾随的 follow-up 同步覆盖。

use sha2::{Digest, Sha256};
use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::broadcast::error::RecvError;
use tokio::sync::{broadcast, Mutex, RwLock};
use tokio::task::JoinHandle;
use tracing::{info, warn};

use crate::share::client::InstallClient;
use crate::ui::Clipboard;
use crate::workspace::{WorkspaceEvent, WorkspaceManager};

/// Shown in place of a link while the workspace is empty.
pub const SHARE_PLACEHOLDER: &str = "Add files to generate install link";

/// Share panel state machine.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ShareState {
    /// Panel not shown at all (embedding UIs may park the machine here).
    Hidden,
    Synced,
    Syncing,
    Error,
}

/// 防抖 / 尾随 / 重试三类定时器的间隔。
#[derive(Debug, Clone, Copy)]
pub struct ShareTiming {
    pub debounce: Duration,
    pub follow_up: Duration,
    pub retry: Duration,
}

impl Default for ShareTiming {
    fn default() -> Self {
        Self {
            debounce: Duration::from_millis(500),
            follow_up: Duration::from_millis(100),
            retry: Duration::from_millis(2000),
        }
    }
}

/// What the presentation layer needs to draw the share panel.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ShareView {
    pub state: ShareState,
    /// `None` 时展示 [`SHARE_PLACEHOLDER`]。
    pub command: Option<String>,
}

pub type SharedWorkspace = Arc<RwLock<WorkspaceManager>>;

#[derive(Clone)]
pub struct AutoShareManager {
    inner: Arc<ShareInner>,
}

struct ShareInner {
    workspace: SharedWorkspace,
    client: Arc<dyn InstallClient>,
    origin: String,
    timing: ShareTiming,
    sync: Mutex<SyncSlots>,
}

struct SyncSlots {
    status: ShareState,
    dirty: bool,
    pending_sync: bool,
    placeholder: bool,
    share_id: Option<String>,
    share_command: Option<String>,
    last_fingerprint: Option<String>,
    // 每类用途最多一个未决定时器，替换时取消前一个
    debounce: Option<JoinHandle<()>>,
    deferred: Option<JoinHandle<()>>,
}

/// Deterministic digest of a file set: paths and contents in map order,
/// NUL-separated. Stable under any insertion order, sensitive to every
/// path or content change.
pub fn fingerprint(files: &BTreeMap<String, String>) -> String {
    let mut hasher = Sha256::new();
    for (path, content) in files {
        hasher.update(path.as_bytes());
        hasher.update([0u8]);
        hasher.update(content.as_bytes());
        hasher.update([0u8]);
    }
    hex::encode(&hasher.finalize()[..16])
}

/// The shareable one-liner embedding the service-issued identifier.
pub fn install_command(origin: &str, hash: &str) -> String {
    format!("sh -c \"$(curl -fsSL {origin}/api/install/{hash}.sh)\"")
}

impl AutoShareManager {
    pub fn new(workspace: SharedWorkspace, client: Arc<dyn InstallClient>, origin: &str) -> Self {
        Self::with_timing(workspace, client, origin, ShareTiming::default())
    }

    pub fn with_timing(
        workspace: SharedWorkspace,
        client: Arc<dyn InstallClient>,
        origin: &str,
        timing: ShareTiming,
    ) -> Self {
        Self {
            inner: Arc::new(ShareInner {
                workspace,
                client,
                origin: origin.trim_end_matches('/').to_string(),
                timing,
                sync: Mutex::new(SyncSlots {
                    status: ShareState::Synced,
                    dirty: false,
                    pending_sync: false,
                    placeholder: true,
                    share_id: None,
                    share_command: None,
                    last_fingerprint: None,
                    debounce: None,
                    deferred: None,
                }),
            }),
        }
    }

    /// 后台监听 actor：把工作空间事件流排进防抖窗口。启动时若已有内容
    /// 则补一次初始同步。
    pub fn spawn_listener(
        &self,
        mut events: broadcast::Receiver<WorkspaceEvent>,
    ) -> JoinHandle<()> {
        let manager = self.clone();
        tokio::spawn(async move {
            let has_files = {
                let workspace = manager.inner.workspace.read().await;
                workspace
                    .state()
                    .map(|state| !state.files().is_empty())
                    .unwrap_or(false)
            };
            if has_files {
                manager.mark_dirty().await;
            }

            loop {
                match events.recv().await {
                    Ok(_event) => manager.mark_dirty().await,
                    Err(RecvError::Lagged(skipped)) => {
                        warn!(skipped, "Workspace event stream lagged");
                        manager.mark_dirty().await;
                    }
                    Err(RecvError::Closed) => {
                        info!("Workspace event channel closed, auto-share listener exiting");
                        return;
                    }
                }
            }
        })
    }

    /// Note a content change and (re)arm the debounce timer. Replacing a
    /// pending timer cancels it, so a burst of edits yields one sync.
    pub async fn mark_dirty(&self) {
        let mut slots = self.inner.sync.lock().await;
        slots.dirty = true;
        if let Some(timer) = slots.debounce.take() {
            timer.abort();
        }
        let manager = self.clone();
        slots.debounce = Some(tokio::spawn(async move {
            tokio::time::sleep(manager.inner.timing.debounce).await;
            // 计时器一旦到期就脱离句柄执行：后续的 abort 只能取消等待中
            // 的窗口，不会打断已经在途的请求。
            tokio::spawn(async move { manager.sync().await });
        }));
    }

    /// Push the current file set to the install service.
    ///
    /// 负载是进入本函数时的 point-in-time 拷贝；在途期间到达的编辑只会
    /// 通过 pending 机制触发尾随同步，不会被并入本次请求。
    pub async fn sync(&self) {
        let files = {
            let workspace = self.inner.workspace.read().await;
            workspace
                .state()
                .map(|state| state.files().clone())
                .unwrap_or_default()
        };

        let digest = {
            let mut slots = self.inner.sync.lock().await;
            if slots.status == ShareState::Syncing {
                slots.pending_sync = true;
                return;
            }

            if files.is_empty() {
                slots.dirty = false;
                slots.placeholder = true;
                slots.status = ShareState::Synced;
                return;
            }

            let digest = fingerprint(&files);
            if slots.last_fingerprint.as_deref() == Some(digest.as_str()) {
                slots.dirty = false;
                return;
            }

            slots.status = ShareState::Syncing;
            digest
        };

        match self.inner.client.create_install(&files).await {
            Ok(hash) => {
                let mut slots = self.inner.sync.lock().await;
                slots.share_command = Some(install_command(&self.inner.origin, &hash));
                info!(hash = %hash, files = files.len(), "Workspace shared");
                slots.share_id = Some(hash);
                slots.last_fingerprint = Some(digest);
                slots.dirty = false;
                slots.placeholder = false;
                slots.status = ShareState::Synced;

                let follow_up = slots.pending_sync;
                slots.pending_sync = false;
                if follow_up {
                    self.schedule(&mut slots, self.inner.timing.follow_up);
                }
            }
            Err(e) => {
                warn!(error = %e, "Auto-share sync failed");
                let mut slots = self.inner.sync.lock().await;
                slots.status = ShareState::Error;
                if slots.dirty {
                    self.schedule(&mut slots, self.inner.timing.retry);
                }
            }
        }
    }

    /// 安排一次延迟同步（尾随或重试共用同一个槽位）。
    fn schedule(&self, slots: &mut SyncSlots, delay: Duration) {
        if let Some(timer) = slots.deferred.take() {
            timer.abort();
        }
        let manager = self.clone();
        slots.deferred = Some(tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            tokio::spawn(async move { manager.sync().await });
        }));
    }

    pub async fn state(&self) -> ShareState {
        self.inner.sync.lock().await.status
    }

    /// Identifier issued by the service for the last successful share.
    pub async fn share_id(&self) -> Option<String> {
        self.inner.sync.lock().await.share_id.clone()
    }

    pub async fn view(&self) -> ShareView {
        let slots = self.inner.sync.lock().await;
        ShareView {
            state: slots.status,
            command: if slots.placeholder {
                None
            } else {
                slots.share_command.clone()
            },
        }
    }

    /// Copy the last successful share command, if any.
    pub async fn copy_share_command(&self, clipboard: &dyn Clipboard) -> bool {
        let command = {
            let slots = self.inner.sync.lock().await;
            slots.share_command.clone()
        };
        match command {
            Some(command) => clipboard.set_text(&command),
            None => false,
        }
    }
}

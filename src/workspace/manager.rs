//! Context registry and orchestration around the active [`WorkspaceState`].
//!
//! The manager owns the set of named contexts, the state of the active one,
//! and the single render path through which state becomes observable. All
//! collaborators (storage, renderer, confirmation prompts) are injected at
//! construction.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::sync::Arc;
use tokio::sync::broadcast;
use tracing::{info, warn};

use crate::ui::{build_tree, Confirmer, ContextEntry, Renderer, WorkspaceView};
use crate::workspace::events::{self, WorkspaceEvent};
use crate::workspace::state::WorkspaceState;
use crate::workspace::store::{state_key, StateStore, CURRENT_CONTEXT_KEY, REGISTRY_KEY};

/// The immortal context every registry contains. Deletion requests against
/// it are refused.
pub const DEFAULT_CONTEXT_ID: &str = "default";

const DEFAULT_CONTEXT_NAME: &str = "Default Workspace";

/// Context metadata. Never mutated after creation.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Context {
    pub id: String,
    pub name: String,
    pub created_at: DateTime<Utc>,
}

pub struct WorkspaceManager {
    store: Arc<dyn StateStore>,
    renderer: Arc<dyn Renderer>,
    confirmer: Arc<dyn Confirmer>,
    contexts: BTreeMap<String, Context>,
    current_context_id: Option<String>,
    current_state: Option<WorkspaceState>,
    events: broadcast::Sender<WorkspaceEvent>,
}

impl WorkspaceManager {
    pub fn new(
        store: Arc<dyn StateStore>,
        renderer: Arc<dyn Renderer>,
        confirmer: Arc<dyn Confirmer>,
    ) -> Self {
        Self {
            store,
            renderer,
            confirmer,
            contexts: BTreeMap::new(),
            current_context_id: None,
            current_state: None,
            events: events::channel(),
        }
    }

    /// Subscribe to change notifications. Hand the receiver to an observer
    /// before the first mutation.
    pub fn subscribe(&self) -> broadcast::Receiver<WorkspaceEvent> {
        self.events.subscribe()
    }

    /// Load the registry, guarantee the default context, and activate the
    /// last-active context (falling back to default for unknown ids).
    pub fn init(&mut self) {
        self.contexts = self.load_registry();

        if !self.contexts.contains_key(DEFAULT_CONTEXT_ID) {
            self.create_context(DEFAULT_CONTEXT_ID, DEFAULT_CONTEXT_NAME);
        }

        let last = self.store.get(CURRENT_CONTEXT_KEY);
        match last {
            Some(id) if self.contexts.contains_key(&id) => {
                self.switch_context(&id);
            }
            _ => {
                self.switch_context(DEFAULT_CONTEXT_ID);
            }
        }
    }

    pub fn contexts(&self) -> &BTreeMap<String, Context> {
        &self.contexts
    }

    pub fn current_context_id(&self) -> Option<&str> {
        self.current_context_id.as_deref()
    }

    pub fn state(&self) -> Option<&WorkspaceState> {
        self.current_state.as_ref()
    }

    /// Register a new context without activating it. Fails on id collision.
    pub fn create_context(&mut self, id: &str, name: &str) -> bool {
        if self.contexts.contains_key(id) {
            warn!(context = %id, "Context already exists");
            return false;
        }

        self.contexts.insert(
            id.to_string(),
            Context {
                id: id.to_string(),
                name: name.to_string(),
                created_at: Utc::now(),
            },
        );
        self.save_registry();
        info!(context = %id, name = %name, "Context created");
        true
    }

    /// Activate a context: persist the outgoing state first, load (or
    /// initialize) the target, record it as last-active, and render.
    ///
    /// An id missing from the in-memory registry triggers one re-read of the
    /// persisted registry, so contexts created by another manager instance
    /// on the same store are found.
    pub fn switch_context(&mut self, id: &str) -> bool {
        if !self.contexts.contains_key(id) && id != DEFAULT_CONTEXT_ID {
            let saved = self.load_registry();
            if !saved.contains_key(id) {
                warn!(context = %id, "Context not found");
                return false;
            }
            self.contexts = saved;
        }

        if self.current_state.is_some() {
            self.persist_current();
        }

        self.current_context_id = Some(id.to_string());
        self.current_state = Some(self.load_state(id));
        if let Err(e) = self.store.set(CURRENT_CONTEXT_KEY, id) {
            warn!(context = %id, error = %e, "Failed to record last-active context");
        }
        info!(context = %id, "Switched context");
        self.render();
        true
    }

    /// Remove a context and its persisted state. The default context is
    /// immortal; deleting the active context falls back to default.
    pub fn delete_context(&mut self, id: &str) -> bool {
        if id == DEFAULT_CONTEXT_ID {
            warn!("Cannot delete default context");
            return false;
        }
        if self.contexts.remove(id).is_none() {
            warn!(context = %id, "Context not found");
            return false;
        }

        if let Err(e) = self.store.remove(&state_key(id)) {
            warn!(context = %id, error = %e, "Failed to erase context state");
        }
        self.save_registry();
        info!(context = %id, "Context deleted");

        if self.current_context_id.as_deref() == Some(id) {
            self.switch_context(DEFAULT_CONTEXT_ID);
        }
        true
    }

    /// Add a file to the active context. Overwriting an existing path
    /// requires confirmation; declining aborts with no side effects.
    pub async fn include_file(&mut self, path: &str, content: &str) -> bool {
        let Some(state) = self.current_state.as_ref() else {
            return false;
        };

        if state.files().contains_key(path) {
            let prompt = format!("File \"{path}\" already exists. Overwrite?");
            if !self.confirmer.confirm(&prompt).await {
                return false;
            }
        }

        if let Some(state) = self.current_state.as_mut() {
            state.add_file(path, content);
        }
        self.emit(WorkspaceEvent::FileAdded {
            path: path.to_string(),
        });
        self.persist_current();
        self.render();
        true
    }

    /// Delete a file from the active context after confirmation.
    pub async fn delete_file(&mut self, path: &str) -> bool {
        if self.current_state.is_none() {
            return false;
        }

        let prompt = format!("Delete \"{path}\"?");
        if !self.confirmer.confirm(&prompt).await {
            return false;
        }

        if let Some(state) = self.current_state.as_mut() {
            state.delete_file(path);
        }
        self.emit(WorkspaceEvent::FileDeleted {
            path: path.to_string(),
        });
        self.persist_current();
        self.render();
        true
    }

    /// Overwrite an existing file's content in place (editor save-back).
    /// Persists and notifies observers, but does not re-render: the editor
    /// is the source of the change.
    pub fn update_content(&mut self, path: &str, content: &str) -> bool {
        let Some(state) = self.current_state.as_mut() else {
            return false;
        };
        if !state.update_content(path, content) {
            return false;
        }
        self.emit(WorkspaceEvent::ContentChanged {
            path: path.to_string(),
        });
        self.persist_current();
        true
    }

    /// Select an existing file for display.
    pub fn select_file(&mut self, path: &str) -> bool {
        let Some(state) = self.current_state.as_mut() else {
            return false;
        };
        if !state.select_file(path) {
            return false;
        }
        self.persist_current();
        self.render();
        true
    }

    /// Flip a folder's collapse marker in the tree.
    pub fn toggle_folder(&mut self, path: &str) {
        let Some(state) = self.current_state.as_mut() else {
            return;
        };
        state.toggle_folder(path);
        self.persist_current();
        self.render();
    }

    /// Step history backwards. Persists and re-renders only on an actual
    /// transition.
    pub fn undo(&mut self) -> bool {
        let Some(state) = self.current_state.as_mut() else {
            return false;
        };
        if !state.undo() {
            return false;
        }
        self.persist_current();
        self.render();
        true
    }

    /// Step history forwards. Mirror of [`undo`](Self::undo).
    pub fn redo(&mut self) -> bool {
        let Some(state) = self.current_state.as_mut() else {
            return false;
        };
        if !state.redo() {
            return false;
        }
        self.persist_current();
        self.render();
        true
    }

    /// Clear the active context after confirmation. Undoable.
    pub async fn reset(&mut self) -> bool {
        if self.current_state.is_none() {
            return false;
        }

        if !self
            .confirmer
            .confirm("Reset will clear all files. Are you sure?")
            .await
        {
            return false;
        }

        if let Some(state) = self.current_state.as_mut() {
            state.reset();
        }
        self.persist_current();
        self.render();
        true
    }

    /// Project the current state onto the presentation layer. Auto-selects
    /// the first file (in path order) when nothing is selected; that is a
    /// persisted mutation. The single place where state becomes observable.
    pub fn render(&mut self) {
        let first_unselected = match self.current_state.as_ref() {
            Some(state) if state.selected_file().is_none() => {
                state.files().keys().next().cloned()
            }
            Some(_) => None,
            None => return,
        };
        if let Some(first) = first_unselected {
            if let Some(state) = self.current_state.as_mut() {
                state.select_file(&first);
            }
            self.persist_current();
        }

        let Some(state) = self.current_state.as_ref() else {
            return;
        };
        let editor_content = state
            .selected_file()
            .and_then(|path| state.files().get(path).cloned());

        let view = WorkspaceView {
            context_id: state.context_id().to_string(),
            tree: build_tree(state.files(), state.collapsed_folders(), state.selected_file()),
            selected_file: state.selected_file().map(str::to_string),
            editor_content,
            can_undo: state.can_undo(),
            can_redo: state.can_redo(),
            contexts: self
                .contexts
                .values()
                .map(|ctx| ContextEntry {
                    id: ctx.id.clone(),
                    name: ctx.name.clone(),
                    active: self.current_context_id.as_deref() == Some(ctx.id.as_str()),
                })
                .collect(),
        };
        self.renderer.render(&view);
    }

    fn emit(&self, event: WorkspaceEvent) {
        // Err just means no live subscribers.
        let _ = self.events.send(event);
    }

    fn load_registry(&self) -> BTreeMap<String, Context> {
        let Some(raw) = self.store.get(REGISTRY_KEY) else {
            return BTreeMap::new();
        };
        match serde_json::from_str(&raw) {
            Ok(contexts) => contexts,
            Err(e) => {
                warn!(error = %e, "Discarding corrupt context registry");
                BTreeMap::new()
            }
        }
    }

    fn save_registry(&self) {
        let raw = match serde_json::to_string(&self.contexts) {
            Ok(raw) => raw,
            Err(e) => {
                warn!(error = %e, "Failed to encode context registry");
                return;
            }
        };
        if let Err(e) = self.store.set(REGISTRY_KEY, &raw) {
            warn!(error = %e, "Failed to persist context registry");
        }
    }

    fn load_state(&self, context_id: &str) -> WorkspaceState {
        let data = self.store.get(&state_key(context_id));
        WorkspaceState::deserialize(context_id, data.as_deref())
    }

    fn persist_current(&self) {
        let Some(state) = self.current_state.as_ref() else {
            return;
        };
        let key = state_key(state.context_id());
        if let Err(e) = self.store.set(&key, &state.serialize()) {
            warn!(context = %state.context_id(), error = %e, "Failed to persist workspace state");
        }
    }
}

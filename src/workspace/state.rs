//! Per-context workspace state: file mapping, selection, folder collapse
//! markers and bounded undo/redo history.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet, VecDeque};
use tracing::warn;

/// Maximum number of undo entries kept per context. Oldest entries are
/// evicted first once the limit is reached.
pub const HISTORY_MAX: usize = 50;

/// Immutable full copy of a state's observable data at one point in time.
///
/// Snapshots are full copies rather than diffs: history is short and file
/// contents are plain text, so copying stays cheap.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Snapshot {
    pub files: BTreeMap<String, String>,
    pub selected_file: Option<String>,
    pub collapsed_folders: BTreeSet<String>,
    pub timestamp: DateTime<Utc>,
}

impl Snapshot {
    fn empty() -> Self {
        Self {
            files: BTreeMap::new(),
            selected_file: None,
            collapsed_folders: BTreeSet::new(),
            timestamp: Utc::now(),
        }
    }
}

impl Default for Snapshot {
    fn default() -> Self {
        Self::empty()
    }
}

/// Undo/redo history. `past` is bounded at [`HISTORY_MAX`] with FIFO
/// eviction; `future` is cleared by every content mutation.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
pub struct History {
    pub past: VecDeque<Snapshot>,
    pub present: Snapshot,
    pub future: VecDeque<Snapshot>,
}

/// All state for a single workspace context.
///
/// `files` maps `/`-delimited paths (no leading slash) to text content.
/// `collapsed_folders` holds folder paths explicitly collapsed in the tree;
/// absence means expanded.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct WorkspaceState {
    context_id: String,
    files: BTreeMap<String, String>,
    selected_file: Option<String>,
    collapsed_folders: BTreeSet<String>,
    history: History,
}

impl Default for WorkspaceState {
    fn default() -> Self {
        Self::new("")
    }
}

impl WorkspaceState {
    pub fn new(context_id: &str) -> Self {
        Self {
            context_id: context_id.to_string(),
            files: BTreeMap::new(),
            selected_file: None,
            collapsed_folders: BTreeSet::new(),
            history: History::default(),
        }
    }

    /// Reset all fields to a fresh empty state, including history.
    pub fn init_empty(&mut self) {
        self.files.clear();
        self.selected_file = None;
        self.collapsed_folders.clear();
        self.history.present = self.snapshot();
        self.history.past.clear();
        self.history.future.clear();
    }

    pub fn context_id(&self) -> &str {
        &self.context_id
    }

    pub fn files(&self) -> &BTreeMap<String, String> {
        &self.files
    }

    pub fn selected_file(&self) -> Option<&str> {
        self.selected_file.as_deref()
    }

    pub fn collapsed_folders(&self) -> &BTreeSet<String> {
        &self.collapsed_folders
    }

    /// Copy out the current observable data.
    pub fn snapshot(&self) -> Snapshot {
        Snapshot {
            files: self.files.clone(),
            selected_file: self.selected_file.clone(),
            collapsed_folders: self.collapsed_folders.clone(),
            timestamp: Utc::now(),
        }
    }

    /// Deep-copy a snapshot's data back into the live fields. Containers are
    /// cloned so later mutation cannot corrupt stored history entries.
    pub fn restore_from_snapshot(&mut self, snapshot: &Snapshot) {
        self.files = snapshot.files.clone();
        self.selected_file = snapshot.selected_file.clone();
        self.collapsed_folders = snapshot.collapsed_folders.clone();
    }

    /// Push `present` onto the past and clear the redo list. Trims the
    /// oldest entry beyond [`HISTORY_MAX`].
    fn push_history(&mut self) {
        self.history.past.push_back(self.history.present.clone());
        if self.history.past.len() > HISTORY_MAX {
            self.history.past.pop_front();
        }
        self.history.future.clear();
    }

    /// Insert or overwrite a file and select it. Paths are taken as-is;
    /// callers normalize and confirm overwrites.
    pub fn add_file(&mut self, path: &str, content: &str) {
        self.push_history();
        self.files.insert(path.to_string(), content.to_string());
        self.selected_file = Some(path.to_string());
        self.history.present = self.snapshot();
    }

    /// Remove a file, clearing the selection if it matched. Deleting an
    /// unknown path is harmless; history is still pushed.
    pub fn delete_file(&mut self, path: &str) {
        self.push_history();
        self.files.remove(path);
        if self.selected_file.as_deref() == Some(path) {
            self.selected_file = None;
        }
        self.history.present = self.snapshot();
    }

    /// Overwrite the content of an existing file in place without pushing a
    /// history entry (editor keystroke flow). Returns whether anything
    /// changed.
    pub fn update_content(&mut self, path: &str, content: &str) -> bool {
        match self.files.get_mut(path) {
            Some(existing) if existing != content => {
                *existing = content.to_string();
                self.history.present = self.snapshot();
                true
            }
            _ => false,
        }
    }

    /// Change the selection to an existing file. Returns false for unknown
    /// paths.
    pub fn select_file(&mut self, path: &str) -> bool {
        if !self.files.contains_key(path) {
            return false;
        }
        self.selected_file = Some(path.to_string());
        self.history.present = self.snapshot();
        true
    }

    /// Flip a folder's collapse marker. Not undoable; the live set is
    /// captured by the next snapshot. Returns whether the folder is now
    /// collapsed.
    pub fn toggle_folder(&mut self, path: &str) -> bool {
        if self.collapsed_folders.remove(path) {
            false
        } else {
            self.collapsed_folders.insert(path.to_string());
            true
        }
    }

    /// Step back one history entry. Returns whether a transition occurred.
    pub fn undo(&mut self) -> bool {
        let Some(previous) = self.history.past.pop_back() else {
            return false;
        };
        let present = std::mem::replace(&mut self.history.present, previous);
        self.history.future.push_front(present);
        let snapshot = self.history.present.clone();
        self.restore_from_snapshot(&snapshot);
        true
    }

    /// Step forward one history entry. Mirror of [`undo`](Self::undo).
    pub fn redo(&mut self) -> bool {
        let Some(next) = self.history.future.pop_front() else {
            return false;
        };
        let present = std::mem::replace(&mut self.history.present, next);
        self.history.past.push_back(present);
        let snapshot = self.history.present.clone();
        self.restore_from_snapshot(&snapshot);
        true
    }

    /// Clear files, selection and collapse markers as an undoable operation.
    pub fn reset(&mut self) {
        self.push_history();
        self.files.clear();
        self.selected_file = None;
        self.collapsed_folders.clear();
        self.history.present = self.snapshot();
    }

    pub fn can_undo(&self) -> bool {
        !self.history.past.is_empty()
    }

    pub fn can_redo(&self) -> bool {
        !self.history.future.is_empty()
    }

    #[cfg(test)]
    pub(crate) fn history(&self) -> &History {
        &self.history
    }

    /// Serialize to the persisted JSON form.
    pub fn serialize(&self) -> String {
        serde_json::to_string(self).unwrap_or_else(|e| {
            warn!(context = %self.context_id, error = %e, "Failed to serialize workspace state");
            "{}".to_string()
        })
    }

    /// Rebuild a state from a persisted record. Total: missing or malformed
    /// data degrades to a freshly initialized empty state.
    pub fn deserialize(context_id: &str, data: Option<&str>) -> Self {
        let mut state = match data {
            Some(raw) => match serde_json::from_str::<WorkspaceState>(raw) {
                Ok(parsed) => parsed,
                Err(e) => {
                    warn!(context = %context_id, error = %e, "Discarding corrupt workspace state");
                    let mut fresh = Self::new(context_id);
                    fresh.init_empty();
                    fresh
                }
            },
            None => {
                let mut fresh = Self::new(context_id);
                fresh.init_empty();
                fresh
            }
        };
        state.context_id = context_id.to_string();
        state
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn populated() -> WorkspaceState {
        let mut state = WorkspaceState::deserialize("test", None);
        state.add_file("a.md", "alpha");
        state.add_file("docs/b.md", "beta");
        state
    }

    #[test]
    fn test_add_selects_and_undo_redo_roundtrip() {
        let mut state = WorkspaceState::deserialize("test", None);
        state.add_file("a.md", "one");
        state.add_file("b.md", "two");
        assert_eq!(state.selected_file(), Some("b.md"));

        assert!(state.undo());
        assert_eq!(state.files().len(), 1);
        assert!(state.files().contains_key("a.md"));

        assert!(state.redo());
        assert_eq!(state.files().len(), 2);
        assert!(state.files().contains_key("b.md"));
    }

    #[test]
    fn test_undo_n_times_returns_to_empty() {
        let mut state = WorkspaceState::deserialize("test", None);
        state.add_file("a.md", "1");
        state.delete_file("a.md");
        state.add_file("b.md", "2");

        for _ in 0..3 {
            assert!(state.undo());
        }
        assert!(state.files().is_empty());
        assert!(!state.can_undo());

        for _ in 0..3 {
            assert!(state.redo());
        }
        assert_eq!(state.files().len(), 1);
        assert!(state.files().contains_key("b.md"));
    }

    #[test]
    fn test_history_bounded_with_fifo_eviction() {
        let mut state = WorkspaceState::deserialize("test", None);
        for i in 0..HISTORY_MAX + 5 {
            state.add_file(&format!("f{i}.md"), "x");
        }
        assert_eq!(state.history().past.len(), HISTORY_MAX);
        // The oldest surviving entry is the one taken after the fifth add.
        assert_eq!(state.history().past[0].files.len(), 5);

        let mut undone = 0;
        while state.undo() {
            undone += 1;
        }
        assert_eq!(undone, HISTORY_MAX);
        assert_eq!(state.files().len(), 5);
    }

    #[test]
    fn test_delete_clears_matching_selection() {
        let mut state = populated();
        assert_eq!(state.selected_file(), Some("docs/b.md"));
        state.delete_file("docs/b.md");
        assert_eq!(state.selected_file(), None);
        assert!(!state.files().contains_key("docs/b.md"));
    }

    #[test]
    fn test_delete_unknown_path_is_harmless_but_pushes_history() {
        let mut state = populated();
        let before = state.files().clone();
        state.delete_file("nope.md");
        assert_eq!(state.files(), &before);
        assert!(state.undo());
    }

    #[test]
    fn test_mutation_clears_redo_list() {
        let mut state = populated();
        assert!(state.undo());
        assert!(state.can_redo());
        state.add_file("c.md", "gamma");
        assert!(!state.can_redo());
    }

    #[test]
    fn test_reset_is_undoable() {
        let mut state = populated();
        state.reset();
        assert!(state.files().is_empty());
        assert_eq!(state.selected_file(), None);
        assert!(state.undo());
        assert_eq!(state.files().len(), 2);
    }

    #[test]
    fn test_update_content_skips_history() {
        let mut state = populated();
        assert!(state.update_content("a.md", "alpha v2"));
        assert_eq!(state.files()["a.md"], "alpha v2");

        // Undo reverts the preceding add, not the keystroke.
        assert!(state.undo());
        assert!(!state.files().contains_key("docs/b.md"));

        assert!(!state.update_content("missing.md", "x"));
        assert!(!state.update_content("a.md", "alpha"));
    }

    #[test]
    fn test_toggle_folder_not_undoable() {
        let mut state = populated();
        assert!(state.toggle_folder("docs"));
        assert!(state.collapsed_folders().contains("docs"));
        assert!(!state.toggle_folder("docs"));
        assert!(state.collapsed_folders().is_empty());
    }

    #[test]
    fn test_serialize_roundtrip() {
        let mut state = populated();
        state.toggle_folder("docs");
        state.undo();

        let restored = WorkspaceState::deserialize("test", Some(&state.serialize()));
        assert_eq!(restored, state);
    }

    #[test]
    fn test_deserialize_corrupt_data_degrades_to_empty() {
        let state = WorkspaceState::deserialize("test", Some("not json {"));
        assert_eq!(state.context_id(), "test");
        assert!(state.files().is_empty());
        assert!(!state.can_undo());

        let state = WorkspaceState::deserialize("test", Some("{}"));
        assert!(state.files().is_empty());
    }

    #[test]
    fn test_deserialize_keeps_given_context_id() {
        let state = populated();
        let restored = WorkspaceState::deserialize("other", Some(&state.serialize()));
        assert_eq!(restored.context_id(), "other");
    }

    #[test]
    fn test_restore_deep_copies_containers() {
        let mut state = populated();
        let snap = state.snapshot();
        state.restore_from_snapshot(&snap);
        state.update_content("a.md", "mutated");
        // The snapshot we restored from must be unaffected.
        assert_eq!(snap.files["a.md"], "alpha");
    }
}

//! Presentation collaborator interface.
//!
//! The engine never touches a screen. It projects its state into a
//! [`WorkspaceView`] and hands that to an injected [`Renderer`]; destructive
//! operations ask an injected [`Confirmer`] first; the share command is
//! exported through a [`Clipboard`]. Substituting scripted fakes makes the
//! whole engine testable without a UI.

use async_trait::async_trait;
use std::collections::{BTreeMap, BTreeSet};

/// Editor text shown when no file is selected.
pub const EDITOR_PLACEHOLDER: &str = "Select a file from the left to view its content.";

/// One node of the rendered file tree. Folders are derived from path
/// segments; they have no standalone existence in the state.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TreeNode {
    Folder {
        name: String,
        path: String,
        collapsed: bool,
        children: Vec<TreeNode>,
    },
    File {
        name: String,
        path: String,
        selected: bool,
    },
}

/// A context as shown in the context selector.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContextEntry {
    pub id: String,
    pub name: String,
    pub active: bool,
}

/// Everything the presentation layer needs to redraw after a mutation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WorkspaceView {
    pub context_id: String,
    pub tree: Vec<TreeNode>,
    pub selected_file: Option<String>,
    /// Content of the selected file; `None` means show [`EDITOR_PLACEHOLDER`].
    pub editor_content: Option<String>,
    pub can_undo: bool,
    pub can_redo: bool,
    pub contexts: Vec<ContextEntry>,
}

/// Redraws the UI from a view. Must be idempotent.
pub trait Renderer: Send + Sync {
    fn render(&self, view: &WorkspaceView);
}

/// Yes/no prompt collaborator for overwrite, delete and reset.
#[async_trait]
pub trait Confirmer: Send + Sync {
    async fn confirm(&self, prompt: &str) -> bool;
}

/// Receives the share command on an explicit copy action.
pub trait Clipboard: Send + Sync {
    fn set_text(&self, text: &str) -> bool;
}

/// Renderer that discards every view. For headless embedding and tests.
pub struct NullRenderer;

impl Renderer for NullRenderer {
    fn render(&self, _view: &WorkspaceView) {}
}

/// Confirmer with a fixed answer. For headless embedding and tests.
pub struct AutoConfirm(pub bool);

#[async_trait]
impl Confirmer for AutoConfirm {
    async fn confirm(&self, _prompt: &str) -> bool {
        self.0
    }
}

/// Build the nested tree view from the flat path mapping. Folders sort
/// before files at every level; both are alphabetical.
pub fn build_tree(
    files: &BTreeMap<String, String>,
    collapsed: &BTreeSet<String>,
    selected: Option<&str>,
) -> Vec<TreeNode> {
    #[derive(Default)]
    struct Level {
        folders: BTreeMap<String, Level>,
        files: BTreeMap<String, String>,
    }

    let mut root = Level::default();
    for path in files.keys() {
        let mut level = &mut root;
        let mut parts = path.split('/').peekable();
        while let Some(part) = parts.next() {
            if parts.peek().is_some() {
                level = level.folders.entry(part.to_string()).or_default();
            } else {
                level.files.insert(part.to_string(), path.clone());
            }
        }
    }

    fn convert(
        level: Level,
        prefix: &str,
        collapsed: &BTreeSet<String>,
        selected: Option<&str>,
    ) -> Vec<TreeNode> {
        let mut nodes = Vec::new();
        for (name, child) in level.folders {
            let path = if prefix.is_empty() {
                name.clone()
            } else {
                format!("{prefix}/{name}")
            };
            let children = convert(child, &path, collapsed, selected);
            nodes.push(TreeNode::Folder {
                collapsed: collapsed.contains(&path),
                name,
                path,
                children,
            });
        }
        for (name, path) in level.files {
            nodes.push(TreeNode::File {
                selected: selected == Some(path.as_str()),
                name,
                path,
            });
        }
        nodes
    }

    convert(root, "", collapsed, selected)
}

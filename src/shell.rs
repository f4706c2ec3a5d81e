//! Interactive terminal front-end.
//!
//! This is the presentation collaborator consumed by the engine: a tree
//! renderer, a y/n confirmation prompt and a clipboard sink, wired to a
//! small command loop. Everything stateful lives in the engine; the shell
//! only projects views and forwards commands.

use anyhow::Result;
use async_trait::async_trait;
use petname::{Generator, Petnames};
use std::io::{self, Write};
use std::path::PathBuf;
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::warn;

use crate::config::{self, BenchConfig};
use crate::share::{AutoShareManager, HttpInstallClient, ShareState, SHARE_PLACEHOLDER};
use crate::ui::{
    Clipboard, Confirmer, Renderer, TreeNode, WorkspaceView, EDITOR_PLACEHOLDER,
};
use crate::workspace::{FileStore, MemoryStore, StateStore, WorkspaceManager};

/// Prints the workspace view to stdout after every mutation.
pub struct TermRenderer;

impl Renderer for TermRenderer {
    fn render(&self, view: &WorkspaceView) {
        println!();
        let contexts = view
            .contexts
            .iter()
            .map(|ctx| {
                if ctx.active {
                    format!("[{}]", ctx.id)
                } else {
                    ctx.id.clone()
                }
            })
            .collect::<Vec<_>>()
            .join(" ");
        println!("contexts: {contexts}");

        if view.tree.is_empty() {
            println!("(no files)");
        } else {
            print_nodes(&view.tree, 1);
        }

        match (&view.selected_file, &view.editor_content) {
            (Some(path), Some(content)) => {
                println!("--- {path} ---");
                println!("{content}");
            }
            _ => println!("{EDITOR_PLACEHOLDER}"),
        }

        let undo = if view.can_undo { "undo" } else { "-" };
        let redo = if view.can_redo { "redo" } else { "-" };
        println!("history: {undo} / {redo}");
    }
}

fn print_nodes(nodes: &[TreeNode], depth: usize) {
    for node in nodes {
        let indent = "  ".repeat(depth);
        match node {
            TreeNode::Folder {
                name,
                collapsed,
                children,
                ..
            } => {
                if *collapsed {
                    println!("{indent}{name}/ (+)");
                } else {
                    println!("{indent}{name}/");
                    print_nodes(children, depth + 1);
                }
            }
            TreeNode::File { name, selected, .. } => {
                let marker = if *selected { " *" } else { "" };
                println!("{indent}{name}{marker}");
            }
        }
    }
}

/// Blocking y/n prompt on the terminal.
pub struct TermConfirmer;

#[async_trait]
impl Confirmer for TermConfirmer {
    async fn confirm(&self, prompt: &str) -> bool {
        print!("{prompt} [y/N] ");
        let _ = io::stdout().flush();
        matches!(read_line().await.as_deref().map(str::trim), Some("y" | "Y" | "yes"))
    }
}

/// Clipboard stand-in: echoes the copied text so it can be picked up from
/// the terminal.
pub struct TermClipboard;

impl Clipboard for TermClipboard {
    fn set_text(&self, text: &str) -> bool {
        println!("Copied: {text}");
        true
    }
}

/// One line from stdin, `None` on EOF. Reads on the blocking pool so the
/// timer-driven share loop keeps running while we wait.
async fn read_line() -> Option<String> {
    tokio::task::spawn_blocking(|| {
        let mut line = String::new();
        match io::stdin().read_line(&mut line) {
            Ok(0) => None,
            Ok(_) => Some(line),
            Err(_) => None,
        }
    })
    .await
    .ok()
    .flatten()
}

/// Context id derived from a display name: lowercase, everything outside
/// `[a-z0-9]` becomes `-`.
fn slugify(name: &str) -> String {
    name.to_lowercase()
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() { c } else { '-' })
        .collect()
}

/// Run the interactive shell until EOF or `quit`.
pub async fn run(
    data_dir: Option<PathBuf>,
    origin_override: Option<String>,
    ephemeral: bool,
) -> Result<()> {
    let data_dir = data_dir.unwrap_or_else(config::default_data_dir);
    let config = BenchConfig::load(&data_dir)?;
    let origin = origin_override.unwrap_or_else(|| config.server.origin.clone());

    let store: Arc<dyn StateStore> = if ephemeral {
        Arc::new(MemoryStore::new())
    } else {
        Arc::new(FileStore::open(data_dir.join("packbench.json")))
    };

    let mut manager = WorkspaceManager::new(store, Arc::new(TermRenderer), Arc::new(TermConfirmer));
    manager.init();
    let events = manager.subscribe();
    let workspace = Arc::new(RwLock::new(manager));

    let client = Arc::new(HttpInstallClient::new(&origin)?);
    let share = AutoShareManager::with_timing(
        workspace.clone(),
        client,
        &origin,
        config.share_timing(),
    );
    let _listener = share.spawn_listener(events);

    println!("packbench shell - type `help` for commands");
    loop {
        print!("> ");
        let _ = io::stdout().flush();
        let Some(line) = read_line().await else {
            break;
        };
        let line = line.trim();
        if line.is_empty() {
            continue;
        }

        let (command, rest) = match line.split_once(char::is_whitespace) {
            Some((command, rest)) => (command, rest.trim()),
            None => (line, ""),
        };

        match command {
            "help" => print_help(),
            "include" => {
                let (path, inline) = match rest.split_once(char::is_whitespace) {
                    Some((path, content)) => (path, Some(content.to_string())),
                    None => (rest, None),
                };
                if path.is_empty() {
                    println!("usage: include <path> [content]");
                    continue;
                }
                let content = match inline {
                    Some(content) => content,
                    None => read_body().await,
                };
                workspace.write().await.include_file(path, &content).await;
            }
            "edit" => {
                let Some((path, content)) = rest.split_once(char::is_whitespace) else {
                    println!("usage: edit <path> <content>");
                    continue;
                };
                if !workspace.write().await.update_content(path, content.trim()) {
                    println!("no such file: {path}");
                }
            }
            "open" => {
                if !workspace.write().await.select_file(rest) {
                    println!("no such file: {rest}");
                }
            }
            "delete" | "rm" => {
                workspace.write().await.delete_file(rest).await;
            }
            "toggle" => workspace.write().await.toggle_folder(rest),
            "undo" => {
                if !workspace.write().await.undo() {
                    println!("nothing to undo");
                }
            }
            "redo" => {
                if !workspace.write().await.redo() {
                    println!("nothing to redo");
                }
            }
            "reset" => {
                workspace.write().await.reset().await;
            }
            "contexts" => {
                let ws = workspace.read().await;
                for ctx in ws.contexts().values() {
                    let marker = if ws.current_context_id() == Some(ctx.id.as_str()) {
                        " (active)"
                    } else {
                        ""
                    };
                    println!("{}  {}{}", ctx.id, ctx.name, marker);
                }
            }
            "new" => {
                let name = if rest.is_empty() {
                    Petnames::default()
                        .generate_one(2, "-")
                        .unwrap_or_else(|| "scratch-pad".to_string())
                } else {
                    rest.to_string()
                };
                let id = slugify(&name);
                let mut ws = workspace.write().await;
                if ws.create_context(&id, &name) {
                    ws.switch_context(&id);
                } else {
                    println!("context already exists: {id}");
                }
            }
            "switch" => {
                if !workspace.write().await.switch_context(rest) {
                    println!("no such context: {rest}");
                }
            }
            "drop" => {
                if !workspace.write().await.delete_context(rest) {
                    println!("cannot delete context: {rest}");
                }
            }
            "share" => {
                let view = share.view().await;
                let status = match view.state {
                    ShareState::Hidden => "hidden",
                    ShareState::Synced => "synced",
                    ShareState::Syncing => "syncing",
                    ShareState::Error => "error",
                };
                match view.command {
                    Some(command) => println!("[{status}] {command}"),
                    None => println!("[{status}] {SHARE_PLACEHOLDER}"),
                }
            }
            "copy" => {
                if !share.copy_share_command(&TermClipboard).await {
                    println!("nothing to copy yet");
                }
            }
            "quit" | "exit" => break,
            other => {
                warn!(command = other, "Unknown shell command");
                println!("unknown command: {other} (try `help`)");
            }
        }
    }

    Ok(())
}

/// Multi-line body terminated by a lone `.` line, as in `mail(1)`.
async fn read_body() -> String {
    println!("enter content, end with a single `.` line:");
    let mut body = String::new();
    while let Some(line) = read_line().await {
        if line.trim_end() == "." {
            break;
        }
        body.push_str(&line);
    }
    body.trim_end_matches('\n').to_string()
}

fn print_help() {
    println!("workspace:  include <path> [content] | edit <path> <content> | open <path>");
    println!("            delete <path> | toggle <folder> | undo | redo | reset");
    println!("contexts:   contexts | new [name] | switch <id> | drop <id>");
    println!("share:      share | copy");
    println!("            help | quit");
}

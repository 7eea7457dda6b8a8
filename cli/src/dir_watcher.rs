use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use notify::{Event, EventKind, RecursiveMode, Watcher};
use tokio::sync::{RwLock, mpsc};
use tokio::task::JoinHandle;

use crate::app_state::AppState;
use crate::commands;

/// Editors write a file in several steps; wait for the burst to settle.
const SETTLE: Duration = Duration::from_millis(250);

/// Start watching the mods root, reloading the engine when a definition
/// file changes.
pub async fn init_watcher(state: Arc<RwLock<AppState>>) -> Option<JoinHandle<()>> {
    let root = {
        let s = state.read().await;
        if !s.config.watch {
            return None;
        }
        s.config.mods_root.clone()
    };

    if !root.exists() {
        println!("Warning: Mods root {} does not exist", root.display());
        return None;
    }

    let (tx, mut rx) = mpsc::unbounded_channel::<notify::Result<Event>>();
    let mut watcher = match notify::recommended_watcher(move |res| {
        let _ = tx.send(res);
    }) {
        Ok(w) => w,
        Err(e) => {
            println!("Failed to start directory watcher: {}", e);
            return None;
        }
    };

    if let Err(e) = watcher.watch(&root, RecursiveMode::Recursive) {
        println!("Failed to watch {}: {}", root.display(), e);
        return None;
    }

    println!("Watching mods root: {}", root.display());

    let handle = tokio::spawn(async move {
        // Dropping the watcher stops the notifications
        let _watcher = watcher;
        while let Some(res) = rx.recv().await {
            match res {
                Ok(event) if is_definition_change(&event) => {
                    tokio::time::sleep(SETTLE).await;
                    while rx.try_recv().is_ok() {}

                    let changed: Vec<PathBuf> = event.paths;
                    tracing::info!(paths = ?changed, "Definition files changed");
                    commands::reload(Arc::clone(&state)).await;
                }
                Ok(_) => {}
                Err(e) => println!("Error: {}", e),
            }
        }
    });

    Some(handle)
}

fn is_definition_change(event: &Event) -> bool {
    matches!(
        event.kind,
        EventKind::Create(_) | EventKind::Modify(_) | EventKind::Remove(_)
    ) && event.paths.iter().any(|path| is_definition_file(path))
}

fn is_definition_file(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| ext.eq_ignore_ascii_case("json") || ext.eq_ignore_ascii_case("toml"))
}

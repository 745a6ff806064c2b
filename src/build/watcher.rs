//! Filesystem watching for the command source tree.
//!
//! Bridges `notify` events into a tokio channel of simplified add / change /
//! remove events. Pre-existing files are reported as add events before any
//! live event, matching the orchestrator's expectation that the initial
//! state of the tree flows through the same code path as later edits.
//! Directory add/remove noise is filtered out here.

use std::path::{Path, PathBuf};

use notify::event::{CreateKind, EventKind, ModifyKind, RemoveKind, RenameMode};
use notify::{Config as NotifyConfig, RecommendedWatcher, RecursiveMode, Watcher};
use tokio::sync::mpsc;
use tracing::warn;

use crate::error::{ForgeError, Result};

const CHANNEL_CAPACITY: usize = 1024;

/// A simplified filesystem event for a single path.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WatchEvent {
    Added(PathBuf),
    Changed(PathBuf),
    Removed(PathBuf),
}

impl WatchEvent {
    pub fn path(&self) -> &Path {
        match self {
            WatchEvent::Added(p) | WatchEvent::Changed(p) | WatchEvent::Removed(p) => p,
        }
    }

    /// Short label for log lines.
    pub fn label(&self) -> &'static str {
        match self {
            WatchEvent::Added(_) => "add",
            WatchEvent::Changed(_) => "change",
            WatchEvent::Removed(_) => "remove",
        }
    }
}

/// Handle owning the underlying watcher. Dropping it releases the watch
/// resources; [`FsWatcher::close`] does so explicitly.
pub struct FsWatcher {
    _watcher: RecommendedWatcher,
}

impl FsWatcher {
    /// Stops watching and releases the watcher's resources.
    pub fn close(self) {
        drop(self);
    }
}

/// Starts watching `root` recursively.
///
/// Returns the watcher handle and the event stream. Every file already
/// present under `root` is delivered as an initial `Added` event.
pub fn watch_dir(root: &Path) -> Result<(FsWatcher, mpsc::Receiver<WatchEvent>)> {
    let (tx, rx) = mpsc::channel(CHANNEL_CAPACITY);

    for path in existing_files(root) {
        if tx.try_send(WatchEvent::Added(path)).is_err() {
            warn!("Watch channel full while reporting pre-existing files");
            break;
        }
    }

    let event_tx = tx.clone();
    let mut watcher = RecommendedWatcher::new(
        move |res: std::result::Result<notify::Event, notify::Error>| {
            if let Ok(event) = res {
                for ev in classify_event(&event) {
                    // Dropping an event under burst pressure is acceptable;
                    // every surviving event triggers a full re-scan anyway.
                    let _ = event_tx.try_send(ev);
                }
            }
        },
        NotifyConfig::default(),
    )
    .map_err(|e| ForgeError::Config(format!("Failed to create filesystem watcher: {}", e)))?;

    watcher
        .watch(root, RecursiveMode::Recursive)
        .map_err(|e| {
            ForgeError::Config(format!(
                "Failed to watch \"{}\": {}",
                root.display(),
                e
            ))
        })?;

    Ok((FsWatcher { _watcher: watcher }, rx))
}

/// Maps a raw notify event onto zero or more simplified events. Directory
/// events and watcher lifecycle noise map to nothing.
fn classify_event(event: &notify::Event) -> Vec<WatchEvent> {
    match &event.kind {
        EventKind::Create(CreateKind::File) | EventKind::Create(CreateKind::Any) => event
            .paths
            .iter()
            .filter(|p| p.is_file())
            .map(|p| WatchEvent::Added(p.clone()))
            .collect(),

        EventKind::Modify(ModifyKind::Data(_)) | EventKind::Modify(ModifyKind::Any) => event
            .paths
            .iter()
            .filter(|p| p.is_file())
            .map(|p| WatchEvent::Changed(p.clone()))
            .collect(),

        EventKind::Modify(ModifyKind::Name(mode)) => match mode {
            RenameMode::From => event
                .paths
                .first()
                .map(|p| vec![WatchEvent::Removed(p.clone())])
                .unwrap_or_default(),
            RenameMode::To => event
                .paths
                .first()
                .filter(|p| p.is_file())
                .map(|p| vec![WatchEvent::Added(p.clone())])
                .unwrap_or_default(),
            RenameMode::Both => {
                let mut events = Vec::new();
                if let Some(from) = event.paths.first() {
                    events.push(WatchEvent::Removed(from.clone()));
                }
                if let Some(to) = event.paths.get(1) {
                    if to.is_file() {
                        events.push(WatchEvent::Added(to.clone()));
                    }
                }
                events
            }
            _ => event
                .paths
                .iter()
                .map(|p| {
                    if p.exists() {
                        WatchEvent::Changed(p.clone())
                    } else {
                        WatchEvent::Removed(p.clone())
                    }
                })
                .collect(),
        },

        EventKind::Remove(RemoveKind::File) | EventKind::Remove(RemoveKind::Any) => event
            .paths
            .iter()
            .map(|p| WatchEvent::Removed(p.clone()))
            .collect(),

        // Directory creation/removal and everything else is noise here.
        _ => Vec::new(),
    }
}

fn existing_files(root: &Path) -> Vec<PathBuf> {
    let mut files = Vec::new();
    collect_files(root, &mut files);
    files
}

fn collect_files(dir: &Path, out: &mut Vec<PathBuf>) {
    let entries = match std::fs::read_dir(dir) {
        Ok(entries) => entries,
        Err(_) => return,
    };
    for entry in entries.flatten() {
        let path = entry.path();
        if path.is_dir() {
            collect_files(&path, out);
        } else {
            out.push(path);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn test_classify_remove_folder_is_dropped() {
        let event = notify::Event::new(EventKind::Remove(RemoveKind::Folder))
            .add_path(PathBuf::from("/x/dir"));
        assert!(classify_event(&event).is_empty());
    }

    #[test]
    fn test_classify_remove_file() {
        let event = notify::Event::new(EventKind::Remove(RemoveKind::File))
            .add_path(PathBuf::from("/x/command.json5"));
        assert_eq!(
            classify_event(&event),
            vec![WatchEvent::Removed(PathBuf::from("/x/command.json5"))]
        );
    }

    #[test]
    fn test_classify_create_filters_directories() {
        let tmp = TempDir::new().unwrap();
        let file = tmp.path().join("command.json5");
        fs::write(&file, "{}").unwrap();
        let dir = tmp.path().join("sub");
        fs::create_dir(&dir).unwrap();

        let event = notify::Event::new(EventKind::Create(CreateKind::Any))
            .add_path(file.clone())
            .add_path(dir);
        assert_eq!(classify_event(&event), vec![WatchEvent::Added(file)]);
    }

    #[test]
    fn test_classify_rename_both() {
        let tmp = TempDir::new().unwrap();
        let to = tmp.path().join("command.json5");
        fs::write(&to, "{}").unwrap();

        let event = notify::Event::new(EventKind::Modify(ModifyKind::Name(RenameMode::Both)))
            .add_path(tmp.path().join("old.json5"))
            .add_path(to.clone());
        assert_eq!(
            classify_event(&event),
            vec![
                WatchEvent::Removed(tmp.path().join("old.json5")),
                WatchEvent::Added(to)
            ]
        );
    }

    #[tokio::test]
    async fn test_pre_existing_files_reported_as_adds() {
        let tmp = TempDir::new().unwrap();
        fs::create_dir_all(tmp.path().join("ping")).unwrap();
        fs::write(tmp.path().join("ping/command.json5"), "{}").unwrap();

        let (watcher, mut rx) = watch_dir(tmp.path()).unwrap();
        let first = rx.recv().await.unwrap();
        assert_eq!(
            first,
            WatchEvent::Added(tmp.path().join("ping/command.json5"))
        );
        watcher.close();
    }
}

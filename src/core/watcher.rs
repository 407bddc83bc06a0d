//! Directory change notifications
//!
//! A `ChangeSource` turns platform file-system events for a directory into a
//! channel of `ChangeEvent`s. Events are produced on a background thread; the
//! owner of the document set drains the receiver on its own thread.

use std::path::{Path, PathBuf};
use std::sync::mpsc::{self, Receiver, Sender};
use std::sync::{Arc, Mutex};

use notify::event::ModifyKind;
use notify::{Event, EventKind, RecommendedWatcher, RecursiveMode, Watcher};

use super::error::Result;

/// Kind of change observed under the watched directory
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChangeKind {
    Created,
    Removed,
    Modified,
    Renamed,
}

/// A file-system change under the watched directory
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChangeEvent {
    pub kind: ChangeKind,
    pub paths: Vec<PathBuf>,
}

impl ChangeEvent {
    pub fn new(kind: ChangeKind, paths: Vec<PathBuf>) -> Self {
        Self { kind, paths }
    }

    /// Map a notify event to a change event; `None` for access and metadata noise
    pub fn from_notify(event: Event) -> Option<Self> {
        let kind = match event.kind {
            EventKind::Create(_) => ChangeKind::Created,
            EventKind::Remove(_) => ChangeKind::Removed,
            EventKind::Modify(ModifyKind::Name(_)) => ChangeKind::Renamed,
            EventKind::Modify(ModifyKind::Data(_)) | EventKind::Modify(ModifyKind::Any) => {
                ChangeKind::Modified
            }
            _ => return None,
        };
        Some(Self::new(kind, event.paths))
    }
}

/// Capability producing change events for a directory
pub trait ChangeSource: Send {
    /// Start delivering changes under `path`; replaces any previous subscription
    fn subscribe(&mut self, path: &Path) -> Result<Receiver<ChangeEvent>>;

    /// Stop delivering changes
    fn unsubscribe(&mut self);
}

/// `ChangeSource` backed by the platform's recommended `notify` watcher
#[derive(Default)]
pub struct NotifyChangeSource {
    watcher: Option<RecommendedWatcher>,
}

impl NotifyChangeSource {
    pub fn new() -> Self {
        Self::default()
    }
}

impl ChangeSource for NotifyChangeSource {
    fn subscribe(&mut self, path: &Path) -> Result<Receiver<ChangeEvent>> {
        let (tx, rx) = mpsc::channel();

        let mut watcher = notify::recommended_watcher(move |res: notify::Result<Event>| {
            match res {
                Ok(event) => {
                    if let Some(change) = ChangeEvent::from_notify(event) {
                        let _ = tx.send(change);
                    }
                }
                Err(e) => tracing::warn!("Watch error: {}", e),
            }
        })?;

        watcher.watch(path, RecursiveMode::Recursive)?;
        tracing::info!("Watching {}", path.display());

        self.watcher = Some(watcher);
        Ok(rx)
    }

    fn unsubscribe(&mut self) {
        self.watcher = None;
    }
}

/// `ChangeSource` fed by hand, for hosts with their own notification facility
#[derive(Clone, Default)]
pub struct ManualChangeSource {
    sender: Arc<Mutex<Option<Sender<ChangeEvent>>>>,
}

impl ManualChangeSource {
    pub fn new() -> Self {
        Self::default()
    }

    /// Deliver an event to the current subscriber; `false` if nobody listens
    pub fn send(&self, event: ChangeEvent) -> bool {
        match self.sender.lock() {
            Ok(guard) => guard
                .as_ref()
                .map(|tx| tx.send(event).is_ok())
                .unwrap_or(false),
            Err(_) => false,
        }
    }
}

impl ChangeSource for ManualChangeSource {
    fn subscribe(&mut self, _path: &Path) -> Result<Receiver<ChangeEvent>> {
        let (tx, rx) = mpsc::channel();
        if let Ok(mut guard) = self.sender.lock() {
            *guard = Some(tx);
        }
        Ok(rx)
    }

    fn unsubscribe(&mut self) {
        if let Ok(mut guard) = self.sender.lock() {
            *guard = None;
        }
    }
}

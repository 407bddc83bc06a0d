//! Document set model: the browser's single source of truth
//!
//! Owns the list of documents of the configured type under the documents
//! root, the selection, and the "opening" marker. The list is only ever
//! rebuilt wholesale by [`DocumentSetModel::scan`]. Mutations go straight to
//! the file system; when a change source is attached the resulting
//! notifications drive the rescan, otherwise the mutation rescans itself.
//!
//! All state lives behind `&mut self` and is meant to be driven from one
//! thread. Change notifications are queued on a channel and applied by
//! [`DocumentSetModel::process_changes`] on that thread.

use std::collections::BTreeSet;
use std::path::{Path, PathBuf};
use std::sync::mpsc::{self, Receiver, Sender, TryRecvError};

use super::access::{AccessGuard, ScopedAccess, Unrestricted};
use super::config::BrowserConfig;
use super::document::DocumentEntry;
use super::error::{BrowserError, Result};
use super::file_system::{unique_path, FileOps, LocalFileSystem};
use super::watcher::{ChangeEvent, ChangeSource, NotifyChangeSource};

/// Base name for documents created from the template
pub const UNTITLED: &str = "Untitled";

/// Notification broadcast to subscribers after a state change
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ModelEvent {
    /// The document list was rebuilt
    Scanned { count: usize },
    /// Selection mode was switched on or off
    SelectionModeChanged(bool),
    /// The selection set changed
    SelectionChanged,
    /// An entry is being opened, or the open finished
    Opening(Option<PathBuf>),
    Renamed { from: PathBuf, to: PathBuf },
    Deleted(PathBuf),
    Duplicated { from: PathBuf, to: PathBuf },
    Created(PathBuf),
    Imported(PathBuf),
}

/// Documents of one type under the documents root
pub struct DocumentSetModel {
    config: BrowserConfig,
    ops: Box<dyn FileOps>,
    access: Box<dyn ScopedAccess>,
    entries: Vec<DocumentEntry>,
    selected: BTreeSet<PathBuf>,
    selecting: bool,
    opening: Option<PathBuf>,
    source: Option<Box<dyn ChangeSource>>,
    changes: Option<Receiver<ChangeEvent>>,
    subscribers: Vec<Sender<ModelEvent>>,
}

impl DocumentSetModel {
    /// Create a model over the local file system and scan it.
    ///
    /// Attaches a `notify` watch on the documents root when `config.watch` is set.
    pub fn new(config: BrowserConfig) -> Result<Self> {
        let watch = config.watch;
        let mut model =
            Self::with_capabilities(config, Box::new(LocalFileSystem), Box::new(Unrestricted))?;
        if watch {
            model.watch(Box::new(NotifyChangeSource::new()))?;
        }
        Ok(model)
    }

    /// Create a model with explicit file-system and access capabilities and scan it
    pub fn with_capabilities(
        config: BrowserConfig,
        ops: Box<dyn FileOps>,
        access: Box<dyn ScopedAccess>,
    ) -> Result<Self> {
        let config = config.normalized();
        config.validate()?;

        let mut model = Self {
            config,
            ops,
            access,
            entries: Vec::new(),
            selected: BTreeSet::new(),
            selecting: false,
            opening: None,
            source: None,
            changes: None,
            subscribers: Vec::new(),
        };
        model.scan();
        Ok(model)
    }

    pub fn config(&self) -> &BrowserConfig {
        &self.config
    }

    /// Documents as of the last scan, sorted by name
    pub fn entries(&self) -> &[DocumentEntry] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Find an entry by path
    pub fn entry(&self, path: &Path) -> Option<&DocumentEntry> {
        self.entries.iter().find(|e| e.path == path)
    }

    pub fn documents_root(&self) -> Result<PathBuf> {
        self.config.resolve_documents_root()
    }

    /// Receive every subsequent model event
    pub fn subscribe(&mut self) -> Receiver<ModelEvent> {
        let (tx, rx) = mpsc::channel();
        self.subscribers.push(tx);
        rx
    }

    fn notify(&mut self, event: ModelEvent) {
        self.subscribers.retain(|tx| tx.send(event.clone()).is_ok());
    }

    /// Rebuild the document list from disk.
    ///
    /// An unavailable documents root is logged and leaves the previous list in place.
    pub fn scan(&mut self) {
        let root = match self.documents_root() {
            Ok(root) => root,
            Err(e) => {
                tracing::warn!("Couldn't get documents directory: {}", e);
                return;
            }
        };

        let paths = match self
            .ops
            .documents(&root, self.config.extension(), &self.config.excluded)
        {
            Ok(paths) => paths,
            Err(e) => {
                tracing::warn!("Couldn't scan {}: {}", root.display(), e);
                return;
            }
        };

        let mut entries: Vec<DocumentEntry> = paths.into_iter().map(DocumentEntry::new).collect();
        entries.sort();
        self.entries = entries;

        let before = self.selected.len();
        let entries = &self.entries;
        self.selected
            .retain(|path| entries.iter().any(|e| &e.path == path));

        tracing::debug!("Scanned {} documents in {}", self.entries.len(), root.display());
        let count = self.entries.len();
        self.notify(ModelEvent::Scanned { count });
        if self.selected.len() != before {
            self.notify(ModelEvent::SelectionChanged);
        }
    }

    /// Rescan unless a change source will report the mutation
    fn refresh_after_mutation(&mut self) {
        if !self.is_watching() {
            self.scan();
        }
    }

    /// Rename a document, keeping its directory and extension.
    ///
    /// Fails if a document with the new name already exists; no disambiguation.
    pub fn rename(&mut self, entry: &DocumentEntry, new_name: &str) -> Result<PathBuf> {
        if new_name.is_empty() || new_name.contains(std::path::is_separator) {
            return Err(BrowserError::io(
                &entry.path,
                std::io::Error::new(
                    std::io::ErrorKind::InvalidInput,
                    format!("invalid document name '{}'", new_name),
                ),
            ));
        }

        let target = entry
            .path
            .with_file_name(format!("{}.{}", new_name, self.config.extension()));

        self.ops
            .move_item(&entry.path, &target)
            .map_err(|e| BrowserError::io(&entry.path, e))?;
        tracing::info!("Renamed {} to {}", entry.path.display(), target.display());

        if self.selected.remove(&entry.path) {
            self.selected.insert(target.clone());
        }
        self.notify(ModelEvent::Renamed {
            from: entry.path.clone(),
            to: target.clone(),
        });
        self.refresh_after_mutation();
        Ok(target)
    }

    /// Delete one document
    pub fn delete(&mut self, entry: &DocumentEntry) -> Result<()> {
        self.ops
            .remove_item(&entry.path)
            .map_err(|e| BrowserError::io(&entry.path, e))?;
        tracing::info!("Deleted {}", entry.path.display());

        if self.selected.remove(&entry.path) {
            self.notify(ModelEvent::SelectionChanged);
        }
        self.notify(ModelEvent::Deleted(entry.path.clone()));
        self.refresh_after_mutation();
        Ok(())
    }

    /// Delete every selected document in path order.
    ///
    /// Stops at the first failure without restoring what was already
    /// removed. The selection is cleared either way. Returns how many
    /// documents were removed.
    pub fn delete_selected(&mut self) -> Result<usize> {
        let targets: Vec<PathBuf> = std::mem::take(&mut self.selected).into_iter().collect();
        self.notify(ModelEvent::SelectionChanged);

        let mut removed = 0;
        let mut outcome = Ok(());
        for path in &targets {
            if let Err(e) = self.ops.remove_item(path) {
                tracing::warn!("Failed to delete {}: {}", path.display(), e);
                outcome = Err(BrowserError::io(path, e));
                break;
            }
            tracing::info!("Deleted {}", path.display());
            self.notify(ModelEvent::Deleted(path.clone()));
            removed += 1;
        }

        self.refresh_after_mutation();
        outcome.map(|()| removed)
    }

    /// Copy every selected document to a free name in the documents root.
    ///
    /// Stops at the first failure; copies already made are kept.
    pub fn duplicate_selected(&mut self) -> Result<Vec<PathBuf>> {
        let root = self.documents_root()?;
        let sources: Vec<PathBuf> = self.selected.iter().cloned().collect();
        let extension = self.config.extension().to_string();

        let mut created = Vec::new();
        let mut outcome = Ok(());
        for source in &sources {
            let base = DocumentEntry::new(source.clone()).name;
            let dest = unique_path(self.ops.as_ref(), &root, &base, &extension);

            if let Err(e) = self.ops.copy_item(source, &dest) {
                tracing::warn!("Failed to duplicate {}: {}", source.display(), e);
                outcome = Err(BrowserError::io(source, e));
                break;
            }
            tracing::info!("Duplicated {} to {}", source.display(), dest.display());
            self.notify(ModelEvent::Duplicated {
                from: source.clone(),
                to: dest.clone(),
            });
            created.push(dest);
        }

        self.refresh_after_mutation();
        outcome.map(|()| created)
    }

    /// Copy the template to a free `Untitled[ N]` name and return its path
    pub fn new_document(&mut self) -> Result<PathBuf> {
        let root = self.documents_root()?;
        let dest = unique_path(self.ops.as_ref(), &root, UNTITLED, self.config.extension());

        self.ops
            .copy_item(&self.config.template_path, &dest)
            .map_err(|e| BrowserError::io(&self.config.template_path, e))?;
        tracing::info!("Created {}", dest.display());

        self.notify(ModelEvent::Created(dest.clone()));
        self.refresh_after_mutation();
        Ok(dest)
    }

    /// Copy an external file into the documents root under its own name.
    ///
    /// Failures are logged and yield `None`.
    pub fn import_file(&mut self, external: &Path) -> Option<PathBuf> {
        let root = match self.documents_root() {
            Ok(root) => root,
            Err(e) => {
                tracing::warn!("Couldn't get documents directory: {}", e);
                return None;
            }
        };

        let Some(file_name) = external.file_name() else {
            tracing::warn!("Nothing to import at {}", external.display());
            return None;
        };
        let dest = root.join(file_name);

        let copied = {
            let Some(_guard) = AccessGuard::acquire(self.access.as_ref(), external) else {
                tracing::warn!("Access denied to {}", external.display());
                return None;
            };
            self.ops.copy_item(external, &dest)
        };

        let imported = match copied {
            Ok(()) => {
                tracing::info!("Imported {} to {}", external.display(), dest.display());
                self.notify(ModelEvent::Imported(dest.clone()));
                Some(dest)
            }
            Err(e) => {
                tracing::warn!("Error importing {}: {}", external.display(), e);
                None
            }
        };

        self.refresh_after_mutation();
        imported
    }

    pub fn is_selecting(&self) -> bool {
        self.selecting
    }

    pub fn selected(&self) -> &BTreeSet<PathBuf> {
        &self.selected
    }

    pub fn is_selected(&self, entry: &DocumentEntry) -> bool {
        self.selected.contains(&entry.path)
    }

    /// Enter selection mode
    pub fn begin_selection(&mut self) {
        if !self.selecting {
            self.selecting = true;
            self.notify(ModelEvent::SelectionModeChanged(true));
        }
    }

    /// Leave selection mode and clear the selection
    pub fn end_selection(&mut self) {
        let had_selection = !self.selected.is_empty();
        self.selected.clear();
        if self.selecting {
            self.selecting = false;
            self.notify(ModelEvent::SelectionModeChanged(false));
        }
        if had_selection {
            self.notify(ModelEvent::SelectionChanged);
        }
    }

    /// Flip an entry's selection; returns whether it is now selected
    pub fn toggle_selection(&mut self, entry: &DocumentEntry) -> bool {
        let now_selected = if self.selected.remove(&entry.path) {
            false
        } else {
            self.selected.insert(entry.path.clone());
            true
        };
        self.notify(ModelEvent::SelectionChanged);
        now_selected
    }

    /// Tap on an entry: toggles it in selection mode, otherwise opens it.
    ///
    /// Returns the path to open, if any.
    pub fn activate(&mut self, entry: &DocumentEntry) -> Option<PathBuf> {
        if self.selecting {
            self.toggle_selection(entry);
            None
        } else {
            self.open(entry);
            Some(entry.path.clone())
        }
    }

    /// Mark an entry as being opened
    pub fn open(&mut self, entry: &DocumentEntry) {
        self.opening = Some(entry.path.clone());
        self.notify(ModelEvent::Opening(self.opening.clone()));
    }

    /// Entry currently being opened
    pub fn opening(&self) -> Option<&Path> {
        self.opening.as_deref()
    }

    /// Clear the opening marker, returning what was being opened
    pub fn finish_opening(&mut self) -> Option<PathBuf> {
        let opened = self.opening.take();
        if opened.is_some() {
            self.notify(ModelEvent::Opening(None));
        }
        opened
    }

    /// Subscribe to changes under the documents root
    pub fn watch(&mut self, mut source: Box<dyn ChangeSource>) -> Result<()> {
        let root = self.documents_root()?;
        self.unwatch();

        let rx = source.subscribe(&root)?;
        self.changes = Some(rx);
        self.source = Some(source);
        Ok(())
    }

    /// Drop the change subscription; mutations rescan on their own again
    pub fn unwatch(&mut self) {
        if let Some(mut source) = self.source.take() {
            source.unsubscribe();
        }
        self.changes = None;
    }

    pub fn is_watching(&self) -> bool {
        self.changes.is_some()
    }

    /// Drain queued change notifications and rescan if any arrived.
    ///
    /// Call from the thread that owns the model. Returns the number of
    /// notifications drained.
    pub fn process_changes(&mut self) -> usize {
        let mut drained = 0;
        let mut disconnected = false;

        if let Some(ref rx) = self.changes {
            loop {
                match rx.try_recv() {
                    Ok(event) => {
                        tracing::debug!("File system change: {:?}", event);
                        drained += 1;
                    }
                    Err(TryRecvError::Empty) => break,
                    Err(TryRecvError::Disconnected) => {
                        disconnected = true;
                        break;
                    }
                }
            }
        }

        if disconnected {
            tracing::warn!("Change source disconnected");
            self.source = None;
            self.changes = None;
        }

        if drained > 0 {
            self.scan();
        }
        drained
    }
}

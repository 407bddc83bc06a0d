//! Background thumbnail loading with per-document cancellation
//!
//! Each document has at most one load in flight. Starting a new load for a
//! document aborts the previous one and bumps the document's generation.
//! Finished loads are queued and applied on the owner's thread by
//! [`ThumbnailLoader::apply_ready`]; a result is applied only if its
//! generation is still current, so a superseded read that already completed
//! is dropped instead of overwriting the newer image.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use tokio::runtime::Handle;
use tokio::sync::mpsc::{self, UnboundedReceiver, UnboundedSender};
use tokio::task::JoinHandle;

use super::source::ThumbnailSource;
use super::Thumbnail;
use crate::core::error::{BrowserError, Result};

/// In-flight state for one document
struct Slot {
    generation: u64,
    task: Option<JoinHandle<()>>,
}

/// A finished load waiting to be applied
struct Delivery {
    path: PathBuf,
    generation: u64,
    result: Result<Thumbnail>,
}

/// Loads thumbnails on a tokio runtime and keeps the latest image per document
pub struct ThumbnailLoader {
    runtime: Handle,
    source: Arc<dyn ThumbnailSource>,
    slots: HashMap<PathBuf, Slot>,
    images: HashMap<PathBuf, Thumbnail>,
    tx: UnboundedSender<Delivery>,
    rx: UnboundedReceiver<Delivery>,
    next_generation: u64,
}

impl ThumbnailLoader {
    pub fn new(runtime: Handle, source: Arc<dyn ThumbnailSource>) -> Self {
        let (tx, rx) = mpsc::unbounded_channel();
        Self {
            runtime,
            source,
            slots: HashMap::new(),
            images: HashMap::new(),
            tx,
            rx,
            next_generation: 0,
        }
    }

    /// Start loading a document's thumbnail, cancelling any load already running for it
    pub fn load(&mut self, document: &Path) {
        self.next_generation += 1;
        let generation = self.next_generation;

        let slot = self.slots.entry(document.to_path_buf()).or_insert(Slot {
            generation,
            task: None,
        });
        if let Some(task) = slot.task.take() {
            task.abort();
        }
        slot.generation = generation;

        let tx = self.tx.clone();
        let source = Arc::clone(&self.source);
        let path = document.to_path_buf();

        slot.task = Some(self.runtime.spawn(async move {
            let read_path = path.clone();
            let result = match tokio::task::spawn_blocking(move || source.thumbnail(&read_path)).await
            {
                Ok(result) => result,
                Err(e) => Err(BrowserError::Thumbnail {
                    path: path.clone(),
                    message: e.to_string(),
                }),
            };
            let _ = tx.send(Delivery {
                path,
                generation,
                result,
            });
        }));
    }

    /// Apply every finished load; returns the documents whose image changed
    pub fn apply_ready(&mut self) -> Vec<PathBuf> {
        let mut updated = Vec::new();
        while let Ok(delivery) = self.rx.try_recv() {
            self.apply(delivery, &mut updated);
        }
        updated
    }

    /// Wait for every in-flight load and apply the results
    pub async fn settle(&mut self) -> Vec<PathBuf> {
        let mut updated = Vec::new();
        while self.in_flight() > 0 {
            match self.rx.recv().await {
                Some(delivery) => self.apply(delivery, &mut updated),
                None => break,
            }
        }
        updated
    }

    fn apply(&mut self, delivery: Delivery, updated: &mut Vec<PathBuf>) {
        let path = delivery.path.clone();
        match self.accept(delivery) {
            Ok(()) => updated.push(path),
            Err(BrowserError::Cancelled) => {
                tracing::debug!("Discarding superseded thumbnail for {}", path.display());
            }
            Err(e) => tracing::warn!("Error loading thumbnail for {}: {}", path.display(), e),
        }
    }

    fn accept(&mut self, delivery: Delivery) -> Result<()> {
        let slot = self
            .slots
            .get_mut(&delivery.path)
            .filter(|slot| slot.generation == delivery.generation)
            .ok_or(BrowserError::Cancelled)?;
        slot.task = None;

        let thumbnail = delivery.result?;
        self.images.insert(delivery.path, thumbnail);
        Ok(())
    }

    /// Latest applied thumbnail for a document
    pub fn image(&self, document: &Path) -> Option<&Thumbnail> {
        self.images.get(document)
    }

    /// Abort a document's load; any result still in the queue is discarded
    pub fn cancel(&mut self, document: &Path) {
        if let Some(slot) = self.slots.remove(document) {
            if let Some(task) = slot.task {
                task.abort();
            }
        }
    }

    pub fn cancel_all(&mut self) {
        for (_, slot) in self.slots.drain() {
            if let Some(task) = slot.task {
                task.abort();
            }
        }
    }

    /// Cancel a document's load and drop its image
    pub fn forget(&mut self, document: &Path) {
        self.cancel(document);
        self.images.remove(document);
    }

    /// Number of documents with a load that has not been applied yet
    pub fn in_flight(&self) -> usize {
        self.slots.values().filter(|slot| slot.task.is_some()).count()
    }
}

impl Drop for ThumbnailLoader {
    fn drop(&mut self) {
        self.cancel_all();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{DynamicImage, RgbaImage};
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::sync::mpsc as std_mpsc;
    use std::sync::Mutex;
    use std::time::Duration;

    /// Returns a `width x 1` image; the width and delay are read when a call starts
    struct ScriptedSource {
        width: AtomicU32,
        delay_ms: AtomicU32,
        started: Mutex<std_mpsc::Sender<u32>>,
    }

    impl ScriptedSource {
        fn new() -> (Arc<Self>, std_mpsc::Receiver<u32>) {
            let (tx, rx) = std_mpsc::channel();
            let source = Arc::new(Self {
                width: AtomicU32::new(1),
                delay_ms: AtomicU32::new(0),
                started: Mutex::new(tx),
            });
            (source, rx)
        }

        fn script(&self, width: u32, delay_ms: u32) {
            self.width.store(width, Ordering::SeqCst);
            self.delay_ms.store(delay_ms, Ordering::SeqCst);
        }
    }

    impl ThumbnailSource for ScriptedSource {
        fn thumbnail(&self, _document: &Path) -> Result<Thumbnail> {
            let width = self.width.load(Ordering::SeqCst);
            let delay = self.delay_ms.load(Ordering::SeqCst);
            let _ = self.started.lock().unwrap().send(width);
            std::thread::sleep(Duration::from_millis(delay as u64));
            Ok(Thumbnail::new(DynamicImage::ImageRgba8(RgbaImage::new(
                width, 1,
            ))))
        }
    }

    struct FailingSource;

    impl ThumbnailSource for FailingSource {
        fn thumbnail(&self, document: &Path) -> Result<Thumbnail> {
            Err(BrowserError::Thumbnail {
                path: document.to_path_buf(),
                message: "unreadable".to_string(),
            })
        }
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_load_applies_result() {
        let (source, _started) = ScriptedSource::new();
        source.script(7, 0);
        let mut loader = ThumbnailLoader::new(Handle::current(), source);

        let doc = Path::new("/docs/a.doc");
        loader.load(doc);
        assert_eq!(loader.in_flight(), 1);

        let updated = loader.settle().await;
        assert_eq!(updated, vec![doc.to_path_buf()]);
        assert_eq!(loader.image(doc).unwrap().width(), 7);
        assert_eq!(loader.in_flight(), 0);
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_second_load_supersedes_first() {
        let (source, started) = ScriptedSource::new();
        let mut loader = ThumbnailLoader::new(Handle::current(), source.clone());
        let doc = Path::new("/docs/a.doc");

        source.script(1, 300);
        loader.load(doc);
        assert_eq!(started.recv_timeout(Duration::from_secs(5)).unwrap(), 1);

        source.script(2, 0);
        loader.load(doc);
        assert_eq!(loader.in_flight(), 1);

        loader.settle().await;
        assert_eq!(loader.image(doc).unwrap().width(), 2);

        // Let the slow first read finish; it must never be applied
        tokio::time::sleep(Duration::from_millis(400)).await;
        assert!(loader.apply_ready().is_empty());
        assert_eq!(loader.image(doc).unwrap().width(), 2);
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_stale_delivery_is_discarded() {
        let (source, _started) = ScriptedSource::new();
        let mut loader = ThumbnailLoader::new(Handle::current(), source.clone());
        let doc = Path::new("/docs/a.doc");

        source.script(5, 0);
        loader.load(doc);
        loader.settle().await;

        // A read that completed but belongs to an older generation
        let stale = Delivery {
            path: doc.to_path_buf(),
            generation: 0,
            result: Ok(Thumbnail::new(DynamicImage::ImageRgba8(RgbaImage::new(9, 1)))),
        };
        loader.tx.send(stale).unwrap();

        assert!(loader.apply_ready().is_empty());
        assert_eq!(loader.image(doc).unwrap().width(), 5);
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_cancel_discards_pending_result() {
        let (source, started) = ScriptedSource::new();
        let mut loader = ThumbnailLoader::new(Handle::current(), source.clone());
        let doc = Path::new("/docs/a.doc");

        source.script(3, 100);
        loader.load(doc);
        started.recv_timeout(Duration::from_secs(5)).unwrap();
        loader.cancel(doc);
        assert_eq!(loader.in_flight(), 0);

        tokio::time::sleep(Duration::from_millis(250)).await;
        assert!(loader.apply_ready().is_empty());
        assert!(loader.image(doc).is_none());
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_failure_keeps_previous_image() {
        let (source, _started) = ScriptedSource::new();
        let mut loader = ThumbnailLoader::new(Handle::current(), source.clone());
        let doc = Path::new("/docs/a.doc");

        source.script(4, 0);
        loader.load(doc);
        loader.settle().await;

        loader.source = Arc::new(FailingSource);
        loader.load(doc);
        assert!(loader.settle().await.is_empty());
        assert_eq!(loader.image(doc).unwrap().width(), 4);
        assert_eq!(loader.in_flight(), 0);
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_documents_load_independently() {
        let (source, _started) = ScriptedSource::new();
        source.script(6, 0);
        let mut loader = ThumbnailLoader::new(Handle::current(), source);

        let a = Path::new("/docs/a.doc");
        let b = Path::new("/docs/b.doc");
        loader.load(a);
        loader.load(b);
        assert_eq!(loader.in_flight(), 2);

        let mut updated = loader.settle().await;
        updated.sort();
        assert_eq!(updated, vec![a.to_path_buf(), b.to_path_buf()]);

        loader.forget(a);
        assert!(loader.image(a).is_none());
        assert!(loader.image(b).is_some());
    }
}

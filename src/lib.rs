//! Docshelf - document-set model for in-app file browsers
//!
//! Lists the documents of one file type under an app's documents directory,
//! mirrors rename, delete, duplicate, import and create operations onto the
//! file system, rescans on directory changes, and loads thumbnails in the
//! background. Rendering is left to the host UI, which drives the model from
//! its own thread and listens for [`ModelEvent`]s.

pub mod core;
pub mod logging;
pub mod thumbnail;

pub use crate::core::access::{AccessGuard, ScopedAccess, Unrestricted};
pub use crate::core::config::BrowserConfig;
pub use crate::core::document::DocumentEntry;
pub use crate::core::document_set::{DocumentSetModel, ModelEvent};
pub use crate::core::error::{BrowserError, Result};
pub use crate::core::file_system::{unique_path, FileOps, LocalFileSystem};
pub use crate::core::watcher::{
    ChangeEvent, ChangeKind, ChangeSource, ManualChangeSource, NotifyChangeSource,
};
pub use crate::thumbnail::{Thumbnail, ThumbnailLoader, ThumbnailSource};

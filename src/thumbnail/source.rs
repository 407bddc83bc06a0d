//! Thumbnail sources

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use image::ImageFormat;

use super::{Thumbnail, THUMBNAIL_SIZE};
use crate::core::config::BrowserConfig;
use crate::core::error::{BrowserError, Result};

/// Produces a thumbnail for a document. Called off the owner's thread.
pub trait ThumbnailSource: Send + Sync + 'static {
    fn thumbnail(&self, document: &Path) -> Result<Thumbnail>;
}

/// Reads a PNG stored inside a package document
#[derive(Debug, Clone)]
pub struct SidecarThumbnails {
    file_name: String,
}

impl SidecarThumbnails {
    pub fn new(file_name: impl Into<String>) -> Self {
        Self {
            file_name: file_name.into(),
        }
    }

    /// Location of the sidecar for a document
    pub fn sidecar_path(&self, document: &Path) -> PathBuf {
        document.join(format!("{}.png", self.file_name))
    }
}

impl ThumbnailSource for SidecarThumbnails {
    fn thumbnail(&self, document: &Path) -> Result<Thumbnail> {
        let path = self.sidecar_path(document);
        tracing::debug!("Getting thumbnail for {}", document.display());

        let bytes = fs::read(&path).map_err(|e| BrowserError::io(&path, e))?;
        let image = image::load_from_memory_with_format(&bytes, ImageFormat::Png).map_err(|e| {
            BrowserError::Thumbnail {
                path: path.clone(),
                message: e.to_string(),
            }
        })?;
        Ok(Thumbnail::new(image))
    }
}

/// Decodes the document itself as an image and scales it down
#[derive(Debug, Clone, Copy)]
pub struct GeneratedThumbnails {
    size: u32,
}

impl Default for GeneratedThumbnails {
    fn default() -> Self {
        Self::new(THUMBNAIL_SIZE)
    }
}

impl GeneratedThumbnails {
    pub fn new(size: u32) -> Self {
        Self { size: size.max(1) }
    }
}

impl ThumbnailSource for GeneratedThumbnails {
    fn thumbnail(&self, document: &Path) -> Result<Thumbnail> {
        let bytes = fs::read(document).map_err(|e| BrowserError::io(document, e))?;
        let image = image::load_from_memory(&bytes).map_err(|e| BrowserError::Thumbnail {
            path: document.to_path_buf(),
            message: e.to_string(),
        })?;

        // Preserves aspect ratio
        Ok(Thumbnail::new(image.thumbnail(self.size, self.size)))
    }
}

/// Sidecar thumbnails when the configuration names one, generated otherwise
pub fn thumbnail_source(config: &BrowserConfig) -> Arc<dyn ThumbnailSource> {
    match config.thumbnail_name {
        Some(ref name) => Arc::new(SidecarThumbnails::new(name.clone())),
        None => Arc::new(GeneratedThumbnails::default()),
    }
}

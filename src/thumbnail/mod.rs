//! Document thumbnails: where they come from and how they are loaded

pub mod loader;
pub mod source;

pub use loader::ThumbnailLoader;
pub use source::{thumbnail_source, GeneratedThumbnails, SidecarThumbnails, ThumbnailSource};

use image::DynamicImage;

/// Default edge length, in pixels, of generated thumbnails
pub const THUMBNAIL_SIZE: u32 = 200;

/// A decoded thumbnail image
#[derive(Debug, Clone, PartialEq)]
pub struct Thumbnail {
    image: DynamicImage,
}

impl Thumbnail {
    pub fn new(image: DynamicImage) -> Self {
        Self { image }
    }

    pub fn width(&self) -> u32 {
        self.image.width()
    }

    pub fn height(&self) -> u32 {
        self.image.height()
    }

    pub fn image(&self) -> &DynamicImage {
        &self.image
    }

    /// RGBA pixels, row-major, for handing to a texture upload
    pub fn to_rgba(&self) -> Vec<u8> {
        self.image.to_rgba8().into_raw()
    }
}

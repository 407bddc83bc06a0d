//! Document entries managed by the browser

use std::cmp::Ordering;
use std::path::{Path, PathBuf};

/// A document on disk: a file, or a package directory named with the extension
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct DocumentEntry {
    /// File path
    pub path: PathBuf,
    /// Logical name (file name without extension)
    pub name: String,
    /// Extension without the leading dot
    pub extension: String,
}

impl DocumentEntry {
    /// Create an entry from a path
    pub fn new(path: PathBuf) -> Self {
        let name = path
            .file_stem()
            .map(|s| s.to_string_lossy().to_string())
            .unwrap_or_else(|| "Untitled".to_string());
        let extension = path
            .extension()
            .map(|s| s.to_string_lossy().to_string())
            .unwrap_or_default();

        Self {
            path,
            name,
            extension,
        }
    }

    /// File name including extension
    pub fn file_name(&self) -> String {
        self.path
            .file_name()
            .map(|s| s.to_string_lossy().to_string())
            .unwrap_or_default()
    }
}

impl PartialOrd for DocumentEntry {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for DocumentEntry {
    fn cmp(&self, other: &Self) -> Ordering {
        self.name
            .cmp(&other.name)
            .then_with(|| self.path.cmp(&other.path))
    }
}

/// Check a path's extension, case-sensitively
pub fn has_extension(path: &Path, extension: &str) -> bool {
    path.extension()
        .map(|ext| ext == extension)
        .unwrap_or(false)
}

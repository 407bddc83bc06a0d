//! Error types for document set operations

use std::io;
use std::path::{Path, PathBuf};

use thiserror::Error;

/// Errors surfaced by the document set model and its collaborators
#[derive(Debug, Error)]
pub enum BrowserError {
    /// Documents root unavailable or configuration invalid
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// A move, copy or remove failed
    #[error("I/O error on {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// A thumbnail load was superseded before it could be applied
    #[error("Operation cancelled")]
    Cancelled,

    /// File-system watch could not be installed
    #[error("Watch error: {0}")]
    Watch(#[from] notify::Error),

    /// Thumbnail could not be read or decoded
    #[error("Thumbnail error for {}: {message}", .path.display())]
    Thumbnail { path: PathBuf, message: String },
}

impl BrowserError {
    /// Wrap an I/O error with the path it happened on
    pub fn io(path: impl AsRef<Path>, source: io::Error) -> Self {
        Self::Io {
            path: path.as_ref().to_path_buf(),
            source,
        }
    }

    /// Underlying `io::ErrorKind`, if this is an I/O error
    pub fn io_kind(&self) -> Option<io::ErrorKind> {
        match self {
            Self::Io { source, .. } => Some(source.kind()),
            _ => None,
        }
    }
}

/// Result alias for document set operations
pub type Result<T> = std::result::Result<T, BrowserError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_io_kind() {
        let err = BrowserError::io("a.doc", io::Error::from(io::ErrorKind::NotFound));
        assert_eq!(err.io_kind(), Some(io::ErrorKind::NotFound));
        assert!(err.to_string().contains("a.doc"));
        assert_eq!(BrowserError::Cancelled.io_kind(), None);
    }
}

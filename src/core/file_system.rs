//! File system operations behind the document set

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use walkdir::WalkDir;

use super::document::has_extension;

/// File system capability used by the document set model
pub trait FileOps: Send + Sync {
    /// Recursively collect paths under `root` carrying `extension`,
    /// pruning any subtree listed in `excluded` (relative to `root`)
    fn documents(&self, root: &Path, extension: &str, excluded: &[PathBuf])
        -> io::Result<Vec<PathBuf>>;

    /// Whether anything exists at `path`
    fn exists(&self, path: &Path) -> bool;

    /// Move an item; fails if the target exists
    fn move_item(&self, from: &Path, to: &Path) -> io::Result<()>;

    /// Copy a file or package directory; fails if the target exists
    fn copy_item(&self, from: &Path, to: &Path) -> io::Result<()>;

    /// Remove a file or package directory
    fn remove_item(&self, path: &Path) -> io::Result<()>;
}

/// `FileOps` backed by `std::fs`
#[derive(Debug, Clone, Copy, Default)]
pub struct LocalFileSystem;

impl FileOps for LocalFileSystem {
    fn documents(
        &self,
        root: &Path,
        extension: &str,
        excluded: &[PathBuf],
    ) -> io::Result<Vec<PathBuf>> {
        // Surface an inaccessible root instead of yielding an empty walk
        if !fs::metadata(root)?.is_dir() {
            return Err(io::Error::new(
                io::ErrorKind::NotFound,
                format!("{} is not a directory", root.display()),
            ));
        }

        let mut found = Vec::new();
        let mut walker = WalkDir::new(root).min_depth(1).into_iter();

        while let Some(entry) = walker.next() {
            let entry = match entry {
                Ok(entry) => entry,
                Err(e) => {
                    tracing::debug!("Skipping unreadable entry: {}", e);
                    continue;
                }
            };

            let path = entry.path();
            let is_dir = entry.file_type().is_dir();
            let relative = path.strip_prefix(root).unwrap_or(path);

            if excluded.iter().any(|subtree| relative.starts_with(subtree)) {
                if is_dir {
                    walker.skip_current_dir();
                }
                continue;
            }

            if has_extension(path, extension) {
                found.push(path.to_path_buf());
                // Packages are opaque documents
                if is_dir {
                    walker.skip_current_dir();
                }
            }
        }

        Ok(found)
    }

    fn exists(&self, path: &Path) -> bool {
        fs::symlink_metadata(path).is_ok()
    }

    fn move_item(&self, from: &Path, to: &Path) -> io::Result<()> {
        refuse_existing(self, to)?;
        fs::rename(from, to)
    }

    fn copy_item(&self, from: &Path, to: &Path) -> io::Result<()> {
        refuse_existing(self, to)?;
        if fs::metadata(from)?.is_dir() {
            copy_directory(from, to)
        } else {
            fs::copy(from, to).map(|_| ())
        }
    }

    fn remove_item(&self, path: &Path) -> io::Result<()> {
        if fs::symlink_metadata(path)?.is_dir() {
            fs::remove_dir_all(path)
        } else {
            fs::remove_file(path)
        }
    }
}

fn refuse_existing(ops: &impl FileOps, to: &Path) -> io::Result<()> {
    if ops.exists(to) {
        return Err(io::Error::new(
            io::ErrorKind::AlreadyExists,
            format!("{} already exists", to.display()),
        ));
    }
    Ok(())
}

/// Copy a directory tree
fn copy_directory(from: &Path, to: &Path) -> io::Result<()> {
    for entry in WalkDir::new(from) {
        let entry = entry.map_err(io::Error::from)?;
        let relative = entry.path().strip_prefix(from).unwrap_or(entry.path());
        let target = to.join(relative);

        if entry.file_type().is_dir() {
            fs::create_dir_all(&target)?;
        } else {
            fs::copy(entry.path(), &target)?;
        }
    }
    Ok(())
}

/// First free path for `base` in `dir`: `base.ext`, then `base 1.ext`, `base 2.ext`, ...
pub fn unique_path(ops: &dyn FileOps, dir: &Path, base: &str, extension: &str) -> PathBuf {
    let mut candidate = dir.join(format!("{}.{}", base, extension));
    let mut counter: u64 = 1;

    while ops.exists(&candidate) {
        candidate = dir.join(format!("{} {}.{}", base, counter, extension));
        counter += 1;
    }

    candidate
}

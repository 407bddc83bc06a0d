//! Browser configuration management

use std::path::{Component, Path, PathBuf};

use anyhow::{Context, Result};
use directories::{ProjectDirs, UserDirs};
use serde::{Deserialize, Serialize};

use super::error::BrowserError;

/// Configuration for a document set
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BrowserConfig {
    /// File extension of managed documents, without the leading dot
    pub path_extension: String,
    /// Uniform type identifier handed to file pickers
    pub content_type: String,
    /// Template copied by "new document"
    pub template_path: PathBuf,
    /// Sidecar thumbnail name inside package documents
    #[serde(default)]
    pub thumbnail_name: Option<String>,
    /// Subtrees (relative to the documents root) never scanned
    #[serde(default)]
    pub excluded: Vec<PathBuf>,
    /// Overrides the platform documents directory
    #[serde(default)]
    pub documents_root: Option<PathBuf>,
    /// Attach a file-system watch on construction
    #[serde(default)]
    pub watch: bool,
}

impl BrowserConfig {
    /// Create a configuration for one document type
    pub fn new(
        path_extension: impl Into<String>,
        content_type: impl Into<String>,
        template_path: impl Into<PathBuf>,
    ) -> Self {
        let path_extension: String = path_extension.into();
        Self {
            path_extension: path_extension.trim_start_matches('.').to_string(),
            content_type: content_type.into(),
            template_path: template_path.into(),
            thumbnail_name: None,
            excluded: Vec::new(),
            documents_root: None,
            watch: false,
        }
    }

    pub fn with_documents_root(mut self, root: impl Into<PathBuf>) -> Self {
        self.documents_root = Some(root.into());
        self
    }

    pub fn with_excluded(mut self, subtree: impl Into<PathBuf>) -> Self {
        self.excluded.push(normalize_subtree(&subtree.into()));
        self
    }

    pub fn with_thumbnail_name(mut self, name: impl Into<String>) -> Self {
        self.thumbnail_name = Some(name.into());
        self
    }

    pub fn with_watch(mut self, watch: bool) -> Self {
        self.watch = watch;
        self
    }

    /// Check the configuration is usable
    pub fn validate(&self) -> Result<(), BrowserError> {
        let ext = self.path_extension.trim_start_matches('.');
        if ext.is_empty() {
            return Err(BrowserError::Configuration(
                "path extension must not be empty".to_string(),
            ));
        }
        if ext.contains(std::path::is_separator) {
            return Err(BrowserError::Configuration(format!(
                "path extension '{}' contains a path separator",
                ext
            )));
        }
        // Path::extension only sees the last dot, so "tar.gz" could never match
        if ext.contains('.') {
            return Err(BrowserError::Configuration(format!(
                "path extension '{}' must not contain a dot",
                ext
            )));
        }
        if let Some(subtree) = self.excluded.iter().find(|p| p.is_absolute()) {
            return Err(BrowserError::Configuration(format!(
                "excluded subtree must be relative: {}",
                subtree.display()
            )));
        }
        if let Some(subtree) = self
            .excluded
            .iter()
            .find(|p| p.as_os_str().is_empty() || p.components().any(|c| c == Component::ParentDir))
        {
            return Err(BrowserError::Configuration(format!(
                "excluded subtree must name a directory inside the documents root: '{}'",
                subtree.display()
            )));
        }
        Ok(())
    }

    /// Strip the extension's leading dot and `.` components from excluded subtrees
    pub fn normalized(mut self) -> Self {
        self.path_extension = self.extension().to_string();
        self.excluded = self.excluded.iter().map(|p| normalize_subtree(p)).collect();
        self
    }

    /// Extension without a leading dot
    pub fn extension(&self) -> &str {
        self.path_extension.trim_start_matches('.')
    }

    /// Resolve the documents root: the override, else the platform documents dir
    pub fn resolve_documents_root(&self) -> Result<PathBuf, BrowserError> {
        if let Some(ref root) = self.documents_root {
            return Ok(root.clone());
        }
        UserDirs::new()
            .and_then(|dirs| dirs.document_dir().map(Path::to_path_buf))
            .ok_or_else(|| {
                BrowserError::Configuration("could not determine documents directory".to_string())
            })
    }

    /// Get the config file path
    fn config_path() -> Option<PathBuf> {
        ProjectDirs::from("com", "docshelf", "Docshelf")
            .map(|dirs| dirs.config_dir().join("config.json"))
    }

    /// Load configuration from the platform config directory
    pub fn load() -> Result<Option<Self>> {
        let path = Self::config_path()
            .ok_or_else(|| anyhow::anyhow!("Could not determine config directory"))?;
        Self::load_from(&path)
    }

    /// Load configuration from a file; `None` if the file does not exist
    pub fn load_from(path: &Path) -> Result<Option<Self>> {
        if !path.exists() {
            return Ok(None);
        }

        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config: {}", path.display()))?;
        let config: Self = serde_json::from_str(&content)
            .with_context(|| format!("Failed to parse config: {}", path.display()))?;
        let config = config.normalized();
        config.validate()?;
        Ok(Some(config))
    }

    /// Save configuration to the platform config directory
    pub fn save(&self) -> Result<()> {
        let path = Self::config_path()
            .ok_or_else(|| anyhow::anyhow!("Could not determine config directory"))?;
        self.save_to(&path)
    }

    /// Save configuration to a file
    pub fn save_to(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let content = serde_json::to_string_pretty(self)?;
        std::fs::write(path, content)
            .with_context(|| format!("Failed to write config: {}", path.display()))?;

        tracing::info!("Saved config to: {}", path.display());
        Ok(())
    }
}

/// Drop `.` components so `./Inbox` and `Inbox` name the same subtree
fn normalize_subtree(subtree: &Path) -> PathBuf {
    subtree
        .components()
        .filter(|c| *c != Component::CurDir)
        .collect()
}

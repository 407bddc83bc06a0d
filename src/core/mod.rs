//! Core functionality: configuration, documents, file operations and the document set

pub mod access;
pub mod config;
pub mod document;
pub mod document_set;
pub mod error;
pub mod file_system;
pub mod watcher;

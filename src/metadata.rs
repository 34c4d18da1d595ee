//! File metadata probing
//!
//! Reads path, extension, size, and modification time of a backing
//! file. The extension is normalized to lowercase with a leading dot
//! so it can key the type-priority table directly.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::time::SystemTime;

/// Metadata describing a cached file's backing path
#[derive(Debug, Clone)]
pub struct FileMetadata {
    /// Backing file path
    pub path: PathBuf,
    /// Lowercase extension including the leading dot, empty if none
    pub extension: String,
    /// Logical size in bytes; tracks the cached buffer length once resident
    pub size: u64,
    /// Modification time observed at probe time
    pub last_modified: SystemTime,
}

impl FileMetadata {
    /// Probe the filesystem for a file's metadata
    pub fn probe(path: impl AsRef<Path>) -> io::Result<Self> {
        let path = path.as_ref().to_path_buf();
        let meta = fs::metadata(&path)?;
        Ok(Self {
            extension: extension_of(&path),
            size: meta.len(),
            last_modified: meta.modified().unwrap_or_else(|_| SystemTime::now()),
            path,
        })
    }

    /// Metadata for a file that is being created empty (write-mode open)
    pub fn empty(path: impl AsRef<Path>) -> Self {
        let path = path.as_ref().to_path_buf();
        Self {
            extension: extension_of(&path),
            size: 0,
            last_modified: SystemTime::now(),
            path,
        }
    }
}

/// Lowercase leading-dot extension of a path, or an empty string
pub fn extension_of(path: &Path) -> String {
    match path.extension() {
        Some(ext) => format!(".{}", ext.to_string_lossy().to_ascii_lowercase()),
        None => String::new(),
    }
}

/// Normalize a user-supplied extension to leading-dot lowercase
///
/// Accepts extensions with or without the leading dot; an empty string
/// stays empty (files without an extension).
pub fn normalize_extension(ext: &str) -> String {
    let ext = ext.trim().to_ascii_lowercase();
    if ext.is_empty() || ext.starts_with('.') {
        ext
    } else {
        format!(".{ext}")
    }
}

//! Directory scanning utilities for discovering image files.

use std::fs;
use std::path::{Path, PathBuf};
use std::time::SystemTime;

use tracing::{debug, info};
use walkdir::WalkDir;

/// Default accepted extensions (lowercase, without dot).
pub const DEFAULT_EXTENSIONS: &[&str] = &["bmp", "png", "jpg", "jpeg", "gif"];

/// Recursive image finder rooted at the share directory.
#[derive(Debug, Clone)]
pub struct Scanner {
    root: PathBuf,
    exts: Vec<String>,
}

impl Scanner {
    pub fn new(root: impl Into<PathBuf>, exts: &[String]) -> Self {
        Self {
            root: root.into(),
            exts: exts.iter().map(|e| e.to_ascii_lowercase()).collect(),
        }
    }

    /// Scanner accepting [`DEFAULT_EXTENSIONS`].
    pub fn with_default_extensions(root: impl Into<PathBuf>) -> Self {
        let exts: Vec<String> = DEFAULT_EXTENSIONS.iter().map(|e| e.to_string()).collect();
        Self::new(root, &exts)
    }

    #[must_use]
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Return `true` if `path` has an accepted extension.
    #[must_use]
    pub fn accepts(&self, path: &Path) -> bool {
        is_supported_image(path, &self.exts)
    }

    /// List every accepted file below the root, as absolute paths.
    ///
    /// A missing or empty root yields an empty list; unreadable entries are
    /// skipped.
    #[must_use]
    pub fn scan(&self) -> Vec<PathBuf> {
        let root = std::path::absolute(&self.root).unwrap_or_else(|_| self.root.clone());
        if !root.is_dir() {
            debug!(root = %root.display(), "scan root missing or not a directory");
            return Vec::new();
        }

        let mut out = Vec::new();
        for entry in WalkDir::new(&root).follow_links(true) {
            let entry = match entry {
                Ok(entry) => entry,
                Err(err) => {
                    debug!("skipping unreadable entry: {err}");
                    continue;
                }
            };
            if entry.file_type().is_file() && self.accepts(entry.path()) {
                out.push(entry.into_path());
            }
        }
        info!(root = %root.display(), discovered = out.len(), "scan complete");
        out
    }

    /// The accepted file with the newest creation time, if any.
    ///
    /// Filesystems without birth times fall back to the modification time.
    #[must_use]
    pub fn most_recent(&self) -> Option<PathBuf> {
        self.scan()
            .into_iter()
            .filter_map(|p| created_at(&p).map(|t| (t, p)))
            .max_by(|a, b| a.0.cmp(&b.0))
            .map(|(_, p)| p)
    }
}

/// Return `true` if `path` has one of `exts` as its extension, ignoring case.
#[must_use]
pub fn is_supported_image(path: &Path, exts: &[String]) -> bool {
    path.extension()
        .and_then(|s| s.to_str())
        .is_some_and(|ext| {
            let ext = ext.to_ascii_lowercase();
            exts.iter().any(|e| *e == ext)
        })
}

fn created_at(path: &Path) -> Option<SystemTime> {
    let meta = fs::metadata(path).ok()?;
    meta.created().or_else(|_| meta.modified()).ok()
}

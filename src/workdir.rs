// src/workdir.rs
//! Run-scoped temporary storage for downloaded newsletter images.
//!
//! One run owns exactly one directory under the OS temp root; every image the
//! enricher downloads lands there and nowhere else. Cleanup is deferred until
//! after delivery has been attempted, and must stay safe when called twice.

use anyhow::{Context, Result};
use std::path::{Path, PathBuf};
use tracing::warn;

#[derive(Debug, Clone)]
pub struct RunWorkdir {
    root: PathBuf,
}

impl RunWorkdir {
    /// Create a fresh, uniquely named directory for this run.
    pub fn create() -> Result<Self> {
        let root = std::env::temp_dir().join(format!("newsletter-{}", uuid::Uuid::new_v4()));
        std::fs::create_dir_all(&root)
            .with_context(|| format!("creating run workdir {}", root.display()))?;
        Ok(Self { root })
    }

    pub fn path(&self) -> &Path {
        &self.root
    }

    /// Reserve a unique path for one downloaded image with the given extension.
    pub fn image_path(&self, ext: &str) -> PathBuf {
        self.root.join(format!("{}.{ext}", uuid::Uuid::new_v4()))
    }

    /// Delete every file under the run directory, then the directory itself.
    ///
    /// Errors are logged and swallowed: a cleanup failure must never mask the
    /// run outcome. Calling this twice, or when the directory was never
    /// populated, is a no-op.
    pub fn cleanup(&self) {
        let entries = match std::fs::read_dir(&self.root) {
            Ok(entries) => entries,
            // Directory already gone: nothing to do.
            Err(_) => return,
        };
        for entry in entries.flatten() {
            if let Err(e) = std::fs::remove_file(entry.path()) {
                warn!(error = ?e, file = %entry.path().display(), "could not remove temp image");
            }
        }
        if let Err(e) = std::fs::remove_dir(&self.root) {
            warn!(error = ?e, dir = %self.root.display(), "could not remove run workdir");
        }
    }
}

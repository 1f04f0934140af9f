//! Local attachment storage

use anyhow::{Context, Result, bail};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};

/// Trait for where materialized attachment bytes go
///
/// Keys are attachment file names as reported by the server; implementations
/// are responsible for making them safe.
pub trait AttachmentStore: Send + Sync {
    /// Check whether content for `name` is already stored
    fn exists(&self, name: &str) -> Result<bool>;

    /// Store content for `name`, returning where it landed
    fn put(&self, name: &str, data: &[u8]) -> Result<PathBuf>;
}

/// Reduce a server-provided attachment name to a plain file name
///
/// Directory components (either separator style) are dropped so a name can
/// never escape the attachment directory.
pub fn safe_file_name(name: &str) -> Result<&str> {
    let base = name.rsplit(['/', '\\']).next().unwrap_or_default().trim();
    if base.is_empty() || base == "." || base == ".." {
        bail!("Unusable attachment name: {:?}", name);
    }
    Ok(base)
}

/// Attachments stored as plain files in one directory
///
/// ```text
/// attachments/
///   invoice-0042.pdf
///   photo.jpg
/// ```
///
/// A file that already exists is treated as cached. Two searches writing the
/// same name concurrently race benignly: each write goes to a private temp
/// file that is renamed into place, so the last writer wins and readers never
/// see a partial file.
pub struct DirectoryAttachmentStore {
    root: PathBuf,
}

/// Disambiguates temp files of concurrent writers in one process
static TEMP_COUNTER: AtomicU64 = AtomicU64::new(0);

impl DirectoryAttachmentStore {
    /// Use `root` as the attachment directory; it is created on first write
    pub fn new(root: impl AsRef<Path>) -> Self {
        Self {
            root: root.as_ref().to_path_buf(),
        }
    }

    /// Target path for an attachment name
    pub fn path_for(&self, name: &str) -> Result<PathBuf> {
        Ok(self.root.join(safe_file_name(name)?))
    }
}

impl AttachmentStore for DirectoryAttachmentStore {
    fn exists(&self, name: &str) -> Result<bool> {
        Ok(self.path_for(name)?.exists())
    }

    fn put(&self, name: &str, data: &[u8]) -> Result<PathBuf> {
        let path = self.path_for(name)?;
        fs::create_dir_all(&self.root)
            .with_context(|| format!("Failed to create attachment directory: {}", self.root.display()))?;

        let temp_path = self.root.join(format!(
            ".{}.{}-{}.part",
            safe_file_name(name)?,
            std::process::id(),
            TEMP_COUNTER.fetch_add(1, Ordering::Relaxed)
        ));
        fs::write(&temp_path, data)
            .with_context(|| format!("Failed to write attachment: {}", temp_path.display()))?;
        if let Err(e) = fs::rename(&temp_path, &path) {
            let _ = fs::remove_file(&temp_path);
            return Err(e).with_context(|| format!("Failed to move attachment into place: {}", path.display()));
        }

        Ok(path)
    }
}

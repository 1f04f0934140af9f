//! Folder path resolution

use anyhow::Result;
use log::debug;

use crate::models::{FolderEntry, FolderId, FolderPath};

/// Capability to list the child folders of a folder by display name
///
/// The only thing folder resolution needs from the server.
pub trait FolderLookup {
    /// Children of `parent` whose display name matches `name`
    ///
    /// Servers may match loosely; callers re-check names themselves.
    fn find_child_folders(&self, parent: &FolderId, name: &str) -> Result<Vec<FolderEntry>>;
}

/// Resolve `path` below `root` to a concrete folder
///
/// Walks one level per path segment, issuing one child-folder query per
/// level, and stops at the first level without a match. Returns `Ok(None)`
/// when the path does not exist.
///
/// When several children share a display name (ignoring case), the first one
/// in the server's return order wins. That order is not specified by the
/// server, so duplicate names make the result order-dependent.
pub fn resolve_folder(lookup: &dyn FolderLookup, root: &FolderId, path: &FolderPath) -> Result<Option<FolderId>> {
    resolve_segments(lookup, root, path.segments())
}

fn resolve_segments(lookup: &dyn FolderLookup, parent: &FolderId, segments: &[String]) -> Result<Option<FolderId>> {
    let Some((name, rest)) = segments.split_first() else {
        return Ok(Some(parent.clone()));
    };

    let children = lookup.find_child_folders(parent, name)?;
    let Some(found) = children.into_iter().find(|f| f.is_named(name)) else {
        debug!("[FOLDER] '{}' not found under {}", name, parent);
        return Ok(None);
    };

    if rest.is_empty() {
        Ok(Some(found.id))
    } else {
        resolve_segments(lookup, &found.id, rest)
    }
}

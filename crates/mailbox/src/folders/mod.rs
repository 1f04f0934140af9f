//! Folder lookup by display-name path

mod resolver;

pub use resolver::{FolderLookup, resolve_folder};

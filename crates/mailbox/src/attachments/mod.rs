//! Attachment materialization
//!
//! Attachment metadata always travels with a message; the bytes are written
//! straight to an [`AttachmentStore`] and never kept in memory afterwards.

mod materialize;
mod store;

pub use materialize::{AttachmentFailure, Materialized, Materializer};
pub use store::{AttachmentStore, DirectoryAttachmentStore, safe_file_name};

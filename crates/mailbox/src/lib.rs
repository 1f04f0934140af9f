//! Mailbox crate - Access layer for a groupware mail server
//!
//! This crate provides:
//! - Domain models (MailMessage, FolderId, FolderPath, OutgoingMessage)
//! - Folder resolution by display-name path
//! - Filter building and paginated search
//! - Attachment materialization into a local directory
//! - Mark-as-read, move and send operations
//! - A REST transport and an in-memory transport for tests
//!
//! All I/O is blocking. [`MailService`] holds no mutable state, so
//! independent operations may run on separate threads.

pub mod attachments;
pub mod config;
mod error;
pub mod folders;
pub mod models;
pub mod rest;
pub mod search;
pub mod service;
pub mod transport;

pub use attachments::{AttachmentFailure, AttachmentStore, DirectoryAttachmentStore, Materializer};
pub use config::{MailboxConfig, RestConfig, ServiceConfig};
pub use error::{MailError, Result};
pub use folders::{FolderLookup, resolve_folder};
pub use models::{
    AttachmentContent, AttachmentId, AttachmentRef, EmailAddress, FileAttachment, FolderEntry, FolderId,
    FolderPath, Importance, MailMessage, MessageId, OutgoingMessage, WellKnownFolder,
};
pub use rest::RestTransport;
pub use search::{FilterNode, SearchCriteria, SearchOptions, SearchStats, build_filter, search_all};
pub use service::{MailService, MarkReadReport, SearchResults, SendFailure, SendOutcome, SendStage};
pub use transport::{InMemoryTransport, MailTransport};

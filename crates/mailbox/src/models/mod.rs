//! Domain models for mailbox entities

mod folder;
mod message;
mod outgoing;

pub use folder::{FolderEntry, FolderId, FolderPath, WellKnownFolder};
pub use message::{AttachmentId, AttachmentRef, EmailAddress, MailMessage, MailMessageBuilder, MessageId};
pub use outgoing::{AttachmentContent, FileAttachment, Importance, OutgoingMessage};

//! Transport trait definitions

use anyhow::Result;

use super::{BoundItem, ItemView, Page, RawMessage};
use crate::folders::FolderLookup;
use crate::models::{AttachmentContent, AttachmentId, FolderId, MessageId, OutgoingMessage};
use crate::search::{Field, FilterNode};

/// Trait for the remote mail server
///
/// This abstracts over the concrete protocol (REST, SOAP, in-memory) and
/// provides the remote calls the mailbox service composes. Connection setup,
/// credentials and TLS are the implementation's business.
///
/// Every call is a single blocking round-trip (or a short sequence of them);
/// implementations do not retry.
pub trait MailTransport: FolderLookup + Send + Sync {
    /// Search `folder` for items matching `filter`, returning one page
    fn find_items(&self, folder: &FolderId, filter: &FilterNode, view: &ItemView) -> Result<Page>;

    /// Load the full property set (body, attachments metadata) for items
    ///
    /// The result preserves the order of `ids`.
    fn load_full_properties(&self, ids: &[MessageId]) -> Result<Vec<RawMessage>>;

    /// Bind items with only the given fields loaded
    ///
    /// Items that no longer exist are left out of the result.
    fn bind_items(&self, ids: &[MessageId], fields: &[Field]) -> Result<Vec<BoundItem>>;

    /// Set the read flag of one item
    fn update_read_state(&self, id: &MessageId, is_read: bool) -> Result<()>;

    /// Move items into `target` as one batched operation
    fn move_items(&self, ids: &[MessageId], target: &FolderId) -> Result<()>;

    /// Save `message` into `folder` (the sender's Drafts), returning its ID
    fn save_draft(
        &self,
        message: &OutgoingMessage,
        attachments: &[AttachmentContent],
        folder: &FolderId,
    ) -> Result<MessageId>;

    /// Send a saved draft and keep a copy in `folder` (the sender's Sent Items)
    fn send_and_save_copy(&self, draft: &MessageId, folder: &FolderId) -> Result<()>;

    /// Fetch the byte content of one attachment
    fn fetch_attachment_content(&self, message: &MessageId, attachment: &AttachmentId) -> Result<Vec<u8>>;
}

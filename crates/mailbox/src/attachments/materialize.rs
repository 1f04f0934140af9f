//! Mapping of raw server records into [`MailMessage`]s
//!
//! Attachment bytes are only downloaded when the caller supplies a store,
//! and only for attachments the store does not already hold. Running the
//! same search twice into the same directory therefore downloads nothing
//! the second time.

use anyhow::Result;
use log::{debug, warn};

use super::AttachmentStore;
use crate::models::{AttachmentId, AttachmentRef, EmailAddress, MailMessage, MessageId};
use crate::transport::{MailTransport, RawAttachment, RawMessage};

/// An attachment that could not be materialized
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AttachmentFailure {
    pub message_id: MessageId,
    pub attachment_id: AttachmentId,
    pub name: String,
    pub reason: String,
}

/// Result of materializing one message
///
/// `message.attachments` holds exactly the attachments that succeeded.
#[derive(Debug, Clone, PartialEq)]
pub struct Materialized {
    pub message: MailMessage,
    pub failures: Vec<AttachmentFailure>,
}

/// Builds [`MailMessage`]s, downloading attachments into a store
pub struct Materializer<'a> {
    transport: &'a dyn MailTransport,
    store: Option<&'a dyn AttachmentStore>,
}

impl<'a> Materializer<'a> {
    /// Without a store no attachment is ever fetched and messages carry an
    /// empty attachment list
    pub fn new(transport: &'a dyn MailTransport, store: Option<&'a dyn AttachmentStore>) -> Self {
        Self { transport, store }
    }

    /// Map one record, materializing its attachments
    ///
    /// Never fails: a broken attachment is logged, recorded in
    /// `failures` and skipped, and the remaining attachments are still
    /// processed.
    pub fn materialize(&self, raw: RawMessage) -> Materialized {
        let mut attachments = Vec::new();
        let mut failures = Vec::new();

        if let Some(store) = self.store
            && raw.has_attachments
        {
            for attachment in &raw.attachments {
                match self.materialize_attachment(store, &raw.id, attachment) {
                    Ok(()) => attachments.push(attachment_ref(attachment)),
                    Err(e) => {
                        warn!(
                            "[ATTACH] Failed to load attachment '{}' of message '{}': {:#}",
                            attachment.name, raw.subject, e
                        );
                        failures.push(AttachmentFailure {
                            message_id: raw.id.clone(),
                            attachment_id: attachment.id.clone(),
                            name: attachment.name.clone(),
                            reason: format!("{:#}", e),
                        });
                    }
                }
            }
        }

        let from = raw.from.unwrap_or_else(|| EmailAddress::new(""));
        let message = MailMessage::builder(raw.id)
            .from(from)
            .subject(raw.subject)
            .body(raw.body)
            .conversation_id(raw.conversation_id)
            .sent_date(raw.sent_at)
            .received_date(raw.received_at)
            .has_attachments(raw.has_attachments)
            .attachments(attachments)
            .build();

        Materialized { message, failures }
    }

    fn materialize_attachment(
        &self,
        store: &dyn AttachmentStore,
        message_id: &MessageId,
        attachment: &RawAttachment,
    ) -> Result<()> {
        if store.exists(&attachment.name)? {
            debug!("[ATTACH] '{}' already present, skipping download", attachment.name);
            return Ok(());
        }

        let content = self
            .transport
            .fetch_attachment_content(message_id, &attachment.id)?;
        let path = store.put(&attachment.name, &content)?;
        debug!("[ATTACH] Saved {} bytes to {}", content.len(), path.display());
        Ok(())
    }
}

fn attachment_ref(attachment: &RawAttachment) -> AttachmentRef {
    AttachmentRef {
        content_id: attachment.content_id.clone(),
        content_type: attachment.content_type.clone(),
        id: attachment.id.clone(),
        name: attachment.name.clone(),
    }
}

//! Outgoing mail pipeline: compose, save as draft, send
//!
//! Sending is best-effort from the caller's point of view: the outcome is a
//! value, never an error, so a caller that does not care can ignore it.

use log::{error, info};
use std::fmt;

use crate::models::{FolderId, MessageId, OutgoingMessage};
use crate::transport::MailTransport;

/// Step at which sending stopped
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SendStage {
    /// Validating the message or reading attachments
    Compose,
    SaveDraft,
    Send,
}

impl fmt::Display for SendStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            SendStage::Compose => "compose",
            SendStage::SaveDraft => "save draft",
            SendStage::Send => "send",
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SendFailure {
    pub stage: SendStage,
    pub reason: String,
    /// Set when the draft was saved before sending failed; it stays in the
    /// sender's Drafts folder
    pub draft_id: Option<MessageId>,
}

impl fmt::Display for SendFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} failed: {}", self.stage, self.reason)
    }
}

impl std::error::Error for SendFailure {}

/// Result of sending a message
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SendOutcome {
    /// Sent; carries the server ID of the message
    Sent(MessageId),
    Failed(SendFailure),
}

impl SendOutcome {
    pub fn is_sent(&self) -> bool {
        matches!(self, SendOutcome::Sent(_))
    }

    /// Server ID of the message, if one was assigned
    ///
    /// A failed send still has an ID when the draft was saved.
    pub fn message_id(&self) -> Option<&MessageId> {
        match self {
            SendOutcome::Sent(id) => Some(id),
            SendOutcome::Failed(failure) => failure.draft_id.as_ref(),
        }
    }

    pub fn into_result(self) -> Result<MessageId, SendFailure> {
        match self {
            SendOutcome::Sent(id) => Ok(id),
            SendOutcome::Failed(failure) => Err(failure),
        }
    }
}

/// Save `message` as a draft of its sender, then send it keeping a copy in
/// Sent Items
pub(crate) fn send_message(transport: &dyn MailTransport, message: &OutgoingMessage) -> SendOutcome {
    let outcome = try_send(transport, message);
    match &outcome {
        SendOutcome::Sent(id) => info!(
            "[SEND] Sent '{}' to {} ({})",
            message.subject,
            message.recipients_summary(),
            id.as_str()
        ),
        SendOutcome::Failed(failure) => error!(
            "[SEND] Failed to send mail. Subject: {}; Recipients: {}; {}",
            message.subject,
            message.recipients_summary(),
            failure
        ),
    }
    outcome
}

fn try_send(transport: &dyn MailTransport, message: &OutgoingMessage) -> SendOutcome {
    let fail = |stage, reason: String, draft_id| {
        SendOutcome::Failed(SendFailure {
            stage,
            reason,
            draft_id,
        })
    };

    if message.from.is_empty() {
        return fail(SendStage::Compose, "sender mailbox is empty".to_string(), None);
    }
    if message.to.is_empty() && message.cc.is_empty() && message.bcc.is_empty() {
        return fail(SendStage::Compose, "message has no recipients".to_string(), None);
    }

    let attachments = match message.load_attachments() {
        Ok(attachments) => attachments,
        Err(e) => return fail(SendStage::Compose, format!("{:#}", e), None),
    };

    let drafts = FolderId::drafts(&message.from);
    let draft_id = match transport.save_draft(message, &attachments, &drafts) {
        Ok(id) => id,
        Err(e) => return fail(SendStage::SaveDraft, format!("{:#}", e), None),
    };

    let sent_items = FolderId::sent_items(&message.from);
    match transport.send_and_save_copy(&draft_id, &sent_items) {
        Ok(()) => SendOutcome::Sent(draft_id),
        Err(e) => fail(SendStage::Send, format!("{:#}", e), Some(draft_id)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transport::{FailPoint, InMemoryTransport};

    fn message() -> OutgoingMessage {
        OutgoingMessage::new("ops@example.com", "Weekly report", "<p>Attached.</p>")
            .to(["boss@example.com"])
            .attach_bytes("report.csv", b"a,b".to_vec())
    }

    #[test]
    fn test_send_saves_draft_then_sends() {
        let transport = InMemoryTransport::new();

        let outcome = send_message(&transport, &message());

        assert!(outcome.is_sent());
        let drafts = transport.drafts();
        assert_eq!(drafts.len(), 1);
        assert_eq!(drafts[0].folder, FolderId::drafts("ops@example.com"));
        assert_eq!(drafts[0].sent_copy, Some(FolderId::sent_items("ops@example.com")));
        assert_eq!(drafts[0].attachments[0].name, "report.csv");
        assert_eq!(outcome.message_id(), Some(&drafts[0].id));
    }

    #[test]
    fn test_save_failure() {
        let transport = InMemoryTransport::new();
        transport.fail_on(FailPoint::SaveDraft);

        let outcome = send_message(&transport, &message());

        let failure = outcome.into_result().unwrap_err();
        assert_eq!(failure.stage, SendStage::SaveDraft);
        assert_eq!(failure.draft_id, None);
        assert_eq!(transport.calls().send_and_save_copy, 0);
    }

    #[test]
    fn test_send_failure_keeps_draft_id() {
        let transport = InMemoryTransport::new();
        transport.fail_on(FailPoint::SendAndSaveCopy);

        let outcome = send_message(&transport, &message());

        assert!(!outcome.is_sent());
        assert!(outcome.message_id().is_some());
        match outcome {
            SendOutcome::Failed(failure) => assert_eq!(failure.stage, SendStage::Send),
            other => panic!("expected failure, got {:?}", other),
        }
    }

    #[test]
    fn test_no_recipients() {
        let transport = InMemoryTransport::new();
        let outcome = send_message(&transport, &OutgoingMessage::new("ops@example.com", "s", "b").to([" "]));

        let failure = outcome.into_result().unwrap_err();
        assert_eq!(failure.stage, SendStage::Compose);
        assert_eq!(transport.calls().save_draft, 0);
    }

    #[test]
    fn test_unreadable_attachment() {
        let transport = InMemoryTransport::new();
        let msg = message().attach_path("/nonexistent/definitely/missing.pdf");

        let failure = send_message(&transport, &msg).into_result().unwrap_err();

        assert_eq!(failure.stage, SendStage::Compose);
        assert!(failure.reason.contains("missing.pdf"));
    }
}

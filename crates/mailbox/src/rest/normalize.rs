//! REST response normalization
//!
//! Converts API resources to transport records and outgoing messages to
//! API request bodies.

use anyhow::{Context, Result};
use base64::prelude::*;
use chrono::{DateTime, Utc};

use super::api::{self, ItemBody, NewAttachment, NewMessage, Recipient};
use crate::models::{AttachmentContent, AttachmentId, EmailAddress, MessageId, OutgoingMessage};
use crate::transport::{RawAttachment, RawMessage};

/// Normalize an API message to a transport record
///
/// The received time is required; a missing sent time (drafts) falls back
/// to it.
pub fn normalize_message(msg: api::Message) -> Result<RawMessage> {
    let received_at = msg
        .received_date_time
        .as_deref()
        .context("Message has no received time")
        .and_then(parse_time)
        .with_context(|| format!("Bad received time on message {}", msg.id))?;
    let sent_at = match msg.sent_date_time.as_deref() {
        Some(s) => parse_time(s).with_context(|| format!("Bad sent time on message {}", msg.id))?,
        None => received_at,
    };

    let mut builder = RawMessage::builder(MessageId::new(&msg.id))
        .subject(msg.subject.unwrap_or_default())
        .body(msg.body.map(|b| b.content).unwrap_or_default())
        .sent_at(sent_at)
        .received_at(received_at)
        .is_read(msg.is_read.unwrap_or(false));

    if let Some(from) = msg.from.as_ref().and_then(email_address) {
        builder = builder.from(from);
    }
    if let Some(sender) = msg.sender.as_ref().and_then(email_address) {
        builder = builder.last_modified_name(sender.name.unwrap_or(sender.address));
    }
    if let Some(conversation_id) = msg.conversation_id {
        builder = builder.conversation_id(conversation_id);
    }
    for attachment in msg.attachments {
        builder = builder.attachment(RawAttachment {
            id: AttachmentId::new(attachment.id.clone()),
            name: attachment.name.unwrap_or(attachment.id),
            content_type: attachment
                .content_type
                .unwrap_or_else(|| "application/octet-stream".to_string()),
            content_id: attachment.content_id,
        });
    }

    let mut raw = builder.build();
    // Search pages select the flag without expanding attachments
    raw.has_attachments = raw.has_attachments || msg.has_attachments.unwrap_or(false);
    Ok(raw)
}

fn parse_time(s: &str) -> Result<DateTime<Utc>> {
    Ok(DateTime::parse_from_rfc3339(s)
        .with_context(|| format!("Invalid timestamp: {}", s))?
        .with_timezone(&Utc))
}

fn email_address(recipient: &Recipient) -> Option<EmailAddress> {
    let address = recipient.email_address.address.as_deref()?.trim();
    if address.is_empty() {
        return None;
    }
    Some(match recipient.email_address.name.as_deref().map(str::trim) {
        Some(name) if !name.is_empty() => EmailAddress::with_name(name, address),
        _ => EmailAddress::new(address),
    })
}

/// Decode the base64 `contentBytes` of an attachment resource
pub fn decode_content(attachment: &api::Attachment) -> Result<Vec<u8>> {
    let encoded = attachment
        .content_bytes
        .as_deref()
        .with_context(|| format!("Attachment {} has no file content", attachment.id))?;
    BASE64_STANDARD
        .decode(encoded)
        .with_context(|| format!("Invalid base64 content in attachment {}", attachment.id))
}

fn recipients(addresses: &[String]) -> Vec<Recipient> {
    addresses
        .iter()
        .map(|address| Recipient {
            email_address: api::EmailAddress {
                name: None,
                address: Some(address.clone()),
            },
        })
        .collect()
}

/// Request body creating `message` as a draft with inline file attachments
pub fn draft_body(message: &OutgoingMessage, attachments: &[AttachmentContent]) -> NewMessage {
    NewMessage {
        subject: message.subject.clone(),
        body: ItemBody {
            content_type: "HTML".to_string(),
            content: message.body.clone(),
        },
        to_recipients: recipients(&message.to),
        cc_recipients: recipients(&message.cc),
        bcc_recipients: recipients(&message.bcc),
        importance: message.importance.as_str().to_string(),
        attachments: attachments
            .iter()
            .map(|a| NewAttachment {
                odata_type: "#microsoft.graph.fileAttachment".to_string(),
                name: a.name.clone(),
                content_bytes: BASE64_STANDARD.encode(&a.content),
            })
            .collect(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Importance;
    use chrono::TimeZone;

    fn parse(json: &str) -> api::Message {
        serde_json::from_str(json).unwrap()
    }

    #[test]
    fn test_normalize_full_message() {
        let msg = parse(
            r#"{
                "id": "AAMk1",
                "subject": "Invoice 42",
                "body": { "contentType": "html", "content": "<p>Hi</p>" },
                "from": { "emailAddress": { "name": "Billing", "address": "billing@vendor.com" } },
                "sender": { "emailAddress": { "name": "Billing Bot", "address": "bot@vendor.com" } },
                "conversationId": "conv-9",
                "sentDateTime": "2024-03-01T09:59:00Z",
                "receivedDateTime": "2024-03-01T10:00:00Z",
                "isRead": true,
                "hasAttachments": true,
                "attachments": [
                    { "id": "att-1", "name": "invoice.pdf", "contentType": "application/pdf", "contentId": null }
                ]
            }"#,
        );

        let raw = normalize_message(msg).unwrap();

        assert_eq!(raw.id, MessageId::new("AAMk1"));
        assert_eq!(raw.subject, "Invoice 42");
        assert_eq!(raw.body, "<p>Hi</p>");
        assert_eq!(raw.from, Some(EmailAddress::with_name("Billing", "billing@vendor.com")));
        assert_eq!(raw.last_modified_name.as_deref(), Some("Billing Bot"));
        assert_eq!(raw.conversation_id.as_deref(), Some("conv-9"));
        assert_eq!(raw.sent_at, Utc.with_ymd_and_hms(2024, 3, 1, 9, 59, 0).unwrap());
        assert_eq!(raw.received_at, Utc.with_ymd_and_hms(2024, 3, 1, 10, 0, 0).unwrap());
        assert!(raw.is_read);
        assert_eq!(raw.attachments.len(), 1);
        assert_eq!(raw.attachments[0].id, AttachmentId::new("att-1"));
        assert_eq!(raw.attachments[0].content_type, "application/pdf");
    }

    #[test]
    fn test_normalize_summary_keeps_attachment_flag() {
        let msg = parse(
            r#"{ "id": "m1", "receivedDateTime": "2024-03-01T10:00:00Z", "hasAttachments": true }"#,
        );

        let raw = normalize_message(msg).unwrap();

        assert!(raw.has_attachments);
        assert!(raw.attachments.is_empty());
        assert!(raw.from.is_none());
        assert_eq!(raw.sent_at, raw.received_at);
    }

    #[test]
    fn test_missing_received_time_is_an_error() {
        assert!(normalize_message(parse(r#"{ "id": "m1" }"#)).is_err());
        assert!(normalize_message(parse(r#"{ "id": "m1", "receivedDateTime": "yesterday" }"#)).is_err());
    }

    #[test]
    fn test_decode_content() {
        let attachment: api::Attachment =
            serde_json::from_str(r#"{ "id": "a1", "contentBytes": "aGVsbG8=" }"#).unwrap();
        assert_eq!(decode_content(&attachment).unwrap(), b"hello");

        let item: api::Attachment = serde_json::from_str(r#"{ "id": "a2" }"#).unwrap();
        assert!(decode_content(&item).is_err());
    }

    #[test]
    fn test_draft_body() {
        let message = OutgoingMessage::new("ops@example.com", "Report", "<b>done</b>")
            .to(["a@example.com"])
            .bcc(["audit@example.com"])
            .importance(Importance::Normal);
        let attachments = vec![AttachmentContent {
            name: "r.txt".to_string(),
            content: b"hello".to_vec(),
        }];

        let body = serde_json::to_value(draft_body(&message, &attachments)).unwrap();

        assert_eq!(body["body"]["contentType"], "HTML");
        assert_eq!(body["toRecipients"][0]["emailAddress"]["address"], "a@example.com");
        assert_eq!(body["ccRecipients"].as_array().unwrap().len(), 0);
        assert_eq!(body["bccRecipients"][0]["emailAddress"]["address"], "audit@example.com");
        assert_eq!(body["importance"], "normal");
        assert_eq!(body["attachments"][0]["@odata.type"], "#microsoft.graph.fileAttachment");
        assert_eq!(body["attachments"][0]["contentBytes"], "aGVsbG8=");
    }
}

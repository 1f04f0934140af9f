//! Message model returned to callers of the mailbox service

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Unique identifier of a message on the remote server
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct MessageId(pub String);

impl MessageId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<String> for MessageId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl From<&str> for MessageId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

/// Identifier of an attachment on the remote server
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct AttachmentId(pub String);

impl AttachmentId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&str> for AttachmentId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

/// An email address with optional display name
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EmailAddress {
    pub name: Option<String>,
    pub address: String,
}

impl EmailAddress {
    pub fn new(address: impl Into<String>) -> Self {
        Self {
            name: None,
            address: address.into(),
        }
    }

    pub fn with_name(name: impl Into<String>, address: impl Into<String>) -> Self {
        Self {
            name: Some(name.into()),
            address: address.into(),
        }
    }
}

/// Metadata of an attachment
///
/// The byte content is never held here; it is written straight to the
/// attachment directory by the materializer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AttachmentRef {
    pub content_id: Option<String>,
    pub content_type: String,
    pub id: AttachmentId,
    pub name: String,
}

/// A message as handed to application code
///
/// Immutable once built; the caller owns it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MailMessage {
    pub unique_id: MessageId,
    pub from_name: Option<String>,
    pub from_mail: String,
    pub subject: String,
    /// Body as delivered by the server (usually HTML)
    pub body: String,
    pub conversation_id: Option<String>,
    pub sent_date: DateTime<Utc>,
    pub received_date: DateTime<Utc>,
    /// Whether the server reports attachments, regardless of whether they
    /// were materialized
    pub has_attachments: bool,
    pub attachments: Vec<AttachmentRef>,
}

/// Sequences stripped from subjects when deriving a file name, in order
const FILENAME_STRIP: [&str; 4] = ["|-", "/", " ", ":"];

impl MailMessage {
    pub fn builder(unique_id: MessageId) -> MailMessageBuilder {
        MailMessageBuilder::new(unique_id)
    }

    /// Stable file name stem for exporting this message:
    /// `20240131094500_QuarterlyReport`
    pub fn filename(&self) -> String {
        let subject = FILENAME_STRIP
            .iter()
            .fold(self.subject.trim().to_string(), |acc, seq| acc.replace(seq, ""));
        format!("{}_{}", self.received_date.format("%Y%m%d%H%M%S"), subject)
    }
}

/// Builder for [`MailMessage`]
pub struct MailMessageBuilder {
    unique_id: MessageId,
    from: Option<EmailAddress>,
    subject: String,
    body: String,
    conversation_id: Option<String>,
    sent_date: Option<DateTime<Utc>>,
    received_date: Option<DateTime<Utc>>,
    has_attachments: bool,
    attachments: Vec<AttachmentRef>,
}

impl MailMessageBuilder {
    fn new(unique_id: MessageId) -> Self {
        Self {
            unique_id,
            from: None,
            subject: String::new(),
            body: String::new(),
            conversation_id: None,
            sent_date: None,
            received_date: None,
            has_attachments: false,
            attachments: Vec::new(),
        }
    }

    pub fn from(mut self, from: EmailAddress) -> Self {
        self.from = Some(from);
        self
    }

    pub fn subject(mut self, subject: impl Into<String>) -> Self {
        self.subject = subject.into();
        self
    }

    pub fn body(mut self, body: impl Into<String>) -> Self {
        self.body = body.into();
        self
    }

    pub fn conversation_id(mut self, conversation_id: Option<String>) -> Self {
        self.conversation_id = conversation_id;
        self
    }

    pub fn sent_date(mut self, sent_date: DateTime<Utc>) -> Self {
        self.sent_date = Some(sent_date);
        self
    }

    pub fn received_date(mut self, received_date: DateTime<Utc>) -> Self {
        self.received_date = Some(received_date);
        self
    }

    pub fn has_attachments(mut self, has_attachments: bool) -> Self {
        self.has_attachments = has_attachments;
        self
    }

    pub fn attachments(mut self, attachments: Vec<AttachmentRef>) -> Self {
        self.attachments = attachments;
        self
    }

    pub fn build(self) -> MailMessage {
        let from = self.from.unwrap_or_else(|| EmailAddress::new(""));
        let received_date = self.received_date.unwrap_or_else(Utc::now);
        MailMessage {
            unique_id: self.unique_id,
            from_name: from.name,
            from_mail: from.address,
            subject: self.subject,
            body: self.body,
            conversation_id: self.conversation_id,
            sent_date: self.sent_date.unwrap_or(received_date),
            received_date,
            has_attachments: self.has_attachments,
            attachments: self.attachments,
        }
    }
}

//! Protocol-neutral records exchanged with a transport

use chrono::{DateTime, Utc};

use crate::models::{AttachmentId, EmailAddress, MessageId};
use crate::search::Field;

/// Attachment metadata as reported by the server
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawAttachment {
    pub id: AttachmentId,
    pub name: String,
    pub content_type: String,
    pub content_id: Option<String>,
}

impl RawAttachment {
    pub fn new(id: impl Into<String>, name: impl Into<String>, content_type: impl Into<String>) -> Self {
        Self {
            id: AttachmentId::new(id),
            name: name.into(),
            content_type: content_type.into(),
            content_id: None,
        }
    }
}

/// A message record as returned by the server
#[derive(Debug, Clone, PartialEq)]
pub struct RawMessage {
    pub id: MessageId,
    pub from: Option<EmailAddress>,
    pub last_modified_name: Option<String>,
    pub subject: String,
    pub body: String,
    pub conversation_id: Option<String>,
    pub sent_at: DateTime<Utc>,
    pub received_at: DateTime<Utc>,
    pub is_read: bool,
    pub has_attachments: bool,
    pub attachments: Vec<RawAttachment>,
}

impl RawMessage {
    pub fn builder(id: MessageId) -> RawMessageBuilder {
        RawMessageBuilder::new(id)
    }
}

/// Builder for [`RawMessage`], mostly for transports and tests
pub struct RawMessageBuilder {
    inner: RawMessage,
    sent_at: Option<DateTime<Utc>>,
}

impl RawMessageBuilder {
    fn new(id: MessageId) -> Self {
        let now = Utc::now();
        Self {
            inner: RawMessage {
                id,
                from: None,
                last_modified_name: None,
                subject: String::new(),
                body: String::new(),
                conversation_id: None,
                sent_at: now,
                received_at: now,
                is_read: false,
                has_attachments: false,
                attachments: Vec::new(),
            },
            sent_at: None,
        }
    }

    pub fn from(mut self, from: EmailAddress) -> Self {
        self.inner.from = Some(from);
        self
    }

    pub fn last_modified_name(mut self, name: impl Into<String>) -> Self {
        self.inner.last_modified_name = Some(name.into());
        self
    }

    pub fn subject(mut self, subject: impl Into<String>) -> Self {
        self.inner.subject = subject.into();
        self
    }

    pub fn body(mut self, body: impl Into<String>) -> Self {
        self.inner.body = body.into();
        self
    }

    pub fn conversation_id(mut self, conversation_id: impl Into<String>) -> Self {
        self.inner.conversation_id = Some(conversation_id.into());
        self
    }

    pub fn sent_at(mut self, sent_at: DateTime<Utc>) -> Self {
        self.sent_at = Some(sent_at);
        self
    }

    /// Also used as the sent time unless one is given explicitly
    pub fn received_at(mut self, received_at: DateTime<Utc>) -> Self {
        self.inner.received_at = received_at;
        self
    }

    pub fn is_read(mut self, is_read: bool) -> Self {
        self.inner.is_read = is_read;
        self
    }

    /// Add attachment metadata; marks the message as having attachments
    pub fn attachment(mut self, attachment: RawAttachment) -> Self {
        self.inner.attachments.push(attachment);
        self.inner.has_attachments = true;
        self
    }

    pub fn build(mut self) -> RawMessage {
        self.inner.sent_at = self.sent_at.unwrap_or(self.inner.received_at);
        self.inner
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortDirection {
    Ascending,
    Descending,
}

/// Server-side ordering of search results
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SortOrder {
    pub field: Field,
    pub direction: SortDirection,
}

impl SortOrder {
    /// Oldest first, the ordering every mailbox search uses
    pub fn received_ascending() -> Self {
        Self {
            field: Field::ReceivedTime,
            direction: SortDirection::Ascending,
        }
    }
}

impl Default for SortOrder {
    fn default() -> Self {
        Self::received_ascending()
    }
}

/// Window of a search request
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ItemView {
    /// Maximum number of items in one page
    pub page_size: usize,
    /// Index of the first item to return
    pub offset: usize,
    pub sort: SortOrder,
}

impl ItemView {
    pub fn new(page_size: usize, sort: SortOrder) -> Self {
        Self {
            page_size,
            offset: 0,
            sort,
        }
    }
}

/// One page of search results; consumed once
#[derive(Debug, Clone, PartialEq)]
pub struct Page {
    pub items: Vec<RawMessage>,
    pub more_available: bool,
    /// Offset of the next page when `more_available` is set
    pub next_offset: Option<usize>,
}

/// An item bound with a reduced property set (currently the read flag)
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BoundItem {
    pub id: MessageId,
    pub is_read: bool,
}

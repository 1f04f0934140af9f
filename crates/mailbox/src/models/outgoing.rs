//! Outgoing message composition

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Message importance flag
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum Importance {
    Low,
    Normal,
    #[default]
    High,
}

impl Importance {
    pub fn as_str(&self) -> &'static str {
        match self {
            Importance::Low => "low",
            Importance::Normal => "normal",
            Importance::High => "high",
        }
    }
}

/// A file to attach, either in memory or on disk
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FileAttachment {
    Bytes { name: String, content: Vec<u8> },
    /// Read at send time; the attachment is named after the file
    Path(PathBuf),
}

/// Attachment content ready to hand to the transport
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AttachmentContent {
    pub name: String,
    pub content: Vec<u8>,
}

impl FileAttachment {
    /// Load the attachment bytes
    pub fn load(&self) -> Result<AttachmentContent> {
        match self {
            FileAttachment::Bytes { name, content } => Ok(AttachmentContent {
                name: name.clone(),
                content: content.clone(),
            }),
            FileAttachment::Path(path) => {
                let name = path
                    .file_name()
                    .and_then(|n| n.to_str())
                    .with_context(|| format!("Attachment path has no file name: {}", path.display()))?
                    .to_string();
                let content = std::fs::read(path)
                    .with_context(|| format!("Failed to read attachment: {}", path.display()))?;
                Ok(AttachmentContent { name, content })
            }
        }
    }
}

/// A message to be saved as draft and sent
///
/// Recipient lists are normalized as they are added: entries are trimmed and
/// blank entries dropped.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutgoingMessage {
    /// Sending mailbox; also the mailbox whose Drafts and Sent Items are used
    pub from: String,
    pub subject: String,
    /// HTML body
    pub body: String,
    pub to: Vec<String>,
    pub cc: Vec<String>,
    pub bcc: Vec<String>,
    pub attachments: Vec<FileAttachment>,
    pub importance: Importance,
}

fn normalize_recipients<I, S>(recipients: I) -> impl Iterator<Item = String>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    recipients
        .into_iter()
        .map(|r| r.as_ref().trim().to_string())
        .filter(|r| !r.is_empty())
}

impl OutgoingMessage {
    pub fn new(from: impl Into<String>, subject: impl Into<String>, body: impl Into<String>) -> Self {
        Self {
            from: from.into().trim().to_string(),
            subject: subject.into(),
            body: body.into(),
            to: Vec::new(),
            cc: Vec::new(),
            bcc: Vec::new(),
            attachments: Vec::new(),
            importance: Importance::default(),
        }
    }

    pub fn to<I, S>(mut self, recipients: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        self.to.extend(normalize_recipients(recipients));
        self
    }

    pub fn cc<I, S>(mut self, recipients: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        self.cc.extend(normalize_recipients(recipients));
        self
    }

    pub fn bcc<I, S>(mut self, recipients: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        self.bcc.extend(normalize_recipients(recipients));
        self
    }

    pub fn attach_bytes(mut self, name: impl Into<String>, content: Vec<u8>) -> Self {
        self.attachments.push(FileAttachment::Bytes {
            name: name.into(),
            content,
        });
        self
    }

    pub fn attach_path(mut self, path: impl AsRef<Path>) -> Self {
        self.attachments
            .push(FileAttachment::Path(path.as_ref().to_path_buf()));
        self
    }

    pub fn importance(mut self, importance: Importance) -> Self {
        self.importance = importance;
        self
    }

    /// Load every attachment, failing on the first unreadable one
    pub fn load_attachments(&self) -> Result<Vec<AttachmentContent>> {
        self.attachments.iter().map(FileAttachment::load).collect()
    }

    /// All recipients (`to`, then `cc`, then `bcc`) joined with `|`, used in log lines
    pub fn recipients_summary(&self) -> String {
        self.to
            .iter()
            .chain(&self.cc)
            .chain(&self.bcc)
            .map(String::as_str)
            .collect::<Vec<_>>()
            .join("|")
    }
}

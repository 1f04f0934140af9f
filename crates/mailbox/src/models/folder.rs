//! Folder identifiers and display-name paths

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::error::MailError;

/// Folders every mailbox has, addressed without knowing their remote ID
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum WellKnownFolder {
    /// Root of the visible message folder hierarchy
    MsgFolderRoot,
    Inbox,
    Drafts,
    SentItems,
}

impl WellKnownFolder {
    /// Name used by the server to address this folder
    pub fn as_str(&self) -> &'static str {
        match self {
            WellKnownFolder::MsgFolderRoot => "msgfolderroot",
            WellKnownFolder::Inbox => "inbox",
            WellKnownFolder::Drafts => "drafts",
            WellKnownFolder::SentItems => "sentitems",
        }
    }
}

/// Identifier of a folder on the remote server
///
/// Either a well-known folder of a specific mailbox, or an opaque ID handed
/// out by the transport. IDs are resolved per request and never cached, since
/// the folder structure may change between calls.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum FolderId {
    WellKnown {
        folder: WellKnownFolder,
        mailbox: String,
    },
    Id(String),
}

impl FolderId {
    /// Wrap an opaque folder ID returned by the server
    pub fn new(id: impl Into<String>) -> Self {
        Self::Id(id.into())
    }

    pub fn well_known(folder: WellKnownFolder, mailbox: impl Into<String>) -> Self {
        Self::WellKnown {
            folder,
            mailbox: mailbox.into(),
        }
    }

    /// Root of the message folder tree of `mailbox`
    pub fn message_root(mailbox: impl Into<String>) -> Self {
        Self::well_known(WellKnownFolder::MsgFolderRoot, mailbox)
    }

    pub fn inbox(mailbox: impl Into<String>) -> Self {
        Self::well_known(WellKnownFolder::Inbox, mailbox)
    }

    pub fn drafts(mailbox: impl Into<String>) -> Self {
        Self::well_known(WellKnownFolder::Drafts, mailbox)
    }

    pub fn sent_items(mailbox: impl Into<String>) -> Self {
        Self::well_known(WellKnownFolder::SentItems, mailbox)
    }

    /// The opaque ID, if this is not a well-known folder
    pub fn as_id(&self) -> Option<&str> {
        match self {
            FolderId::Id(id) => Some(id),
            FolderId::WellKnown { .. } => None,
        }
    }
}

impl fmt::Display for FolderId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FolderId::WellKnown { folder, mailbox } => write!(f, "{}:{}", mailbox, folder.as_str()),
            FolderId::Id(id) => f.write_str(id),
        }
    }
}

impl From<&str> for FolderId {
    fn from(s: &str) -> Self {
        Self::Id(s.to_string())
    }
}

impl From<String> for FolderId {
    fn from(s: String) -> Self {
        Self::Id(s)
    }
}

/// A child folder as reported by the server
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FolderEntry {
    pub id: FolderId,
    pub display_name: String,
}

impl FolderEntry {
    pub fn new(id: impl Into<FolderId>, display_name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            display_name: display_name.into(),
        }
    }

    /// Case-insensitive display name comparison
    pub fn is_named(&self, name: &str) -> bool {
        self.display_name.to_lowercase() == name.to_lowercase()
    }
}

/// Root-relative sequence of folder display names, e.g. `Projects/2024/Invoices`
///
/// Always holds at least one non-blank segment.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct FolderPath(Vec<String>);

impl FolderPath {
    /// Build a path from individual segments
    pub fn new<I, S>(segments: I) -> Result<Self, MailError>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let segments: Vec<String> = segments.into_iter().map(Into::into).collect();
        if segments.is_empty() || segments.iter().any(|s| s.trim().is_empty()) {
            return Err(MailError::EmptyFolderPath);
        }
        Ok(Self(segments))
    }

    /// Parse a `/`-separated path; leading and trailing separators are ignored
    pub fn parse(path: &str) -> Result<Self, MailError> {
        Self::new(path.trim_matches('/').split('/'))
    }

    pub fn segments(&self) -> &[String] {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Always false; kept for API symmetry with `len`
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl fmt::Display for FolderPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0.join("/"))
    }
}

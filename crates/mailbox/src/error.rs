//! Error taxonomy for mailbox operations

use crate::models::FolderPath;

/// Errors surfaced by the mailbox service
///
/// Sending and per-attachment downloads do not use this type; they report
/// failures as values (`SendOutcome`, `AttachmentFailure`).
#[derive(Debug, thiserror::Error)]
pub enum MailError {
    /// The folder path does not resolve under the mailbox root
    #[error("Folder '{path}' not found in mailbox {mailbox}")]
    FolderNotFound { mailbox: String, path: FolderPath },

    /// A remote call failed (network, authentication, server error)
    #[error("Transport failure: {0:#}")]
    Transport(#[source] anyhow::Error),

    /// A subject search was requested with no substrings to match
    #[error("Subject search requires at least one substring")]
    EmptySubjectFilter,

    #[error("Folder path must contain at least one non-blank name")]
    EmptyFolderPath,

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// The server returned an inconsistent continuation
    #[error("Malformed search page: {0}")]
    MalformedPage(String),

    /// The server kept reporting more results past the page limit
    #[error("Search exceeded {max_pages} pages")]
    PageLimitExceeded { max_pages: usize },
}

impl MailError {
    pub fn is_not_found(&self) -> bool {
        matches!(self, MailError::FolderNotFound { .. })
    }
}

impl From<anyhow::Error> for MailError {
    fn from(err: anyhow::Error) -> Self {
        MailError::Transport(err)
    }
}

pub type Result<T> = std::result::Result<T, MailError>;

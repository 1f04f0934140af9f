//! Mailbox service
//!
//! Composes folder resolution, filter building, paginated search and
//! message materialization over a [`MailTransport`].

use chrono::{DateTime, Utc};
use log::{info, warn};
use std::path::Path;
use std::sync::Arc;

use super::send::{SendOutcome, send_message};
use crate::attachments::{AttachmentFailure, AttachmentStore, DirectoryAttachmentStore, Materializer};
use crate::config::ServiceConfig;
use crate::error::{MailError, Result};
use crate::folders::resolve_folder;
use crate::models::{FolderId, FolderPath, MailMessage, MessageId, OutgoingMessage};
use crate::search::{
    Field, FilterNode, SearchCriteria, SearchOptions, SearchStats, build_filter, search_all_with_stats,
};
use crate::transport::MailTransport;

/// Messages found by a search
#[derive(Debug, Clone, Default)]
pub struct SearchResults {
    /// In ascending received order
    pub messages: Vec<MailMessage>,
    /// Attachments that could not be downloaded; their messages are still
    /// in `messages`, without those attachments
    pub attachment_failures: Vec<AttachmentFailure>,
    pub stats: SearchStats,
}

/// Outcome of marking messages as read
///
/// Every bound item is updated independently; one failure does not stop
/// the others.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MarkReadReport {
    pub updated: Vec<MessageId>,
    /// Requested IDs the server no longer knows
    pub missing: Vec<MessageId>,
    pub failed: Vec<(MessageId, String)>,
}

impl MarkReadReport {
    pub fn is_complete(&self) -> bool {
        self.missing.is_empty() && self.failed.is_empty()
    }
}

/// Mailbox operations over a remote mail server
///
/// Holds no mutable state; independent calls may run concurrently.
pub struct MailService {
    transport: Arc<dyn MailTransport>,
    options: SearchOptions,
}

impl MailService {
    /// Create a service with default search settings
    pub fn new(transport: Arc<dyn MailTransport>) -> Self {
        Self::with_config(transport, &ServiceConfig::default())
    }

    pub fn with_config(transport: Arc<dyn MailTransport>, config: &ServiceConfig) -> Self {
        Self {
            transport,
            options: SearchOptions {
                page_size: config.page_size,
                max_pages: config.max_pages,
                ..SearchOptions::default()
            },
        }
    }

    /// Resolve `path` below the message root of `mailbox`
    ///
    /// # Errors
    /// `MailError::FolderNotFound` when any segment is missing.
    pub fn folder_id(&self, mailbox: &str, path: &FolderPath) -> Result<FolderId> {
        let root = FolderId::message_root(mailbox);
        resolve_folder(self.transport.as_ref(), &root, path)?.ok_or_else(|| MailError::FolderNotFound {
            mailbox: mailbox.to_string(),
            path: path.clone(),
        })
    }

    /// Messages in the folder at `path` received after `since` whose subject
    /// contains any of `subject_substrings`
    ///
    /// Mail sent by `mailbox` itself is excluded. With `attachment_dir`,
    /// attachments are downloaded there (skipping files already present).
    pub fn search_by_folder_path<S: AsRef<str>>(
        &self,
        mailbox: &str,
        path: &FolderPath,
        since: DateTime<Utc>,
        subject_substrings: &[S],
        attachment_dir: Option<&Path>,
    ) -> Result<SearchResults> {
        let criteria = SearchCriteria::since(since)
            .subject_contains(subject_substrings.iter().map(|s| s.as_ref().to_string()), mailbox);
        let filter = build_filter(&criteria)?;
        let folder = self.folder_id(mailbox, path)?;

        info!("[SEARCH] {} in {} since {}", mailbox, path, since);
        self.run_search(&folder, &filter, attachment_dir)
    }

    /// Inbox messages of `mailbox` received after `since`, from `sender`
    /// (or, with `exclude_sender`, from anyone else)
    ///
    /// A blank `sender` places no sender restriction.
    pub fn search_by_sender(
        &self,
        mailbox: &str,
        sender: &str,
        since: DateTime<Utc>,
        attachment_dir: Option<&Path>,
        unread_only: bool,
        exclude_sender: bool,
    ) -> Result<SearchResults> {
        let mut criteria = SearchCriteria::since(since).unread_only(unread_only);
        let sender = sender.trim();
        if !sender.is_empty() {
            criteria = if exclude_sender {
                criteria.excluding_sender(sender)
            } else {
                criteria.from_sender(sender)
            };
        }
        let filter = build_filter(&criteria)?;

        info!(
            "[SEARCH] {} inbox since {} sender={:?} exclude={} unread_only={}",
            mailbox, since, sender, exclude_sender, unread_only
        );
        self.run_search(&FolderId::inbox(mailbox), &filter, attachment_dir)
    }

    fn run_search(
        &self,
        folder: &FolderId,
        filter: &FilterNode,
        attachment_dir: Option<&Path>,
    ) -> Result<SearchResults> {
        let (records, stats) = search_all_with_stats(self.transport.as_ref(), folder, filter, &self.options)?;

        let store = attachment_dir
            .filter(|dir| !dir.as_os_str().is_empty() && !dir.to_string_lossy().trim().is_empty())
            .map(DirectoryAttachmentStore::new);
        let materializer = Materializer::new(
            self.transport.as_ref(),
            store.as_ref().map(|s| s as &dyn AttachmentStore),
        );

        let mut results = SearchResults {
            stats,
            ..SearchResults::default()
        };
        for record in records {
            let materialized = materializer.materialize(record);
            results.messages.push(materialized.message);
            results.attachment_failures.extend(materialized.failures);
        }

        info!(
            "[SEARCH] {} messages from {} ({} pages, {} attachment failures)",
            results.messages.len(),
            folder,
            results.stats.pages_fetched,
            results.attachment_failures.len()
        );
        Ok(results)
    }

    /// Mark messages as read
    ///
    /// The read state of all `ids` is bound in one call (a failure there
    /// fails the whole operation). Each bound item is then updated on its
    /// own; failures are collected in the report instead of aborting.
    pub fn mark_as_read(&self, mailbox: &str, ids: &[MessageId]) -> Result<MarkReadReport> {
        let mut report = MarkReadReport::default();
        if ids.is_empty() {
            return Ok(report);
        }

        let bound = self.transport.bind_items(ids, &[Field::IsRead])?;
        report.missing = ids
            .iter()
            .filter(|id| !bound.iter().any(|b| &b.id == *id))
            .cloned()
            .collect();

        for item in bound {
            match self.transport.update_read_state(&item.id, true) {
                Ok(()) => report.updated.push(item.id),
                Err(e) => {
                    warn!("[READ] Failed to mark {} as read in {}: {:#}", item.id.as_str(), mailbox, e);
                    report.failed.push((item.id, format!("{:#}", e)));
                }
            }
        }

        info!(
            "[READ] {}: {} marked read, {} missing, {} failed",
            mailbox,
            report.updated.len(),
            report.missing.len(),
            report.failed.len()
        );
        Ok(report)
    }

    /// Move messages into `target` with a single request
    pub fn move_to_folder(&self, target: &FolderId, ids: &[MessageId]) -> Result<()> {
        if ids.is_empty() {
            return Ok(());
        }
        info!("[MOVE] Moving {} messages to {}", ids.len(), target);
        self.transport.move_items(ids, target)?;
        Ok(())
    }

    /// Save `message` as a draft of its sender and send it
    ///
    /// Never fails; see [`SendOutcome`].
    pub fn send(&self, message: &OutgoingMessage) -> SendOutcome {
        send_message(self.transport.as_ref(), message)
    }
}

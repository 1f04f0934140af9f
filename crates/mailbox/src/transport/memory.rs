//! In-memory transport implementation
//!
//! Holds a folder tree, messages and attachment bytes in process memory and
//! evaluates filters locally. Used by tests and as a stand-in server while
//! wiring an application. Every call is counted, and individual calls can be
//! made to fail, so callers can assert on round-trips and failure handling.

use anyhow::{Context, Result, anyhow, bail};
use std::collections::{HashMap, HashSet};
use std::sync::{Mutex, MutexGuard, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

use super::{BoundItem, ItemView, MailTransport, Page, RawMessage, SortDirection};
use crate::folders::FolderLookup;
use crate::models::{
    AttachmentContent, AttachmentId, FolderEntry, FolderId, MessageId, OutgoingMessage,
};
use crate::search::{Field, FilterNode};

/// Number of calls made to each transport operation
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct CallCounts {
    pub find_child_folders: usize,
    pub find_items: usize,
    pub load_full_properties: usize,
    pub bind_items: usize,
    pub update_read_state: usize,
    pub move_items: usize,
    pub save_draft: usize,
    pub send_and_save_copy: usize,
    pub fetch_attachment_content: usize,
}

/// Whole operations that can be forced to fail
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FailPoint {
    FindChildFolders,
    FindItems,
    BindItems,
    MoveItems,
    SaveDraft,
    SendAndSaveCopy,
}

/// A draft saved through the transport
#[derive(Debug, Clone)]
pub struct SavedDraft {
    pub id: MessageId,
    pub folder: FolderId,
    pub message: OutgoingMessage,
    pub attachments: Vec<AttachmentContent>,
    /// Folder the sent copy went to, once sent
    pub sent_copy: Option<FolderId>,
}

struct StoredMessage {
    folder: FolderId,
    message: RawMessage,
}

/// In-memory implementation of MailTransport
pub struct InMemoryTransport {
    /// parent -> children in insertion order (the "natural" server order)
    folders: RwLock<HashMap<FolderId, Vec<FolderEntry>>>,
    messages: RwLock<Vec<StoredMessage>>,
    /// (message id, attachment id) -> bytes
    attachment_content: RwLock<HashMap<(String, String), Vec<u8>>>,
    drafts: RwLock<Vec<SavedDraft>>,
    failing_attachments: RwLock<HashSet<String>>,
    failing_read_updates: RwLock<HashSet<String>>,
    fail_points: RwLock<HashSet<FailPoint>>,
    calls: Mutex<CallCounts>,
    next_id: Mutex<u64>,
}

fn read<T>(lock: &RwLock<T>) -> RwLockReadGuard<'_, T> {
    lock.read().unwrap_or_else(PoisonError::into_inner)
}

fn write<T>(lock: &RwLock<T>) -> RwLockWriteGuard<'_, T> {
    lock.write().unwrap_or_else(PoisonError::into_inner)
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

impl InMemoryTransport {
    /// Create an empty server
    pub fn new() -> Self {
        Self {
            folders: RwLock::new(HashMap::new()),
            messages: RwLock::new(Vec::new()),
            attachment_content: RwLock::new(HashMap::new()),
            drafts: RwLock::new(Vec::new()),
            failing_attachments: RwLock::new(HashSet::new()),
            failing_read_updates: RwLock::new(HashSet::new()),
            fail_points: RwLock::new(HashSet::new()),
            calls: Mutex::new(CallCounts::default()),
            next_id: Mutex::new(1),
        }
    }

    fn generate_id(&self, prefix: &str) -> String {
        let mut next = lock(&self.next_id);
        let id = format!("{}-{}", prefix, *next);
        *next += 1;
        id
    }

    fn count(&self, f: impl FnOnce(&mut CallCounts)) {
        f(&mut lock(&self.calls));
    }

    fn check(&self, point: FailPoint) -> Result<()> {
        if read(&self.fail_points).contains(&point) {
            bail!("Injected failure at {:?}", point);
        }
        Ok(())
    }

    /// Create a child folder under `parent` and return its ID
    pub fn add_folder(&self, parent: &FolderId, display_name: &str) -> FolderId {
        let id = FolderId::new(self.generate_id("folder"));
        write(&self.folders)
            .entry(parent.clone())
            .or_default()
            .push(FolderEntry::new(id.clone(), display_name));
        id
    }

    /// Store a message in `folder`
    pub fn add_message(&self, folder: &FolderId, message: RawMessage) {
        write(&self.messages).push(StoredMessage {
            folder: folder.clone(),
            message,
        });
    }

    /// Store the bytes served for an attachment
    pub fn add_attachment_content(&self, message: &MessageId, attachment: &AttachmentId, content: &[u8]) {
        write(&self.attachment_content).insert(
            (message.0.clone(), attachment.0.clone()),
            content.to_vec(),
        );
    }

    /// Make fetching this attachment fail
    pub fn fail_attachment(&self, attachment: &AttachmentId) {
        write(&self.failing_attachments).insert(attachment.0.clone());
    }

    /// Make updating this item's read state fail
    pub fn fail_read_update(&self, id: &MessageId) {
        write(&self.failing_read_updates).insert(id.0.clone());
    }

    /// Make every call of an operation fail
    pub fn fail_on(&self, point: FailPoint) {
        write(&self.fail_points).insert(point);
    }

    /// Snapshot of the call counters
    pub fn calls(&self) -> CallCounts {
        lock(&self.calls).clone()
    }

    /// Current state of a stored message
    pub fn message(&self, id: &MessageId) -> Option<RawMessage> {
        read(&self.messages)
            .iter()
            .find(|m| &m.message.id == id)
            .map(|m| m.message.clone())
    }

    /// Folder a stored message currently lives in
    pub fn folder_of(&self, id: &MessageId) -> Option<FolderId> {
        read(&self.messages)
            .iter()
            .find(|m| &m.message.id == id)
            .map(|m| m.folder.clone())
    }

    /// Drafts saved so far, including sent ones
    pub fn drafts(&self) -> Vec<SavedDraft> {
        read(&self.drafts).clone()
    }
}

impl Default for InMemoryTransport {
    fn default() -> Self {
        Self::new()
    }
}

impl FolderLookup for InMemoryTransport {
    fn find_child_folders(&self, parent: &FolderId, name: &str) -> Result<Vec<FolderEntry>> {
        self.count(|c| c.find_child_folders += 1);
        self.check(FailPoint::FindChildFolders)?;

        Ok(read(&self.folders)
            .get(parent)
            .map(|children| children.iter().filter(|f| f.is_named(name)).cloned().collect())
            .unwrap_or_default())
    }
}

impl MailTransport for InMemoryTransport {
    fn find_items(&self, folder: &FolderId, filter: &FilterNode, view: &ItemView) -> Result<Page> {
        self.count(|c| c.find_items += 1);
        self.check(FailPoint::FindItems)?;

        let messages = read(&self.messages);
        let mut matching: Vec<&RawMessage> = messages
            .iter()
            .filter(|m| &m.folder == folder && filter.matches(&m.message))
            .map(|m| &m.message)
            .collect();

        match view.sort.field {
            Field::Subject => matching.sort_by(|a, b| a.subject.cmp(&b.subject)),
            _ => matching.sort_by_key(|m| m.received_at),
        }
        if view.sort.direction == SortDirection::Descending {
            matching.reverse();
        }

        let total = matching.len();
        let start = view.offset.min(total);
        let end = start.saturating_add(view.page_size).min(total);
        let more_available = end < total;

        Ok(Page {
            items: matching[start..end].iter().map(|m| (*m).clone()).collect(),
            more_available,
            next_offset: more_available.then_some(end),
        })
    }

    fn load_full_properties(&self, ids: &[MessageId]) -> Result<Vec<RawMessage>> {
        self.count(|c| c.load_full_properties += 1);

        ids.iter()
            .map(|id| {
                self.message(id)
                    .with_context(|| format!("Item not found: {}", id.as_str()))
            })
            .collect()
    }

    fn bind_items(&self, ids: &[MessageId], _fields: &[Field]) -> Result<Vec<BoundItem>> {
        self.count(|c| c.bind_items += 1);
        self.check(FailPoint::BindItems)?;

        Ok(ids
            .iter()
            .filter_map(|id| {
                self.message(id).map(|m| BoundItem {
                    id: m.id,
                    is_read: m.is_read,
                })
            })
            .collect())
    }

    fn update_read_state(&self, id: &MessageId, is_read: bool) -> Result<()> {
        self.count(|c| c.update_read_state += 1);

        if read(&self.failing_read_updates).contains(id.as_str()) {
            bail!("Injected failure updating {}", id.as_str());
        }

        let mut messages = write(&self.messages);
        let stored = messages
            .iter_mut()
            .find(|m| &m.message.id == id)
            .with_context(|| format!("Item not found: {}", id.as_str()))?;
        stored.message.is_read = is_read;
        Ok(())
    }

    fn move_items(&self, ids: &[MessageId], target: &FolderId) -> Result<()> {
        self.count(|c| c.move_items += 1);
        self.check(FailPoint::MoveItems)?;

        let mut messages = write(&self.messages);
        if let Some(missing) = ids.iter().find(|id| !messages.iter().any(|m| &m.message.id == *id)) {
            return Err(anyhow!("Item not found: {}", missing.as_str()));
        }
        for stored in messages.iter_mut().filter(|m| ids.contains(&m.message.id)) {
            stored.folder = target.clone();
        }
        Ok(())
    }

    fn save_draft(
        &self,
        message: &OutgoingMessage,
        attachments: &[AttachmentContent],
        folder: &FolderId,
    ) -> Result<MessageId> {
        self.count(|c| c.save_draft += 1);
        self.check(FailPoint::SaveDraft)?;

        let id = MessageId::new(self.generate_id("draft"));
        write(&self.drafts).push(SavedDraft {
            id: id.clone(),
            folder: folder.clone(),
            message: message.clone(),
            attachments: attachments.to_vec(),
            sent_copy: None,
        });
        Ok(id)
    }

    fn send_and_save_copy(&self, draft: &MessageId, folder: &FolderId) -> Result<()> {
        self.count(|c| c.send_and_save_copy += 1);
        self.check(FailPoint::SendAndSaveCopy)?;

        let mut drafts = write(&self.drafts);
        let saved = drafts
            .iter_mut()
            .find(|d| &d.id == draft)
            .with_context(|| format!("Draft not found: {}", draft.as_str()))?;
        saved.sent_copy = Some(folder.clone());
        Ok(())
    }

    fn fetch_attachment_content(&self, message: &MessageId, attachment: &AttachmentId) -> Result<Vec<u8>> {
        self.count(|c| c.fetch_attachment_content += 1);

        if read(&self.failing_attachments).contains(attachment.as_str()) {
            bail!("Injected failure fetching attachment {}", attachment.as_str());
        }

        read(&self.attachment_content)
            .get(&(message.0.clone(), attachment.0.clone()))
            .cloned()
            .with_context(|| format!("Attachment not found: {}", attachment.as_str()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::EmailAddress;
    use crate::transport::SortOrder;
    use chrono::{Duration, TimeZone, Utc};

    fn seeded(count: usize) -> (InMemoryTransport, FolderId) {
        let transport = InMemoryTransport::new();
        let inbox = FolderId::inbox("ops@example.com");
        let base = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
        // Insert newest first so sorting is observable
        for i in (0..count).rev() {
            transport.add_message(
                &inbox,
                RawMessage::builder(MessageId::new(format!("m{}", i)))
                    .from(EmailAddress::new("a@example.com"))
                    .received_at(base + Duration::minutes(i as i64))
                    .build(),
            );
        }
        (transport, inbox)
    }

    #[test]
    fn test_find_items_pages_in_order() {
        let (transport, inbox) = seeded(5);
        let mut view = ItemView::new(2, SortOrder::received_ascending());

        let first = transport.find_items(&inbox, &FilterNode::and(vec![]), &view).unwrap();
        assert_eq!(first.items.len(), 2);
        assert_eq!(first.items[0].id.as_str(), "m0");
        assert!(first.more_available);
        assert_eq!(first.next_offset, Some(2));

        view.offset = 4;
        let last = transport.find_items(&inbox, &FilterNode::and(vec![]), &view).unwrap();
        assert_eq!(last.items.len(), 1);
        assert_eq!(last.items[0].id.as_str(), "m4");
        assert!(!last.more_available);
        assert_eq!(last.next_offset, None);
        assert_eq!(transport.calls().find_items, 2);
    }

    #[test]
    fn test_child_folders_match_ignoring_case() {
        let transport = InMemoryTransport::new();
        let root = FolderId::message_root("ops@example.com");
        let clients = transport.add_folder(&root, "Clients");
        transport.add_folder(&root, "Archive");

        let found = transport.find_child_folders(&root, "CLIENTS").unwrap();
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].id, clients);
        assert!(transport.find_child_folders(&clients, "Clients").unwrap().is_empty());
    }

    #[test]
    fn test_move_is_all_or_nothing() {
        let (transport, _inbox) = seeded(2);
        let archive = FolderId::new("archive");

        let result = transport.move_items(&[MessageId::new("m0"), MessageId::new("ghost")], &archive);
        assert!(result.is_err());
        assert_ne!(transport.folder_of(&MessageId::new("m0")), Some(archive.clone()));

        transport.move_items(&[MessageId::new("m0")], &archive).unwrap();
        assert_eq!(transport.folder_of(&MessageId::new("m0")), Some(archive));
    }

    #[test]
    fn test_fail_point() {
        let (transport, inbox) = seeded(1);
        transport.fail_on(FailPoint::FindItems);
        let view = ItemView::new(10, SortOrder::received_ascending());
        assert!(transport.find_items(&inbox, &FilterNode::and(vec![]), &view).is_err());
    }
}

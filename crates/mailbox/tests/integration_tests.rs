//! Integration tests for the mailbox crate
//!
//! These tests drive the service end to end over the in-memory transport.

use chrono::{DateTime, Duration, TimeZone, Utc};
use mailbox::models::{AttachmentId, EmailAddress, FolderId, FolderPath, MessageId, OutgoingMessage};
use mailbox::transport::{FailPoint, InMemoryTransport, RawAttachment, RawMessage};
use mailbox::{MailError, MailService, SendStage, ServiceConfig};
use std::sync::Arc;
use tempfile::TempDir;

const MAILBOX: &str = "ops@example.com";

fn init_logging() {
    let _ = env_logger::builder().is_test(true).try_init();
}

fn base_time() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap()
}

/// Helper to create test messages
fn make_message(id: &str, from: &str, subject: &str, minutes: i64) -> RawMessage {
    RawMessage::builder(MessageId::new(id))
        .from(EmailAddress::new(from))
        .subject(subject)
        .body(format!("<p>Body of {}</p>", id))
        .received_at(base_time() + Duration::minutes(minutes))
        .build()
}

fn setup() -> (Arc<InMemoryTransport>, MailService) {
    init_logging();
    let transport = Arc::new(InMemoryTransport::new());
    let service = MailService::new(transport.clone());
    (transport, service)
}

#[test]
fn test_large_search_pages_in_order() {
    let (transport, service) = setup();
    let inbox = FolderId::inbox(MAILBOX);
    // Insert newest first so ordering comes from the search, not insertion
    for i in (0..2042).rev() {
        transport.add_message(&inbox, make_message(&format!("m{:04}", i), "feed@vendor.com", "Update", i));
    }

    let results = service
        .search_by_sender(MAILBOX, "feed@vendor.com", base_time() - Duration::days(1), None, false, false)
        .unwrap();

    assert_eq!(results.messages.len(), 2042);
    assert_eq!(results.stats.pages_fetched, 3);
    assert_eq!(transport.calls().find_items, 3);
    assert_eq!(transport.calls().load_full_properties, 3);
    assert!(
        results
            .messages
            .windows(2)
            .all(|w| w[0].received_date <= w[1].received_date)
    );
    assert_eq!(results.messages[0].unique_id, MessageId::new("m0000"));
}

#[test]
fn test_page_size_from_config() {
    init_logging();
    let transport = Arc::new(InMemoryTransport::new());
    let config = ServiceConfig {
        page_size: 10,
        ..ServiceConfig::default()
    };
    let service = MailService::with_config(transport.clone(), &config);
    let inbox = FolderId::inbox(MAILBOX);
    for i in 0..25 {
        transport.add_message(&inbox, make_message(&format!("m{}", i), "a@example.com", "x", i));
    }

    let results = service
        .search_by_sender(MAILBOX, "", base_time() - Duration::days(1), None, false, false)
        .unwrap();

    assert_eq!(results.messages.len(), 25);
    assert_eq!(results.stats.pages_fetched, 3);
}

#[test]
fn test_folder_path_search() {
    let (transport, service) = setup();
    let root = FolderId::message_root(MAILBOX);
    let clients = transport.add_folder(&root, "Clients");
    let acme = transport.add_folder(&clients, "Acme");
    let invoices = transport.add_folder(&acme, "Invoices");

    transport.add_message(&invoices, make_message("m1", "billing@acme.com", "Invoice 1001", 10));
    transport.add_message(&invoices, make_message("m2", "billing@acme.com", "Monthly RECEIPT", 20));
    transport.add_message(&invoices, make_message("m3", "billing@acme.com", "Newsletter", 30));
    transport.add_message(&invoices, make_message("m4", MAILBOX, "Invoice forwarded", 40));
    transport.add_message(&invoices, make_message("m5", "billing@acme.com", "Invoice old", -60));
    // Same subject in another folder is out of scope
    transport.add_message(&acme, make_message("m6", "billing@acme.com", "Invoice elsewhere", 50));

    let path = FolderPath::parse("Clients/Acme/Invoices").unwrap();
    let results = service
        .search_by_folder_path(MAILBOX, &path, base_time(), &["invoice", "receipt"], None)
        .unwrap();

    let ids: Vec<&str> = results.messages.iter().map(|m| m.unique_id.as_str()).collect();
    assert_eq!(ids, vec!["m1", "m2"]);
    assert_eq!(transport.calls().find_child_folders, 3);
    assert_eq!(service.folder_id(MAILBOX, &path).unwrap(), invoices);
}

#[test]
fn test_folder_path_not_found() {
    let (transport, service) = setup();
    let root = FolderId::message_root(MAILBOX);
    transport.add_folder(&root, "Clients");

    let path = FolderPath::parse("Clients/Missing/Deeper").unwrap();
    let err = service
        .search_by_folder_path(MAILBOX, &path, base_time(), &["x"], None)
        .unwrap_err();

    match err {
        MailError::FolderNotFound { mailbox, path: missing } => {
            assert_eq!(mailbox, MAILBOX);
            assert_eq!(missing, path);
        }
        other => panic!("expected FolderNotFound, got {:?}", other),
    }
    // Resolution stops at the first missing level
    assert_eq!(transport.calls().find_child_folders, 2);
    assert_eq!(transport.calls().find_items, 0);
}

#[test]
fn test_sender_search_unread_and_exclusion() {
    let (transport, service) = setup();
    let inbox = FolderId::inbox(MAILBOX);
    transport.add_message(&inbox, make_message("m1", "alerts@monitor.io", "CPU high", 1));
    transport.add_message(
        &inbox,
        RawMessage::builder(MessageId::new("m2"))
            .from(EmailAddress::new("alerts@monitor.io"))
            .subject("Disk full")
            .received_at(base_time() + Duration::minutes(2))
            .is_read(true)
            .build(),
    );
    transport.add_message(&inbox, make_message("m3", "boss@example.com", "Status?", 3));

    let since = base_time();
    let unread_from = service
        .search_by_sender(MAILBOX, "alerts@monitor.io", since, None, true, false)
        .unwrap();
    let all_from = service
        .search_by_sender(MAILBOX, "alerts@monitor.io", since, None, false, false)
        .unwrap();
    let others = service
        .search_by_sender(MAILBOX, "alerts@monitor.io", since, None, false, true)
        .unwrap();

    let ids = |r: &mailbox::SearchResults| -> Vec<String> {
        r.messages.iter().map(|m| m.unique_id.as_str().to_string()).collect()
    };
    assert_eq!(ids(&unread_from), vec!["m1"]);
    assert_eq!(ids(&all_from), vec!["m1", "m2"]);
    assert_eq!(ids(&others), vec!["m3"]);
}

#[test]
fn test_attachments_downloaded_once() {
    let (transport, service) = setup();
    let dir = TempDir::new().unwrap();
    let inbox = FolderId::inbox(MAILBOX);
    let id = MessageId::new("m1");
    let message = RawMessage::builder(id.clone())
        .from(EmailAddress::new("scanner@example.com"))
        .subject("Scans")
        .received_at(base_time() + Duration::minutes(5))
        .attachment(RawAttachment::new("a1", "scan-1.png", "image/png"))
        .attachment(RawAttachment::new("a2", "scan-2.png", "image/png"))
        .build();
    transport.add_message(&inbox, message);
    transport.add_attachment_content(&id, &AttachmentId::new("a1"), b"first");
    transport.add_attachment_content(&id, &AttachmentId::new("a2"), b"second");

    let first = service
        .search_by_sender(MAILBOX, "scanner@example.com", base_time(), Some(dir.path()), false, false)
        .unwrap();
    let second = service
        .search_by_sender(MAILBOX, "scanner@example.com", base_time(), Some(dir.path()), false, false)
        .unwrap();

    assert_eq!(transport.calls().fetch_attachment_content, 2);
    assert_eq!(first.messages[0].attachments, second.messages[0].attachments);
    assert_eq!(first.messages[0].attachments.len(), 2);
    assert_eq!(std::fs::read(dir.path().join("scan-2.png")).unwrap(), b"second");
    assert!(second.attachment_failures.is_empty());
}

#[test]
fn test_no_attachment_dir_skips_downloads() {
    let (transport, service) = setup();
    let inbox = FolderId::inbox(MAILBOX);
    transport.add_message(
        &inbox,
        RawMessage::builder(MessageId::new("m1"))
            .from(EmailAddress::new("a@example.com"))
            .received_at(base_time() + Duration::minutes(1))
            .attachment(RawAttachment::new("a1", "f.txt", "text/plain"))
            .build(),
    );
    let blank = std::path::Path::new("   ");

    let results = service
        .search_by_sender(MAILBOX, "a@example.com", base_time(), Some(blank), false, false)
        .unwrap();

    assert!(results.messages[0].has_attachments);
    assert!(results.messages[0].attachments.is_empty());
    assert_eq!(transport.calls().fetch_attachment_content, 0);
}

#[test]
fn test_failing_attachment_keeps_message() {
    let (transport, service) = setup();
    let dir = TempDir::new().unwrap();
    let inbox = FolderId::inbox(MAILBOX);
    let id = MessageId::new("m1");
    let message = RawMessage::builder(id.clone())
        .from(EmailAddress::new("a@example.com"))
        .subject("Docs")
        .received_at(base_time() + Duration::minutes(1))
        .attachment(RawAttachment::new("a1", "one.pdf", "application/pdf"))
        .attachment(RawAttachment::new("a2", "two.pdf", "application/pdf"))
        .attachment(RawAttachment::new("a3", "three.pdf", "application/pdf"))
        .build();
    transport.add_message(&inbox, message);
    for aid in ["a1", "a2", "a3"] {
        transport.add_attachment_content(&id, &AttachmentId::new(aid), aid.as_bytes());
    }
    transport.fail_attachment(&AttachmentId::new("a2"));

    let results = service
        .search_by_sender(MAILBOX, "a@example.com", base_time(), Some(dir.path()), false, false)
        .unwrap();

    assert_eq!(results.messages.len(), 1);
    let names: Vec<&str> = results.messages[0].attachments.iter().map(|a| a.name.as_str()).collect();
    assert_eq!(names, vec!["one.pdf", "three.pdf"]);
    assert_eq!(results.attachment_failures.len(), 1);
    assert_eq!(results.attachment_failures[0].message_id, id);
    assert!(dir.path().join("three.pdf").exists());
}

#[test]
fn test_mark_read_then_move() {
    let (transport, service) = setup();
    let inbox = FolderId::inbox(MAILBOX);
    for i in 0..3 {
        transport.add_message(&inbox, make_message(&format!("m{}", i), "a@example.com", "Job", i));
    }
    let done = transport.add_folder(&FolderId::message_root(MAILBOX), "Done");

    let found = service
        .search_by_sender(MAILBOX, "a@example.com", base_time() - Duration::days(1), None, true, false)
        .unwrap();
    let ids: Vec<MessageId> = found.messages.iter().map(|m| m.unique_id.clone()).collect();

    let report = service.mark_as_read(MAILBOX, &ids).unwrap();
    assert!(report.is_complete());
    assert_eq!(report.updated.len(), 3);

    service
        .move_to_folder(&service.folder_id(MAILBOX, &FolderPath::parse("Done").unwrap()).unwrap(), &ids)
        .unwrap();
    assert_eq!(transport.calls().move_items, 1);
    for id in &ids {
        assert_eq!(transport.folder_of(id), Some(done.clone()));
        assert!(transport.message(id).unwrap().is_read);
    }

    let unread_left = service
        .search_by_sender(MAILBOX, "a@example.com", base_time() - Duration::days(1), None, true, false)
        .unwrap();
    assert!(unread_left.messages.is_empty());
}

#[test]
fn test_move_failure_propagates() {
    let (transport, service) = setup();
    transport.fail_on(FailPoint::MoveItems);

    let result = service.move_to_folder(&FolderId::new("folder-x"), &[MessageId::new("m1")]);

    assert!(matches!(result, Err(MailError::Transport(_))));
}

#[test]
fn test_send_outcomes() {
    let (transport, service) = setup();
    let dir = TempDir::new().unwrap();
    let report = dir.path().join("report.csv");
    std::fs::write(&report, b"day,count\nmon,3\n").unwrap();

    let message = OutgoingMessage::new(MAILBOX, "Daily report", "<p>See attached</p>")
        .to(["boss@example.com", " "])
        .cc(["team@example.com"])
        .attach_path(&report);

    let outcome = service.send(&message);
    assert!(outcome.is_sent());
    let drafts = transport.drafts();
    assert_eq!(drafts.len(), 1);
    assert_eq!(drafts[0].folder, FolderId::drafts(MAILBOX));
    assert_eq!(drafts[0].message.to, vec!["boss@example.com"]);
    assert_eq!(drafts[0].message.cc, vec!["team@example.com"]);
    assert_eq!(drafts[0].attachments[0].name, "report.csv");
    assert_eq!(drafts[0].attachments[0].content, b"day,count\nmon,3\n");

    transport.fail_on(FailPoint::SendAndSaveCopy);
    let failure = service.send(&message).into_result().unwrap_err();
    assert_eq!(failure.stage, SendStage::Send);
    assert!(failure.draft_id.is_some());
}

#[test]
fn test_concurrent_searches() {
    let (transport, service) = setup();
    let service = Arc::new(service);
    let inbox = FolderId::inbox(MAILBOX);
    for i in 0..50 {
        transport.add_message(&inbox, make_message(&format!("m{}", i), "a@example.com", "x", i));
    }

    let handles: Vec<_> = (0..4)
        .map(|_| {
            let service = Arc::clone(&service);
            std::thread::spawn(move || {
                service
                    .search_by_sender(MAILBOX, "a@example.com", base_time() - Duration::days(1), None, false, false)
                    .map(|r| r.messages.len())
            })
        })
        .collect();

    for handle in handles {
        assert_eq!(handle.join().unwrap().unwrap(), 50);
    }
}

//! High-level mailbox operations
//!
//! [`MailService`] is the entry point for application code.

mod mail;
mod send;

pub use mail::{MailService, MarkReadReport, SearchResults};
pub use send::{SendFailure, SendOutcome, SendStage};

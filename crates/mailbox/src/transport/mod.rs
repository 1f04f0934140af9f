//! Transport abstraction for the remote mail server
//!
//! The mailbox service never talks to the network itself. It composes the
//! calls of a [`MailTransport`]: the REST adapter in [`crate::rest`] for real
//! servers, or [`InMemoryTransport`] for tests.

mod memory;
mod traits;
mod types;

pub use memory::{CallCounts, FailPoint, InMemoryTransport, SavedDraft};
pub use traits::MailTransport;
pub use types::{
    BoundItem, ItemView, Page, RawAttachment, RawMessage, RawMessageBuilder, SortDirection, SortOrder,
};

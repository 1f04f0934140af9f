//! Paginated search execution
//!
//! Pages are requested strictly one after another: each request needs the
//! continuation offset from the previous response, and sequential fetching
//! keeps the declared sort order intact across page boundaries.

use log::debug;

use super::FilterNode;
use crate::error::{MailError, Result};
use crate::models::{FolderId, MessageId};
use crate::transport::{ItemView, MailTransport, RawMessage, SortOrder};

/// Historical page size of the mailbox service
pub const DEFAULT_PAGE_SIZE: usize = 1000;

/// Upper bound on pages fetched by one search
pub const DEFAULT_MAX_PAGES: usize = 10_000;

/// Tunables for a paginated search
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SearchOptions {
    /// Items per page; trades round-trips against payload size
    pub page_size: usize,
    /// Guard against a server that never stops reporting more results
    pub max_pages: usize,
    pub sort: SortOrder,
}

impl Default for SearchOptions {
    fn default() -> Self {
        Self {
            page_size: DEFAULT_PAGE_SIZE,
            max_pages: DEFAULT_MAX_PAGES,
            sort: SortOrder::received_ascending(),
        }
    }
}

/// Statistics from a paginated search
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct SearchStats {
    pub pages_fetched: usize,
    pub items_found: usize,
}

/// Run `filter` against `folder` and collect every page
///
/// Full properties are loaded page by page as items come in. Results keep
/// the server's order.
///
/// # Errors
/// Transport failures propagate unchanged. A page claiming more results
/// without a usable continuation offset is `MailError::MalformedPage`, and
/// running past `options.max_pages` is `MailError::PageLimitExceeded`.
pub fn search_all(
    transport: &dyn MailTransport,
    folder: &FolderId,
    filter: &FilterNode,
    options: &SearchOptions,
) -> Result<Vec<RawMessage>> {
    search_all_with_stats(transport, folder, filter, options).map(|(items, _)| items)
}

/// Like [`search_all`], also reporting how many pages were fetched
pub fn search_all_with_stats(
    transport: &dyn MailTransport,
    folder: &FolderId,
    filter: &FilterNode,
    options: &SearchOptions,
) -> Result<(Vec<RawMessage>, SearchStats)> {
    if options.page_size == 0 {
        return Err(MailError::InvalidConfig("page size must be positive".to_string()));
    }

    let mut view = ItemView::new(options.page_size, options.sort);
    let mut results = Vec::new();
    let mut stats = SearchStats::default();

    loop {
        if stats.pages_fetched >= options.max_pages {
            return Err(MailError::PageLimitExceeded {
                max_pages: options.max_pages,
            });
        }

        let page = transport.find_items(folder, filter, &view)?;
        stats.pages_fetched += 1;

        debug!(
            "[SEARCH] {} page {} offset {}: {} items, more={}",
            folder,
            stats.pages_fetched,
            view.offset,
            page.items.len(),
            page.more_available
        );

        if !page.items.is_empty() {
            let ids: Vec<MessageId> = page.items.iter().map(|m| m.id.clone()).collect();
            results.extend(transport.load_full_properties(&ids)?);
        }

        if !page.more_available {
            break;
        }

        let next = page.next_offset.ok_or_else(|| {
            MailError::MalformedPage("more results reported without a next offset".to_string())
        })?;
        if next <= view.offset {
            return Err(MailError::MalformedPage(format!(
                "next offset {} does not advance past {}",
                next, view.offset
            )));
        }
        view.offset = next;
    }

    stats.items_found = results.len();
    Ok((results, stats))
}

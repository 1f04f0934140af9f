//! Mailbox search
//!
//! - `filter`: protocol-neutral boolean filter tree
//! - `builder`: search parameters to filter tree
//! - `executor`: sequential page-by-page retrieval

mod builder;
mod executor;
mod filter;

pub use builder::{SearchCriteria, SenderMatch, SubjectMatch, build_filter};
pub use executor::{
    DEFAULT_MAX_PAGES, DEFAULT_PAGE_SIZE, SearchOptions, SearchStats, search_all, search_all_with_stats,
};
pub use filter::{ComparisonMode, ContainmentMode, Field, FilterNode, FilterValue, Operator};

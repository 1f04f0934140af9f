//! Translation of search parameters into a filter tree

use chrono::{DateTime, Utc};

use super::filter::{ComparisonMode, ContainmentMode, Field, FilterNode};
use crate::error::{MailError, Result};

/// Sender constraint of a search
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SenderMatch {
    /// Matched against both the sender and the last modifier
    pub address: String,
    /// Select messages NOT from this sender instead
    pub exclude: bool,
}

/// Subject constraint of a search
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SubjectMatch {
    /// Any of these substrings must occur in the subject (case-insensitive)
    pub substrings: Vec<String>,
    /// Own mailbox address; mail sent from it is never returned
    pub exclude_from: String,
}

/// Parameters of a mailbox search
///
/// The received-time lower bound is mandatory and always combined with AND
/// against every other constraint.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SearchCriteria {
    pub received_after: DateTime<Utc>,
    pub sender: Option<SenderMatch>,
    pub unread_only: bool,
    pub subject: Option<SubjectMatch>,
}

impl SearchCriteria {
    /// Messages received strictly after `received_after`
    pub fn since(received_after: DateTime<Utc>) -> Self {
        Self {
            received_after,
            sender: None,
            unread_only: false,
            subject: None,
        }
    }

    /// Only messages from (or last modified by) `address`
    pub fn from_sender(mut self, address: impl Into<String>) -> Self {
        self.sender = Some(SenderMatch {
            address: address.into(),
            exclude: false,
        });
        self
    }

    /// Only messages NOT from (nor last modified by) `address`
    pub fn excluding_sender(mut self, address: impl Into<String>) -> Self {
        self.sender = Some(SenderMatch {
            address: address.into(),
            exclude: true,
        });
        self
    }

    pub fn unread_only(mut self, unread_only: bool) -> Self {
        self.unread_only = unread_only;
        self
    }

    /// Subjects containing any of `substrings`, excluding mail sent by `mailbox`
    pub fn subject_contains<I, S>(mut self, substrings: I, mailbox: impl Into<String>) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.subject = Some(SubjectMatch {
            substrings: substrings.into_iter().map(Into::into).collect(),
            exclude_from: mailbox.into(),
        });
        self
    }
}

/// `from == address OR last_modified_by == address`
fn sender_clause(address: &str) -> FilterNode {
    FilterNode::or(vec![
        FilterNode::equals(Field::From, address),
        FilterNode::equals(Field::LastModifiedBy, address),
    ])
}

/// Build the server-side filter for `criteria`
///
/// The root is always an `And` whose first child is the received-time bound.
///
/// # Errors
/// `MailError::EmptySubjectFilter` when a subject constraint has no
/// substrings; such a search could never match anything.
pub fn build_filter(criteria: &SearchCriteria) -> Result<FilterNode> {
    let mut clauses = vec![FilterNode::greater_than(
        Field::ReceivedTime,
        criteria.received_after,
    )];

    if let Some(sender) = &criteria.sender {
        let clause = sender_clause(&sender.address);
        clauses.push(if sender.exclude {
            FilterNode::not(clause)
        } else {
            clause
        });
    }

    if criteria.unread_only {
        clauses.push(FilterNode::equals(Field::IsRead, false));
    }

    if let Some(subject) = &criteria.subject {
        if subject.substrings.is_empty() {
            return Err(MailError::EmptySubjectFilter);
        }
        clauses.push(FilterNode::or(
            subject
                .substrings
                .iter()
                .map(|s| {
                    FilterNode::contains(
                        Field::Subject,
                        s.as_str(),
                        ContainmentMode::Substring,
                        ComparisonMode::IgnoreCaseAndNonSpacing,
                    )
                })
                .collect(),
        ));
        clauses.push(FilterNode::not_equals(Field::From, subject.exclude_from.as_str()));
    }

    Ok(FilterNode::and(clauses))
}

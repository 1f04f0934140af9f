//! Boolean search filter tree
//!
//! Filters are evaluated by the server. The tree stays protocol-neutral here;
//! each transport serializes it to its own query language at the boundary.
//! [`FilterNode::matches`] evaluates a tree locally, which is what the
//! in-memory transport uses.

use chrono::{DateTime, SecondsFormat, Utc};
use std::fmt;

use crate::transport::RawMessage;

/// Message properties a filter can test
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Field {
    ReceivedTime,
    /// Sender address (or display name)
    From,
    /// Display name of whoever last modified the item
    LastModifiedBy,
    Subject,
    IsRead,
    /// Folder display name, used for child-folder lookups
    DisplayName,
}

impl Field {
    pub fn as_str(&self) -> &'static str {
        match self {
            Field::ReceivedTime => "received",
            Field::From => "from",
            Field::LastModifiedBy => "last_modified_by",
            Field::Subject => "subject",
            Field::IsRead => "is_read",
            Field::DisplayName => "display_name",
        }
    }
}

/// Where a substring has to occur
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContainmentMode {
    Substring,
    Prefixed,
    FullString,
}

/// How text is compared in a substring match
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ComparisonMode {
    Exact,
    IgnoreCase,
    /// Case-insensitive and ignoring diacritics where the server supports it
    IgnoreCaseAndNonSpacing,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operator {
    Equals,
    NotEquals,
    GreaterThan,
    ContainsSubstring(ContainmentMode, ComparisonMode),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FilterValue {
    Text(String),
    Bool(bool),
    Time(DateTime<Utc>),
}

impl From<&str> for FilterValue {
    fn from(s: &str) -> Self {
        FilterValue::Text(s.to_string())
    }
}

impl From<String> for FilterValue {
    fn from(s: String) -> Self {
        FilterValue::Text(s)
    }
}

impl From<bool> for FilterValue {
    fn from(b: bool) -> Self {
        FilterValue::Bool(b)
    }
}

impl From<DateTime<Utc>> for FilterValue {
    fn from(t: DateTime<Utc>) -> Self {
        FilterValue::Time(t)
    }
}

impl fmt::Display for FilterValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FilterValue::Text(s) => write!(f, "'{}'", s),
            FilterValue::Bool(b) => write!(f, "{}", b),
            FilterValue::Time(t) => f.write_str(&t.to_rfc3339_opts(SecondsFormat::AutoSi, true)),
        }
    }
}

/// A node of the filter tree
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FilterNode {
    Leaf {
        field: Field,
        op: Operator,
        value: FilterValue,
    },
    And(Vec<FilterNode>),
    /// An empty `Or` matches nothing
    Or(Vec<FilterNode>),
    Not(Box<FilterNode>),
}

impl FilterNode {
    pub fn leaf(field: Field, op: Operator, value: impl Into<FilterValue>) -> Self {
        FilterNode::Leaf {
            field,
            op,
            value: value.into(),
        }
    }

    pub fn equals(field: Field, value: impl Into<FilterValue>) -> Self {
        Self::leaf(field, Operator::Equals, value)
    }

    pub fn not_equals(field: Field, value: impl Into<FilterValue>) -> Self {
        Self::leaf(field, Operator::NotEquals, value)
    }

    pub fn greater_than(field: Field, value: impl Into<FilterValue>) -> Self {
        Self::leaf(field, Operator::GreaterThan, value)
    }

    pub fn contains(
        field: Field,
        value: impl Into<FilterValue>,
        containment: ContainmentMode,
        comparison: ComparisonMode,
    ) -> Self {
        Self::leaf(field, Operator::ContainsSubstring(containment, comparison), value)
    }

    pub fn and(children: Vec<FilterNode>) -> Self {
        FilterNode::And(children)
    }

    pub fn or(children: Vec<FilterNode>) -> Self {
        FilterNode::Or(children)
    }

    #[allow(clippy::should_implement_trait)]
    pub fn not(child: FilterNode) -> Self {
        FilterNode::Not(Box::new(child))
    }

    /// Child nodes of a composite, empty for leaves
    pub fn children(&self) -> &[FilterNode] {
        match self {
            FilterNode::And(children) | FilterNode::Or(children) => children,
            FilterNode::Not(child) => std::slice::from_ref(child.as_ref()),
            FilterNode::Leaf { .. } => &[],
        }
    }

    /// Evaluate the filter against a message record
    pub fn matches(&self, message: &RawMessage) -> bool {
        match self {
            FilterNode::Leaf { field, op, value } => leaf_matches(*field, *op, value, message),
            FilterNode::And(children) => children.iter().all(|c| c.matches(message)),
            FilterNode::Or(children) => children.iter().any(|c| c.matches(message)),
            FilterNode::Not(child) => !child.matches(message),
        }
    }
}

impl fmt::Display for FilterNode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fn join(f: &mut fmt::Formatter<'_>, name: &str, children: &[FilterNode]) -> fmt::Result {
            write!(f, "{}(", name)?;
            for (i, child) in children.iter().enumerate() {
                if i > 0 {
                    f.write_str(", ")?;
                }
                write!(f, "{}", child)?;
            }
            f.write_str(")")
        }

        match self {
            FilterNode::Leaf { field, op, value } => {
                let op = match op {
                    Operator::Equals => "==",
                    Operator::NotEquals => "!=",
                    Operator::GreaterThan => ">",
                    Operator::ContainsSubstring(..) => "~",
                };
                write!(f, "{} {} {}", field.as_str(), op, value)
            }
            FilterNode::And(children) => join(f, "and", children),
            FilterNode::Or(children) => join(f, "or", children),
            FilterNode::Not(child) => write!(f, "not({})", child),
        }
    }
}

/// Property values a message exposes for one field
enum Actual<'a> {
    Time(DateTime<Utc>),
    Bool(bool),
    /// A field may expose several spellings (address and display name)
    Text(Vec<&'a str>),
}

fn actual_value(field: Field, message: &RawMessage) -> Option<Actual<'_>> {
    match field {
        Field::ReceivedTime => Some(Actual::Time(message.received_at)),
        Field::IsRead => Some(Actual::Bool(message.is_read)),
        Field::Subject => Some(Actual::Text(vec![message.subject.as_str()])),
        Field::From => {
            let from = message.from.as_ref()?;
            let mut texts = vec![from.address.as_str()];
            texts.extend(from.name.as_deref());
            Some(Actual::Text(texts))
        }
        Field::LastModifiedBy => message
            .last_modified_name
            .as_deref()
            .map(|name| Actual::Text(vec![name])),
        Field::DisplayName => None,
    }
}

fn text_eq(a: &str, b: &str) -> bool {
    a.to_lowercase() == b.to_lowercase()
}

fn text_contains(haystack: &str, needle: &str, containment: ContainmentMode, comparison: ComparisonMode) -> bool {
    let (haystack, needle) = match comparison {
        ComparisonMode::Exact => (haystack.to_string(), needle.to_string()),
        ComparisonMode::IgnoreCase | ComparisonMode::IgnoreCaseAndNonSpacing => {
            (haystack.to_lowercase(), needle.to_lowercase())
        }
    };
    match containment {
        ContainmentMode::Substring => haystack.contains(&needle),
        ContainmentMode::Prefixed => haystack.starts_with(&needle),
        ContainmentMode::FullString => haystack == needle,
    }
}

fn leaf_matches(field: Field, op: Operator, value: &FilterValue, message: &RawMessage) -> bool {
    let Some(actual) = actual_value(field, message) else {
        // An absent property only satisfies "not equal"
        return op == Operator::NotEquals;
    };

    match (actual, value) {
        (Actual::Time(t), FilterValue::Time(v)) => match op {
            Operator::Equals => t == *v,
            Operator::NotEquals => t != *v,
            Operator::GreaterThan => t > *v,
            Operator::ContainsSubstring(..) => false,
        },
        (Actual::Bool(b), FilterValue::Bool(v)) => match op {
            Operator::Equals => b == *v,
            Operator::NotEquals => b != *v,
            _ => false,
        },
        (Actual::Text(texts), FilterValue::Text(v)) => match op {
            Operator::Equals => texts.iter().any(|t| text_eq(t, v)),
            Operator::NotEquals => !texts.iter().any(|t| text_eq(t, v)),
            Operator::GreaterThan => texts
                .first()
                .is_some_and(|t| t.to_lowercase() > v.to_lowercase()),
            Operator::ContainsSubstring(containment, comparison) => texts
                .iter()
                .any(|t| text_contains(t, v, containment, comparison)),
        },
        _ => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{EmailAddress, MessageId};
    use chrono::TimeZone;

    fn message() -> RawMessage {
        RawMessage::builder(MessageId::new("m1"))
            .from(EmailAddress::with_name("Billing Team", "billing@vendor.com"))
            .last_modified_name("Billing Team")
            .subject("Invoice Nº 42 available")
            .received_at(Utc.with_ymd_and_hms(2024, 3, 10, 8, 0, 0).unwrap())
            .build()
    }

    #[test]
    fn test_time_comparison() {
        let msg = message();
        let before = Utc.with_ymd_and_hms(2024, 3, 1, 0, 0, 0).unwrap();
        let after = Utc.with_ymd_and_hms(2024, 4, 1, 0, 0, 0).unwrap();

        assert!(FilterNode::greater_than(Field::ReceivedTime, before).matches(&msg));
        assert!(!FilterNode::greater_than(Field::ReceivedTime, after).matches(&msg));
    }

    #[test]
    fn test_from_matches_address_or_name() {
        let msg = message();
        assert!(FilterNode::equals(Field::From, "BILLING@vendor.com").matches(&msg));
        assert!(FilterNode::equals(Field::From, "billing team").matches(&msg));
        assert!(FilterNode::not_equals(Field::From, "ops@example.com").matches(&msg));
        assert!(!FilterNode::not_equals(Field::From, "billing@vendor.com").matches(&msg));
    }

    #[test]
    fn test_contains_modes() {
        let msg = message();
        let ci = |s: &str, mode| {
            FilterNode::contains(Field::Subject, s, mode, ComparisonMode::IgnoreCase).matches(&msg)
        };
        assert!(ci("invoice", ContainmentMode::Substring));
        assert!(ci("INVOICE nº", ContainmentMode::Prefixed));
        assert!(!ci("available", ContainmentMode::Prefixed));
        assert!(!ci("invoice", ContainmentMode::FullString));

        let exact = FilterNode::contains(
            Field::Subject,
            "invoice",
            ContainmentMode::Substring,
            ComparisonMode::Exact,
        );
        assert!(!exact.matches(&msg));
    }

    #[test]
    fn test_composites() {
        let msg = message();
        assert!(FilterNode::and(vec![]).matches(&msg));
        assert!(!FilterNode::or(vec![]).matches(&msg));
        assert!(!FilterNode::not(FilterNode::equals(Field::IsRead, false)).matches(&msg));
        assert!(
            FilterNode::or(vec![
                FilterNode::equals(Field::Subject, "nope"),
                FilterNode::equals(Field::IsRead, false),
            ])
            .matches(&msg)
        );
    }

    #[test]
    fn test_missing_property() {
        let msg = RawMessage::builder(MessageId::new("m2")).build();
        assert!(!FilterNode::equals(Field::From, "x@example.com").matches(&msg));
        assert!(FilterNode::not_equals(Field::From, "x@example.com").matches(&msg));
    }

    #[test]
    fn test_display() {
        let filter = FilterNode::and(vec![
            FilterNode::equals(Field::IsRead, false),
            FilterNode::not(FilterNode::equals(Field::From, "a@b.c")),
        ]);
        assert_eq!(filter.to_string(), "and(is_read == false, not(from == 'a@b.c'))");
    }
}

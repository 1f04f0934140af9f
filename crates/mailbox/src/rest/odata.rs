//! Filter tree to OData `$filter` expressions

use chrono::SecondsFormat;

use crate::search::{ContainmentMode, Field, FilterNode, FilterValue, Operator};

/// Property path addressed by a filter field
pub fn property(field: Field) -> &'static str {
    match field {
        Field::ReceivedTime => "receivedDateTime",
        Field::From => "from/emailAddress/address",
        // The server exposes no last-modifier; the sending account is the
        // closest property and equals the mailbox for self-sent mail.
        Field::LastModifiedBy => "sender/emailAddress/address",
        Field::Subject => "subject",
        Field::IsRead => "isRead",
        Field::DisplayName => "displayName",
    }
}

/// Whether `filter` matches everything and can be left out of a request
pub fn is_unrestricted(filter: &FilterNode) -> bool {
    matches!(filter, FilterNode::And(children) if children.is_empty())
}

/// Render `filter` as an OData `$filter` expression
///
/// Composites are parenthesized; an empty `Or` renders as `false` and an
/// empty `And` as `true`. Comparison modes are not expressible and the
/// server's default (case-insensitive) applies.
pub fn to_filter(filter: &FilterNode) -> String {
    match filter {
        FilterNode::Leaf { field, op, value } => leaf(*field, *op, value),
        FilterNode::And(children) => join(children, "and", "true"),
        FilterNode::Or(children) => join(children, "or", "false"),
        FilterNode::Not(child) => {
            let inner = to_filter(child);
            if child.children().len() > 1 {
                format!("not {}", inner)
            } else {
                format!("not ({})", inner)
            }
        }
    }
}

fn join(children: &[FilterNode], op: &str, empty: &str) -> String {
    match children {
        [] => empty.to_string(),
        [only] => to_filter(only),
        _ => {
            let parts: Vec<String> = children.iter().map(to_filter).collect();
            format!("({})", parts.join(&format!(" {} ", op)))
        }
    }
}

fn leaf(field: Field, op: Operator, value: &FilterValue) -> String {
    let property = property(field);
    let literal = literal(value);
    match op {
        Operator::Equals => format!("{} eq {}", property, literal),
        Operator::NotEquals => format!("{} ne {}", property, literal),
        Operator::GreaterThan => format!("{} gt {}", property, literal),
        Operator::ContainsSubstring(ContainmentMode::Substring, _) => {
            format!("contains({}, {})", property, literal)
        }
        Operator::ContainsSubstring(ContainmentMode::Prefixed, _) => {
            format!("startswith({}, {})", property, literal)
        }
        Operator::ContainsSubstring(ContainmentMode::FullString, _) => {
            format!("{} eq {}", property, literal)
        }
    }
}

/// OData literal; strings are single-quoted with quotes doubled
pub fn literal(value: &FilterValue) -> String {
    match value {
        FilterValue::Text(s) => quote(s),
        FilterValue::Bool(b) => b.to_string(),
        FilterValue::Time(t) => t.to_rfc3339_opts(SecondsFormat::AutoSi, true),
    }
}

pub fn quote(s: &str) -> String {
    format!("'{}'", s.replace('\'', "''"))
}

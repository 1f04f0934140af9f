//! REST transport
//!
//! This module provides:
//! - JSON client for an OData-style mail REST API
//! - `$filter` rendering of filter trees
//! - Response normalization to transport records

mod client;
mod normalize;
pub mod odata;

pub use client::RestTransport;
pub use normalize::{draft_body, normalize_message};

/// REST API request and response types
pub mod api {
    use serde::{Deserialize, Serialize};
    use std::collections::HashMap;

    /// A page of a collection response
    #[derive(Debug, Deserialize)]
    pub struct Collection<T> {
        pub value: Vec<T>,
        /// Present when more results follow
        #[serde(rename = "@odata.nextLink")]
        pub next_link: Option<String>,
    }

    #[derive(Debug, Deserialize)]
    #[serde(rename_all = "camelCase")]
    pub struct MailFolder {
        pub id: String,
        pub display_name: String,
    }

    #[derive(Debug, Clone, Serialize, Deserialize)]
    #[serde(rename_all = "camelCase")]
    pub struct Recipient {
        pub email_address: EmailAddress,
    }

    #[derive(Debug, Clone, Serialize, Deserialize)]
    pub struct EmailAddress {
        #[serde(skip_serializing_if = "Option::is_none")]
        pub name: Option<String>,
        pub address: Option<String>,
    }

    #[derive(Debug, Clone, Serialize, Deserialize)]
    #[serde(rename_all = "camelCase")]
    pub struct ItemBody {
        pub content_type: String,
        pub content: String,
    }

    /// Message resource; which fields are present depends on `$select`
    #[derive(Debug, Deserialize)]
    #[serde(rename_all = "camelCase")]
    pub struct Message {
        pub id: String,
        pub subject: Option<String>,
        pub body: Option<ItemBody>,
        pub from: Option<Recipient>,
        pub sender: Option<Recipient>,
        pub conversation_id: Option<String>,
        pub sent_date_time: Option<String>,
        pub received_date_time: Option<String>,
        pub is_read: Option<bool>,
        pub has_attachments: Option<bool>,
        #[serde(default)]
        pub attachments: Vec<Attachment>,
    }

    /// Attachment resource; `content_bytes` is base64 and only present
    /// when requested
    #[derive(Debug, Deserialize)]
    #[serde(rename_all = "camelCase")]
    pub struct Attachment {
        pub id: String,
        pub name: Option<String>,
        pub content_type: Option<String>,
        pub content_id: Option<String>,
        pub content_bytes: Option<String>,
    }

    /// Body of a draft creation request
    #[derive(Debug, Serialize)]
    #[serde(rename_all = "camelCase")]
    pub struct NewMessage {
        pub subject: String,
        pub body: ItemBody,
        pub to_recipients: Vec<Recipient>,
        pub cc_recipients: Vec<Recipient>,
        pub bcc_recipients: Vec<Recipient>,
        pub importance: String,
        pub attachments: Vec<NewAttachment>,
    }

    #[derive(Debug, Serialize)]
    #[serde(rename_all = "camelCase")]
    pub struct NewAttachment {
        #[serde(rename = "@odata.type")]
        pub odata_type: String,
        pub name: String,
        pub content_bytes: String,
    }

    #[derive(Debug, Serialize)]
    #[serde(rename_all = "camelCase")]
    pub struct ReadStateUpdate {
        pub is_read: bool,
    }

    #[derive(Debug, Serialize)]
    #[serde(rename_all = "camelCase")]
    pub struct MoveRequest {
        pub destination_id: String,
    }

    /// JSON batch of sub-requests sent as one HTTP request
    #[derive(Debug, Serialize)]
    pub struct BatchRequest {
        pub requests: Vec<BatchRequestItem>,
    }

    #[derive(Debug, Serialize)]
    pub struct BatchRequestItem {
        pub id: String,
        pub method: String,
        /// Relative to the API root, starting with `/`
        pub url: String,
        pub headers: HashMap<String, String>,
        pub body: serde_json::Value,
    }

    #[derive(Debug, Deserialize)]
    pub struct BatchResponse {
        pub responses: Vec<BatchResponseItem>,
    }

    #[derive(Debug, Deserialize)]
    pub struct BatchResponseItem {
        pub id: String,
        pub status: u16,
        pub body: Option<serde_json::Value>,
    }
}

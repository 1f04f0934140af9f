//! REST API HTTP client
//!
//! Implements [`MailTransport`] over an OData-style JSON mail API.
//! Uses synchronous HTTP (ureq) to be executor-agnostic.

use anyhow::{Context, Result, bail};
use log::debug;
use serde::Serialize;
use serde::de::DeserializeOwned;
use std::collections::HashMap;
use ureq::Agent;

use super::api::{
    self, BatchRequest, BatchRequestItem, BatchResponse, Collection, MailFolder, MoveRequest, ReadStateUpdate,
};
use super::normalize::{decode_content, draft_body, normalize_message};
use super::odata::{is_unrestricted, property, quote, to_filter};
use crate::config::RestConfig;
use crate::folders::FolderLookup;
use crate::models::{AttachmentContent, AttachmentId, FolderEntry, FolderId, MessageId, OutgoingMessage};
use crate::search::{Field, FilterNode};
use crate::transport::{BoundItem, ItemView, MailTransport, Page, RawMessage, SortDirection};

/// Properties selected for search result pages
const SUMMARY_FIELDS: &str =
    "id,subject,from,sender,conversationId,sentDateTime,receivedDateTime,isRead,hasAttachments";

/// Attachment metadata expanded when loading full properties (no content)
const ATTACHMENT_EXPAND: &str = "attachments($select=id,name,contentType,contentId)";

/// Largest number of sub-requests the server accepts in one batch
const BATCH_LIMIT: usize = 20;

/// Upper bound on child folders returned for one display name
const CHILD_FOLDER_LIMIT: usize = 100;

/// Mail transport speaking the REST API
///
/// Well-known folders are addressed through their mailbox
/// (`users/{mailbox}/mailFolders/{name}`). Folder and message IDs are
/// addressed through the configured principal.
pub struct RestTransport {
    agent: Agent,
    base_url: String,
    access_token: String,
    principal: String,
}

/// Percent-encode one path segment or query value
fn encode(s: &str) -> String {
    urlencoding::encode(s).into_owned()
}

fn query(params: &[(&str, String)]) -> String {
    params
        .iter()
        .map(|(k, v)| format!("{}={}", k, encode(v)))
        .collect::<Vec<_>>()
        .join("&")
}

/// Bound item keyed by the requested ID, whatever form the server echoes
fn bound_item(requested: &MessageId, message: &api::Message) -> BoundItem {
    BoundItem {
        id: requested.clone(),
        is_read: message.is_read.unwrap_or(false),
    }
}

impl RestTransport {
    /// Create a transport from validated settings
    ///
    /// No request is made until the first call.
    pub fn new(config: &RestConfig) -> Result<Self> {
        config.validate()?;

        let agent: Agent = Agent::config_builder()
            .timeout_global(Some(config.timeout()))
            .build()
            .into();

        Ok(Self {
            agent,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            access_token: config.access_token.clone(),
            principal: config.principal.trim().to_string(),
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}/{}", self.base_url, path)
    }

    fn authorization(&self) -> String {
        format!("Bearer {}", self.access_token)
    }

    fn principal_path(&self) -> String {
        if self.principal.eq_ignore_ascii_case("me") {
            "me".to_string()
        } else {
            format!("users/{}", encode(&self.principal))
        }
    }

    /// Path of a folder relative to the API root
    fn folder_path(&self, folder: &FolderId) -> String {
        match folder {
            FolderId::WellKnown { folder, mailbox } => {
                format!("users/{}/mailFolders/{}", encode(mailbox), folder.as_str())
            }
            FolderId::Id(id) => format!("{}/mailFolders/{}", self.principal_path(), encode(id)),
        }
    }

    fn message_path(&self, id: &MessageId) -> String {
        format!("{}/messages/{}", self.principal_path(), encode(id.as_str()))
    }

    /// Value the server accepts as a move destination
    fn destination_id(folder: &FolderId) -> String {
        match folder {
            FolderId::WellKnown { folder, .. } => folder.as_str().to_string(),
            FolderId::Id(id) => id.clone(),
        }
    }

    fn get_json<T: DeserializeOwned>(&self, url: &str) -> Result<T> {
        debug!("[REST] GET {}", url);
        let mut response = self
            .agent
            .get(url)
            .header("Authorization", &self.authorization())
            .call()
            .with_context(|| format!("GET {} failed", url))?;

        response
            .body_mut()
            .read_json()
            .with_context(|| format!("Failed to parse response of GET {}", url))
    }

    /// Like `get_json`, but a 404 yields `None`
    fn get_json_opt<T: DeserializeOwned>(&self, url: &str) -> Result<Option<T>> {
        debug!("[REST] GET {}", url);
        let response = self
            .agent
            .get(url)
            .header("Authorization", &self.authorization())
            .call();

        match response {
            Ok(mut resp) => {
                let value = resp
                    .body_mut()
                    .read_json()
                    .with_context(|| format!("Failed to parse response of GET {}", url))?;
                Ok(Some(value))
            }
            Err(ureq::Error::StatusCode(404)) => Ok(None),
            Err(e) => Err(anyhow::anyhow!("GET {} failed: {}", url, e)),
        }
    }

    fn post_json<B: Serialize, T: DeserializeOwned>(&self, url: &str, body: &B) -> Result<T> {
        debug!("[REST] POST {}", url);
        let mut response = self
            .agent
            .post(url)
            .header("Authorization", &self.authorization())
            .send_json(body)
            .with_context(|| format!("POST {} failed", url))?;

        response
            .body_mut()
            .read_json()
            .with_context(|| format!("Failed to parse response of POST {}", url))
    }

    fn post_empty(&self, url: &str) -> Result<()> {
        debug!("[REST] POST {}", url);
        self.agent
            .post(url)
            .header("Authorization", &self.authorization())
            .send_empty()
            .with_context(|| format!("POST {} failed", url))?;
        Ok(())
    }

    fn patch_json<B: Serialize>(&self, url: &str, body: &B) -> Result<()> {
        debug!("[REST] PATCH {}", url);
        self.agent
            .patch(url)
            .header("Authorization", &self.authorization())
            .send_json(body)
            .with_context(|| format!("PATCH {} failed", url))?;
        Ok(())
    }

    fn load_message(&self, id: &MessageId) -> Result<RawMessage> {
        let url = format!(
            "{}?{}",
            self.url(&self.message_path(id)),
            query(&[("$expand", ATTACHMENT_EXPAND.to_string())])
        );
        let message: api::Message = self.get_json(&url)?;
        normalize_message(message)
    }

    /// Move one chunk of items with a single batch request
    fn move_chunk(&self, ids: &[MessageId], destination_id: &str) -> Result<()> {
        let headers = HashMap::from([("Content-Type".to_string(), "application/json".to_string())]);
        let requests = ids
            .iter()
            .enumerate()
            .map(|(i, id)| -> Result<BatchRequestItem> {
                Ok(BatchRequestItem {
                    id: i.to_string(),
                    method: "POST".to_string(),
                    url: format!("/{}/move", self.message_path(id)),
                    headers: headers.clone(),
                    body: serde_json::to_value(MoveRequest {
                        destination_id: destination_id.to_string(),
                    })?,
                })
            })
            .collect::<Result<Vec<_>>>()?;

        let response: BatchResponse = self.post_json(&self.url("$batch"), &BatchRequest { requests })?;

        let failed: Vec<String> = response
            .responses
            .iter()
            .filter(|r| !(200..300).contains(&r.status))
            .map(|r| {
                let id = r
                    .id
                    .parse::<usize>()
                    .ok()
                    .and_then(|i| ids.get(i))
                    .map(|id| id.as_str().to_string())
                    .unwrap_or_else(|| r.id.clone());
                format!("{} (HTTP {})", id, r.status)
            })
            .collect();
        if !failed.is_empty() {
            bail!("Failed to move {} of {} items: {}", failed.len(), ids.len(), failed.join(", "));
        }
        Ok(())
    }
}

impl FolderLookup for RestTransport {
    fn find_child_folders(&self, parent: &FolderId, name: &str) -> Result<Vec<FolderEntry>> {
        let url = format!(
            "{}/childFolders?{}",
            self.url(&self.folder_path(parent)),
            query(&[
                ("$filter", format!("displayName eq {}", quote(name))),
                ("$top", CHILD_FOLDER_LIMIT.to_string()),
            ])
        );
        let folders: Collection<MailFolder> = self
            .get_json(&url)
            .with_context(|| format!("Failed to list child folders of {}", parent))?;

        Ok(folders
            .value
            .into_iter()
            .map(|f| FolderEntry::new(FolderId::new(f.id), f.display_name))
            .collect())
    }
}

impl MailTransport for RestTransport {
    fn find_items(&self, folder: &FolderId, filter: &FilterNode, view: &ItemView) -> Result<Page> {
        let direction = match view.sort.direction {
            SortDirection::Ascending => "asc",
            SortDirection::Descending => "desc",
        };
        let mut params = vec![
            ("$select", SUMMARY_FIELDS.to_string()),
            ("$orderby", format!("{} {}", property(view.sort.field), direction)),
            ("$top", view.page_size.to_string()),
            ("$skip", view.offset.to_string()),
        ];
        if !is_unrestricted(filter) {
            params.push(("$filter", to_filter(filter)));
        }
        let url = format!("{}/messages?{}", self.url(&self.folder_path(folder)), query(&params));

        let page: Collection<api::Message> = self
            .get_json(&url)
            .with_context(|| format!("Failed to search {}", folder))?;
        let more_available = page.next_link.is_some();
        let items = page
            .value
            .into_iter()
            .map(normalize_message)
            .collect::<Result<Vec<_>>>()?;

        Ok(Page {
            next_offset: more_available.then(|| view.offset + items.len()),
            more_available,
            items,
        })
    }

    fn load_full_properties(&self, ids: &[MessageId]) -> Result<Vec<RawMessage>> {
        ids.iter()
            .map(|id| {
                self.load_message(id)
                    .with_context(|| format!("Failed to load message {}", id.as_str()))
            })
            .collect()
    }

    fn bind_items(&self, ids: &[MessageId], fields: &[Field]) -> Result<Vec<BoundItem>> {
        let mut select = vec!["id"];
        select.extend(fields.iter().map(|f| property(*f)));
        let select = select.join(",");

        let mut bound = Vec::with_capacity(ids.len());
        for id in ids {
            let url = format!(
                "{}?{}",
                self.url(&self.message_path(id)),
                query(&[("$select", select.clone())])
            );
            match self.get_json_opt::<api::Message>(&url)? {
                Some(message) => bound.push(bound_item(id, &message)),
                None => debug!("[REST] Message {} no longer exists", id.as_str()),
            }
        }
        Ok(bound)
    }

    fn update_read_state(&self, id: &MessageId, is_read: bool) -> Result<()> {
        self.patch_json(&self.url(&self.message_path(id)), &ReadStateUpdate { is_read })
    }

    fn move_items(&self, ids: &[MessageId], target: &FolderId) -> Result<()> {
        let destination_id = Self::destination_id(target);
        for chunk in ids.chunks(BATCH_LIMIT) {
            self.move_chunk(chunk, &destination_id)?;
        }
        Ok(())
    }

    fn save_draft(
        &self,
        message: &OutgoingMessage,
        attachments: &[AttachmentContent],
        folder: &FolderId,
    ) -> Result<MessageId> {
        let url = format!("{}/messages", self.url(&self.folder_path(folder)));
        let created: api::Message = self
            .post_json(&url, &draft_body(message, attachments))
            .context("Failed to save draft")?;
        Ok(MessageId::new(created.id))
    }

    fn send_and_save_copy(&self, draft: &MessageId, folder: &FolderId) -> Result<()> {
        // Sending keeps a copy in the Sent Items of the mailbox that owns
        // the draft, so only the mailbox of `folder` matters here.
        let owner = match folder {
            FolderId::WellKnown { mailbox, .. } => format!("users/{}", encode(mailbox)),
            FolderId::Id(_) => self.principal_path(),
        };
        let url = self.url(&format!("{}/messages/{}/send", owner, encode(draft.as_str())));
        self.post_empty(&url).context("Failed to send draft")
    }

    fn fetch_attachment_content(&self, message: &MessageId, attachment: &AttachmentId) -> Result<Vec<u8>> {
        let url = self.url(&format!(
            "{}/attachments/{}",
            self.message_path(message),
            encode(attachment.as_str())
        ));
        let resource: api::Attachment = self.get_json(&url)?;
        decode_content(&resource)
    }
}

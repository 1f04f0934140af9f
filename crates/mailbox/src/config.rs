//! Configuration loading for the mailbox service
//!
//! Settings come from (in order of priority):
//! 1. Environment variables (`MAILBOX_*`)
//! 2. JSON file (~/.config/mailbox/mailbox.json)
//! 3. Built-in defaults

use anyhow::{Context, Result, bail};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

use crate::search::{DEFAULT_MAX_PAGES, DEFAULT_PAGE_SIZE};

/// Config filename in the mailbox config directory
const CONFIG_FILE: &str = "mailbox.json";

/// Search tunables
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServiceConfig {
    /// Items requested per search page
    pub page_size: usize,
    /// Pages after which a search is abandoned
    pub max_pages: usize,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            page_size: DEFAULT_PAGE_SIZE,
            max_pages: DEFAULT_MAX_PAGES,
        }
    }
}

/// Connection settings for the REST transport
///
/// The access token is obtained elsewhere; this crate does not negotiate
/// sessions.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RestConfig {
    /// API root, e.g. `https://mail.example.com/api/v1.0`
    pub base_url: String,
    pub access_token: String,
    /// Principal used for item-level calls (`me` or a mailbox address)
    #[serde(default = "default_principal")]
    pub principal: String,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

fn default_principal() -> String {
    "me".to_string()
}

fn default_timeout_secs() -> u64 {
    300
}

impl std::fmt::Debug for RestConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RestConfig")
            .field("base_url", &self.base_url)
            .field("access_token", &"<redacted>")
            .field("principal", &self.principal)
            .field("timeout_secs", &self.timeout_secs)
            .finish()
    }
}

impl RestConfig {
    pub fn new(base_url: impl Into<String>, access_token: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            access_token: access_token.into(),
            principal: default_principal(),
            timeout_secs: default_timeout_secs(),
        }
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    /// Check the settings are usable
    pub fn validate(&self) -> Result<()> {
        let url = url::Url::parse(&self.base_url)
            .with_context(|| format!("Invalid base URL: {}", self.base_url))?;
        if url.scheme() != "https" && url.scheme() != "http" {
            bail!("Base URL must be http(s): {}", self.base_url);
        }
        if self.access_token.trim().is_empty() {
            bail!("Access token is empty");
        }
        if self.principal.trim().is_empty() {
            bail!("Principal is empty");
        }
        Ok(())
    }
}

/// Everything the config file may hold
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MailboxConfig {
    #[serde(default)]
    pub service: ServiceConfig,
    pub rest: Option<RestConfig>,
}

impl MailboxConfig {
    /// Load from the config directory, then apply environment overrides
    pub fn load() -> Result<Self> {
        let base = config::load_json_opt::<MailboxConfig>(CONFIG_FILE)?.unwrap_or_default();
        base.with_overrides(|key| std::env::var(key).ok())
    }

    /// Load from a specific JSON file, then apply environment overrides
    pub fn from_file(path: &Path) -> Result<Self> {
        let base: MailboxConfig = config::load_json_file(path)?;
        base.with_overrides(|key| std::env::var(key).ok())
    }

    /// Parse a JSON document
    pub fn from_json(json: &str) -> Result<Self> {
        serde_json::from_str(json).context("Failed to parse mailbox config JSON")
    }

    /// Apply `MAILBOX_*` overrides read through `lookup`
    ///
    /// `MAILBOX_BASE_URL` and `MAILBOX_ACCESS_TOKEN` together create the REST
    /// section when the file has none.
    pub fn with_overrides<F>(mut self, lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let non_empty = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        if let Some(page_size) = non_empty("MAILBOX_PAGE_SIZE") {
            self.service.page_size = page_size
                .trim()
                .parse()
                .with_context(|| format!("Invalid MAILBOX_PAGE_SIZE: {}", page_size))?;
        }
        if let Some(max_pages) = non_empty("MAILBOX_MAX_PAGES") {
            self.service.max_pages = max_pages
                .trim()
                .parse()
                .with_context(|| format!("Invalid MAILBOX_MAX_PAGES: {}", max_pages))?;
        }

        let base_url = non_empty("MAILBOX_BASE_URL");
        let token = non_empty("MAILBOX_ACCESS_TOKEN");
        let mut rest = match (self.rest.take(), base_url, token) {
            (Some(mut rest), url, token) => {
                if let Some(url) = url {
                    rest.base_url = url;
                }
                if let Some(token) = token {
                    rest.access_token = token;
                }
                Some(rest)
            }
            (None, Some(url), Some(token)) => Some(RestConfig::new(url, token)),
            (None, _, _) => None,
        };

        if let Some(rest) = rest.as_mut() {
            if let Some(principal) = non_empty("MAILBOX_PRINCIPAL") {
                rest.principal = principal;
            }
            if let Some(timeout) = non_empty("MAILBOX_TIMEOUT_SECS") {
                rest.timeout_secs = timeout
                    .trim()
                    .parse()
                    .with_context(|| format!("Invalid MAILBOX_TIMEOUT_SECS: {}", timeout))?;
            }
        }
        self.rest = rest;

        Ok(self)
    }

    /// The REST section, required for talking to a real server
    pub fn rest(&self) -> Result<&RestConfig> {
        self.rest
            .as_ref()
            .context("No REST endpoint configured (set MAILBOX_BASE_URL and MAILBOX_ACCESS_TOKEN)")
    }
}

//! In-memory webhook registry.
//!
//! Maps a webhook id to its forwarding target and shared secret. The id is
//! derived from `(team, name)`, so registering the same pair twice is
//! rejected rather than overwriting the first record.
//!
//! Ids are `hex(sha1(team ++ name))` with no separator between the fields.
//! `("ab", "c")` and `("a", "bc")` therefore share an id. Existing ids depend
//! on this derivation, so it is kept as is.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use sha1::{Digest, Sha1};
use tokio::sync::RwLock;
use tracing::info;

use crate::error::RelayError;

/// A registered webhook.
#[derive(Clone, PartialEq, Eq)]
pub struct WebhookRecord {
    pub id: String,
    pub name: String,
    pub team: String,
    /// Downstream URL deliveries are forwarded to
    pub url: String,
    /// HMAC key shared with the sender
    pub secret: Vec<u8>,
    pub created_at: DateTime<Utc>,
}

impl fmt::Debug for WebhookRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("WebhookRecord")
            .field("id", &self.id)
            .field("name", &self.name)
            .field("team", &self.team)
            .field("url", &self.url)
            .field("secret", &"<redacted>")
            .field("created_at", &self.created_at)
            .finish()
    }
}

/// Derive the webhook id for a `(team, name)` pair.
pub fn derive_id(team: &str, name: &str) -> String {
    let mut hasher = Sha1::new();
    hasher.update(team.as_bytes());
    hasher.update(name.as_bytes());
    hex::encode(hasher.finalize())
}

/// Shared handle to the webhook registry.
///
/// Clones share the same map. Each operation takes the lock exactly once.
#[derive(Clone, Default)]
pub struct Registry {
    inner: Arc<RwLock<HashMap<String, WebhookRecord>>>,
}

impl Registry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a new webhook, failing if its derived id is taken.
    pub async fn create(
        &self,
        name: &str,
        team: &str,
        url: &str,
        secret: Vec<u8>,
    ) -> Result<WebhookRecord, RelayError> {
        let id = derive_id(team, name);

        let mut webhooks = self.inner.write().await;
        if webhooks.contains_key(&id) {
            info!(webhook_id = %id, team = %team, name = %name, "webhook_already_exists");
            return Err(RelayError::AlreadyExists);
        }

        let record = WebhookRecord {
            id: id.clone(),
            name: name.to_string(),
            team: team.to_string(),
            url: url.to_string(),
            secret,
            created_at: Utc::now(),
        };
        webhooks.insert(id, record.clone());
        drop(webhooks);

        info!(
            webhook_id = %record.id,
            team = %record.team,
            name = %record.name,
            url = %record.url,
            "webhook_created"
        );

        Ok(record)
    }

    pub async fn get(&self, id: &str) -> Option<WebhookRecord> {
        self.inner.read().await.get(id).cloned()
    }

    /// Snapshot of all webhooks, oldest first.
    pub async fn list(&self) -> Vec<WebhookRecord> {
        let mut items: Vec<WebhookRecord> = self.inner.read().await.values().cloned().collect();
        items.sort_by(|a, b| a.created_at.cmp(&b.created_at).then_with(|| a.id.cmp(&b.id)));
        items
    }

    /// Remove a webhook. Removing an unknown id is a no-op.
    pub async fn delete(&self, id: &str) {
        if self.inner.write().await.remove(id).is_some() {
            info!(webhook_id = %id, "webhook_deleted");
        }
    }

    pub async fn lookup(&self, team: &str, name: &str) -> Option<WebhookRecord> {
        self.get(&derive_id(team, name)).await
    }
}

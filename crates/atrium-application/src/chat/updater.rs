//! Chat updater helper for common update patterns.
//!
//! `ChatUpdater` abstracts the "fetch → mutate → update" pattern used by the
//! orchestrator whenever it changes persisted chat state.

use atrium_core::entity::{Chat, Entity, EntityKind};
use atrium_core::error::{AtriumError, Result};
use atrium_core::registry;
use atrium_core::service::DataService;
use serde_json::{Map, Value};
use std::sync::Arc;

/// Helper struct for updating chats with a common pattern.
#[derive(Clone)]
pub struct ChatUpdater {
    service: Arc<dyn DataService>,
}

fn into_chat(raw: &Value) -> Result<Chat> {
    registry::convert(EntityKind::Chat, raw)
        .into_chat()
        .ok_or_else(|| AtriumError::internal("chat converter returned another kind"))
}

/// Top-level keys of `after` whose value differs from `before`.
fn changed_fields(before: &Value, after: &Value) -> Map<String, Value> {
    let Value::Object(after) = after else {
        return Map::new();
    };
    after
        .iter()
        .filter(|(key, value)| before.get(key.as_str()) != Some(*value))
        .map(|(key, value)| (key.clone(), value.clone()))
        .collect()
}

impl ChatUpdater {
    pub fn new(service: Arc<dyn DataService>) -> Self {
        Self { service }
    }

    /// Fetches the chat, applies `updater`, and writes back the top-level
    /// fields it changed.
    ///
    /// Untouched fields are never sent, so data the local model cannot
    /// represent (e.g. a message the converter had to repair) stays as stored.
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - The chat doesn't exist
    /// - The updater function returns an error
    /// - The service rejects the update
    pub async fn update<F>(&self, chat_id: &str, updater: F) -> Result<Chat>
    where
        F: FnOnce(&mut Chat) -> Result<()>,
    {
        tracing::debug!("[ChatUpdater] update() called for chat_id: {}", chat_id);

        let raw = self.service.fetch(EntityKind::Chat, chat_id).await?;
        let mut chat = into_chat(&raw)?;
        let before = Entity::Chat(chat.clone()).to_raw();

        updater(&mut chat)?;

        let changed = changed_fields(&before, &Entity::Chat(chat.clone()).to_raw());
        if changed.is_empty() {
            tracing::debug!("[ChatUpdater] nothing changed for chat_id: {}", chat_id);
            return Ok(chat);
        }

        let stored = self
            .service
            .update(EntityKind::Chat, chat_id, Value::Object(changed))
            .await?;

        tracing::debug!("[ChatUpdater] chat saved: id={}", chat_id);
        into_chat(&stored)
    }

    /// Writes only `fields` to the chat, without reading it first.
    pub async fn patch(&self, chat_id: &str, fields: Map<String, Value>) -> Result<Chat> {
        tracing::debug!(
            "[ChatUpdater] patch() chat_id: {} keys: {:?}",
            chat_id,
            fields.keys().collect::<Vec<_>>()
        );
        let stored = self
            .service
            .update(EntityKind::Chat, chat_id, Value::Object(fields))
            .await?;
        into_chat(&stored)
    }
}

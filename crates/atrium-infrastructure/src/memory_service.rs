//! Process-local implementation of [`DataService`].
//!
//! Keeps raw JSON per collection in insertion order. Ids are UUID v4 and
//! timestamps RFC 3339, assigned the way the remote API assigns them, so the
//! binding layer behaves identically against this store and the real one.

use async_trait::async_trait;
use atrium_core::entity::{Chat, Entity, EntityKind, Message, MessageRole};
use atrium_core::error::{AtriumError, Result};
use atrium_core::registry;
use atrium_core::service::DataService;
use serde_json::{Map, Value};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;
use uuid::Uuid;

/// Produces the assistant reply for a chat.
pub trait ResponseGenerator: Send + Sync {
    /// Returns `None` to decline generating.
    fn reply(&self, chat: &Chat) -> Option<String>;
}

/// Replies by echoing the most recent user message.
#[derive(Debug, Default, Clone, Copy)]
pub struct EchoGenerator;

impl ResponseGenerator for EchoGenerator {
    fn reply(&self, chat: &Chat) -> Option<String> {
        chat.messages
            .iter()
            .rev()
            .find(|m| m.role == MessageRole::User)
            .map(|m| format!("Echo: {}", m.content))
    }
}

pub struct InMemoryDataService {
    collections: RwLock<HashMap<EntityKind, Vec<Value>>>,
    generator: Arc<dyn ResponseGenerator>,
}

impl InMemoryDataService {
    pub fn new() -> Self {
        Self::with_generator(Arc::new(EchoGenerator))
    }

    pub fn with_generator(generator: Arc<dyn ResponseGenerator>) -> Self {
        Self {
            collections: RwLock::new(HashMap::new()),
            generator,
        }
    }

    /// Stores `raw` as-is (keeping its id), for seeding fixtures.
    pub async fn insert(&self, kind: EntityKind, raw: Value) {
        let mut collections = self.collections.write().await;
        collections.entry(kind).or_default().push(raw);
    }

    fn now() -> Value {
        Value::String(chrono::Utc::now().to_rfc3339())
    }

    fn id_of(raw: &Value) -> Option<&str> {
        raw.get("id").and_then(Value::as_str)
    }

    fn stamp_new(raw: &mut Map<String, Value>) {
        raw.insert("id".to_string(), Value::String(Uuid::new_v4().to_string()));
        let now = Self::now();
        raw.insert("created_at".to_string(), now.clone());
        raw.insert("updated_at".to_string(), now);
    }

    fn object(kind: EntityKind, value: Value) -> Result<Map<String, Value>> {
        match value {
            Value::Object(map) => Ok(map),
            other => Err(AtriumError::data_access(format!(
                "{} payload must be an object, got {}",
                kind, other
            ))),
        }
    }

    async fn load_chat(&self, chat_id: &str) -> Result<Chat> {
        let raw = self.fetch(EntityKind::Chat, chat_id).await?;
        registry::convert(EntityKind::Chat, &raw)
            .into_chat()
            .ok_or_else(|| AtriumError::internal("chat converter returned another kind"))
    }

    /// Appends an already stored message to the chat's raw `messages` list.
    ///
    /// Existing entries are carried over verbatim rather than through the
    /// converter, so nothing already stored is rewritten.
    async fn append_to_chat(&self, chat_id: &str, stored: Value) -> Result<Value> {
        let raw = self.fetch(EntityKind::Chat, chat_id).await?;
        let mut messages = match raw.get("messages") {
            Some(Value::Array(items)) => items.clone(),
            _ => Vec::new(),
        };
        messages.push(stored);
        let mut patch = Map::new();
        patch.insert("messages".to_string(), Value::Array(messages));
        self.update(EntityKind::Chat, chat_id, Value::Object(patch)).await
    }

    /// Stores `message` in the messages collection and returns its raw form.
    async fn persist_message(&self, chat_id: &str, message: &Message) -> Result<Value> {
        let mut raw = Self::object(EntityKind::Message, Entity::Message(message.clone()).to_raw())?;
        let created_at = raw.get("created_at").cloned();
        Self::stamp_new(&mut raw);
        if let Some(created_at) = created_at {
            raw.insert("created_at".to_string(), created_at);
        }
        raw.entry("generated_by".to_string())
            .or_insert_with(|| Value::String(chat_id.to_string()));
        let stored = Value::Object(raw);
        self.insert(EntityKind::Message, stored.clone()).await;
        Ok(stored)
    }
}

impl Default for InMemoryDataService {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl DataService for InMemoryDataService {
    async fn fetch_all(&self, kind: EntityKind) -> Result<Vec<Value>> {
        let collections = self.collections.read().await;
        Ok(collections.get(&kind).cloned().unwrap_or_default())
    }

    async fn fetch(&self, kind: EntityKind, id: &str) -> Result<Value> {
        let collections = self.collections.read().await;
        collections
            .get(&kind)
            .and_then(|items| items.iter().find(|raw| Self::id_of(raw) == Some(id)))
            .cloned()
            .ok_or_else(|| AtriumError::not_found(kind.label(), id))
    }

    async fn create(&self, kind: EntityKind, partial: Value) -> Result<Value> {
        let mut raw = Self::object(kind, partial)?;
        Self::stamp_new(&mut raw);
        let stored = Value::Object(raw);
        tracing::debug!(
            "[InMemoryDataService] create {} id={:?}",
            kind,
            Self::id_of(&stored)
        );
        self.insert(kind, stored.clone()).await;
        Ok(stored)
    }

    async fn update(&self, kind: EntityKind, id: &str, partial: Value) -> Result<Value> {
        let patch = Self::object(kind, partial)?;
        let mut collections = self.collections.write().await;
        let stored = collections
            .get_mut(&kind)
            .and_then(|items| items.iter_mut().find(|raw| Self::id_of(raw) == Some(id)))
            .ok_or_else(|| AtriumError::not_found(kind.label(), id))?;

        if let Value::Object(current) = stored {
            for (key, value) in patch {
                if key != "id" {
                    current.insert(key, value);
                }
            }
            current.insert("updated_at".to_string(), Self::now());
        }
        tracing::debug!("[InMemoryDataService] update {} id={}", kind, id);
        Ok(stored.clone())
    }

    async fn send_message(&self, chat_id: &str, message: &Message) -> Result<Value> {
        self.fetch(EntityKind::Chat, chat_id).await?;
        let stored = self.persist_message(chat_id, message).await?;
        self.append_to_chat(chat_id, stored).await
    }

    async fn generate_response(&self, chat_id: &str) -> Result<bool> {
        let chat = self.load_chat(chat_id).await?;
        if chat.messages.is_empty() {
            return Ok(false);
        }
        let Some(content) = self.generator.reply(&chat) else {
            tracing::debug!("[InMemoryDataService] generator declined for chat {}", chat_id);
            return Ok(false);
        };

        let mut reply = Message::assistant(content);
        reply.assistant_name = chat.agent_id.clone();
        let stored = self.persist_message(chat_id, &reply).await?;
        self.append_to_chat(chat_id, stored).await?;
        Ok(true)
    }

    async fn add_task_response(&self, chat_id: &str, task_response_id: &str) -> Result<Value> {
        self.fetch(EntityKind::Chat, chat_id).await?;
        let raw = self.fetch(EntityKind::TaskResponse, task_response_id).await?;
        let task_name = match registry::convert(EntityKind::TaskResponse, &raw) {
            Entity::TaskResponse(response) => response.task_name,
            _ => String::new(),
        };

        let mut message = Message::with_role(MessageRole::Tool, task_name);
        message.references.task_responses = Some(vec![task_response_id.to_string()]);
        let stored = self.persist_message(chat_id, &message).await?;
        self.append_to_chat(chat_id, stored).await
    }
}

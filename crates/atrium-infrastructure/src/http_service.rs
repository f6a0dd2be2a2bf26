//! REST implementation of [`DataService`].
//!
//! Maps each operation onto the remote API:
//!
//! ```text
//! GET    {base}/{collection}                      fetch_all
//! GET    {base}/{collection}/{id}                 fetch
//! POST   {base}/{collection}                      create
//! PATCH  {base}/{collection}/{id}                 update
//! POST   {base}/chats/{id}/send_message           send_message
//! POST   {base}/chats/{id}/generate_response      generate_response
//! POST   {base}/chats/{id}/add_task_response      add_task_response
//! ```

use async_trait::async_trait;
use atrium_core::config::ServiceConfig;
use atrium_core::entity::{Entity, EntityKind, Message};
use atrium_core::error::{AtriumError, Result};
use atrium_core::service::DataService;
use reqwest::{Client, RequestBuilder, StatusCode, Url};
use serde_json::{Value, json};
use std::time::Duration;

pub struct HttpDataService {
    client: Client,
    base_url: Url,
    api_key: Option<String>,
}

impl HttpDataService {
    /// Builds a client from the `[service]` config section.
    pub fn new(config: &ServiceConfig) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()?;
        let base_url = Url::parse(&config.base_url).map_err(|err| {
            AtriumError::config(format!("invalid base_url '{}': {}", config.base_url, err))
        })?;
        if base_url.cannot_be_a_base() {
            return Err(AtriumError::config(format!(
                "base_url '{}' cannot carry a path",
                config.base_url
            )));
        }
        Ok(Self {
            client,
            base_url,
            api_key: config.api_key.clone(),
        })
    }

    /// `base_url` with `segments` appended, each percent-encoded.
    fn url(&self, segments: &[&str]) -> Url {
        let mut url = self.base_url.clone();
        if let Ok(mut path) = url.path_segments_mut() {
            path.pop_if_empty().extend(segments);
        }
        url
    }

    fn collection_url(&self, kind: EntityKind) -> Url {
        self.url(&[kind.collection_name()])
    }

    fn item_url(&self, kind: EntityKind, id: &str) -> Url {
        self.url(&[kind.collection_name(), id])
    }

    fn chat_action_url(&self, chat_id: &str, action: &str) -> Url {
        self.url(&[EntityKind::Chat.collection_name(), chat_id, action])
    }

    fn authorize(&self, request: RequestBuilder) -> RequestBuilder {
        match &self.api_key {
            Some(key) => request.bearer_auth(key),
            None => request,
        }
    }

    /// Sends `request`, maps non-2xx statuses to errors, and decodes JSON.
    async fn send(&self, request: RequestBuilder, kind: EntityKind, id: Option<&str>) -> Result<Value> {
        let response = self.authorize(request).send().await?;
        let status = response.status();
        if status == StatusCode::NOT_FOUND {
            return Err(AtriumError::not_found(kind.label(), id.unwrap_or_default()));
        }
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            tracing::warn!("[HttpDataService] {} request failed: {} {}", kind, status, body);
            return Err(AtriumError::data_access(format!("{status}: {body}")));
        }
        Ok(response.json::<Value>().await?)
    }
}

#[async_trait]
impl DataService for HttpDataService {
    async fn fetch_all(&self, kind: EntityKind) -> Result<Vec<Value>> {
        let request = self.client.get(self.collection_url(kind));
        match self.send(request, kind, None).await? {
            Value::Array(items) => Ok(items),
            other => Err(AtriumError::data_access(format!(
                "expected a list of {}, got {}",
                kind.collection_name(),
                other
            ))),
        }
    }

    async fn fetch(&self, kind: EntityKind, id: &str) -> Result<Value> {
        let request = self.client.get(self.item_url(kind, id));
        self.send(request, kind, Some(id)).await
    }

    async fn create(&self, kind: EntityKind, partial: Value) -> Result<Value> {
        let request = self.client.post(self.collection_url(kind)).json(&partial);
        self.send(request, kind, None).await
    }

    async fn update(&self, kind: EntityKind, id: &str, partial: Value) -> Result<Value> {
        let request = self.client.patch(self.item_url(kind, id)).json(&partial);
        self.send(request, kind, Some(id)).await
    }

    async fn send_message(&self, chat_id: &str, message: &Message) -> Result<Value> {
        let body = Entity::Message(message.clone()).to_raw();
        let request = self
            .client
            .post(self.chat_action_url(chat_id, "send_message"))
            .json(&body);
        self.send(request, EntityKind::Chat, Some(chat_id)).await
    }

    async fn generate_response(&self, chat_id: &str) -> Result<bool> {
        let request = self
            .client
            .post(self.chat_action_url(chat_id, "generate_response"));
        let value = self.send(request, EntityKind::Chat, Some(chat_id)).await?;
        Ok(success_flag(&value))
    }

    async fn add_task_response(&self, chat_id: &str, task_response_id: &str) -> Result<Value> {
        let request = self
            .client
            .post(self.chat_action_url(chat_id, "add_task_response"))
            .json(&json!({ "task_response_id": task_response_id }));
        self.send(request, EntityKind::Chat, Some(chat_id)).await
    }
}

/// Accepts either a bare JSON boolean or `{ "success": bool }`.
fn success_flag(value: &Value) -> bool {
    match value {
        Value::Bool(flag) => *flag,
        Value::Object(map) => map.get("success").and_then(Value::as_bool).unwrap_or(false),
        _ => false,
    }
}

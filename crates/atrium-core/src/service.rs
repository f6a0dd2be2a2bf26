//! Data service trait.
//!
//! The remote data API the client binds to. Payloads are raw JSON; callers
//! normalize them through the registry's converters.

use crate::entity::{EntityKind, Message};
use crate::error::Result;
use async_trait::async_trait;
use serde_json::Value;

/// An abstract, kind-parameterized data service.
///
/// This trait decouples the binding and orchestration logic from the
/// transport (in-memory store, REST API, ...).
///
/// # Implementation Notes
///
/// - `create` assigns the id; callers never invent one
/// - `generate_response` only signals success; the updated chat must be
///   fetched separately
#[async_trait]
pub trait DataService: Send + Sync {
    /// Fetches the whole collection for `kind`.
    async fn fetch_all(&self, kind: EntityKind) -> Result<Vec<Value>>;

    /// Fetches a single entity.
    ///
    /// # Errors
    ///
    /// `AtriumError::NotFound` when no entity has this id.
    async fn fetch(&self, kind: EntityKind, id: &str) -> Result<Value>;

    /// Creates an entity and returns it with its server-assigned id.
    async fn create(&self, kind: EntityKind, partial: Value) -> Result<Value>;

    /// Updates an entity and returns the stored result.
    async fn update(&self, kind: EntityKind, id: &str, partial: Value) -> Result<Value>;

    /// Persists `message` on the chat and returns the updated chat.
    async fn send_message(&self, chat_id: &str, message: &Message) -> Result<Value>;

    /// Asks the service to generate the next reply for the chat.
    ///
    /// # Returns
    ///
    /// - `Ok(true)`: a reply was generated and stored
    /// - `Ok(false)`: the service declined to generate
    /// - `Err(_)`: the request failed
    async fn generate_response(&self, chat_id: &str) -> Result<bool>;

    /// Attaches a task response to the chat and returns the updated chat.
    async fn add_task_response(&self, chat_id: &str, task_response_id: &str) -> Result<Value>;
}

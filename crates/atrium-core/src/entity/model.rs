//! Per-kind entity records.
//!
//! Every record flattens [`EntityBase`] and defaults each field so that a raw
//! payload with missing fields still converts into a fully populated record.

use super::base::EntityBase;
use super::kind::EntityKind;
use super::message::Message;
use crate::registry::convert_record;
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

/// Behaviour shared by every per-kind record.
pub trait EntityModel {
    const KIND: EntityKind;

    fn base(&self) -> &EntityBase;

    fn base_mut(&mut self) -> &mut EntityBase;

    /// Display title used by cards, lists and dialog headers.
    fn title(&self) -> String;

    /// Labelled field values shown in card, table and form views.
    fn fields(&self) -> Vec<(&'static str, String)>;
}

fn opt(value: &Option<String>) -> String {
    value.clone().unwrap_or_default()
}

fn joined(values: &[String]) -> String {
    values.join(", ")
}

fn untitled(kind: EntityKind, name: &str, base: &EntityBase) -> String {
    if !name.is_empty() {
        return name.to_string();
    }
    match &base.id {
        Some(id) => format!("{} {}", kind.label(), id),
        None => format!("New {}", kind.label()),
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Agent {
    #[serde(flatten)]
    pub base: EntityBase,
    pub name: String,
    pub system_message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub model_id: Option<String>,
    pub tasks: Vec<String>,
    pub max_consecutive_replies: u32,
    pub has_code_exec: bool,
}

impl EntityModel for Agent {
    const KIND: EntityKind = EntityKind::Agent;

    fn base(&self) -> &EntityBase {
        &self.base
    }

    fn base_mut(&mut self) -> &mut EntityBase {
        &mut self.base
    }

    fn title(&self) -> String {
        untitled(Self::KIND, &self.name, &self.base)
    }

    fn fields(&self) -> Vec<(&'static str, String)> {
        vec![
            ("name", self.name.clone()),
            ("system_message", self.system_message.clone()),
            ("model_id", opt(&self.model_id)),
            ("tasks", joined(&self.tasks)),
            ("max_consecutive_replies", self.max_consecutive_replies.to_string()),
            ("has_code_exec", self.has_code_exec.to_string()),
        ]
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Model {
    #[serde(flatten)]
    pub base: EntityBase,
    pub short_name: String,
    pub model_name: String,
    pub api_name: String,
    pub temperature: f64,
    pub ctx_size: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub deployment: Option<String>,
}

impl EntityModel for Model {
    const KIND: EntityKind = EntityKind::Model;

    fn base(&self) -> &EntityBase {
        &self.base
    }

    fn base_mut(&mut self) -> &mut EntityBase {
        &mut self.base
    }

    fn title(&self) -> String {
        untitled(Self::KIND, &self.short_name, &self.base)
    }

    fn fields(&self) -> Vec<(&'static str, String)> {
        vec![
            ("short_name", self.short_name.clone()),
            ("model_name", self.model_name.clone()),
            ("api_name", self.api_name.clone()),
            ("temperature", self.temperature.to_string()),
            ("ctx_size", self.ctx_size.to_string()),
            ("deployment", opt(&self.deployment)),
        ]
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Prompt {
    #[serde(flatten)]
    pub base: EntityBase,
    pub name: String,
    pub content: String,
    pub is_templated: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub agent_id: Option<String>,
}

impl EntityModel for Prompt {
    const KIND: EntityKind = EntityKind::Prompt;

    fn base(&self) -> &EntityBase {
        &self.base
    }

    fn base_mut(&mut self) -> &mut EntityBase {
        &mut self.base
    }

    fn title(&self) -> String {
        untitled(Self::KIND, &self.name, &self.base)
    }

    fn fields(&self) -> Vec<(&'static str, String)> {
        vec![
            ("name", self.name.clone()),
            ("content", self.content.clone()),
            ("is_templated", self.is_templated.to_string()),
            ("agent_id", opt(&self.agent_id)),
        ]
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Task {
    #[serde(flatten)]
    pub base: EntityBase,
    pub task_name: String,
    pub task_description: String,
    pub task_type: String,
    pub prompts: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub required_api: Option<String>,
    pub input_variables: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub exit_code_response_map: Option<Value>,
}

impl EntityModel for Task {
    const KIND: EntityKind = EntityKind::Task;

    fn base(&self) -> &EntityBase {
        &self.base
    }

    fn base_mut(&mut self) -> &mut EntityBase {
        &mut self.base
    }

    fn title(&self) -> String {
        untitled(Self::KIND, &self.task_name, &self.base)
    }

    fn fields(&self) -> Vec<(&'static str, String)> {
        vec![
            ("task_name", self.task_name.clone()),
            ("task_description", self.task_description.clone()),
            ("task_type", self.task_type.clone()),
            ("prompts", joined(&self.prompts)),
            ("required_api", opt(&self.required_api)),
            ("input_variables", joined(&self.input_variables)),
        ]
    }
}

/// Converts each element on its own, so one malformed message only loses
/// its own bad fields. A non-array value yields no messages.
fn each_message<'de, D>(deserializer: D) -> Result<Vec<Message>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match Value::deserialize(deserializer)? {
        Value::Array(items) => items.iter().map(convert_record::<Message>).collect(),
        _ => Vec::new(),
    })
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Chat {
    #[serde(flatten)]
    pub base: EntityBase,
    pub name: String,
    #[serde(deserialize_with = "each_message")]
    pub messages: Vec<Message>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub agent_id: Option<String>,
    /// Task ids attached to the chat and offered to the agent.
    pub functions: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data_cluster_id: Option<String>,
}

impl EntityModel for Chat {
    const KIND: EntityKind = EntityKind::Chat;

    fn base(&self) -> &EntityBase {
        &self.base
    }

    fn base_mut(&mut self) -> &mut EntityBase {
        &mut self.base
    }

    fn title(&self) -> String {
        untitled(Self::KIND, &self.name, &self.base)
    }

    fn fields(&self) -> Vec<(&'static str, String)> {
        vec![
            ("name", self.name.clone()),
            ("agent_id", opt(&self.agent_id)),
            ("messages", self.messages.len().to_string()),
            ("functions", joined(&self.functions)),
        ]
    }
}

impl EntityModel for Message {
    const KIND: EntityKind = EntityKind::Message;

    fn base(&self) -> &EntityBase {
        &self.base
    }

    fn base_mut(&mut self) -> &mut EntityBase {
        &mut self.base
    }

    fn title(&self) -> String {
        let preview: String = self.content.chars().take(40).collect();
        format!("{}: {}", self.role, preview)
    }

    fn fields(&self) -> Vec<(&'static str, String)> {
        vec![
            ("role", self.role.to_string()),
            ("content", self.content.clone()),
            ("content_type", self.content_type().to_string()),
            ("assistant_name", opt(&self.assistant_name)),
        ]
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct File {
    #[serde(flatten)]
    pub base: EntityBase,
    pub filename: String,
    #[serde(rename = "type")]
    pub file_type: String,
    pub storage_path: String,
    pub file_size: u64,
}

impl EntityModel for File {
    const KIND: EntityKind = EntityKind::File;

    fn base(&self) -> &EntityBase {
        &self.base
    }

    fn base_mut(&mut self) -> &mut EntityBase {
        &mut self.base
    }

    fn title(&self) -> String {
        untitled(Self::KIND, &self.filename, &self.base)
    }

    fn fields(&self) -> Vec<(&'static str, String)> {
        vec![
            ("filename", self.filename.clone()),
            ("type", self.file_type.clone()),
            ("storage_path", self.storage_path.clone()),
            ("file_size", self.file_size.to_string()),
        ]
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Parameter {
    #[serde(flatten)]
    pub base: EntityBase,
    #[serde(rename = "type")]
    pub param_type: String,
    pub description: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub default: Option<Value>,
    #[serde(rename = "enum")]
    pub allowed_values: Vec<String>,
}

impl EntityModel for Parameter {
    const KIND: EntityKind = EntityKind::Parameter;

    fn base(&self) -> &EntityBase {
        &self.base
    }

    fn base_mut(&mut self) -> &mut EntityBase {
        &mut self.base
    }

    fn title(&self) -> String {
        untitled(Self::KIND, &self.description, &self.base)
    }

    fn fields(&self) -> Vec<(&'static str, String)> {
        vec![
            ("type", self.param_type.clone()),
            ("description", self.description.clone()),
            (
                "default",
                self.default.as_ref().map(Value::to_string).unwrap_or_default(),
            ),
            ("enum", joined(&self.allowed_values)),
        ]
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Api {
    #[serde(flatten)]
    pub base: EntityBase,
    pub api_name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub base_url: Option<String>,
    pub is_active: bool,
}

impl EntityModel for Api {
    const KIND: EntityKind = EntityKind::Api;

    fn base(&self) -> &EntityBase {
        &self.base
    }

    fn base_mut(&mut self) -> &mut EntityBase {
        &mut self.base
    }

    fn title(&self) -> String {
        untitled(Self::KIND, &self.api_name, &self.base)
    }

    fn fields(&self) -> Vec<(&'static str, String)> {
        // Keys are never rendered in clear.
        let key = if self.api_key.is_some() { "********" } else { "" };
        vec![
            ("api_name", self.api_name.clone()),
            ("api_key", key.to_string()),
            ("base_url", opt(&self.base_url)),
            ("is_active", self.is_active.to_string()),
        ]
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TaskResponse {
    #[serde(flatten)]
    pub base: EntityBase,
    pub task_id: String,
    pub task_name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub task_outputs: Option<Value>,
    pub result_code: i32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub usage_metrics: Option<Value>,
}

impl EntityModel for TaskResponse {
    const KIND: EntityKind = EntityKind::TaskResponse;

    fn base(&self) -> &EntityBase {
        &self.base
    }

    fn base_mut(&mut self) -> &mut EntityBase {
        &mut self.base
    }

    fn title(&self) -> String {
        untitled(Self::KIND, &self.task_name, &self.base)
    }

    fn fields(&self) -> Vec<(&'static str, String)> {
        vec![
            ("task_id", self.task_id.clone()),
            ("task_name", self.task_name.clone()),
            ("result_code", self.result_code.to_string()),
            (
                "task_outputs",
                self.task_outputs.as_ref().map(Value::to_string).unwrap_or_default(),
            ),
        ]
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct UrlReference {
    #[serde(flatten)]
    pub base: EntityBase,
    pub url: String,
    pub title: String,
    pub content: String,
}

impl EntityModel for UrlReference {
    const KIND: EntityKind = EntityKind::UrlReference;

    fn base(&self) -> &EntityBase {
        &self.base
    }

    fn base_mut(&mut self) -> &mut EntityBase {
        &mut self.base
    }

    fn title(&self) -> String {
        if self.title.is_empty() {
            untitled(Self::KIND, &self.url, &self.base)
        } else {
            self.title.clone()
        }
    }

    fn fields(&self) -> Vec<(&'static str, String)> {
        vec![
            ("url", self.url.clone()),
            ("title", self.title.clone()),
            ("content", self.content.clone()),
        ]
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct User {
    #[serde(flatten)]
    pub base: EntityBase,
    pub name: String,
    pub email: String,
    pub role: String,
}

impl EntityModel for User {
    const KIND: EntityKind = EntityKind::User;

    fn base(&self) -> &EntityBase {
        &self.base
    }

    fn base_mut(&mut self) -> &mut EntityBase {
        &mut self.base
    }

    fn title(&self) -> String {
        untitled(Self::KIND, &self.name, &self.base)
    }

    fn fields(&self) -> Vec<(&'static str, String)> {
        vec![
            ("name", self.name.clone()),
            ("email", self.email.clone()),
            ("role", self.role.clone()),
        ]
    }
}

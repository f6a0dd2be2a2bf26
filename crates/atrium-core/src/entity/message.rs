//! Chat message types.
//!
//! A message carries its text content plus optional reference buckets pointing
//! at other entities (files, task responses, search results, ...). The derived
//! [`ContentType`] tells a renderer which of those buckets matter.

use super::base::EntityBase;
use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};

/// Represents the role of a message in a conversation.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, Display, EnumString)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case", ascii_case_insensitive)]
pub enum MessageRole {
    /// Message from the user.
    #[default]
    User,
    /// Message from the AI assistant.
    Assistant,
    /// System-generated message.
    System,
    /// Output produced by a tool/task run.
    Tool,
}

/// Independently optional reference buckets attached to a message.
///
/// Each bucket holds entity ids (or raw strings for `string_outputs`).
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MessageReferences {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub messages: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub files: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub task_responses: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub search_results: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub string_outputs: Option<Vec<String>>,
}

/// What a message predominantly carries, derived from its references.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Display)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum ContentType {
    Text,
    Messages,
    Files,
    TaskResponses,
    SearchResults,
    StringOutputs,
    Multiple,
}

fn populated(bucket: &Option<Vec<String>>) -> bool {
    bucket.as_ref().is_some_and(|items| !items.is_empty())
}

impl MessageReferences {
    /// Content types of every populated bucket, in declaration order.
    pub fn populated_buckets(&self) -> Vec<ContentType> {
        [
            (&self.messages, ContentType::Messages),
            (&self.files, ContentType::Files),
            (&self.task_responses, ContentType::TaskResponses),
            (&self.search_results, ContentType::SearchResults),
            (&self.string_outputs, ContentType::StringOutputs),
        ]
        .into_iter()
        .filter(|(bucket, _)| populated(bucket))
        .map(|(_, content_type)| content_type)
        .collect()
    }

    /// `Multiple` iff more than one bucket is populated, otherwise the single
    /// populated bucket's type, otherwise `Text`.
    pub fn content_type(&self) -> ContentType {
        let buckets = self.populated_buckets();
        match buckets.as_slice() {
            [] => ContentType::Text,
            [single] => *single,
            _ => ContentType::Multiple,
        }
    }

    /// Whether the task-response bucket references `task_response_id`.
    pub fn has_task_response(&self, task_response_id: &str) -> bool {
        self.task_responses
            .as_ref()
            .is_some_and(|ids| ids.iter().any(|id| id == task_response_id))
    }

    /// True when no bucket is present at all (not even an empty one).
    pub fn is_unset(&self) -> bool {
        self.messages.is_none()
            && self.files.is_none()
            && self.task_responses.is_none()
            && self.search_results.is_none()
            && self.string_outputs.is_none()
    }
}

/// A single message in a chat.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Message {
    #[serde(flatten)]
    pub base: EntityBase,
    pub role: MessageRole,
    pub content: String,
    #[serde(skip_serializing_if = "MessageReferences::is_unset")]
    pub references: MessageReferences,
    /// Name of the agent that produced an assistant message.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub assistant_name: Option<String>,
    /// Id of the chat or agent the message was generated by.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub generated_by: Option<String>,
}

impl Message {
    /// Creates a user message stamped with the current time.
    pub fn user(content: impl Into<String>) -> Self {
        Self::with_role(MessageRole::User, content)
    }

    /// Creates an assistant message stamped with the current time.
    pub fn assistant(content: impl Into<String>) -> Self {
        Self::with_role(MessageRole::Assistant, content)
    }

    pub fn with_role(role: MessageRole, content: impl Into<String>) -> Self {
        Self {
            base: EntityBase {
                created_at: Some(chrono::Utc::now()),
                ..Default::default()
            },
            role,
            content: content.into(),
            ..Default::default()
        }
    }

    pub fn content_type(&self) -> ContentType {
        self.references.content_type()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ids(values: &[&str]) -> Option<Vec<String>> {
        Some(values.iter().map(|v| v.to_string()).collect())
    }

    #[test]
    fn test_content_type_text_when_no_bucket() {
        let refs = MessageReferences::default();
        assert_eq!(refs.content_type(), ContentType::Text);
    }

    #[test]
    fn test_content_type_empty_bucket_is_not_populated() {
        let refs = MessageReferences {
            files: Some(Vec::new()),
            ..Default::default()
        };
        assert_eq!(refs.content_type(), ContentType::Text);
    }

    #[test]
    fn test_content_type_single_bucket() {
        let refs = MessageReferences {
            task_responses: ids(&["tr-1"]),
            ..Default::default()
        };
        assert_eq!(refs.content_type(), ContentType::TaskResponses);
        assert!(refs.has_task_response("tr-1"));
        assert!(!refs.has_task_response("tr-2"));
    }

    #[test]
    fn test_content_type_multiple() {
        let refs = MessageReferences {
            files: ids(&["f-1"]),
            string_outputs: ids(&["done"]),
            ..Default::default()
        };
        assert_eq!(refs.content_type(), ContentType::Multiple);
    }

    #[test]
    fn test_message_role_serde() {
        let msg = Message::with_role(MessageRole::Tool, "ran");
        let value = serde_json::to_value(&msg).unwrap();
        assert_eq!(value["role"], "tool");
        assert!(value.get("references").is_none());
    }
}

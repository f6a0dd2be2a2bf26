//! In-memory state of the active chat.

use atrium_core::entity::{Agent, Chat, Message, Task};
use atrium_core::error::AtriumError;
use chrono::{DateTime, Utc};
use std::collections::HashSet;

/// Whether a reply is being generated.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionStatus {
    Idle,
    Generating,
}

/// Session state of one active chat.
#[derive(Debug, Clone, Default)]
pub struct ChatSession {
    pub chat_id: Option<String>,
    pub chat_name: String,
    /// Ordered by creation time, oldest first.
    pub messages: Vec<Message>,
    pub agent: Option<Agent>,
    /// Task ids attached to the chat.
    pub functions: Vec<String>,
    /// Every task the user can attach.
    pub available_tasks: Vec<Task>,
    /// True from a generate request until it resolves or fails.
    pub is_generating: bool,
    /// Most recent service failure, for notification display.
    pub last_error: Option<AtriumError>,
    /// Task responses being attached but not yet reflected in `messages`.
    pub(crate) pending_task_results: HashSet<String>,
    /// Bumped by every chat selection; older selections resolving late are dropped.
    pub(crate) selection_epoch: u64,
}

impl ChatSession {
    pub fn status(&self) -> SessionStatus {
        if self.is_generating {
            SessionStatus::Generating
        } else {
            SessionStatus::Idle
        }
    }

    pub fn is_task_in_chat(&self, task_id: &str) -> bool {
        self.functions.iter().any(|id| id == task_id)
    }

    pub fn is_task_result_in_chat(&self, task_result_id: &str) -> bool {
        self.pending_task_results.contains(task_result_id)
            || self
                .messages
                .iter()
                .any(|message| message.references.has_task_response(task_result_id))
    }

    /// Replaces the chat-derived fields with `chat`; unrelated fields survive.
    pub(crate) fn adopt(&mut self, chat: Chat, agent: Option<Agent>) {
        self.chat_id = chat.base.id;
        self.chat_name = chat.name;
        self.messages = sort_by_creation(chat.messages);
        self.agent = agent;
        self.functions = chat.functions;
        self.pending_task_results.clear();
    }
}

/// Stable sort by `created_at`, oldest first.
///
/// A message without a timestamp sorts as if created with its predecessor,
/// so undated messages keep their position relative to their neighbours.
pub fn sort_by_creation(messages: Vec<Message>) -> Vec<Message> {
    let mut last: Option<DateTime<Utc>> = None;
    let mut keyed: Vec<(Option<DateTime<Utc>>, Message)> = messages
        .into_iter()
        .map(|message| {
            if message.base.created_at.is_some() {
                last = message.base.created_at;
            }
            (last, message)
        })
        .collect();
    keyed.sort_by_key(|(key, _)| *key);
    keyed.into_iter().map(|(_, message)| message).collect()
}

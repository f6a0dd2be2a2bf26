//! The closed set of entity kinds.

use serde::{Deserialize, Serialize};
use strum::{Display, EnumIter, EnumString, IntoEnumIterator};

/// Identifies one of the domain object types the client can bind to.
///
/// The set is closed: every kind has exactly one registry entry, and every
/// `match` over it is checked for exhaustiveness at build time.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, Display, EnumIter, EnumString,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case", ascii_case_insensitive)]
pub enum EntityKind {
    Agent,
    Model,
    Prompt,
    Task,
    Chat,
    Message,
    File,
    Parameter,
    Api,
    TaskResponse,
    UrlReference,
    User,
}

impl EntityKind {
    /// Returns every kind, in declaration order.
    pub fn all() -> Vec<EntityKind> {
        EntityKind::iter().collect()
    }

    /// Name of the remote collection holding entities of this kind.
    pub fn collection_name(&self) -> &'static str {
        match self {
            EntityKind::Agent => "agents",
            EntityKind::Model => "models",
            EntityKind::Prompt => "prompts",
            EntityKind::Task => "tasks",
            EntityKind::Chat => "chats",
            EntityKind::Message => "messages",
            EntityKind::File => "files",
            EntityKind::Parameter => "parameters",
            EntityKind::Api => "apis",
            EntityKind::TaskResponse => "task_responses",
            EntityKind::UrlReference => "url_references",
            EntityKind::User => "users",
        }
    }

    /// Human-readable label used as a view title prefix.
    pub fn label(&self) -> &'static str {
        match self {
            EntityKind::Agent => "Agent",
            EntityKind::Model => "Model",
            EntityKind::Prompt => "Prompt",
            EntityKind::Task => "Task",
            EntityKind::Chat => "Chat",
            EntityKind::Message => "Message",
            EntityKind::File => "File",
            EntityKind::Parameter => "Parameter",
            EntityKind::Api => "API",
            EntityKind::TaskResponse => "Task Response",
            EntityKind::UrlReference => "URL Reference",
            EntityKind::User => "User",
        }
    }

    /// Resolves a kind from either its snake_case name or its collection name.
    pub fn from_collection(name: &str) -> Option<EntityKind> {
        EntityKind::iter().find(|kind| {
            kind.collection_name().eq_ignore_ascii_case(name)
                || kind.to_string().eq_ignore_ascii_case(name)
        })
    }
}

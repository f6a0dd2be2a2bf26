//! Entity domain module.
//!
//! This module contains the closed set of entity kinds, the per-kind records
//! and the [`Entity`] sum type the rest of the client works with.
//!
//! # Module Structure
//!
//! - `kind`: the `EntityKind` tag
//! - `base`: fields shared by every entity (`EntityBase`)
//! - `message`: chat message types (`Message`, `MessageRole`, `MessageReferences`)
//! - `model`: per-kind records and the `EntityModel` trait

mod base;
mod kind;
mod message;
mod model;

pub use base::EntityBase;
pub use kind::EntityKind;
pub use message::{ContentType, Message, MessageReferences, MessageRole};
pub use model::{
    Agent, Api, Chat, EntityModel, File, Model, Parameter, Prompt, Task, TaskResponse,
    UrlReference, User,
};

use serde::Serialize;
use serde_json::{Map, Value};

/// A value-like snapshot of one entity of any kind.
#[derive(Debug, Clone, PartialEq)]
pub enum Entity {
    Agent(Agent),
    Model(Model),
    Prompt(Prompt),
    Task(Task),
    Chat(Chat),
    Message(Message),
    File(File),
    Parameter(Parameter),
    Api(Api),
    TaskResponse(TaskResponse),
    UrlReference(UrlReference),
    User(User),
}

/// Applies `$body` to the record inside any `Entity` variant.
macro_rules! with_record {
    ($entity:expr, $record:ident => $body:expr) => {
        match $entity {
            Entity::Agent($record) => $body,
            Entity::Model($record) => $body,
            Entity::Prompt($record) => $body,
            Entity::Task($record) => $body,
            Entity::Chat($record) => $body,
            Entity::Message($record) => $body,
            Entity::File($record) => $body,
            Entity::Parameter($record) => $body,
            Entity::Api($record) => $body,
            Entity::TaskResponse($record) => $body,
            Entity::UrlReference($record) => $body,
            Entity::User($record) => $body,
        }
    };
}

impl Entity {
    /// The empty instance for `kind`: every field at its default, no id.
    pub fn empty(kind: EntityKind) -> Self {
        match kind {
            EntityKind::Agent => Entity::Agent(Agent::default()),
            EntityKind::Model => Entity::Model(Model::default()),
            EntityKind::Prompt => Entity::Prompt(Prompt::default()),
            EntityKind::Task => Entity::Task(Task::default()),
            EntityKind::Chat => Entity::Chat(Chat::default()),
            EntityKind::Message => Entity::Message(Message::default()),
            EntityKind::File => Entity::File(File::default()),
            EntityKind::Parameter => Entity::Parameter(Parameter::default()),
            EntityKind::Api => Entity::Api(Api::default()),
            EntityKind::TaskResponse => Entity::TaskResponse(TaskResponse::default()),
            EntityKind::UrlReference => Entity::UrlReference(UrlReference::default()),
            EntityKind::User => Entity::User(User::default()),
        }
    }

    pub fn kind(&self) -> EntityKind {
        match self {
            Entity::Agent(_) => EntityKind::Agent,
            Entity::Model(_) => EntityKind::Model,
            Entity::Prompt(_) => EntityKind::Prompt,
            Entity::Task(_) => EntityKind::Task,
            Entity::Chat(_) => EntityKind::Chat,
            Entity::Message(_) => EntityKind::Message,
            Entity::File(_) => EntityKind::File,
            Entity::Parameter(_) => EntityKind::Parameter,
            Entity::Api(_) => EntityKind::Api,
            Entity::TaskResponse(_) => EntityKind::TaskResponse,
            Entity::UrlReference(_) => EntityKind::UrlReference,
            Entity::User(_) => EntityKind::User,
        }
    }

    pub fn base(&self) -> &EntityBase {
        with_record!(self, record => record.base())
    }

    pub fn base_mut(&mut self) -> &mut EntityBase {
        with_record!(self, record => record.base_mut())
    }

    pub fn id(&self) -> Option<&str> {
        self.base().id.as_deref()
    }

    pub fn title(&self) -> String {
        with_record!(self, record => record.title())
    }

    pub fn fields(&self) -> Vec<(&'static str, String)> {
        with_record!(self, record => record.fields())
    }

    /// Serializes the record back to the raw payload shape.
    ///
    /// Always an object; records hold only JSON-representable data.
    pub fn to_raw(&self) -> Value {
        with_record!(self, record => to_object(record))
    }

    pub fn as_chat(&self) -> Option<&Chat> {
        match self {
            Entity::Chat(chat) => Some(chat),
            _ => None,
        }
    }

    pub fn into_chat(self) -> Option<Chat> {
        match self {
            Entity::Chat(chat) => Some(chat),
            _ => None,
        }
    }

    pub fn into_task(self) -> Option<Task> {
        match self {
            Entity::Task(task) => Some(task),
            _ => None,
        }
    }

    pub fn into_agent(self) -> Option<Agent> {
        match self {
            Entity::Agent(agent) => Some(agent),
            _ => None,
        }
    }
}

fn to_object<T: Serialize>(record: &T) -> Value {
    match serde_json::to_value(record) {
        Ok(value @ Value::Object(_)) => value,
        Ok(_) | Err(_) => Value::Object(Map::new()),
    }
}

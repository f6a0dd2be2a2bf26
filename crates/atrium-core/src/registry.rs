//! Entity registry.
//!
//! A compile-time table mapping every [`EntityKind`] to its converter, its
//! default form and the presentation modes it supports. Lookup is a `match`
//! over the closed kind set, so adding a kind without an entry fails to build.

use crate::entity::{
    Agent, Api, Chat, Entity, EntityKind, File, Message, Model, Parameter, Prompt, Task,
    TaskResponse, UrlReference, User,
};
use crate::dispatch::{Renderer, renderers};
use crate::mode::PresentationMode;
use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::{Map, Value, json};

/// Registry row for one entity kind.
#[derive(Debug)]
pub struct RegistryEntry {
    pub kind: EntityKind,
    /// Normalizes a raw payload into a fully populated entity. Total and idempotent.
    pub convert: fn(&Value) -> Entity,
    /// Prefilled values a create form starts from.
    pub default_form: fn() -> Map<String, Value>,
    /// Renderer per supported presentation mode; absent modes are unsupported.
    pub renderers: &'static [(PresentationMode, Renderer)],
}

impl RegistryEntry {
    pub fn renderer(&self, mode: PresentationMode) -> Option<Renderer> {
        self.renderers
            .iter()
            .find(|(supported, _)| *supported == mode)
            .map(|(_, render)| *render)
    }

    pub fn supports(&self, mode: PresentationMode) -> bool {
        self.renderer(mode).is_some()
    }

    pub fn presentations(&self) -> impl Iterator<Item = PresentationMode> + '_ {
        self.renderers.iter().map(|(mode, _)| *mode)
    }
}

const ALL_MODES: &[(PresentationMode, Renderer)] = &[
    (PresentationMode::Create, renderers::form),
    (PresentationMode::View, renderers::details),
    (PresentationMode::Edit, renderers::form),
    (PresentationMode::List, renderers::list),
    (PresentationMode::ShortList, renderers::short_list),
    (PresentationMode::Card, renderers::card),
    (PresentationMode::Table, renderers::table),
];

const CHAT_MODES: &[(PresentationMode, Renderer)] = &[
    (PresentationMode::Create, renderers::form),
    (PresentationMode::View, renderers::details),
    (PresentationMode::Edit, renderers::form),
    (PresentationMode::List, renderers::list),
    (PresentationMode::ShortList, renderers::short_list),
    (PresentationMode::Card, renderers::chat_card),
    (PresentationMode::Table, renderers::table),
];

// Messages are immutable once persisted; they are replaced, never edited.
const MESSAGE_MODES: &[(PresentationMode, Renderer)] = &[
    (PresentationMode::Create, renderers::form),
    (PresentationMode::View, renderers::details),
    (PresentationMode::List, renderers::list),
    (PresentationMode::ShortList, renderers::short_list),
    (PresentationMode::Card, renderers::message_card),
    (PresentationMode::Table, renderers::table),
];

// Produced by task runs on the server.
const READ_ONLY_MODES: &[(PresentationMode, Renderer)] = &[
    (PresentationMode::View, renderers::details),
    (PresentationMode::List, renderers::list),
    (PresentationMode::ShortList, renderers::short_list),
    (PresentationMode::Card, renderers::card),
    (PresentationMode::Table, renderers::table),
];

// Accounts are provisioned server-side.
const USER_MODES: &[(PresentationMode, Renderer)] = &[
    (PresentationMode::View, renderers::details),
    (PresentationMode::Edit, renderers::form),
    (PresentationMode::List, renderers::list),
    (PresentationMode::ShortList, renderers::short_list),
    (PresentationMode::Card, renderers::card),
    (PresentationMode::Table, renderers::table),
];

/// Deserializes `raw` into `T`, never failing.
///
/// Non-object payloads yield `T::default()`. When the payload as a whole does
/// not deserialize, fields are admitted one at a time and any field whose
/// value has the wrong shape is dropped in favour of its default.
pub fn convert_record<T>(raw: &Value) -> T
where
    T: DeserializeOwned + Serialize + Default,
{
    let Value::Object(fields) = raw else {
        return T::default();
    };

    if let Ok(record) = serde_json::from_value::<T>(raw.clone()) {
        return record;
    }

    let mut accepted = Map::new();
    for (key, value) in fields {
        let mut candidate = accepted.clone();
        candidate.insert(key.clone(), value.clone());
        if serde_json::from_value::<T>(Value::Object(candidate.clone())).is_ok() {
            accepted = candidate;
        } else {
            tracing::debug!("[Registry] dropping malformed field '{}'", key);
        }
    }

    serde_json::from_value(Value::Object(accepted)).unwrap_or_default()
}

fn object(value: Value) -> Map<String, Value> {
    match value {
        Value::Object(map) => map,
        _ => Map::new(),
    }
}

fn convert_agent(raw: &Value) -> Entity {
    Entity::Agent(convert_record::<Agent>(raw))
}

fn convert_model(raw: &Value) -> Entity {
    Entity::Model(convert_record::<Model>(raw))
}

fn convert_prompt(raw: &Value) -> Entity {
    Entity::Prompt(convert_record::<Prompt>(raw))
}

fn convert_task(raw: &Value) -> Entity {
    Entity::Task(convert_record::<Task>(raw))
}

fn convert_chat(raw: &Value) -> Entity {
    Entity::Chat(convert_record::<Chat>(raw))
}

fn convert_message(raw: &Value) -> Entity {
    Entity::Message(convert_record::<Message>(raw))
}

fn convert_file(raw: &Value) -> Entity {
    Entity::File(convert_record::<File>(raw))
}

fn convert_parameter(raw: &Value) -> Entity {
    Entity::Parameter(convert_record::<Parameter>(raw))
}

fn convert_api(raw: &Value) -> Entity {
    Entity::Api(convert_record::<Api>(raw))
}

fn convert_task_response(raw: &Value) -> Entity {
    Entity::TaskResponse(convert_record::<TaskResponse>(raw))
}

fn convert_url_reference(raw: &Value) -> Entity {
    Entity::UrlReference(convert_record::<UrlReference>(raw))
}

fn convert_user(raw: &Value) -> Entity {
    Entity::User(convert_record::<User>(raw))
}

fn agent_form() -> Map<String, Value> {
    object(json!({
        "name": "",
        "system_message": "You are a helpful assistant.",
        "tasks": [],
        "max_consecutive_replies": 10,
        "has_code_exec": false,
    }))
}

fn model_form() -> Map<String, Value> {
    object(json!({
        "short_name": "",
        "model_name": "",
        "api_name": "",
        "temperature": 0.7,
        "ctx_size": 4096,
    }))
}

fn prompt_form() -> Map<String, Value> {
    object(json!({ "name": "", "content": "", "is_templated": false }))
}

fn task_form() -> Map<String, Value> {
    object(json!({
        "task_name": "",
        "task_description": "",
        "task_type": "PromptAgentTask",
        "prompts": [],
        "input_variables": [],
    }))
}

fn chat_form() -> Map<String, Value> {
    object(json!({ "name": "New Chat", "messages": [], "functions": [] }))
}

fn message_form() -> Map<String, Value> {
    object(json!({ "role": "user", "content": "" }))
}

fn file_form() -> Map<String, Value> {
    object(json!({ "filename": "", "type": "file", "storage_path": "" }))
}

fn parameter_form() -> Map<String, Value> {
    object(json!({ "type": "string", "description": "", "enum": [] }))
}

fn api_form() -> Map<String, Value> {
    object(json!({ "api_name": "", "is_active": true }))
}

fn task_response_form() -> Map<String, Value> {
    object(json!({ "task_name": "", "result_code": 0 }))
}

fn url_reference_form() -> Map<String, Value> {
    object(json!({ "url": "https://", "title": "", "content": "" }))
}

fn user_form() -> Map<String, Value> {
    object(json!({ "name": "", "email": "", "role": "user" }))
}

static AGENT: RegistryEntry = RegistryEntry {
    kind: EntityKind::Agent,
    convert: convert_agent,
    default_form: agent_form,
    renderers: ALL_MODES,
};

static MODEL: RegistryEntry = RegistryEntry {
    kind: EntityKind::Model,
    convert: convert_model,
    default_form: model_form,
    renderers: ALL_MODES,
};

static PROMPT: RegistryEntry = RegistryEntry {
    kind: EntityKind::Prompt,
    convert: convert_prompt,
    default_form: prompt_form,
    renderers: ALL_MODES,
};

static TASK: RegistryEntry = RegistryEntry {
    kind: EntityKind::Task,
    convert: convert_task,
    default_form: task_form,
    renderers: ALL_MODES,
};

static CHAT: RegistryEntry = RegistryEntry {
    kind: EntityKind::Chat,
    convert: convert_chat,
    default_form: chat_form,
    renderers: CHAT_MODES,
};

static MESSAGE: RegistryEntry = RegistryEntry {
    kind: EntityKind::Message,
    convert: convert_message,
    default_form: message_form,
    renderers: MESSAGE_MODES,
};

static FILE: RegistryEntry = RegistryEntry {
    kind: EntityKind::File,
    convert: convert_file,
    default_form: file_form,
    renderers: ALL_MODES,
};

static PARAMETER: RegistryEntry = RegistryEntry {
    kind: EntityKind::Parameter,
    convert: convert_parameter,
    default_form: parameter_form,
    renderers: ALL_MODES,
};

static API: RegistryEntry = RegistryEntry {
    kind: EntityKind::Api,
    convert: convert_api,
    default_form: api_form,
    renderers: ALL_MODES,
};

static TASK_RESPONSE: RegistryEntry = RegistryEntry {
    kind: EntityKind::TaskResponse,
    convert: convert_task_response,
    default_form: task_response_form,
    renderers: READ_ONLY_MODES,
};

static URL_REFERENCE: RegistryEntry = RegistryEntry {
    kind: EntityKind::UrlReference,
    convert: convert_url_reference,
    default_form: url_reference_form,
    renderers: ALL_MODES,
};

static USER: RegistryEntry = RegistryEntry {
    kind: EntityKind::User,
    convert: convert_user,
    default_form: user_form,
    renderers: USER_MODES,
};

/// Returns the registry entry for `kind`.
pub fn entry(kind: EntityKind) -> &'static RegistryEntry {
    match kind {
        EntityKind::Agent => &AGENT,
        EntityKind::Model => &MODEL,
        EntityKind::Prompt => &PROMPT,
        EntityKind::Task => &TASK,
        EntityKind::Chat => &CHAT,
        EntityKind::Message => &MESSAGE,
        EntityKind::File => &FILE,
        EntityKind::Parameter => &PARAMETER,
        EntityKind::Api => &API,
        EntityKind::TaskResponse => &TASK_RESPONSE,
        EntityKind::UrlReference => &URL_REFERENCE,
        EntityKind::User => &USER,
    }
}

/// Shorthand for `entry(kind).convert`.
pub fn convert(kind: EntityKind, raw: &Value) -> Entity {
    (entry(kind).convert)(raw)
}

/// Shorthand for `entry(kind).default_form`.
pub fn default_form(kind: EntityKind) -> Map<String, Value> {
    (entry(kind).default_form)()
}

/// Shallow-merges `partial` over the raw form of `entity` and re-normalizes.
///
/// Keys absent from `partial` keep their current value; keys present replace
/// it outright. Malformed values fall back to defaults through `convert`.
pub fn merge(entity: &Entity, partial: &Map<String, Value>) -> Entity {
    let mut raw = match entity.to_raw() {
        Value::Object(map) => map,
        _ => Map::new(),
    };
    for (key, value) in partial {
        raw.insert(key.clone(), value.clone());
    }
    convert(entity.kind(), &Value::Object(raw))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entity::MessageRole;

    fn raw_samples() -> Vec<Value> {
        vec![
            Value::Null,
            json!(42),
            json!({}),
            json!({ "id": "x-1", "name": "Researcher", "unknown": true }),
            json!({ "id": 7, "name": ["wrong"], "temperature": "hot", "tasks": "nope" }),
            json!({
                "id": "c-1",
                "created_at": "2024-05-01T10:00:00Z",
                "messages": [{ "role": "user", "content": "hi", "created_at": "2024-05-01T10:00:01Z" }],
                "functions": ["t-1"],
                "role": "assistant",
                "content": "hello",
                "references": { "files": ["f-1"], "task_responses": [] },
                "temperature": 1,
                "default": null,
            }),
        ]
    }

    #[test]
    fn test_every_kind_has_matching_entry() {
        for kind in EntityKind::all() {
            let entry = entry(kind);
            assert_eq!(entry.kind, kind);
            assert!(entry.presentations().next().is_some());
        }
    }

    #[test]
    fn test_convert_is_total_and_idempotent() {
        for kind in EntityKind::all() {
            for raw in raw_samples() {
                let once = convert(kind, &raw);
                assert_eq!(once.kind(), kind);
                let twice = convert(kind, &once.to_raw());
                assert_eq!(twice, once, "convert not idempotent for {kind} on {raw}");
            }
        }
    }

    #[test]
    fn test_convert_drops_malformed_fields_only() {
        let entity = convert(
            EntityKind::Model,
            &json!({ "id": "m-1", "short_name": "gpt", "temperature": "hot" }),
        );
        let Entity::Model(model) = entity else {
            panic!("expected model");
        };
        assert_eq!(model.base.id.as_deref(), Some("m-1"));
        assert_eq!(model.short_name, "gpt");
        assert_eq!(model.temperature, 0.0);
    }

    #[test]
    fn test_malformed_message_keeps_its_siblings() {
        let chat = convert(
            EntityKind::Chat,
            &json!({
                "id": "c-1",
                "messages": [
                    { "role": "user", "content": "one", "created_at": "2024-05-01T10:00:00Z" },
                    { "role": "assistant", "content": "reply", "created_at": "2024-05-01T10:01:00" },
                    "not a message"
                ],
            }),
        )
        .into_chat()
        .unwrap();

        let contents: Vec<_> = chat.messages.iter().map(|m| m.content.as_str()).collect();
        assert_eq!(contents, vec!["one", "reply", ""]);
        assert_eq!(chat.messages[1].role, MessageRole::Assistant);
        assert!(chat.messages[1].base.created_at.is_none());
    }

    #[test]
    fn test_default_form_converts_cleanly() {
        for kind in EntityKind::all() {
            let form = default_form(kind);
            let entity = convert(kind, &Value::Object(form.clone()));
            let raw = entity.to_raw();
            for key in form.keys() {
                assert!(raw.get(key).is_some(), "{kind}: default form key '{key}' lost");
            }
        }
    }

    #[test]
    fn test_merge_is_shallow() {
        let chat = convert(
            EntityKind::Chat,
            &json!({ "id": "c-1", "name": "Old", "functions": ["t-1"] }),
        );
        let mut partial = Map::new();
        partial.insert("name".to_string(), json!("New"));
        let merged = merge(&chat, &partial);
        let chat = merged.into_chat().unwrap();
        assert_eq!(chat.name, "New");
        assert_eq!(chat.functions, vec!["t-1".to_string()]);
        assert_eq!(chat.base.id.as_deref(), Some("c-1"));
    }

    #[test]
    fn test_message_form_is_user_role() {
        let Entity::Message(message) = convert(EntityKind::Message, &Value::Object(default_form(EntityKind::Message))) else {
            panic!("expected message");
        };
        assert_eq!(message.role, MessageRole::User);
    }

    #[test]
    fn test_supported_modes() {
        assert!(entry(EntityKind::Agent).supports(PresentationMode::Card));
        assert!(!entry(EntityKind::TaskResponse).supports(PresentationMode::Create));
        assert!(!entry(EntityKind::Message).supports(PresentationMode::Edit));
        assert!(!entry(EntityKind::User).supports(PresentationMode::Create));
    }

    #[test]
    fn test_each_mode_declared_once() {
        for kind in EntityKind::all() {
            let modes: Vec<_> = entry(kind).presentations().collect();
            let mut unique = modes.clone();
            unique.sort_by_key(|mode| mode.to_string());
            unique.dedup();
            assert_eq!(unique.len(), modes.len(), "{kind} declares a mode twice");
        }
    }
}

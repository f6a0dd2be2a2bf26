//! Chat orchestrator.
//!
//! Session semantics on top of the data service: send a message, generate a
//! reply, regenerate the last reply, attach tasks and task results. After any
//! change to persisted state the session is refreshed from the service; local
//! state is only ever a speculative preview.

use super::session::{ChatSession, SessionStatus};
use super::updater::ChatUpdater;
use atrium_core::entity::{Agent, Chat, Entity, EntityKind, Message, MessageRole};
use atrium_core::error::{AtriumError, Result};
use atrium_core::registry;
use atrium_core::service::DataService;
use serde_json::{Map, Value, json};
use std::sync::Arc;
use tokio::sync::{Mutex, RwLock};

/// What a generate request ended up doing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GenerateOutcome {
    /// A reply was generated and the session refreshed.
    Generated,
    /// The service declined to generate.
    Declined,
    /// Nothing was requested: no chat selected or a generation already running.
    Skipped,
}

/// Drives one chat session.
///
/// Cloning yields another handle to the same session.
#[derive(Clone)]
pub struct ChatOrchestrator {
    service: Arc<dyn DataService>,
    updater: ChatUpdater,
    session: Arc<RwLock<ChatSession>>,
    /// Serializes writes to the persisted message list.
    history: Arc<Mutex<()>>,
}

impl ChatOrchestrator {
    pub fn new(service: Arc<dyn DataService>) -> Self {
        Self {
            updater: ChatUpdater::new(service.clone()),
            service,
            session: Arc::new(RwLock::new(ChatSession::default())),
            history: Arc::new(Mutex::new(())),
        }
    }

    /// A copy of the current session for rendering.
    pub async fn snapshot(&self) -> ChatSession {
        self.session.read().await.clone()
    }

    pub async fn status(&self) -> SessionStatus {
        self.session.read().await.status()
    }

    pub async fn is_task_in_chat(&self, task_id: &str) -> bool {
        self.session.read().await.is_task_in_chat(task_id)
    }

    pub async fn is_task_result_in_chat(&self, task_result_id: &str) -> bool {
        self.session.read().await.is_task_result_in_chat(task_result_id)
    }

    async fn record_error(&self, err: &AtriumError) {
        self.session.write().await.last_error = Some(err.clone());
    }

    /// Loads `chat_id` and replaces the session's chat, messages and agent with it.
    ///
    /// Nothing from the previous chat is merged in. If another selection starts
    /// before this one resolves, this one is dropped.
    pub async fn select_chat(&self, chat_id: &str) -> Result<()> {
        let epoch = {
            let mut session = self.session.write().await;
            session.selection_epoch += 1;
            session.selection_epoch
        };
        tracing::debug!("[ChatOrchestrator] select_chat {}", chat_id);

        let chat = match self.load_chat(chat_id).await {
            Ok(chat) => chat,
            Err(err) => {
                tracing::warn!("[ChatOrchestrator] failed to load chat {}: {}", chat_id, err);
                self.record_error(&err).await;
                return Err(err);
            }
        };
        let agent = match &chat.agent_id {
            Some(agent_id) => self.load_agent(agent_id).await,
            None => None,
        };

        let mut session = self.session.write().await;
        if session.selection_epoch != epoch {
            tracing::debug!("[ChatOrchestrator] dropping superseded selection of {}", chat_id);
            return Ok(());
        }
        session.adopt(chat, agent);
        session.last_error = None;
        Ok(())
    }

    async fn load_chat(&self, chat_id: &str) -> Result<Chat> {
        let raw = self.service.fetch(EntityKind::Chat, chat_id).await?;
        registry::convert(EntityKind::Chat, &raw)
            .into_chat()
            .ok_or_else(|| AtriumError::internal("chat converter returned another kind"))
    }

    async fn load_agent(&self, agent_id: &str) -> Option<Agent> {
        match self.service.fetch(EntityKind::Agent, agent_id).await {
            Ok(raw) => registry::convert(EntityKind::Agent, &raw).into_agent(),
            Err(err) => {
                tracing::warn!("[ChatOrchestrator] agent {} unavailable: {}", agent_id, err);
                None
            }
        }
    }

    /// Creates a chat and selects it.
    pub async fn new_chat(&self, name: &str, agent_id: Option<&str>) -> Result<String> {
        let mut form = registry::default_form(EntityKind::Chat);
        form.insert("name".to_string(), json!(name));
        if let Some(agent_id) = agent_id {
            form.insert("agent_id".to_string(), json!(agent_id));
        }
        let created = self
            .service
            .create(EntityKind::Chat, Value::Object(form))
            .await;
        let chat_id = match created.map(|raw| registry::convert(EntityKind::Chat, &raw)) {
            Ok(chat) => chat
                .id()
                .map(str::to_string)
                .ok_or_else(|| AtriumError::data_access("created chat has no id"))?,
            Err(err) => {
                self.record_error(&err).await;
                return Err(err);
            }
        };
        tracing::info!("[ChatOrchestrator] created chat {}", chat_id);
        self.select_chat(&chat_id).await?;
        Ok(chat_id)
    }

    /// Loads every task into `available_tasks`.
    pub async fn load_available_tasks(&self) -> Result<()> {
        match self.service.fetch_all(EntityKind::Task).await {
            Ok(raws) => {
                let tasks = raws
                    .iter()
                    .filter_map(|raw| registry::convert(EntityKind::Task, raw).into_task())
                    .collect();
                self.session.write().await.available_tasks = tasks;
                Ok(())
            }
            Err(err) => {
                tracing::warn!("[ChatOrchestrator] failed to load tasks: {}", err);
                self.record_error(&err).await;
                Err(err)
            }
        }
    }

    /// Appends `message` locally, persists it, then requests a reply.
    ///
    /// The local append is not rolled back if persisting fails, so the message
    /// stays visible for a manual retry. Generation is requested either way,
    /// but only for `chat_id`: if another chat is selected when the reply
    /// would start, generation is `Skipped`.
    pub async fn send_message(&self, chat_id: &str, message: Message) -> Result<GenerateOutcome> {
        {
            let mut session = self.session.write().await;
            if session.chat_id.as_deref() == Some(chat_id) {
                session.messages.push(message.clone());
            }
        }
        tracing::debug!("[ChatOrchestrator] send_message chat={} role={}", chat_id, message.role);

        let sent = {
            let _history = self.history.lock().await;
            self.service.send_message(chat_id, &message).await
        };
        let send_error = match sent {
            Ok(_) => {
                if self.select_chat(chat_id).await.is_err() {
                    tracing::warn!("[ChatOrchestrator] refresh after send failed for {}", chat_id);
                }
                None
            }
            Err(err) => {
                tracing::warn!("[ChatOrchestrator] failed to persist message in {}: {}", chat_id, err);
                self.record_error(&err).await;
                Some(err)
            }
        };

        let outcome = match self.claim_generation(Some(chat_id)).await {
            Some(claimed) => self.run_generation(claimed).await,
            None => Ok(GenerateOutcome::Skipped),
        };
        match send_error {
            Some(err) => Err(err),
            None => outcome,
        }
    }

    /// Requests a reply for the selected chat.
    ///
    /// A no-op (`Skipped`) while another generation is running or when no chat
    /// is selected. On success the chat is re-fetched before the session goes
    /// back to idle; on failure the session goes idle without touching messages.
    pub async fn generate_response(&self) -> Result<GenerateOutcome> {
        match self.claim_generation(None).await {
            Some(chat_id) => self.run_generation(chat_id).await,
            None => Ok(GenerateOutcome::Skipped),
        }
    }

    /// Sets `is_generating` for the selected chat, if it is idle and (when
    /// given) is `expected`. Returns the claimed chat id.
    async fn claim_generation(&self, expected: Option<&str>) -> Option<String> {
        let mut session = self.session.write().await;
        let chat_id = session.chat_id.clone()?;
        if expected.is_some_and(|expected| expected != chat_id) {
            tracing::debug!(
                "[ChatOrchestrator] not generating for {:?}: {} is selected",
                expected,
                chat_id
            );
            return None;
        }
        if session.is_generating {
            tracing::debug!("[ChatOrchestrator] generation already running for {}", chat_id);
            return None;
        }
        session.is_generating = true;
        Some(chat_id)
    }

    /// Generates for a claimed chat and releases the claim on every path.
    async fn run_generation(&self, chat_id: String) -> Result<GenerateOutcome> {
        tracing::info!("[ChatOrchestrator] generating response for {}", chat_id);

        let result = self.service.generate_response(&chat_id).await;
        let outcome = match result {
            Ok(true) => match self.select_chat(&chat_id).await {
                Ok(()) => Ok(GenerateOutcome::Generated),
                Err(err) => Err(err),
            },
            Ok(false) => {
                let err = AtriumError::generation(format!("service declined to generate for {chat_id}"));
                tracing::warn!("[ChatOrchestrator] {}", err);
                self.record_error(&err).await;
                Ok(GenerateOutcome::Declined)
            }
            Err(err) => {
                tracing::warn!("[ChatOrchestrator] generation failed for {}: {}", chat_id, err);
                self.record_error(&err).await;
                Err(err)
            }
        };

        self.session.write().await.is_generating = false;
        outcome
    }

    /// Trims the chat back to its latest user message, persists that, and
    /// generates a new reply.
    ///
    /// The session counts as generating from the start, so a concurrent send
    /// or generate cannot start a reply while the trimmed history is being
    /// written, and a concurrent send persists after the trimmed list instead
    /// of being overwritten by it. Local state is then reconciled from the
    /// service.
    pub async fn regenerate_response(&self) -> Result<GenerateOutcome> {
        let Some(chat_id) = self.claim_generation(None).await else {
            return Ok(GenerateOutcome::Skipped);
        };
        let trimmed = trim_to_last_user(&self.session.read().await.messages);
        tracing::info!(
            "[ChatOrchestrator] regenerating {} from {} messages",
            chat_id,
            trimmed.len()
        );

        let messages: Vec<Value> = trimmed
            .iter()
            .map(|message| Entity::Message(message.clone()).to_raw())
            .collect();
        let mut fields = Map::new();
        fields.insert("messages".to_string(), Value::Array(messages));

        let patched = {
            let _history = self.history.lock().await;
            self.updater.patch(&chat_id, fields).await
        };
        if let Err(err) = patched {
            tracing::warn!("[ChatOrchestrator] failed to persist trimmed history: {}", err);
            let mut session = self.session.write().await;
            session.is_generating = false;
            session.last_error = Some(err.clone());
            return Err(err);
        }
        if let Err(err) = self.select_chat(&chat_id).await {
            self.session.write().await.is_generating = false;
            return Err(err);
        }

        self.run_generation(chat_id).await
    }

    /// Attaches `task_id` to the chat's functions. Returns `false` if it was
    /// already attached or no chat is selected.
    pub async fn add_task_to_chat(&self, task_id: &str) -> Result<bool> {
        let chat_id = {
            let mut session = self.session.write().await;
            let Some(chat_id) = session.chat_id.clone() else {
                return Ok(false);
            };
            if session.is_task_in_chat(task_id) {
                return Ok(false);
            }
            session.functions.push(task_id.to_string());
            chat_id
        };

        let task_id_owned = task_id.to_string();
        let updated = self
            .updater
            .update(&chat_id, move |chat| {
                if !chat.functions.contains(&task_id_owned) {
                    chat.functions.push(task_id_owned);
                }
                Ok(())
            })
            .await;

        if let Err(err) = updated {
            tracing::warn!("[ChatOrchestrator] failed to attach task {}: {}", task_id, err);
            let mut session = self.session.write().await;
            session.functions.retain(|id| id != task_id);
            session.last_error = Some(err.clone());
            return Err(err);
        }

        self.select_chat(&chat_id).await?;
        Ok(true)
    }

    /// Attaches a task result to the chat. Returns `false` if it was already
    /// attached or no chat is selected.
    pub async fn add_task_result_to_chat(&self, task_result_id: &str) -> Result<bool> {
        let chat_id = {
            let mut session = self.session.write().await;
            let Some(chat_id) = session.chat_id.clone() else {
                return Ok(false);
            };
            if session.is_task_result_in_chat(task_result_id) {
                return Ok(false);
            }
            session.pending_task_results.insert(task_result_id.to_string());
            chat_id
        };

        if let Err(err) = self.service.add_task_response(&chat_id, task_result_id).await {
            tracing::warn!(
                "[ChatOrchestrator] failed to attach task result {}: {}",
                task_result_id,
                err
            );
            let mut session = self.session.write().await;
            session.pending_task_results.remove(task_result_id);
            session.last_error = Some(err.clone());
            return Err(err);
        }

        self.select_chat(&chat_id).await?;
        Ok(true)
    }
}

/// Drops trailing non-user messages: keeps everything up to and including the
/// most recent user message.
pub fn trim_to_last_user(messages: &[Message]) -> Vec<Message> {
    match messages.iter().rposition(|m| m.role == MessageRole::User) {
        Some(last_user) => messages[..=last_user].to_vec(),
        None => Vec::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use std::sync::Mutex;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use tokio::sync::Notify;

    /// Scripted chat service recording the calls the orchestrator makes.
    #[derive(Default)]
    struct ScriptedService {
        chat: Mutex<Value>,
        agent: Option<Value>,
        update_gate: Option<Arc<Notify>>,
        generate_gate: Option<Arc<Notify>>,
        generate_calls: AtomicUsize,
        fail_generate: bool,
        fail_send: bool,
        fail_update: bool,
        patches: Mutex<Vec<Value>>,
        task_response_calls: AtomicUsize,
    }

    impl ScriptedService {
        fn with_chat(chat: Value) -> Self {
            Self {
                chat: Mutex::new(chat),
                ..Default::default()
            }
        }
    }

    #[async_trait]
    impl DataService for ScriptedService {
        async fn fetch_all(&self, _kind: EntityKind) -> Result<Vec<Value>> {
            Ok(vec![json!({ "id": "t-1", "task_name": "search" })])
        }

        async fn fetch(&self, kind: EntityKind, id: &str) -> Result<Value> {
            match kind {
                EntityKind::Chat => Ok(self.chat.lock().unwrap().clone()),
                EntityKind::Agent => match &self.agent {
                    Some(agent) if agent["id"] == id => Ok(agent.clone()),
                    _ => Err(AtriumError::not_found(kind.label(), id)),
                },
                _ => Err(AtriumError::not_found(kind.label(), id)),
            }
        }

        async fn create(&self, _kind: EntityKind, _partial: Value) -> Result<Value> {
            Err(AtriumError::data_access("not scripted"))
        }

        async fn update(&self, _kind: EntityKind, _id: &str, partial: Value) -> Result<Value> {
            if let Some(gate) = &self.update_gate {
                gate.notified().await;
            }
            if self.fail_update {
                return Err(AtriumError::data_access("update rejected"));
            }
            self.patches.lock().unwrap().push(partial.clone());
            let mut chat = self.chat.lock().unwrap();
            if let (Value::Object(current), Value::Object(patch)) = (&mut *chat, partial) {
                for (key, value) in patch {
                    current.insert(key, value);
                }
            }
            Ok(chat.clone())
        }

        async fn send_message(&self, _chat_id: &str, message: &Message) -> Result<Value> {
            if self.fail_send {
                return Err(AtriumError::data_access("send rejected"));
            }
            let mut chat = self.chat.lock().unwrap();
            let raw = Entity::Message(message.clone()).to_raw();
            if let Some(Value::Array(messages)) = chat.get_mut("messages") {
                messages.push(raw);
            }
            Ok(chat.clone())
        }

        async fn generate_response(&self, _chat_id: &str) -> Result<bool> {
            self.generate_calls.fetch_add(1, Ordering::SeqCst);
            if let Some(gate) = &self.generate_gate {
                gate.notified().await;
            }
            if self.fail_generate {
                return Err(AtriumError::data_access("model offline"));
            }
            let mut chat = self.chat.lock().unwrap();
            let reply = Entity::Message(Message::assistant("generated")).to_raw();
            if let Some(Value::Array(messages)) = chat.get_mut("messages") {
                messages.push(reply);
            }
            Ok(true)
        }

        async fn add_task_response(&self, _chat_id: &str, task_response_id: &str) -> Result<Value> {
            self.task_response_calls.fetch_add(1, Ordering::SeqCst);
            let mut chat = self.chat.lock().unwrap();
            let mut message = Message::with_role(MessageRole::Tool, "result");
            message.references.task_responses = Some(vec![task_response_id.to_string()]);
            let raw = Entity::Message(message).to_raw();
            if let Some(Value::Array(messages)) = chat.get_mut("messages") {
                messages.push(raw);
            }
            Ok(chat.clone())
        }
    }

    fn message(role: &str, content: &str, minute: u32) -> Value {
        json!({
            "role": role,
            "content": content,
            "created_at": format!("2024-05-01T10:{minute:02}:00Z"),
        })
    }

    fn chat_with(messages: Vec<Value>) -> Value {
        json!({ "id": "c-1", "name": "demo", "messages": messages, "functions": [] })
    }

    async fn selected(service: ScriptedService) -> (Arc<ScriptedService>, ChatOrchestrator) {
        let service = Arc::new(service);
        let orchestrator = ChatOrchestrator::new(service.clone());
        orchestrator.select_chat("c-1").await.unwrap();
        (service, orchestrator)
    }

    #[test]
    fn test_trim_to_last_user() {
        let roles = [
            MessageRole::User,
            MessageRole::Assistant,
            MessageRole::User,
            MessageRole::Assistant,
            MessageRole::Assistant,
        ];
        let messages: Vec<Message> = roles
            .iter()
            .enumerate()
            .map(|(i, role)| Message::with_role(*role, format!("m{i}")))
            .collect();

        let trimmed = trim_to_last_user(&messages);
        let contents: Vec<_> = trimmed.iter().map(|m| m.content.as_str()).collect();
        assert_eq!(contents, vec!["m0", "m1", "m2"]);

        assert!(trim_to_last_user(&[Message::assistant("only")]).is_empty());
    }

    #[tokio::test]
    async fn test_select_chat_replaces_session() {
        let (service, orchestrator) = selected(ScriptedService::with_chat(chat_with(vec![
            message("assistant", "second", 2),
            message("user", "first", 1),
        ])))
        .await;

        let session = orchestrator.snapshot().await;
        assert_eq!(session.chat_id.as_deref(), Some("c-1"));
        let contents: Vec<_> = session.messages.iter().map(|m| m.content.as_str()).collect();
        assert_eq!(contents, vec!["first", "second"]);

        *service.chat.lock().unwrap() = json!({ "id": "c-2", "name": "other" });
        orchestrator.select_chat("c-2").await.unwrap();
        let session = orchestrator.snapshot().await;
        assert_eq!(session.chat_id.as_deref(), Some("c-2"));
        assert!(session.messages.is_empty());
    }

    #[tokio::test]
    async fn test_regenerate_persists_trimmed_history_first() {
        let (service, orchestrator) = selected(ScriptedService::with_chat(chat_with(vec![
            message("user", "U1", 1),
            message("assistant", "A1", 2),
            message("user", "U2", 3),
            message("assistant", "A2", 4),
            message("assistant", "A3", 5),
        ])))
        .await;

        let outcome = orchestrator.regenerate_response().await.unwrap();
        assert_eq!(outcome, GenerateOutcome::Generated);

        let patches = service.patches.lock().unwrap().clone();
        let persisted: Vec<_> = patches[0]["messages"]
            .as_array()
            .unwrap()
            .iter()
            .map(|m| m["content"].as_str().unwrap().to_string())
            .collect();
        assert_eq!(persisted, vec!["U1", "A1", "U2"]);
        assert_eq!(service.generate_calls.load(Ordering::SeqCst), 1);

        let contents: Vec<_> = orchestrator
            .snapshot()
            .await
            .messages
            .iter()
            .map(|m| m.content.clone())
            .collect();
        assert_eq!(contents, vec!["U1", "A1", "U2", "generated"]);
    }

    #[tokio::test]
    async fn test_regenerate_without_chat_is_noop() {
        let service = Arc::new(ScriptedService::default());
        let orchestrator = ChatOrchestrator::new(service.clone());
        assert_eq!(
            orchestrator.regenerate_response().await.unwrap(),
            GenerateOutcome::Skipped
        );
        assert!(service.patches.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_second_generate_while_generating_is_noop() {
        let gate = Arc::new(Notify::new());
        let (service, orchestrator) = selected(ScriptedService {
            chat: Mutex::new(chat_with(vec![message("user", "hi", 1)])),
            generate_gate: Some(gate.clone()),
            ..Default::default()
        })
        .await;

        let first = {
            let orchestrator = orchestrator.clone();
            tokio::spawn(async move { orchestrator.generate_response().await })
        };
        tokio::task::yield_now().await;
        assert_eq!(orchestrator.status().await, SessionStatus::Generating);

        let second = orchestrator.generate_response().await.unwrap();
        assert_eq!(second, GenerateOutcome::Skipped);
        assert_eq!(service.generate_calls.load(Ordering::SeqCst), 1);

        gate.notify_one();
        assert_eq!(first.await.unwrap().unwrap(), GenerateOutcome::Generated);
        assert_eq!(orchestrator.status().await, SessionStatus::Idle);
    }

    #[tokio::test]
    async fn test_generation_failure_resets_flag_and_keeps_messages() {
        let (_service, orchestrator) = selected(ScriptedService {
            chat: Mutex::new(chat_with(vec![message("user", "hi", 1)])),
            fail_generate: true,
            ..Default::default()
        })
        .await;

        assert!(orchestrator.generate_response().await.is_err());

        let session = orchestrator.snapshot().await;
        assert!(!session.is_generating);
        assert_eq!(session.messages.len(), 1);
        assert!(session.last_error.is_some());
    }

    #[tokio::test]
    async fn test_failed_send_keeps_optimistic_message() {
        let (service, orchestrator) = selected(ScriptedService {
            chat: Mutex::new(chat_with(vec![message("user", "hi", 1)])),
            fail_send: true,
            fail_generate: true,
            ..Default::default()
        })
        .await;

        let result = orchestrator.send_message("c-1", Message::user("again")).await;
        assert!(matches!(result, Err(AtriumError::DataAccess(ref msg)) if msg == "send rejected"));

        let session = orchestrator.snapshot().await;
        assert!(session.messages.iter().any(|m| m.content == "again"));
        assert_eq!(service.generate_calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_add_task_twice_attaches_once() {
        let (service, orchestrator) =
            selected(ScriptedService::with_chat(chat_with(Vec::new()))).await;

        assert!(orchestrator.add_task_to_chat("t-1").await.unwrap());
        assert!(!orchestrator.add_task_to_chat("t-1").await.unwrap());

        let session = orchestrator.snapshot().await;
        assert_eq!(session.functions, vec!["t-1".to_string()]);
        assert_eq!(service.patches.lock().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_add_task_result_twice_calls_service_once() {
        let (service, orchestrator) =
            selected(ScriptedService::with_chat(chat_with(Vec::new()))).await;

        assert!(orchestrator.add_task_result_to_chat("tr-1").await.unwrap());
        assert!(!orchestrator.add_task_result_to_chat("tr-1").await.unwrap());

        assert_eq!(service.task_response_calls.load(Ordering::SeqCst), 1);
        assert!(orchestrator.is_task_result_in_chat("tr-1").await);
    }

    #[tokio::test]
    async fn test_load_available_tasks() {
        let (_service, orchestrator) =
            selected(ScriptedService::with_chat(chat_with(Vec::new()))).await;
        orchestrator.load_available_tasks().await.unwrap();
        let session = orchestrator.snapshot().await;
        assert_eq!(session.available_tasks.len(), 1);
        assert_eq!(session.available_tasks[0].task_name, "search");
    }

    fn contents(messages: &[Value]) -> Vec<String> {
        messages
            .iter()
            .map(|m| m["content"].as_str().unwrap_or_default().to_string())
            .collect()
    }

    #[tokio::test]
    async fn test_select_chat_loads_and_resets_agent() {
        let mut chat = chat_with(Vec::new());
        chat["agent_id"] = json!("a-1");
        let (service, orchestrator) = selected(ScriptedService {
            chat: Mutex::new(chat),
            agent: Some(json!({ "id": "a-1", "name": "Planner" })),
            ..Default::default()
        })
        .await;

        let agent = orchestrator.snapshot().await.agent.unwrap();
        assert_eq!(agent.name, "Planner");

        *service.chat.lock().unwrap() = json!({ "id": "c-2", "name": "solo" });
        orchestrator.select_chat("c-2").await.unwrap();
        let session = orchestrator.snapshot().await;
        assert_eq!(session.chat_id.as_deref(), Some("c-2"));
        assert!(session.agent.is_none());
    }

    #[tokio::test]
    async fn test_missing_agent_still_selects_chat() {
        let mut chat = chat_with(Vec::new());
        chat["agent_id"] = json!("gone");
        let (_service, orchestrator) = selected(ScriptedService::with_chat(chat)).await;

        let session = orchestrator.snapshot().await;
        assert_eq!(session.chat_id.as_deref(), Some("c-1"));
        assert!(session.agent.is_none());
    }

    #[tokio::test]
    async fn test_failed_send_to_other_chat_does_not_generate() {
        let (service, orchestrator) = selected(ScriptedService {
            chat: Mutex::new(chat_with(vec![message("user", "hi", 1)])),
            fail_send: true,
            ..Default::default()
        })
        .await;

        let result = orchestrator.send_message("c-2", Message::user("elsewhere")).await;
        assert!(result.is_err());
        assert_eq!(service.generate_calls.load(Ordering::SeqCst), 0);

        let session = orchestrator.snapshot().await;
        assert_eq!(session.messages.len(), 1);
        assert!(!session.is_generating);
    }

    #[tokio::test]
    async fn test_send_during_regenerate_is_not_overwritten() {
        let gate = Arc::new(Notify::new());
        let (service, orchestrator) = selected(ScriptedService {
            chat: Mutex::new(chat_with(vec![
                message("user", "U1", 1),
                message("assistant", "A1", 2),
            ])),
            update_gate: Some(gate.clone()),
            ..Default::default()
        })
        .await;

        let regenerating = {
            let orchestrator = orchestrator.clone();
            tokio::spawn(async move { orchestrator.regenerate_response().await })
        };
        tokio::task::yield_now().await;
        assert_eq!(orchestrator.status().await, SessionStatus::Generating);

        let sending = {
            let orchestrator = orchestrator.clone();
            tokio::spawn(async move { orchestrator.send_message("c-1", Message::user("U2")).await })
        };
        tokio::task::yield_now().await;

        gate.notify_one();
        assert_eq!(regenerating.await.unwrap().unwrap(), GenerateOutcome::Generated);
        assert!(sending.await.unwrap().is_ok());

        let stored = service.chat.lock().unwrap()["messages"].as_array().unwrap().clone();
        let stored = contents(&stored);
        assert!(stored.contains(&"U1".to_string()));
        assert!(stored.contains(&"U2".to_string()));
        assert!(!stored.contains(&"A1".to_string()));

        let session = orchestrator.snapshot().await;
        assert!(!session.is_generating);
        assert!(session.messages.iter().any(|m| m.content == "U2"));
    }

    #[tokio::test]
    async fn test_failed_regenerate_releases_session() {
        let (service, orchestrator) = selected(ScriptedService {
            chat: Mutex::new(chat_with(vec![
                message("user", "U1", 1),
                message("assistant", "A1", 2),
            ])),
            fail_update: true,
            ..Default::default()
        })
        .await;

        assert!(orchestrator.regenerate_response().await.is_err());

        let session = orchestrator.snapshot().await;
        assert!(!session.is_generating);
        assert!(session.last_error.is_some());
        assert_eq!(session.messages.len(), 2);
        assert_eq!(service.generate_calls.load(Ordering::SeqCst), 0);

        assert_eq!(
            orchestrator.generate_response().await.unwrap(),
            GenerateOutcome::Generated
        );
    }
}

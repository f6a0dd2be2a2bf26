//! Data-bound container.
//!
//! `ItemBinder` bridges the data service and a render callback for one
//! `(kind, mode)` pairing. It resolves data through the registry's converters,
//! exposes `on_change` and `save`, and hands a [`RenderProps`] snapshot to the
//! caller's render function.
//!
//! A fetch captures the container's epoch before suspending. `teardown` and
//! `reparameterize` bump the epoch, so a response that arrives afterwards is
//! dropped instead of being applied to state nobody is looking at.

mod config;
mod navigation;

pub use config::{BinderConfig, LoadState};
pub use navigation::{binder_for_card, binder_for_flexible};

use atrium_core::dispatch::{self, DispatchOutcome, ViewProps};
use atrium_core::entity::{Entity, EntityKind};
use atrium_core::error::{AtriumError, Result};
use atrium_core::mode::{OperationMode, PresentationMode};
use atrium_core::registry;
use atrium_core::service::DataService;
use serde_json::{Map, Value};
use std::sync::Arc;
use tokio::sync::RwLock;

/// Callback fired when an interactable container is activated.
pub type InteractionHandler = Arc<dyn Fn(&Entity) + Send + Sync>;

/// Snapshot handed to a render callback.
#[derive(Debug, Clone, Copy)]
pub struct RenderProps<'a> {
    pub kind: EntityKind,
    pub mode: OperationMode,
    /// Set only when the container fetched the whole collection.
    pub items: Option<&'a [Entity]>,
    /// Set only for single-entity containers.
    pub item: Option<&'a Entity>,
    pub state: &'a LoadState,
    /// Last failed `save`, cleared by the next successful one.
    pub save_error: Option<&'a AtriumError>,
    pub interactable: bool,
}

impl<'a> RenderProps<'a> {
    /// The subset of props the dispatcher consumes.
    pub fn view_props(&self) -> ViewProps<'a> {
        ViewProps {
            items: self.items,
            item: self.item,
            interactable: self.interactable,
        }
    }
}

#[derive(Debug)]
struct BinderState {
    config: BinderConfig,
    items: Option<Vec<Entity>>,
    item: Option<Entity>,
    load_state: LoadState,
    save_error: Option<AtriumError>,
    epoch: u64,
    torn_down: bool,
}

impl BinderState {
    fn new(config: BinderConfig) -> Self {
        Self {
            config,
            items: None,
            item: None,
            load_state: LoadState::Idle,
            save_error: None,
            epoch: 0,
            torn_down: false,
        }
    }

    fn is_current(&self, epoch: u64) -> bool {
        !self.torn_down && self.epoch == epoch
    }
}

enum Fetched {
    Items(Vec<Entity>),
    Item(Entity),
    Nothing,
}

/// Generic fetch/mutate/render unit for one entity kind.
///
/// Cloning yields another handle to the same container.
#[derive(Clone)]
pub struct ItemBinder {
    service: Arc<dyn DataService>,
    state: Arc<RwLock<BinderState>>,
    on_interaction: Option<InteractionHandler>,
}

impl ItemBinder {
    /// Creates an idle container; call [`ItemBinder::load`] to resolve data.
    pub fn new(service: Arc<dyn DataService>, config: BinderConfig) -> Self {
        Self {
            service,
            state: Arc::new(RwLock::new(BinderState::new(config))),
            on_interaction: None,
        }
    }

    /// Creates a container and resolves its data.
    pub async fn mount(service: Arc<dyn DataService>, config: BinderConfig) -> Self {
        let binder = Self::new(service, config);
        binder.load().await;
        binder
    }

    /// Creates a loaded container around an already-known entity.
    pub fn seeded(service: Arc<dyn DataService>, mode: OperationMode, entity: Entity) -> Self {
        let mut config = BinderConfig::new(entity.kind(), mode);
        config.id = entity.id().map(str::to_string);
        let mut state = BinderState::new(config);
        state.item = Some(entity);
        state.load_state = LoadState::Loaded;
        Self {
            service,
            state: Arc::new(RwLock::new(state)),
            on_interaction: None,
        }
    }

    /// Registers the activation callback. Only fires when the config is interactable.
    pub fn with_interaction(mut self, handler: InteractionHandler) -> Self {
        self.on_interaction = Some(handler);
        self
    }

    /// Resolves data for the current parameterization and returns the resulting state.
    ///
    /// Service failures become `LoadState::Failed`; a result that arrives after
    /// `teardown`/`reparameterize` is discarded.
    pub async fn load(&self) -> LoadState {
        let (config, epoch) = {
            let mut state = self.state.write().await;
            if state.torn_down {
                return state.load_state.clone();
            }
            state.load_state = LoadState::Loading;
            (state.config.clone(), state.epoch)
        };

        tracing::debug!(
            "[ItemBinder] load kind={} id={:?} mode={} fetch_all={}",
            config.kind,
            config.id,
            config.mode,
            config.fetch_all
        );

        let fetched = self.fetch(&config).await;

        let mut state = self.state.write().await;
        if !state.is_current(epoch) {
            tracing::debug!(
                "[ItemBinder] discarding stale {} result (epoch {} != {})",
                config.kind,
                epoch,
                state.epoch
            );
            return state.load_state.clone();
        }

        match fetched {
            Ok(Fetched::Items(items)) => {
                state.items = Some(items);
                state.item = None;
                state.load_state = LoadState::Loaded;
            }
            Ok(Fetched::Item(item)) => {
                state.items = None;
                state.item = Some(item);
                state.load_state = LoadState::Loaded;
            }
            Ok(Fetched::Nothing) => {
                state.items = None;
                state.item = None;
                state.load_state = LoadState::Loaded;
            }
            Err(err) => {
                tracing::warn!("[ItemBinder] failed to load {}: {}", config.kind, err);
                state.items = None;
                state.item = None;
                state.load_state = LoadState::Failed(err);
            }
        }
        state.load_state.clone()
    }

    async fn fetch(&self, config: &BinderConfig) -> Result<Fetched> {
        let kind = config.kind;
        if config.fetch_all {
            let raws = self.service.fetch_all(kind).await?;
            let items = raws.iter().map(|raw| registry::convert(kind, raw)).collect();
            return Ok(Fetched::Items(items));
        }
        if config.mode != OperationMode::Create {
            return match &config.id {
                Some(id) => {
                    let raw = self.service.fetch(kind, id).await?;
                    Ok(Fetched::Item(registry::convert(kind, &raw)))
                }
                None => {
                    tracing::warn!("[ItemBinder] {} {} container has no id", kind, config.mode);
                    Ok(Fetched::Nothing)
                }
            };
        }
        Ok(Fetched::Item(Entity::empty(kind)))
    }

    /// Shallow-merges `partial` into the current item and returns the new snapshot.
    ///
    /// Collections are never touched; without a single item this is a no-op.
    pub async fn on_change(&self, partial: Map<String, Value>) -> Option<Entity> {
        let mut state = self.state.write().await;
        let current = state.item.as_ref()?;
        let next = registry::merge(current, &partial);
        state.item = Some(next.clone());
        Some(next)
    }

    /// Persists the current item.
    ///
    /// `create` mode calls the service's create and adopts the returned entity,
    /// including its server-assigned id; the container then continues in `edit`
    /// mode so a second save updates instead of duplicating. Other modes call
    /// update. On failure the item is left unchanged and the error is kept in
    /// `save_error` for the view to show; retrying is allowed.
    pub async fn save(&self) -> Result<Entity> {
        let (config, item, epoch) = {
            let state = self.state.read().await;
            let item = state
                .item
                .clone()
                .ok_or_else(|| AtriumError::internal("nothing to save: container holds no item"))?;
            (state.config.clone(), item, state.epoch)
        };
        let kind = config.kind;

        let result = match config.mode {
            OperationMode::Create => {
                tracing::debug!("[ItemBinder] creating {}", kind);
                self.service.create(kind, item.to_raw()).await
            }
            OperationMode::View | OperationMode::Edit => {
                match config.id.as_deref().or_else(|| item.id()) {
                    Some(id) => {
                        tracing::debug!("[ItemBinder] updating {} id={}", kind, id);
                        self.service.update(kind, id, item.to_raw()).await
                    }
                    None => Err(AtriumError::internal(format!(
                        "cannot update {kind} without an id"
                    ))),
                }
            }
        };

        let mut state = self.state.write().await;
        match result {
            Ok(raw) => {
                let saved = registry::convert(kind, &raw);
                if state.is_current(epoch) {
                    if config.mode == OperationMode::Create {
                        state.config.mode = OperationMode::Edit;
                        state.config.id = saved.id().map(str::to_string);
                    }
                    state.item = Some(saved.clone());
                    state.save_error = None;
                }
                tracing::info!("[ItemBinder] saved {} id={:?}", kind, saved.id());
                Ok(saved)
            }
            Err(err) => {
                tracing::warn!("[ItemBinder] failed to save {}: {}", kind, err);
                if state.is_current(epoch) {
                    state.save_error = Some(err.clone());
                }
                Err(err)
            }
        }
    }

    /// Calls `render` with the current snapshot.
    pub async fn render<V, F>(&self, render: F) -> V
    where
        F: FnOnce(RenderProps<'_>) -> V,
    {
        let state = self.state.read().await;
        render(RenderProps {
            kind: state.config.kind,
            mode: state.config.mode,
            items: state.items.as_deref(),
            item: state.item.as_ref(),
            state: &state.load_state,
            save_error: state.save_error.as_ref(),
            interactable: state.config.interactable,
        })
    }

    /// Renders the current snapshot through the mode dispatcher.
    pub async fn dispatch(&self, mode: PresentationMode) -> DispatchOutcome {
        self.render(|props| dispatch::dispatch(props.kind, mode, &props.view_props()))
            .await
    }

    /// Fires the interaction callback with the current item.
    ///
    /// Returns `false` when the container is not interactable, has no
    /// callback, or holds no item.
    pub async fn activate(&self) -> bool {
        let Some(handler) = &self.on_interaction else {
            return false;
        };
        let item = {
            let state = self.state.read().await;
            if !state.config.interactable {
                return false;
            }
            match &state.item {
                Some(item) => item.clone(),
                None => return false,
            }
        };
        handler(&item);
        true
    }

    /// Switches to a new parameterization, discarding data and in-flight fetches.
    pub async fn reparameterize(&self, config: BinderConfig) {
        let mut state = self.state.write().await;
        let epoch = state.epoch + 1;
        *state = BinderState::new(config);
        state.epoch = epoch;
    }

    /// Marks the container as gone; later fetch results are ignored.
    pub async fn teardown(&self) {
        let mut state = self.state.write().await;
        state.epoch += 1;
        state.torn_down = true;
    }

    pub async fn config(&self) -> BinderConfig {
        self.state.read().await.config.clone()
    }

    pub async fn load_state(&self) -> LoadState {
        self.state.read().await.load_state.clone()
    }

    pub async fn item(&self) -> Option<Entity> {
        self.state.read().await.item.clone()
    }

    pub async fn items(&self) -> Option<Vec<Entity>> {
        self.state.read().await.items.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use atrium_core::entity::Message;
    use serde_json::json;
    use std::sync::Mutex;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use tokio::sync::Notify;

    /// Service stub: canned collections, optional gate on `fetch`, failure switches.
    #[derive(Default)]
    struct StubService {
        rows: Mutex<Vec<Value>>,
        gate: Option<Arc<Notify>>,
        fail_fetch: bool,
        fail_save: bool,
        creates: AtomicUsize,
        updates: AtomicUsize,
    }

    impl StubService {
        fn with_rows(rows: Vec<Value>) -> Self {
            Self {
                rows: Mutex::new(rows),
                ..Default::default()
            }
        }
    }

    #[async_trait]
    impl DataService for StubService {
        async fn fetch_all(&self, _kind: EntityKind) -> Result<Vec<Value>> {
            if self.fail_fetch {
                return Err(AtriumError::data_access("offline"));
            }
            Ok(self.rows.lock().unwrap().clone())
        }

        async fn fetch(&self, kind: EntityKind, id: &str) -> Result<Value> {
            if let Some(gate) = &self.gate {
                gate.notified().await;
            }
            if self.fail_fetch {
                return Err(AtriumError::data_access("offline"));
            }
            self.rows
                .lock()
                .unwrap()
                .iter()
                .find(|row| row["id"] == id)
                .cloned()
                .ok_or_else(|| AtriumError::not_found(kind.label(), id))
        }

        async fn create(&self, _kind: EntityKind, partial: Value) -> Result<Value> {
            self.creates.fetch_add(1, Ordering::SeqCst);
            if self.fail_save {
                return Err(AtriumError::data_access("rejected"));
            }
            let mut created = partial;
            created["id"] = json!("server-1");
            Ok(created)
        }

        async fn update(&self, _kind: EntityKind, id: &str, partial: Value) -> Result<Value> {
            self.updates.fetch_add(1, Ordering::SeqCst);
            if self.fail_save {
                return Err(AtriumError::data_access("rejected"));
            }
            let mut updated = partial;
            updated["id"] = json!(id);
            Ok(updated)
        }

        async fn send_message(&self, _chat_id: &str, _message: &Message) -> Result<Value> {
            unreachable!("not used by containers")
        }

        async fn generate_response(&self, _chat_id: &str) -> Result<bool> {
            unreachable!("not used by containers")
        }

        async fn add_task_response(&self, _chat_id: &str, _id: &str) -> Result<Value> {
            unreachable!("not used by containers")
        }
    }

    fn agents() -> Vec<Value> {
        vec![
            json!({ "id": "a-1", "name": "Planner" }),
            json!({ "id": "a-2", "name": "Coder" }),
        ]
    }

    fn partial(key: &str, value: Value) -> Map<String, Value> {
        let mut map = Map::new();
        map.insert(key.to_string(), value);
        map
    }

    #[tokio::test]
    async fn test_fetch_all_never_sets_item() {
        let service = Arc::new(StubService::with_rows(agents()));
        let binder = ItemBinder::mount(service, BinderConfig::collection(EntityKind::Agent)).await;

        assert!(binder.load_state().await.is_loaded());
        assert_eq!(binder.items().await.unwrap().len(), 2);
        assert!(binder.item().await.is_none());

        // on_change never touches collections
        assert!(binder.on_change(partial("name", json!("x"))).await.is_none());
        assert!(binder.item().await.is_none());
    }

    #[tokio::test]
    async fn test_single_fetch_never_sets_items() {
        let service = Arc::new(StubService::with_rows(agents()));
        let binder = ItemBinder::mount(service, BinderConfig::view(EntityKind::Agent, "a-2")).await;

        assert!(binder.items().await.is_none());
        assert_eq!(binder.item().await.unwrap().title(), "Coder");
    }

    #[tokio::test]
    async fn test_create_mode_does_not_fetch() {
        let service = Arc::new(StubService {
            fail_fetch: true,
            ..Default::default()
        });
        let binder = ItemBinder::mount(service, BinderConfig::create(EntityKind::Prompt)).await;

        assert!(binder.load_state().await.is_loaded());
        assert_eq!(binder.item().await, Some(Entity::empty(EntityKind::Prompt)));
    }

    #[tokio::test]
    async fn test_fetch_error_is_terminal_state() {
        let service = Arc::new(StubService {
            fail_fetch: true,
            ..Default::default()
        });
        let binder = ItemBinder::mount(service, BinderConfig::view(EntityKind::Agent, "a-1")).await;

        let state = binder.load_state().await;
        assert!(state.error().unwrap().is_data_access());
        assert!(binder.item().await.is_none());
        assert!(binder.items().await.is_none());
    }

    #[tokio::test]
    async fn test_on_change_merges_into_item() {
        let service = Arc::new(StubService::with_rows(agents()));
        let binder = ItemBinder::mount(service, BinderConfig::edit(EntityKind::Agent, "a-1")).await;

        let next = binder
            .on_change(partial("system_message", json!("Be brief.")))
            .await
            .unwrap();
        let Entity::Agent(agent) = next else {
            panic!("expected agent");
        };
        assert_eq!(agent.name, "Planner");
        assert_eq!(agent.system_message, "Be brief.");
    }

    #[tokio::test]
    async fn test_save_in_create_mode_adopts_server_id() {
        let service = Arc::new(StubService::default());
        let binder = ItemBinder::mount(service.clone(), BinderConfig::create(EntityKind::Prompt)).await;
        binder.on_change(partial("name", json!("greeting"))).await;
        assert!(binder.item().await.unwrap().id().is_none());

        let saved = binder.save().await.unwrap();

        assert_eq!(saved.id(), Some("server-1"));
        assert_eq!(binder.item().await.unwrap().id(), Some("server-1"));
        let config = binder.config().await;
        assert_eq!(config.mode, OperationMode::Edit);
        assert_eq!(config.id.as_deref(), Some("server-1"));

        binder.save().await.unwrap();
        assert_eq!(service.creates.load(Ordering::SeqCst), 1);
        assert_eq!(service.updates.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_failed_save_keeps_item_and_records_error() {
        let service = Arc::new(StubService {
            rows: Mutex::new(agents()),
            fail_save: true,
            ..Default::default()
        });
        let binder = ItemBinder::mount(service, BinderConfig::edit(EntityKind::Agent, "a-1")).await;
        binder.on_change(partial("name", json!("Renamed"))).await;

        assert!(binder.save().await.is_err());

        assert_eq!(binder.item().await.unwrap().title(), "Renamed");
        let has_error = binder.render(|props| props.save_error.is_some()).await;
        assert!(has_error);
        assert!(binder.load_state().await.is_loaded());
    }

    #[tokio::test]
    async fn test_teardown_discards_late_fetch() {
        let gate = Arc::new(Notify::new());
        let service = Arc::new(StubService {
            rows: Mutex::new(agents()),
            gate: Some(gate.clone()),
            ..Default::default()
        });
        let binder = ItemBinder::new(service, BinderConfig::view(EntityKind::Agent, "a-1"));

        let loading = {
            let binder = binder.clone();
            tokio::spawn(async move { binder.load().await })
        };
        tokio::task::yield_now().await;
        assert_eq!(binder.load_state().await, LoadState::Loading);

        binder.teardown().await;
        gate.notify_one();
        loading.await.unwrap();

        assert!(binder.item().await.is_none());
    }

    #[tokio::test]
    async fn test_reparameterize_discards_previous_fetch() {
        let gate = Arc::new(Notify::new());
        let service = Arc::new(StubService {
            rows: Mutex::new(agents()),
            gate: Some(gate.clone()),
            ..Default::default()
        });
        let binder = ItemBinder::new(service, BinderConfig::view(EntityKind::Agent, "a-1"));

        let stale = {
            let binder = binder.clone();
            tokio::spawn(async move { binder.load().await })
        };
        tokio::task::yield_now().await;

        binder
            .reparameterize(BinderConfig::view(EntityKind::Agent, "a-2"))
            .await;
        gate.notify_one();
        stale.await.unwrap();
        assert!(binder.item().await.is_none());

        let fresh = {
            let binder = binder.clone();
            tokio::spawn(async move { binder.load().await })
        };
        tokio::task::yield_now().await;
        gate.notify_one();
        fresh.await.unwrap();
        assert_eq!(binder.item().await.unwrap().id(), Some("a-2"));
    }

    #[tokio::test]
    async fn test_activate_requires_interactable() {
        let service: Arc<dyn DataService> = Arc::new(StubService::with_rows(agents()));
        let hits = Arc::new(AtomicUsize::new(0));
        let handler: InteractionHandler = {
            let hits = hits.clone();
            Arc::new(move |_entity: &Entity| {
                hits.fetch_add(1, Ordering::SeqCst);
            })
        };

        let passive = ItemBinder::mount(service.clone(), BinderConfig::view(EntityKind::Agent, "a-1"))
            .await
            .with_interaction(handler.clone());
        assert!(!passive.activate().await);

        let active = ItemBinder::mount(
            service,
            BinderConfig::view(EntityKind::Agent, "a-1").interactable(),
        )
        .await
        .with_interaction(handler);
        assert!(active.activate().await);
        assert_eq!(hits.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_dispatch_uses_loaded_data() {
        let service = Arc::new(StubService::with_rows(agents()));
        let binder = ItemBinder::mount(service, BinderConfig::collection(EntityKind::Agent)).await;

        let outcome = binder.dispatch(PresentationMode::ShortList).await;
        let titles: Vec<_> = outcome
            .view()
            .unwrap()
            .rows
            .iter()
            .map(|row| row.title.clone())
            .collect();
        assert_eq!(titles, vec!["Planner", "Coder"]);
    }
}

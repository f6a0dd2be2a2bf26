use atrium_core::entity::EntityKind;
use atrium_core::error::AtriumError;
use atrium_core::mode::OperationMode;

/// Parameters of one container instance.
///
/// Exactly one data branch applies: `fetch_all` loads the collection, a
/// non-create mode with an id loads one entity, `create` synthesizes an empty
/// entity. Combining `fetch_all` with `create` is a caller error and is not
/// validated.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BinderConfig {
    pub kind: EntityKind,
    pub id: Option<String>,
    pub mode: OperationMode,
    pub fetch_all: bool,
    pub interactable: bool,
}

impl BinderConfig {
    pub fn new(kind: EntityKind, mode: OperationMode) -> Self {
        Self {
            kind,
            id: None,
            mode,
            fetch_all: false,
            interactable: false,
        }
    }

    /// Single entity in `view` mode.
    pub fn view(kind: EntityKind, id: impl Into<String>) -> Self {
        Self::new(kind, OperationMode::View).with_id(id)
    }

    /// Single entity in `edit` mode.
    pub fn edit(kind: EntityKind, id: impl Into<String>) -> Self {
        Self::new(kind, OperationMode::Edit).with_id(id)
    }

    /// Empty entity in `create` mode.
    pub fn create(kind: EntityKind) -> Self {
        Self::new(kind, OperationMode::Create)
    }

    /// The whole collection, read-only.
    pub fn collection(kind: EntityKind) -> Self {
        Self::new(kind, OperationMode::View).fetch_all()
    }

    pub fn with_id(mut self, id: impl Into<String>) -> Self {
        self.id = Some(id.into());
        self
    }

    pub fn fetch_all(mut self) -> Self {
        self.fetch_all = true;
        self
    }

    pub fn interactable(mut self) -> Self {
        self.interactable = true;
        self
    }
}

/// Load lifecycle of a container.
#[derive(Debug, Clone, Default, PartialEq)]
pub enum LoadState {
    #[default]
    Idle,
    Loading,
    Loaded,
    /// Initial fetch failed; terminal for this parameterization.
    Failed(AtriumError),
}

impl LoadState {
    pub fn is_loaded(&self) -> bool {
        matches!(self, LoadState::Loaded)
    }

    pub fn error(&self) -> Option<&AtriumError> {
        match self {
            LoadState::Failed(err) => Some(err),
            _ => None,
        }
    }
}

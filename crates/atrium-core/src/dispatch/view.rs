//! Structural view descriptions produced by the dispatcher.

use crate::entity::{Entity, EntityKind};
use crate::mode::PresentationMode;
use serde::{Deserialize, Serialize};

/// One labelled value inside a view row.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ViewField {
    pub label: String,
    pub value: String,
    pub editable: bool,
}

/// A row of a view: a whole card/form, or one line of a list/table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ViewRow {
    pub id: Option<String>,
    pub title: String,
    pub fields: Vec<ViewField>,
}

/// The view a renderer produced, without any widget concerns.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RenderedView {
    pub kind: EntityKind,
    pub mode: PresentationMode,
    /// Component name, e.g. `AgentCard` or `TaskTable`.
    pub component: String,
    pub title: String,
    /// Column headers; only set for tables.
    pub columns: Vec<String>,
    pub rows: Vec<ViewRow>,
    /// Whether activating the view should fire the container's interaction hook.
    pub interactable: bool,
}

impl RenderedView {
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

/// Result of dispatching a `(kind, mode)` pair.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum DispatchOutcome {
    View(RenderedView),
    Unsupported {
        kind: EntityKind,
        mode: PresentationMode,
    },
}

impl DispatchOutcome {
    pub fn view(&self) -> Option<&RenderedView> {
        match self {
            DispatchOutcome::View(view) => Some(view),
            DispatchOutcome::Unsupported { .. } => None,
        }
    }

    pub fn is_unsupported(&self) -> bool {
        matches!(self, DispatchOutcome::Unsupported { .. })
    }
}

/// Resolved data handed to a renderer. The dispatcher never fetches.
#[derive(Debug, Clone, Copy, Default)]
pub struct ViewProps<'a> {
    pub items: Option<&'a [Entity]>,
    pub item: Option<&'a Entity>,
    pub interactable: bool,
}

impl<'a> ViewProps<'a> {
    pub fn single(item: &'a Entity) -> Self {
        Self {
            item: Some(item),
            ..Default::default()
        }
    }

    pub fn collection(items: &'a [Entity]) -> Self {
        Self {
            items: Some(items),
            ..Default::default()
        }
    }
}

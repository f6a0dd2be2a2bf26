//! Dialog navigation.
//!
//! Two independent dialog channels: a read-only *card* channel and a
//! create/edit *flexible* channel. Opening a channel replaces its selection
//! outright; there is no history. Nested dialogs are produced by rendering
//! both channels at once, so a card can sit on top of an open editor and the
//! other way around. `close` clears both.
//!
//! The navigator is an owned value: whoever renders dialogs holds it and
//! passes it (or `&mut` to it) to views that need to open related entities.

use crate::entity::{Entity, EntityKind};
use crate::error::{AtriumError, Result};
use crate::mode::FlexibleMode;
use serde::{Deserialize, Serialize};

/// What a dialog channel is showing.
#[derive(Debug, Clone, PartialEq)]
pub struct DialogSelection {
    pub kind: EntityKind,
    pub id: Option<String>,
    /// Already-loaded entity; when present no fetch is needed to show it.
    pub instance: Option<Entity>,
}

impl DialogSelection {
    /// True when only the id is known and the entity must be fetched.
    pub fn needs_fetch(&self) -> bool {
        self.instance.is_none() && self.id.is_some()
    }

    /// Id of the selection, from the explicit id or the instance.
    pub fn resolved_id(&self) -> Option<&str> {
        self.id
            .as_deref()
            .or_else(|| self.instance.as_ref().and_then(Entity::id))
    }
}

/// Selection of the flexible channel plus its sub-mode.
#[derive(Debug, Clone, PartialEq)]
pub struct FlexibleSelection {
    pub selection: DialogSelection,
    pub mode: FlexibleMode,
}

/// Which channel is on top for visibility purposes.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActiveDialog {
    #[default]
    None,
    Card,
    Flexible,
}

/// Two-channel dialog state.
#[derive(Debug, Clone, Default)]
pub struct DialogNavigator {
    card: Option<DialogSelection>,
    flexible: Option<FlexibleSelection>,
    active: ActiveDialog,
}

impl DialogNavigator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Shows `kind` in the card channel, replacing any previous card.
    pub fn open_card(&mut self, kind: EntityKind, id: Option<String>, instance: Option<Entity>) {
        tracing::debug!(
            "[DialogNavigator] open_card kind={} id={:?} seeded={}",
            kind,
            id,
            instance.is_some()
        );
        self.card = Some(DialogSelection { kind, id, instance });
        self.active = ActiveDialog::Card;
    }

    /// Shows `kind` in the flexible channel, replacing any previous selection.
    ///
    /// # Errors
    ///
    /// Returns `AtriumError::Navigation` when `mode` is `Edit` and neither an
    /// id nor an instance is given. State is left untouched in that case.
    pub fn open_flexible(
        &mut self,
        kind: EntityKind,
        mode: FlexibleMode,
        id: Option<String>,
        instance: Option<Entity>,
    ) -> Result<()> {
        if mode == FlexibleMode::Edit && id.is_none() && instance.is_none() {
            tracing::error!("[DialogNavigator] edit requested for {} without id or instance", kind);
            return Err(AtriumError::navigation(format!(
                "cannot edit {kind} without an id or an instance"
            )));
        }
        tracing::debug!(
            "[DialogNavigator] open_flexible kind={} mode={} id={:?} seeded={}",
            kind,
            mode,
            id,
            instance.is_some()
        );
        self.flexible = Some(FlexibleSelection {
            selection: DialogSelection { kind, id, instance },
            mode,
        });
        self.active = ActiveDialog::Flexible;
        Ok(())
    }

    /// Clears both channels.
    pub fn close(&mut self) {
        tracing::debug!("[DialogNavigator] close");
        self.card = None;
        self.flexible = None;
        self.active = ActiveDialog::None;
    }

    pub fn card(&self) -> Option<&DialogSelection> {
        self.card.as_ref()
    }

    pub fn flexible(&self) -> Option<&FlexibleSelection> {
        self.flexible.as_ref()
    }

    pub fn active(&self) -> ActiveDialog {
        self.active
    }

    /// Whether any channel should be drawn.
    pub fn is_open(&self) -> bool {
        self.active != ActiveDialog::None
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entity::{Agent, EntityBase};

    #[test]
    fn test_open_card_replaces_previous() {
        let mut nav = DialogNavigator::new();
        nav.open_card(EntityKind::Agent, Some("a-1".to_string()), None);
        nav.open_card(EntityKind::Task, Some("t-9".to_string()), None);

        let card = nav.card().unwrap();
        assert_eq!(card.kind, EntityKind::Task);
        assert_eq!(card.id.as_deref(), Some("t-9"));
        assert_eq!(nav.active(), ActiveDialog::Card);
    }

    #[test]
    fn test_edit_without_id_or_instance_is_rejected() {
        let mut nav = DialogNavigator::new();
        nav.open_card(EntityKind::Agent, Some("a-1".to_string()), None);

        let err = nav
            .open_flexible(EntityKind::Agent, FlexibleMode::Edit, None, None)
            .unwrap_err();

        assert!(err.is_navigation());
        assert!(nav.flexible().is_none());
        assert_eq!(nav.active(), ActiveDialog::Card);
    }

    #[test]
    fn test_create_without_id_is_allowed() {
        let mut nav = DialogNavigator::new();
        nav.open_flexible(EntityKind::Prompt, FlexibleMode::Create, None, None)
            .unwrap();
        let flexible = nav.flexible().unwrap();
        assert_eq!(flexible.mode, FlexibleMode::Create);
        assert!(!flexible.selection.needs_fetch());
    }

    #[test]
    fn test_channels_layer_and_close_together() {
        let mut nav = DialogNavigator::new();
        let agent = Entity::Agent(Agent {
            base: EntityBase::with_id("a-1"),
            ..Default::default()
        });
        nav.open_flexible(EntityKind::Agent, FlexibleMode::Edit, None, Some(agent))
            .unwrap();
        nav.open_card(EntityKind::Model, Some("m-1".to_string()), None);

        assert_eq!(nav.active(), ActiveDialog::Card);
        assert!(nav.flexible().is_some());
        assert_eq!(nav.flexible().unwrap().selection.resolved_id(), Some("a-1"));
        assert!(nav.card().unwrap().needs_fetch());

        nav.close();
        assert!(nav.card().is_none());
        assert!(nav.flexible().is_none());
        assert!(!nav.is_open());
    }
}

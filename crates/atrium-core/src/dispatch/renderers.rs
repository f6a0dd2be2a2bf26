//! Renderers the registry assigns to `(kind, mode)` pairs.

use super::{RenderedView, ViewField, ViewProps, ViewRow};
use crate::entity::{Entity, EntityKind};
use crate::mode::PresentationMode;

fn component_name(kind: EntityKind, mode: PresentationMode) -> String {
    let prefix: String = kind.label().split_whitespace().collect();
    let suffix = match mode {
        PresentationMode::Create => "CreateForm",
        PresentationMode::Edit => "EditForm",
        PresentationMode::View => "Details",
        PresentationMode::Card => "Card",
        PresentationMode::List => "List",
        PresentationMode::ShortList => "ShortList",
        PresentationMode::Table => "Table",
    };
    format!("{prefix}{suffix}")
}

fn blank_view(kind: EntityKind, mode: PresentationMode, props: &ViewProps<'_>) -> RenderedView {
    RenderedView {
        kind,
        mode,
        component: component_name(kind, mode),
        title: kind.label().to_string(),
        columns: Vec::new(),
        rows: Vec::new(),
        interactable: props.interactable,
    }
}

fn fields_of(entity: &Entity, editable: bool, skip_blank: bool) -> Vec<ViewField> {
    entity
        .fields()
        .into_iter()
        .filter(|(_, value)| !(skip_blank && value.is_empty()))
        .map(|(label, value)| ViewField {
            label: label.to_string(),
            value,
            editable,
        })
        .collect()
}

fn row(entity: &Entity, fields: Vec<ViewField>) -> ViewRow {
    ViewRow {
        id: entity.id().map(str::to_string),
        title: entity.title(),
        fields,
    }
}

pub fn form(kind: EntityKind, mode: PresentationMode, props: &ViewProps<'_>) -> RenderedView {
    let mut view = blank_view(kind, mode, props);
    let empty = Entity::empty(kind);
    let entity = props.item.unwrap_or(&empty);
    view.title = match mode {
        PresentationMode::Create => format!("Create {}", kind.label()),
        _ => format!("Edit {}", entity.title()),
    };
    view.rows.push(row(entity, fields_of(entity, true, false)));
    view
}

pub fn details(kind: EntityKind, mode: PresentationMode, props: &ViewProps<'_>) -> RenderedView {
    let mut view = blank_view(kind, mode, props);
    if let Some(entity) = props.item {
        view.title = entity.title();
        view.rows.push(row(entity, fields_of(entity, false, false)));
    }
    view
}

pub fn card(kind: EntityKind, mode: PresentationMode, props: &ViewProps<'_>) -> RenderedView {
    card_with(kind, mode, props, |_| Vec::new())
}

/// Card that also shows the latest message.
pub fn chat_card(kind: EntityKind, mode: PresentationMode, props: &ViewProps<'_>) -> RenderedView {
    card_with(kind, mode, props, |entity| match entity {
        Entity::Chat(chat) => chat
            .messages
            .last()
            .map(|last| vec![extra("last_message", last.content.clone())])
            .unwrap_or_default(),
        _ => Vec::new(),
    })
}

/// Card that also names the populated reference buckets.
pub fn message_card(kind: EntityKind, mode: PresentationMode, props: &ViewProps<'_>) -> RenderedView {
    card_with(kind, mode, props, |entity| match entity {
        Entity::Message(message) => {
            let buckets = message.references.populated_buckets();
            if buckets.is_empty() {
                return Vec::new();
            }
            let names: Vec<String> = buckets.iter().map(ToString::to_string).collect();
            vec![extra("references", names.join(", "))]
        }
        _ => Vec::new(),
    })
}

fn card_with(
    kind: EntityKind,
    mode: PresentationMode,
    props: &ViewProps<'_>,
    extras: impl FnOnce(&Entity) -> Vec<ViewField>,
) -> RenderedView {
    let mut view = blank_view(kind, mode, props);
    if let Some(entity) = props.item {
        view.title = entity.title();
        let mut fields = fields_of(entity, false, true);
        fields.extend(extras(entity));
        view.rows.push(row(entity, fields));
    }
    view
}

fn extra(label: &str, value: String) -> ViewField {
    ViewField {
        label: label.to_string(),
        value,
        editable: false,
    }
}

pub fn list(kind: EntityKind, mode: PresentationMode, props: &ViewProps<'_>) -> RenderedView {
    let mut view = blank_view(kind, mode, props);
    for entity in props.items.unwrap_or_default() {
        let summary = fields_of(entity, false, true).into_iter().take(2).collect();
        view.rows.push(row(entity, summary));
    }
    view
}

pub fn short_list(kind: EntityKind, mode: PresentationMode, props: &ViewProps<'_>) -> RenderedView {
    let mut view = blank_view(kind, mode, props);
    for entity in props.items.unwrap_or_default() {
        view.rows.push(row(entity, Vec::new()));
    }
    view
}

pub fn table(kind: EntityKind, mode: PresentationMode, props: &ViewProps<'_>) -> RenderedView {
    let mut view = blank_view(kind, mode, props);
    view.columns = Entity::empty(kind)
        .fields()
        .into_iter()
        .map(|(label, _)| label.to_string())
        .collect();
    for entity in props.items.unwrap_or_default() {
        view.rows.push(row(entity, fields_of(entity, false, false)));
    }
    view
}

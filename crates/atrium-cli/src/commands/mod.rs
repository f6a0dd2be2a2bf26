pub mod chat;
pub mod entity;

use anyhow::{Context, Result, bail};
use atrium_core::dispatch::{DispatchOutcome, RenderedView};
use atrium_core::entity::EntityKind;
use atrium_core::mode::PresentationMode;
use serde_json::{Map, Value};

pub(crate) fn parse_kind(kind: &str) -> Result<EntityKind> {
    kind.parse::<EntityKind>()
        .or_else(|_| EntityKind::from_collection(kind).ok_or(()))
        .map_err(|_| anyhow::anyhow!("Unknown entity kind: {kind}"))
}

pub(crate) fn parse_mode(mode: &str) -> Result<PresentationMode> {
    mode.parse::<PresentationMode>()
        .with_context(|| format!("Unknown presentation mode: {mode}"))
}

/// Parses `key=value` pairs; values that are valid JSON keep their type.
pub(crate) fn parse_assignments(assignments: &[String]) -> Result<Map<String, Value>> {
    let mut fields = Map::new();
    for assignment in assignments {
        let Some((key, raw)) = assignment.split_once('=') else {
            bail!("Expected KEY=VALUE, got `{assignment}`");
        };
        let value =
            serde_json::from_str(raw).unwrap_or_else(|_| Value::String(raw.to_string()));
        fields.insert(key.trim().to_string(), value);
    }
    Ok(fields)
}

pub(crate) fn print_outcome(outcome: &DispatchOutcome) -> Result<()> {
    match outcome {
        DispatchOutcome::View(view) => {
            print_view(view);
            Ok(())
        }
        DispatchOutcome::Unsupported { kind, mode } => {
            bail!("{} does not support the {} view", kind.label(), mode)
        }
    }
}

fn print_view(view: &RenderedView) {
    println!("{} [{}]", view.title, view.component);
    if !view.columns.is_empty() {
        println!("{}", view.columns.join(" | "));
        for row in &view.rows {
            let values: Vec<&str> = row.fields.iter().map(|f| f.value.as_str()).collect();
            println!("{}", values.join(" | "));
        }
        return;
    }
    if view.rows.is_empty() {
        println!("  (empty)");
    }
    for row in &view.rows {
        match &row.id {
            Some(id) => println!("- {} ({})", row.title, id),
            None => println!("- {}", row.title),
        }
        for field in &row.fields {
            println!("    {}: {}", field.label, field.value);
        }
    }
}

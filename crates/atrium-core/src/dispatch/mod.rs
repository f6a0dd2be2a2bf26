//! Mode dispatcher.
//!
//! `dispatch(kind, mode, props)` looks up the renderer the registry declares
//! for `(kind, mode)` and applies it to already-resolved data. Combinations
//! the registry does not declare come back as [`DispatchOutcome::Unsupported`].

pub mod renderers;
mod view;

pub use view::{DispatchOutcome, RenderedView, ViewField, ViewProps, ViewRow};

use crate::entity::EntityKind;
use crate::mode::PresentationMode;
use crate::registry;

/// Turns resolved data into a view for one `(kind, mode)` pair.
pub type Renderer = fn(EntityKind, PresentationMode, &ViewProps<'_>) -> RenderedView;

/// Renders `props` as `mode` for `kind`.
pub fn dispatch(kind: EntityKind, mode: PresentationMode, props: &ViewProps<'_>) -> DispatchOutcome {
    match registry::entry(kind).renderer(mode) {
        Some(render) => DispatchOutcome::View(render(kind, mode, props)),
        None => {
            tracing::debug!("[Dispatcher] {} does not support {} mode", kind, mode);
            DispatchOutcome::Unsupported { kind, mode }
        }
    }
}

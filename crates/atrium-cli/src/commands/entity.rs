use anyhow::{Result, bail};
use atrium_application::binder::{BinderConfig, ItemBinder, LoadState};
use atrium_core::mode::PresentationMode;
use atrium_core::registry;
use atrium_core::service::DataService;
use std::sync::Arc;

use super::{parse_assignments, parse_kind, parse_mode, print_outcome};

pub async fn list(service: Arc<dyn DataService>, kind: &str, mode: &str) -> Result<()> {
    let kind = parse_kind(kind)?;
    let mode = parse_mode(mode)?;
    if !mode.is_list_like() {
        bail!("`{mode}` is not a collection view; use list, short-list or table");
    }

    let binder = ItemBinder::mount(service, BinderConfig::collection(kind)).await;
    fail_on_error(binder.load_state().await)?;
    print_outcome(&binder.dispatch(mode).await)
}

pub async fn show(service: Arc<dyn DataService>, kind: &str, id: &str, mode: &str) -> Result<()> {
    let kind = parse_kind(kind)?;
    let mode = parse_mode(mode)?;
    if !matches!(mode, PresentationMode::Card | PresentationMode::View) {
        bail!("`{mode}` is not a single-item view; use card or view");
    }

    let binder = ItemBinder::mount(service, BinderConfig::view(kind, id)).await;
    fail_on_error(binder.load_state().await)?;
    print_outcome(&binder.dispatch(mode).await)
}

pub async fn create(service: Arc<dyn DataService>, kind: &str, assignments: &[String]) -> Result<()> {
    let kind = parse_kind(kind)?;
    let mut fields = registry::default_form(kind);
    fields.extend(parse_assignments(assignments)?);

    let binder = ItemBinder::mount(service, BinderConfig::create(kind)).await;
    fail_on_error(binder.load_state().await)?;
    if binder.dispatch(PresentationMode::Create).await.is_unsupported() {
        bail!("{} cannot be created", kind.label());
    }
    binder.on_change(fields).await;
    let saved = binder.save().await?;

    println!("Created {} {}", kind.label(), saved.id().unwrap_or("(no id)"));
    print_outcome(&binder.dispatch(PresentationMode::View).await)
}

pub async fn edit(
    service: Arc<dyn DataService>,
    kind: &str,
    id: &str,
    assignments: &[String],
) -> Result<()> {
    let kind = parse_kind(kind)?;
    let fields = parse_assignments(assignments)?;

    let binder = ItemBinder::mount(service, BinderConfig::edit(kind, id)).await;
    fail_on_error(binder.load_state().await)?;
    if binder.dispatch(PresentationMode::Edit).await.is_unsupported() {
        bail!("{} cannot be edited", kind.label());
    }
    binder.on_change(fields).await;
    binder.save().await?;

    println!("Updated {} {}", kind.label(), id);
    print_outcome(&binder.dispatch(PresentationMode::View).await)
}

fn fail_on_error(state: LoadState) -> Result<()> {
    match state {
        LoadState::Failed(err) => Err(err.into()),
        _ => Ok(()),
    }
}

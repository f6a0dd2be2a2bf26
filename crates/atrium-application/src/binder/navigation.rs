//! Containers for dialog selections.

use super::{BinderConfig, ItemBinder};
use atrium_core::mode::OperationMode;
use atrium_core::navigation::{DialogNavigator, DialogSelection};
use atrium_core::service::DataService;
use std::sync::Arc;

/// Builds the container for `selection`. Call `load` on it afterwards; a
/// seeded container is already loaded and `load` is only needed to refresh.
fn binder_for(
    service: Arc<dyn DataService>,
    selection: &DialogSelection,
    mode: OperationMode,
) -> ItemBinder {
    if let Some(instance) = &selection.instance {
        return ItemBinder::seeded(service, mode, instance.clone());
    }
    let mut config = BinderConfig::new(selection.kind, mode);
    config.id = selection.id.clone();
    ItemBinder::new(service, config)
}

/// Container for the card channel, read-only.
pub fn binder_for_card(
    service: Arc<dyn DataService>,
    navigator: &DialogNavigator,
) -> Option<ItemBinder> {
    let selection = navigator.card()?;
    Some(binder_for(service, selection, OperationMode::View))
}

/// Container for the flexible channel, in its create or edit sub-mode.
pub fn binder_for_flexible(
    service: Arc<dyn DataService>,
    navigator: &DialogNavigator,
) -> Option<ItemBinder> {
    let flexible = navigator.flexible()?;
    let mode = OperationMode::from(flexible.mode);
    Some(binder_for(service, &flexible.selection, mode))
}

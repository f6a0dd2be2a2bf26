//! Infrastructure for the Atrium client: data service implementations and
//! configuration loading.

pub mod config_loader;
pub mod http_service;
pub mod memory_service;

pub use config_loader::ConfigLoader;
pub use http_service::HttpDataService;
pub use memory_service::{EchoGenerator, InMemoryDataService, ResponseGenerator};

use atrium_core::config::{ServiceBackend, ServiceConfig};
use atrium_core::error::Result;
use atrium_core::service::DataService;
use std::sync::Arc;

/// Builds the data service selected by the `[service]` config section.
pub fn build_service(config: &ServiceConfig) -> Result<Arc<dyn DataService>> {
    match config.backend {
        ServiceBackend::Memory => Ok(Arc::new(InMemoryDataService::new())),
        ServiceBackend::Http => Ok(Arc::new(HttpDataService::new(config)?)),
    }
}

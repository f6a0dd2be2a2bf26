//! Domain core of the Atrium client.
//!
//! Entity kinds and records, the entity registry, presentation dispatch,
//! dialog navigation and the data service interface every screen binds to.

pub mod config;
pub mod dispatch;
pub mod entity;
pub mod error;
pub mod mode;
pub mod navigation;
pub mod registry;
pub mod service;

// Re-export common types
pub use entity::{Entity, EntityKind};
pub use error::AtriumError;
pub use mode::{FlexibleMode, OperationMode, PresentationMode};
pub use service::DataService;

//! Application layer for Atrium.
//!
//! This crate provides the data-bound container every screen is built on and
//! the chat orchestrator layered on top of it.

pub mod binder;
pub mod chat;

pub use binder::{BinderConfig, ItemBinder, LoadState, RenderProps};
pub use chat::{ChatOrchestrator, ChatSession, GenerateOutcome, SessionStatus};

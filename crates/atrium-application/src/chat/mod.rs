//! Chat session orchestration.
//!
//! - `session`: session state (`ChatSession`, `SessionStatus`)
//! - `updater`: fetch → mutate → update helper (`ChatUpdater`)
//! - `orchestrator`: send/generate/regenerate/attach operations (`ChatOrchestrator`)

mod orchestrator;
mod session;
mod updater;

pub use orchestrator::{ChatOrchestrator, GenerateOutcome, trim_to_last_user};
pub use session::{ChatSession, SessionStatus, sort_by_creation};
pub use updater::ChatUpdater;

//! Session lifecycle.

mod engine;
mod types;

pub use engine::SessionEngine;
pub use types::{EngineConfig, EngineDeps, SessionStatus};

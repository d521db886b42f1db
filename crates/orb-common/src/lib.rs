pub mod errors;
pub mod id;
pub mod types;

pub use errors::{ConfigError, OrbError};
pub use id::{new_correlation_id, new_id, SessionId};
pub use types::ToolDefinition;

pub type Result<T> = std::result::Result<T, OrbError>;

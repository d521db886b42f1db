//! Configuration schema types for Orb.
//!
//! All structs use `serde(default)` so partial configs work correctly.

mod endpoints;
mod server;
mod session;
mod system;
mod volume;

pub use endpoints::*;
pub use server::*;
pub use session::*;
pub use system::*;
pub use volume::*;

use serde::{Deserialize, Serialize};

/// Current config schema version.
pub const CONFIG_SCHEMA_VERSION: u32 = 1;

/// Root configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct OrbConfig {
    pub session: SessionConfig,
    pub endpoints: EndpointsConfig,
    pub volume: VolumeConfig,
    pub server: ServerConfig,
    pub logging: LoggingConfig,
}

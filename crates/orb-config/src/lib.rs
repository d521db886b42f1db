//! Orb configuration system.
//!
//! Provides TOML-based configuration with full validation. All config
//! sections use sensible defaults so partial configs work out of the box.
//!
//! # Quick Start
//!
//! ```rust,no_run
//! use orb_config::{load_config, config_to_json};
//!
//! let config = load_config().expect("failed to load config");
//! let json = config_to_json(&config);
//! println!("{json}");
//! ```

pub mod schema;
pub mod toml_loader;
pub mod validation;

pub use schema::{
    EndpointsConfig, LogLevel, LoggingConfig, OrbConfig, ServerConfig, SessionConfig,
    VolumeConfig, CONFIG_SCHEMA_VERSION,
};

use orb_common::ConfigError;

/// Load config from the platform default path and validate it strictly.
///
/// Creates a default `config.toml` if none exists.
pub fn load_config() -> Result<OrbConfig, ConfigError> {
    let config = toml_loader::load_default()?;
    validation::validate(&config)?;
    Ok(config)
}

/// Serialize a config to a pretty-printed JSON string.
pub fn config_to_json(config: &OrbConfig) -> String {
    serde_json::to_string_pretty(config)
        .unwrap_or_else(|e| format!("{{\"error\": \"failed to serialize config: {e}\"}}"))
}

//! Full configuration validation.
//!
//! Each section has its own check; this orchestrator runs them all and
//! collects errors into a single `ConfigError`.

mod helpers;
mod sections;


use crate::schema::OrbConfig;
use orb_common::ConfigError;

/// Run all validations on a config, collecting all errors.
pub fn validate(config: &OrbConfig) -> Result<(), ConfigError> {
    let mut errors: Vec<String> = Vec::new();

    sections::validate_session(&mut errors, config);
    sections::validate_tools(&mut errors, config);
    sections::validate_volume(&mut errors, config);
    sections::validate_server(&mut errors, config);

    if errors.is_empty() {
        Ok(())
    } else {
        Err(ConfigError::ValidationError(errors.join("; ")))
    }
}

//! Per-section validators: session, tools, volume, and server.

use std::collections::HashSet;

use crate::schema::OrbConfig;

use super::helpers::{validate_range, validate_range_f32};

const KNOWN_MODALITIES: &[&str] = &["text", "audio"];

pub(crate) fn validate_session(errors: &mut Vec<String>, config: &OrbConfig) {
    let session = &config.session;

    if session.modalities.is_empty() {
        errors.push("session.modalities must not be empty".into());
    }
    for modality in &session.modalities {
        if !KNOWN_MODALITIES.contains(&modality.as_str()) {
            errors.push(format!("session.modalities contains unknown value '{modality}'"));
        }
    }
    if session.model.trim().is_empty() {
        errors.push("session.model must not be empty".into());
    }
    if session.data_channel_label.is_empty() {
        errors.push("session.data_channel_label must not be empty".into());
    }

    validate_range(
        errors,
        "session.credential_timeout_secs",
        session.credential_timeout_secs,
        1,
        120,
    );
    validate_range(
        errors,
        "session.negotiation_timeout_secs",
        session.negotiation_timeout_secs,
        1,
        120,
    );
}

pub(crate) fn validate_tools(errors: &mut Vec<String>, config: &OrbConfig) {
    let mut seen = HashSet::new();
    for tool in &config.session.tools {
        if tool.name.trim().is_empty() {
            errors.push("session.tools entry has an empty name".into());
        } else if !seen.insert(tool.name.as_str()) {
            errors.push(format!("session.tools has duplicate name '{}'", tool.name));
        }
    }
}

pub(crate) fn validate_volume(errors: &mut Vec<String>, config: &OrbConfig) {
    let volume = &config.volume;

    validate_range(errors, "volume.interval_ms", volume.interval_ms, 10, 1000);
    validate_range(
        errors,
        "volume.fft_size",
        u64::from(volume.fft_size),
        32,
        32768,
    );
    if !volume.fft_size.is_power_of_two() {
        errors.push(format!(
            "volume.fft_size = {} must be a power of two",
            volume.fft_size
        ));
    }
    validate_range_f32(
        errors,
        "volume.speech_threshold",
        volume.speech_threshold,
        0.0,
        1.0,
    );
}

pub(crate) fn validate_server(errors: &mut Vec<String>, config: &OrbConfig) {
    validate_range(
        errors,
        "server.port",
        u64::from(config.server.port),
        1024,
        65535,
    );
    if config.server.api_key_env.is_empty() {
        errors.push("server.api_key_env must not be empty".into());
    }
}

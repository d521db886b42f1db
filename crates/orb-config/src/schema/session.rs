//! Realtime session settings sent to (or negotiated with) the remote model.

use orb_common::ToolDefinition;
use serde::{Deserialize, Serialize};

/// Session configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionConfig {
    /// Remote speech model identifier (query parameter on negotiation).
    pub model: String,
    /// Voice identifier (query parameter on negotiation).
    pub voice: String,
    /// Requested modalities, any of `text` / `audio`.
    pub modalities: Vec<String>,
    /// Model used for user-speech transcription.
    pub transcription_model: String,
    /// Label of the control data channel.
    pub data_channel_label: String,
    /// Upper bound on the credential fetch, in seconds (valid range: 1-120).
    pub credential_timeout_secs: u64,
    /// Upper bound on the offer/answer exchange, in seconds (valid range: 1-120).
    pub negotiation_timeout_secs: u64,
    /// Tool manifest announced on channel open.
    pub tools: Vec<ToolDefinition>,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            model: "gpt-4o-realtime-preview-2024-12-17".into(),
            voice: "alloy".into(),
            modalities: vec!["text".into(), "audio".into()],
            transcription_model: "whisper-1".into(),
            data_channel_label: "response".into(),
            credential_timeout_secs: 10,
            negotiation_timeout_secs: 15,
            tools: Vec::new(),
        }
    }
}

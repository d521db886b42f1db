//! Session status, engine configuration and injected collaborators.

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use orb_common::ToolDefinition;
use orb_config::OrbConfig;

use crate::clock::{Clock, SystemClock};
use crate::credential::{CredentialProvider, HttpCredentialFetcher};
use crate::media::{MediaDevices, TransportFactory};
use crate::protocol::{SessionUpdate, TranscriptionSettings};
use crate::signaling::{Negotiator, SignalingClient};
use crate::tools::to_realtime_tool;

/// Lifecycle state of a [`SessionEngine`](super::SessionEngine).
///
/// `Display` yields the human-readable status line shown by a UI.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum SessionStatus {
    #[default]
    Idle,
    RequestingMedia,
    FetchingCredential,
    Negotiating,
    Active,
    Error(String),
}

impl SessionStatus {
    /// `start()` is accepted only from these states.
    pub fn can_start(&self) -> bool {
        matches!(self, SessionStatus::Idle | SessionStatus::Error(_))
    }

    /// A start attempt is in progress.
    pub fn is_starting(&self) -> bool {
        matches!(
            self,
            SessionStatus::RequestingMedia
                | SessionStatus::FetchingCredential
                | SessionStatus::Negotiating
        )
    }

    pub fn is_error(&self) -> bool {
        matches!(self, SessionStatus::Error(_))
    }
}

impl fmt::Display for SessionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SessionStatus::Idle => Ok(()),
            SessionStatus::RequestingMedia => f.write_str("Requesting microphone access..."),
            SessionStatus::FetchingCredential => f.write_str("Fetching ephemeral token..."),
            SessionStatus::Negotiating => f.write_str("Establishing connection..."),
            SessionStatus::Active => f.write_str("Session established successfully!"),
            SessionStatus::Error(msg) => write!(f, "Error: {msg}"),
        }
    }
}

/// Engine settings, usually derived from [`OrbConfig`].
#[derive(Debug, Clone)]
pub struct EngineConfig {
    pub modalities: Vec<String>,
    /// Empty disables input transcription.
    pub transcription_model: String,
    pub data_channel_label: String,
    pub tools: Vec<ToolDefinition>,
    pub credential_timeout: Duration,
    pub negotiation_timeout: Duration,
    pub volume_interval: Duration,
    pub fft_size: u32,
    pub speech_threshold: f32,
    pub event_capacity: usize,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self::from_config(&OrbConfig::default())
    }
}

impl EngineConfig {
    pub fn from_config(config: &OrbConfig) -> Self {
        let session = &config.session;
        Self {
            modalities: session.modalities.clone(),
            transcription_model: session.transcription_model.clone(),
            data_channel_label: session.data_channel_label.clone(),
            tools: session.tools.clone(),
            credential_timeout: Duration::from_secs(session.credential_timeout_secs),
            negotiation_timeout: Duration::from_secs(session.negotiation_timeout_secs),
            volume_interval: Duration::from_millis(config.volume.interval_ms),
            fft_size: config.volume.fft_size,
            speech_threshold: config.volume.speech_threshold,
            event_capacity: 256,
        }
    }

    /// The `session.update` body sent when the control channel opens.
    pub fn session_update(&self) -> SessionUpdate {
        SessionUpdate {
            modalities: self.modalities.clone(),
            tools: self.tools.iter().map(to_realtime_tool).collect(),
            input_audio_transcription: (!self.transcription_model.is_empty()).then(|| {
                TranscriptionSettings {
                    model: self.transcription_model.clone(),
                }
            }),
        }
    }
}

/// Collaborators the engine drives. Swapped for fakes in tests.
#[derive(Clone)]
pub struct EngineDeps {
    pub media: Arc<dyn MediaDevices>,
    pub credentials: Arc<dyn CredentialProvider>,
    pub negotiator: Arc<dyn Negotiator>,
    pub transports: Arc<dyn TransportFactory>,
    pub clock: Arc<dyn Clock>,
}

impl EngineDeps {
    /// HTTP credential fetch and signaling against the configured endpoints;
    /// media and transport come from the platform binding.
    pub fn http(
        config: &OrbConfig,
        media: Arc<dyn MediaDevices>,
        transports: Arc<dyn TransportFactory>,
    ) -> Self {
        Self {
            media,
            credentials: Arc::new(HttpCredentialFetcher::new(&config.endpoints.credential_url)),
            negotiator: Arc::new(SignalingClient::new(
                &config.endpoints.realtime_url,
                &config.session.model,
                &config.session.voice,
            )),
            transports,
            clock: Arc::new(SystemClock),
        }
    }
}

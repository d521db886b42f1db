//! Seams to the media stack: microphone capture, the peer transport, its
//! control data channel, and the remote audio waveform.
//!
//! The engine never touches audio or ICE itself. A platform binding
//! (browser, native WebRTC stack, or a test fake) implements these traits.

use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::{mpsc, watch};

use crate::error::VoiceError;

/// Opaque session-description blob (SDP). Never interpreted here.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionDescription(pub String);

impl SessionDescription {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

/// Access to local capture devices.
#[async_trait]
pub trait MediaDevices: Send + Sync {
    /// Open the default microphone. Refusal maps to
    /// [`VoiceError::PermissionDenied`].
    async fn open_microphone(&self) -> Result<Arc<dyn MediaCapture>, VoiceError>;
}

/// A live capture. `stop` must be idempotent.
pub trait MediaCapture: Send + Sync {
    fn label(&self) -> String;
    fn stop(&self);
}

/// Source of unsigned 8-bit time-domain samples centred on 128.
pub trait WaveformSource: Send + Sync {
    fn fill_time_domain(&self, buf: &mut [u8]);
}

/// Remote audio track slot. `None` until the peer delivers a track.
pub type RemoteAudio = watch::Receiver<Option<Arc<dyn WaveformSource>>>;

/// Events surfaced by the control data channel.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DataChannelEvent {
    Open,
    Message(String),
    Closed,
}

/// Both halves of an open data channel.
pub struct DataChannelLink {
    pub outbound: mpsc::Sender<String>,
    pub inbound: mpsc::Receiver<DataChannelEvent>,
}

/// Creates one peer transport per session attempt.
#[async_trait]
pub trait TransportFactory: Send + Sync {
    /// Build a transport carrying `capture` as its outgoing audio track.
    async fn connect(
        &self,
        capture: Arc<dyn MediaCapture>,
    ) -> Result<Arc<dyn PeerTransport>, VoiceError>;
}

/// A peer-to-peer media connection to the remote model.
#[async_trait]
pub trait PeerTransport: Send + Sync {
    /// Create the control channel. Must be called before the offer so the
    /// channel is part of the negotiated session.
    fn open_data_channel(&self, label: &str) -> Result<DataChannelLink, VoiceError>;

    async fn create_offer(&self) -> Result<SessionDescription, VoiceError>;

    async fn apply_answer(&self, answer: SessionDescription) -> Result<(), VoiceError>;

    /// Watch for the remote audio track. Tracks usually arrive some time
    /// after the answer is applied; the value flips to `Some` when one does.
    fn remote_audio(&self) -> RemoteAudio;

    /// Close the connection. Must be idempotent.
    fn close(&self);
}

//! Realtime voice-session engine.
//!
//! Provides:
//! - Session lifecycle over an injected media stack (`SessionEngine`)
//! - One-shot offer/answer signaling and ephemeral credential fetch
//! - The JSON control-channel protocol and its inbound loop
//! - Transcript reconstruction from streaming fragments
//! - Volume metering of the remote audio track
//! - A registry of tools the remote model may call

pub mod channel;
pub mod clock;
pub mod credential;
pub mod error;
pub mod events;
pub mod media;
pub mod protocol;
pub mod session;
pub mod signaling;
pub mod tools;
pub mod transcript;
pub mod volume;

pub use channel::{ChannelContext, ControlChannel};
pub use clock::{Clock, SystemClock};
pub use credential::{CredentialProvider, EphemeralCredential, HttpCredentialFetcher};
pub use error::{SignalingError, VoiceError};
pub use events::{EventBus, SessionEvent};
pub use media::{
    DataChannelEvent, DataChannelLink, MediaCapture, MediaDevices, PeerTransport, RemoteAudio,
    SessionDescription, TransportFactory, WaveformSource,
};
pub use session::{EngineConfig, EngineDeps, SessionEngine, SessionStatus};
pub use signaling::{Negotiator, SignalingClient};
pub use tools::{to_realtime_tool, FnTool, ToolHandler, ToolRegistry};
pub use transcript::{should_display, ActivityStatus, ConversationEntry, Role, TranscriptStore};
pub use volume::VolumeMeter;

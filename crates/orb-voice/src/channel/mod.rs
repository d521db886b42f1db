//! Control channel: the JSON side channel next to the audio tracks.
//!
//! Outbound commands go through [`ControlChannel`]. Inbound frames are
//! consumed by one task per session (see [`ControlChannel::spawn`]) that
//! handles them strictly in arrival order.

mod handler;
#[cfg(test)]
mod tests;

pub use handler::ChannelContext;

use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, warn};

use crate::error::VoiceError;
use crate::media::DataChannelEvent;
use crate::protocol::{ClientEvent, SessionUpdate};

/// Sending half of an open control channel.
#[derive(Clone)]
pub struct ControlChannel {
    label: String,
    outbound: mpsc::Sender<String>,
}

impl ControlChannel {
    pub fn new(label: impl Into<String>, outbound: mpsc::Sender<String>) -> Self {
        Self {
            label: label.into(),
            outbound,
        }
    }

    pub fn label(&self) -> &str {
        &self.label
    }

    pub fn is_closed(&self) -> bool {
        self.outbound.is_closed()
    }

    /// Encode and send one command.
    pub async fn send(&self, event: &ClientEvent) -> Result<(), VoiceError> {
        let text = event.encode()?;
        if self.outbound.send(text).await.is_err() {
            warn!(label = %self.label, "Send on closed control channel");
            return Err(VoiceError::Transport("control channel closed".into()));
        }
        Ok(())
    }

    /// Send the `session.update` declaring modalities and tools.
    pub async fn configure(&self, session: SessionUpdate) -> Result<(), VoiceError> {
        debug!(
            label = %self.label,
            modalities = ?session.modalities,
            tools = session.tools.len(),
            "Configuring remote session"
        );
        self.send(&ClientEvent::SessionUpdate { session }).await
    }

    /// Return a tool's result for `call_id`.
    pub async fn send_tool_result(
        &self,
        call_id: &str,
        output: &serde_json::Value,
    ) -> Result<(), VoiceError> {
        self.send(&ClientEvent::tool_result(call_id, output)).await
    }

    /// Start the inbound loop for this channel.
    pub fn spawn(
        self,
        inbound: mpsc::Receiver<DataChannelEvent>,
        ctx: ChannelContext,
    ) -> JoinHandle<()> {
        tokio::spawn(handler::run(self, inbound, ctx))
    }
}

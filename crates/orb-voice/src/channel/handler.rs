//! Inbound control-message handling.

use std::sync::Arc;

use tokio::sync::{mpsc, RwLock};
use tracing::{debug, info, warn};

use super::ControlChannel;
use crate::error::VoiceError;
use crate::events::{EventBus, SessionEvent};
use crate::media::DataChannelEvent;
use crate::protocol::{self, ServerEvent, SessionUpdate};
use crate::tools::ToolRegistry;
use crate::transcript::TranscriptStore;

/// Shared state the inbound loop writes into.
#[derive(Clone)]
pub struct ChannelContext {
    pub transcript: Arc<RwLock<TranscriptStore>>,
    /// Every decoded inbound message, in arrival order.
    pub raw_log: Arc<RwLock<Vec<serde_json::Value>>>,
    pub tools: Arc<ToolRegistry>,
    pub events: EventBus,
    /// Sent once when the channel opens.
    pub session_update: SessionUpdate,
}

impl ChannelContext {
    /// Handle one inbound frame.
    ///
    /// Returns an error only when the frame itself is unusable; the caller
    /// drops it and keeps going. Tool failures are logged here and never
    /// reach the remote side.
    pub async fn handle_message(
        &self,
        channel: &ControlChannel,
        text: &str,
    ) -> Result<(), VoiceError> {
        let msg = protocol::decode(text)?;
        if msg.event == ServerEvent::Unknown {
            debug!(kind = ?msg.raw.get("type"), "Ignoring unhandled message type");
        }
        self.raw_log.write().await.push(msg.raw);

        match msg.event {
            ServerEvent::FunctionCallArgumentsDone {
                name,
                call_id,
                arguments,
            } => {
                let arguments = protocol::parse_arguments(arguments)?;
                self.dispatch_tool(channel, &name, &call_id, arguments).await;
            }
            ServerEvent::Unknown => {}
            event => {
                if self.transcript.write().await.apply(&event) {
                    self.events.publish(SessionEvent::TranscriptUpdated);
                }
            }
        }
        Ok(())
    }

    async fn dispatch_tool(
        &self,
        channel: &ControlChannel,
        name: &str,
        call_id: &str,
        arguments: serde_json::Value,
    ) {
        let result = match self.tools.invoke(name, arguments).await {
            Ok(Some(value)) => value,
            Ok(None) => {
                debug!(tool = %name, call_id = %call_id, "No handler registered; ignoring call");
                return;
            }
            Err(e) => {
                warn!(tool = %name, call_id = %call_id, error = %e, "Tool invocation failed");
                self.publish_invoked(name, call_id);
                return;
            }
        };

        self.publish_invoked(name, call_id);
        if let Err(e) = channel.send_tool_result(call_id, &result).await {
            warn!(tool = %name, call_id = %call_id, error = %e, "Failed to send tool result");
        } else {
            debug!(tool = %name, call_id = %call_id, "Tool result sent");
        }
    }

    fn publish_invoked(&self, name: &str, call_id: &str) {
        self.events.publish(SessionEvent::ToolInvoked {
            name: name.to_string(),
            call_id: call_id.to_string(),
        });
    }
}

/// Inbound loop: configure on open, handle each message in order, stop
/// on close. Never ends because of a bad message.
pub(super) async fn run(
    channel: ControlChannel,
    mut inbound: mpsc::Receiver<DataChannelEvent>,
    ctx: ChannelContext,
) {
    while let Some(event) = inbound.recv().await {
        match event {
            DataChannelEvent::Open => {
                info!(label = %channel.label(), "Control channel open");
                if let Err(e) = channel.configure(ctx.session_update.clone()).await {
                    warn!(error = %e, "Failed to send session configuration");
                }
                ctx.events.publish(SessionEvent::ChannelOpened);
            }
            DataChannelEvent::Message(text) => {
                if let Err(e) = ctx.handle_message(&channel, &text).await {
                    warn!(error = %e, len = text.len(), "Dropping control message");
                }
            }
            DataChannelEvent::Closed => {
                info!(label = %channel.label(), "Control channel closed");
                ctx.events.publish(SessionEvent::ChannelClosed);
                return;
            }
        }
    }
    debug!(label = %channel.label(), "Control channel receiver dropped");
    ctx.events.publish(SessionEvent::ChannelClosed);
}

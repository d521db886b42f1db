//! Control-channel wire protocol.
//!
//! Every message is a JSON object discriminated by its `type` field.
//! Inbound messages decode into [`ServerEvent`]; types this client does
//! not understand land in [`ServerEvent::Unknown`] and are ignored.

use serde::{Deserialize, Serialize};

use crate::error::VoiceError;

/// Outbound message types.
pub mod types {
    pub const SESSION_UPDATE: &str = "session.update";
    pub const CONVERSATION_ITEM_CREATE: &str = "conversation.item.create";
    pub const FUNCTION_CALL_OUTPUT: &str = "function_call_output";
}

// ---------------------------------------------------------------------------
// Inbound
// ---------------------------------------------------------------------------

/// Events received from the remote model.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(tag = "type")]
pub enum ServerEvent {
    #[serde(rename = "input_audio_buffer.speech_started")]
    SpeechStarted,
    #[serde(rename = "input_audio_buffer.speech_stopped")]
    SpeechStopped,
    #[serde(rename = "input_audio_buffer.committed")]
    AudioCommitted {
        #[serde(default)]
        transcript: Option<String>,
    },
    #[serde(rename = "conversation.item.input_audio_transcription")]
    UserTranscriptPartial {
        #[serde(default)]
        transcript: Option<String>,
        #[serde(default)]
        text: Option<String>,
    },
    #[serde(rename = "conversation.item.input_audio_transcription.completed")]
    UserTranscriptCompleted {
        #[serde(default)]
        transcript: String,
    },
    #[serde(rename = "response.audio_transcript.delta")]
    AssistantTranscriptDelta { delta: String },
    #[serde(rename = "response.audio_transcript.done")]
    AssistantTranscriptDone,
    #[serde(rename = "response.function_call_arguments.done")]
    FunctionCallArgumentsDone {
        name: String,
        call_id: String,
        #[serde(default)]
        arguments: serde_json::Value,
    },
    #[serde(other)]
    Unknown,
}

impl ServerEvent {
    /// Partial transcripts carry their text under either key.
    pub fn partial_text(transcript: &Option<String>, text: &Option<String>) -> String {
        transcript
            .as_deref()
            .or(text.as_deref())
            .unwrap_or_default()
            .to_string()
    }
}

/// A single inbound message: the raw JSON (kept for diagnostics) and its
/// typed form.
#[derive(Debug, Clone)]
pub struct InboundMessage {
    pub raw: serde_json::Value,
    pub event: ServerEvent,
}

/// Decode one inbound text frame.
///
/// Fails with [`VoiceError::ProtocolDecode`] when the frame is not JSON or
/// a known `type` is missing required fields.
pub fn decode(text: &str) -> Result<InboundMessage, VoiceError> {
    let raw: serde_json::Value = serde_json::from_str(text)?;
    if !raw.is_object() {
        return Err(VoiceError::ProtocolDecode(
            "message is not a JSON object".into(),
        ));
    }
    let event = ServerEvent::deserialize(&raw).map_err(|e| {
        let kind = raw.get("type").and_then(|t| t.as_str()).unwrap_or("<none>");
        VoiceError::ProtocolDecode(format!("{kind}: {e}"))
    })?;
    Ok(InboundMessage { raw, event })
}

/// Normalise tool-call arguments: the wire carries them as a JSON string,
/// but an already-structured value is accepted as-is.
pub fn parse_arguments(arguments: serde_json::Value) -> Result<serde_json::Value, VoiceError> {
    match arguments {
        serde_json::Value::String(s) if s.trim().is_empty() => Ok(serde_json::json!({})),
        serde_json::Value::String(s) => Ok(serde_json::from_str(&s)?),
        serde_json::Value::Null => Ok(serde_json::json!({})),
        other => Ok(other),
    }
}

// ---------------------------------------------------------------------------
// Outbound
// ---------------------------------------------------------------------------

/// Transcription settings inside `session.update`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TranscriptionSettings {
    pub model: String,
}

/// Body of the `session.update` message sent on channel open.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SessionUpdate {
    pub modalities: Vec<String>,
    pub tools: Vec<serde_json::Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub input_audio_transcription: Option<TranscriptionSettings>,
}

/// Conversation items this client creates.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ConversationItem {
    FunctionCallOutput { call_id: String, output: String },
}

/// Commands sent to the remote model.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type")]
pub enum ClientEvent {
    #[serde(rename = "session.update")]
    SessionUpdate { session: SessionUpdate },
    #[serde(rename = "conversation.item.create")]
    ConversationItemCreate { item: ConversationItem },
}

impl ClientEvent {
    /// Build the tool-result message for `call_id`; `output` is JSON-encoded.
    pub fn tool_result(call_id: impl Into<String>, output: &serde_json::Value) -> Self {
        ClientEvent::ConversationItemCreate {
            item: ConversationItem::FunctionCallOutput {
                call_id: call_id.into(),
                output: output.to_string(),
            },
        }
    }

    pub fn encode(&self) -> Result<String, VoiceError> {
        encode_frame(self)
    }
}

/// Serialise one outbound frame.
fn encode_frame<T: Serialize + ?Sized>(value: &T) -> Result<String, VoiceError> {
    serde_json::to_string(value).map_err(|e| VoiceError::ProtocolEncode(e.to_string()))
}

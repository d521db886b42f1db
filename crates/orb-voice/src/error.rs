//! Error taxonomy for the voice session core.

use std::time::Duration;

/// Failure of the one-shot offer/answer exchange.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SignalingError {
    #[error("HTTP {status}: {reason}")]
    Status { status: u16, reason: String },
    #[error("network error: {0}")]
    Network(String),
    #[error("negotiation timed out after {0:?}")]
    Timeout(Duration),
}

#[derive(Debug, thiserror::Error)]
pub enum VoiceError {
    /// Media capture was refused or no input device is available.
    #[error("microphone access denied: {0}")]
    PermissionDenied(String),
    /// The ephemeral credential could not be obtained.
    #[error("credential error: {0}")]
    Credential(String),
    #[error("signaling error: {0}")]
    Signaling(#[from] SignalingError),
    /// The peer transport failed to produce an offer or accept an answer.
    #[error("transport error: {0}")]
    Transport(String),
    /// A control-channel message could not be decoded.
    #[error("protocol decode error: {0}")]
    ProtocolDecode(String),
    /// An outbound control-channel message could not be serialised.
    #[error("protocol encode error: {0}")]
    ProtocolEncode(String),
    /// A registered tool handler failed.
    #[error("tool '{name}' failed: {message}")]
    ToolInvocation { name: String, message: String },
    /// The start attempt was cancelled by a concurrent `stop()`.
    #[error("session start superseded")]
    Superseded,
}

impl From<serde_json::Error> for VoiceError {
    fn from(e: serde_json::Error) -> Self {
        VoiceError::ProtocolDecode(e.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn signaling_status_display() {
        let err = SignalingError::Status {
            status: 500,
            reason: "Internal Server Error".into(),
        };
        assert_eq!(err.to_string(), "HTTP 500: Internal Server Error");
    }

    #[test]
    fn voice_error_wraps_signaling() {
        let err: VoiceError = SignalingError::Network("connection refused".into()).into();
        assert!(matches!(err, VoiceError::Signaling(_)));
        assert_eq!(
            err.to_string(),
            "signaling error: network error: connection refused"
        );
    }

    #[test]
    fn json_errors_become_decode_errors() {
        let json_err = serde_json::from_str::<serde_json::Value>("{not json").unwrap_err();
        let err: VoiceError = json_err.into();
        assert!(matches!(err, VoiceError::ProtocolDecode(_)));
    }

    #[test]
    fn encode_errors_are_not_decode_errors() {
        let err = VoiceError::ProtocolEncode("key must be a string".into());
        assert_eq!(err.to_string(), "protocol encode error: key must be a string");
        assert!(!matches!(err, VoiceError::ProtocolDecode(_)));
    }

    #[test]
    fn tool_invocation_display() {
        let err = VoiceError::ToolInvocation {
            name: "partyMode".into(),
            message: "no confetti".into(),
        };
        assert_eq!(err.to_string(), "tool 'partyMode' failed: no confetti");
    }
}

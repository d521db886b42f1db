//! Short-lived credential used to authenticate the negotiation call.

use std::time::Duration;

use async_trait::async_trait;
use tracing::{debug, warn};

use crate::error::VoiceError;

/// Bearer token plus whatever issuance metadata came with it.
#[derive(Clone, PartialEq, Eq)]
pub struct EphemeralCredential {
    pub value: String,
    /// Unix seconds.
    pub expires_at: Option<i64>,
    pub session_id: Option<String>,
    pub model: Option<String>,
}

impl std::fmt::Debug for EphemeralCredential {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EphemeralCredential")
            .field("value", &"[REDACTED]")
            .field("expires_at", &self.expires_at)
            .field("session_id", &self.session_id)
            .field("model", &self.model)
            .finish()
    }
}

impl EphemeralCredential {
    pub fn new(value: impl Into<String>) -> Self {
        Self {
            value: value.into(),
            expires_at: None,
            session_id: None,
            model: None,
        }
    }

    /// Parse the credential endpoint's response body.
    ///
    /// The token lives at `client_secret.value`; `expires_at`, `id` and
    /// `model` are optional.
    pub fn from_json(json: &serde_json::Value) -> Result<Self, VoiceError> {
        let secret = &json["client_secret"];
        let value = secret["value"]
            .as_str()
            .filter(|v| !v.is_empty())
            .ok_or_else(|| VoiceError::Credential("no 'client_secret.value' in response".into()))?;

        Ok(Self {
            value: value.to_string(),
            expires_at: secret["expires_at"].as_i64(),
            session_id: json["id"].as_str().map(String::from),
            model: json["model"].as_str().map(String::from),
        })
    }

    /// Whether the credential has expired as of `now` (Unix seconds).
    /// Credentials without an expiry never expire.
    pub fn is_expired_at(&self, now: i64) -> bool {
        self.expires_at.is_some_and(|exp| exp <= now)
    }
}

/// Source of ephemeral credentials.
#[async_trait]
pub trait CredentialProvider: Send + Sync {
    async fn fetch(&self) -> Result<EphemeralCredential, VoiceError>;
}

/// Fetches credentials from the local session endpoint with an empty POST.
pub struct HttpCredentialFetcher {
    url: String,
    http: reqwest::Client,
}

impl HttpCredentialFetcher {
    pub fn new(url: impl Into<String>) -> Self {
        Self::with_client(url, default_client())
    }

    pub fn with_client(url: impl Into<String>, http: reqwest::Client) -> Self {
        Self {
            url: url.into(),
            http,
        }
    }

    pub fn url(&self) -> &str {
        &self.url
    }
}

#[async_trait]
impl CredentialProvider for HttpCredentialFetcher {
    async fn fetch(&self) -> Result<EphemeralCredential, VoiceError> {
        debug!(url = %self.url, "Fetching ephemeral credential");

        let response = self
            .http
            .post(&self.url)
            .send()
            .await
            .map_err(|e| VoiceError::Credential(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            warn!(status = status.as_u16(), "Credential endpoint rejected request");
            return Err(VoiceError::Credential(format!("HTTP {status}: {text}")));
        }

        let json: serde_json::Value = response
            .json()
            .await
            .map_err(|e| VoiceError::Credential(e.to_string()))?;

        let credential = EphemeralCredential::from_json(&json)?;
        debug!(
            session_id = ?credential.session_id,
            expires_at = ?credential.expires_at,
            "Ephemeral credential received"
        );
        Ok(credential)
    }
}

pub(crate) fn default_client() -> reqwest::Client {
    reqwest::Client::builder()
        .connect_timeout(Duration::from_secs(10))
        .timeout(Duration::from_secs(60))
        .build()
        .unwrap_or_else(|_| reqwest::Client::new())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_session_response() {
        let json = serde_json::json!({
            "id": "sess_001",
            "object": "realtime.session",
            "model": "gpt-4o-realtime-preview-2024-12-17",
            "client_secret": { "value": "ek_abc123", "expires_at": 1234567890 }
        });
        let cred = EphemeralCredential::from_json(&json).unwrap();
        assert_eq!(cred.value, "ek_abc123");
        assert_eq!(cred.expires_at, Some(1234567890));
        assert_eq!(cred.session_id.as_deref(), Some("sess_001"));
        assert!(cred.is_expired_at(1234567890));
        assert!(!cred.is_expired_at(1234567889));
    }

    #[test]
    fn missing_secret_is_a_credential_error() {
        let err = EphemeralCredential::from_json(&serde_json::json!({"error": "nope"})).unwrap_err();
        assert!(matches!(err, VoiceError::Credential(_)));
    }

    #[test]
    fn debug_redacts_token() {
        let cred = EphemeralCredential::new("ek_secret");
        let dbg = format!("{cred:?}");
        assert!(dbg.contains("[REDACTED]"));
        assert!(!dbg.contains("ek_secret"));
    }
}

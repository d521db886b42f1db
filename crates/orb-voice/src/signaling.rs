//! One-shot offer/answer exchange with the realtime endpoint.

use async_trait::async_trait;
use tracing::{debug, warn};

use crate::credential::{default_client, EphemeralCredential};
use crate::error::SignalingError;
use crate::media::SessionDescription;

const SDP_CONTENT_TYPE: &str = "application/sdp";
const MAX_REASON_LEN: usize = 200;

/// Exchanges a local offer for the remote answer.
#[async_trait]
pub trait Negotiator: Send + Sync {
    async fn negotiate(
        &self,
        credential: &EphemeralCredential,
        offer: &SessionDescription,
    ) -> Result<SessionDescription, SignalingError>;
}

/// Posts the raw offer to `{base_url}?model=..&voice=..` and returns the
/// raw answer body. Exactly one request per call; no retries.
pub struct SignalingClient {
    base_url: String,
    model: String,
    voice: String,
    http: reqwest::Client,
}

impl SignalingClient {
    pub fn new(
        base_url: impl Into<String>,
        model: impl Into<String>,
        voice: impl Into<String>,
    ) -> Self {
        Self::with_client(base_url, model, voice, default_client())
    }

    pub fn with_client(
        base_url: impl Into<String>,
        model: impl Into<String>,
        voice: impl Into<String>,
        http: reqwest::Client,
    ) -> Self {
        Self {
            base_url: base_url.into(),
            model: model.into(),
            voice: voice.into(),
            http,
        }
    }
}

#[async_trait]
impl Negotiator for SignalingClient {
    async fn negotiate(
        &self,
        credential: &EphemeralCredential,
        offer: &SessionDescription,
    ) -> Result<SessionDescription, SignalingError> {
        debug!(
            url = %self.base_url,
            model = %self.model,
            voice = %self.voice,
            offer_len = offer.as_str().len(),
            "Sending session offer"
        );

        let response = self
            .http
            .post(&self.base_url)
            .query(&[("model", self.model.as_str()), ("voice", self.voice.as_str())])
            .bearer_auth(&credential.value)
            .header(reqwest::header::CONTENT_TYPE, SDP_CONTENT_TYPE)
            .body(offer.as_str().to_owned())
            .send()
            .await
            .map_err(|e| SignalingError::Network(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            let reason = if body.trim().is_empty() {
                status.canonical_reason().unwrap_or("unknown").to_string()
            } else {
                truncate(body.trim(), MAX_REASON_LEN)
            };
            warn!(status = status.as_u16(), "Negotiation rejected");
            return Err(SignalingError::Status {
                status: status.as_u16(),
                reason,
            });
        }

        let answer = response
            .text()
            .await
            .map_err(|e| SignalingError::Network(e.to_string()))?;
        debug!(answer_len = answer.len(), "Received session answer");
        Ok(SessionDescription(answer))
    }
}

fn truncate(s: &str, max: usize) -> String {
    match s.char_indices().nth(max) {
        Some((idx, _)) => format!("{}...", &s[..idx]),
        None => s.to_string(),
    }
}

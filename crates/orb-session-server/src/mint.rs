//! Mints ephemeral realtime sessions from the upstream API.

use std::time::Duration;

use orb_config::OrbConfig;
use tracing::{debug, warn};

#[derive(Debug, thiserror::Error)]
pub enum MintError {
    #[error("API key not set (expected in ${0})")]
    MissingApiKey(String),
    #[error("network error: {0}")]
    Network(String),
    #[error("upstream HTTP {status}: {body}")]
    Upstream { status: u16, body: String },
    #[error("invalid upstream response: {0}")]
    Parse(String),
}

/// Everything forwarded upstream when creating a session.
#[derive(Debug, Clone)]
pub struct MintSettings {
    pub upstream_url: String,
    pub model: String,
    pub voice: String,
    pub modalities: Vec<String>,
    pub instructions: String,
    pub tool_choice: String,
    pub tools: Vec<serde_json::Value>,
    /// Name of the environment variable the key was read from.
    pub api_key_env: String,
}

impl MintSettings {
    pub fn from_config(config: &OrbConfig) -> Self {
        Self {
            upstream_url: config.server.upstream_url.clone(),
            model: config.session.model.clone(),
            voice: config.session.voice.clone(),
            modalities: config.session.modalities.clone(),
            instructions: config.server.instructions.clone(),
            tool_choice: config.server.tool_choice.clone(),
            tools: config
                .session
                .tools
                .iter()
                .map(orb_voice::to_realtime_tool)
                .collect(),
            api_key_env: config.server.api_key_env.clone(),
        }
    }

    /// Request body for the upstream session endpoint.
    pub fn request_body(&self) -> serde_json::Value {
        serde_json::json!({
            "model": self.model,
            "voice": self.voice,
            "modalities": self.modalities,
            "instructions": self.instructions,
            "tools": self.tools,
            "tool_choice": self.tool_choice,
        })
    }
}

pub struct SessionMinter {
    settings: MintSettings,
    api_key: Option<String>,
    http: reqwest::Client,
}

impl std::fmt::Debug for SessionMinter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionMinter")
            .field("settings", &self.settings)
            .field("api_key", &self.api_key.as_ref().map(|_| "[REDACTED]"))
            .finish()
    }
}

impl SessionMinter {
    pub fn new(settings: MintSettings, api_key: Option<String>) -> Self {
        Self {
            settings,
            api_key: api_key.filter(|k| !k.trim().is_empty()),
            http: reqwest::Client::builder()
                .connect_timeout(Duration::from_secs(10))
                .timeout(Duration::from_secs(30))
                .build()
                .unwrap_or_else(|_| reqwest::Client::new()),
        }
    }

    /// Read the API key from the configured environment variable.
    pub fn from_env(settings: MintSettings) -> Self {
        let api_key = std::env::var(&settings.api_key_env).ok();
        if api_key.is_none() {
            warn!(var = %settings.api_key_env, "API key not set; session requests will fail");
        }
        Self::new(settings, api_key)
    }

    pub fn has_api_key(&self) -> bool {
        self.api_key.is_some()
    }

    /// Create one upstream session and return its JSON as-is.
    pub async fn mint(&self) -> Result<serde_json::Value, MintError> {
        let api_key = self
            .api_key
            .as_deref()
            .ok_or_else(|| MintError::MissingApiKey(self.settings.api_key_env.clone()))?;

        debug!(
            url = %self.settings.upstream_url,
            model = %self.settings.model,
            tools = self.settings.tools.len(),
            "Minting realtime session"
        );

        let response = self
            .http
            .post(&self.settings.upstream_url)
            .bearer_auth(api_key)
            .json(&self.settings.request_body())
            .send()
            .await
            .map_err(|e| MintError::Network(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(MintError::Upstream {
                status: status.as_u16(),
                body,
            });
        }

        response
            .json()
            .await
            .map_err(|e| MintError::Parse(e.to_string()))
    }
}

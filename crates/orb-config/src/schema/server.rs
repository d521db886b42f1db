//! Credential server settings.

use serde::{Deserialize, Serialize};

const DEFAULT_INSTRUCTIONS: &str = "You are a helpful voice assistant embedded in a web page. \
Keep answers short and conversational, and use the available tools when the user asks for something they can do.";

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Listen port (valid range: 1024-65535).
    pub port: u16,
    /// Upstream endpoint that mints ephemeral session credentials.
    pub upstream_url: String,
    /// System instructions forwarded with every minted session.
    pub instructions: String,
    /// Tool choice policy forwarded upstream.
    pub tool_choice: String,
    /// Environment variable holding the long-lived API key.
    pub api_key_env: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            port: 3000,
            upstream_url: "https://api.openai.com/v1/realtime/sessions".into(),
            instructions: DEFAULT_INSTRUCTIONS.into(),
            tool_choice: "auto".into(),
            api_key_env: "OPENAI_API_KEY".into(),
        }
    }
}

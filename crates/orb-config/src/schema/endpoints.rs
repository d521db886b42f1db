//! Network endpoints used during session start.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EndpointsConfig {
    /// Local service that issues ephemeral credentials.
    pub credential_url: String,
    /// Remote negotiation endpoint (offer in, answer out).
    pub realtime_url: String,
}

impl Default for EndpointsConfig {
    fn default() -> Self {
        Self {
            credential_url: "http://localhost:3000/api/session".into(),
            realtime_url: "https://api.openai.com/v1/realtime".into(),
        }
    }
}

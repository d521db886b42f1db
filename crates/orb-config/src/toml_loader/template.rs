//! Default TOML config template with inline documentation comments.

/// Generate the default TOML config content with comments.
pub(crate) fn default_config_toml() -> String {
    r##"# Orb Configuration
# Schema version 1
# Only override what you want to change -- missing fields use defaults.

[session]
# model = "gpt-4o-realtime-preview-2024-12-17"
# voice = "alloy"
# modalities = ["text", "audio"]
# transcription_model = "whisper-1"
# data_channel_label = "response"
# credential_timeout_secs = 10     # 1-120
# negotiation_timeout_secs = 15    # 1-120

# Tools announced to the model. Handlers are registered in code by name.
# [[session.tools]]
# name = "getCurrentTime"
# description = "Gets the current time in the user's timezone"
#
# [[session.tools]]
# name = "launchWebsite"
# description = "Launches a website in the user's browser"
# parameters = { type = "object", properties = { url = { type = "string", description = "The URL to launch" } } }

[endpoints]
# credential_url = "http://localhost:3000/api/session"
# realtime_url = "https://api.openai.com/v1/realtime"

[volume]
# interval_ms = 100        # 10-1000
# fft_size = 256           # power of two, 32-32768
# speech_threshold = 0.1   # 0.0-1.0

[server]
# port = 3000              # 1024-65535
# upstream_url = "https://api.openai.com/v1/realtime/sessions"
# tool_choice = "auto"
# api_key_env = "OPENAI_API_KEY"

[logging]
# level = "INFO"           # DEBUG, INFO, WARNING, ERROR
"##
    .to_string()
}

//! Volume meter settings.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct VolumeConfig {
    /// Sampling period in milliseconds (valid range: 10-1000).
    pub interval_ms: u64,
    /// Analyser FFT size; the waveform buffer holds `fft_size / 2` bytes.
    pub fft_size: u32,
    /// Level above which the remote side counts as speaking.
    pub speech_threshold: f32,
}

impl Default for VolumeConfig {
    fn default() -> Self {
        Self {
            interval_ms: 100,
            fft_size: 256,
            speech_threshold: 0.1,
        }
    }
}

//! Periodic loudness sampling of the remote audio track.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::{debug, trace};

use crate::media::WaveformSource;

/// Root-mean-square of unsigned 8-bit samples centred on 128, in `[0, 1]`.
///
/// An empty buffer is silent.
pub fn rms(samples: &[u8]) -> f32 {
    if samples.is_empty() {
        return 0.0;
    }
    let sum: f32 = samples
        .iter()
        .map(|&b| {
            let v = (b as f32 - 128.0) / 128.0;
            v * v
        })
        .sum();
    (sum / samples.len() as f32).sqrt().clamp(0.0, 1.0)
}

/// A running sampling task.
///
/// `cancelled` is read inside the level channel's write lock, so once
/// [`VolumeMeter::stop`] has published 0 no in-flight sample can land.
struct Sampler {
    handle: JoinHandle<()>,
    cancelled: Arc<AtomicBool>,
}

impl Sampler {
    fn cancel(self) {
        self.cancelled.store(true, Ordering::SeqCst);
        self.handle.abort();
    }

    fn is_running(&self) -> bool {
        !self.handle.is_finished()
    }
}

/// Samples a [`WaveformSource`] on a fixed period and publishes the RMS
/// level. At most one sampling task runs at a time.
pub struct VolumeMeter {
    period: Duration,
    buffer_len: usize,
    speech_threshold: f32,
    level: Arc<watch::Sender<f32>>,
    task: Mutex<Option<Sampler>>,
}

impl VolumeMeter {
    /// `fft_size` follows analyser conventions: the time-domain buffer
    /// holds half as many samples.
    pub fn new(period: Duration, fft_size: u32, speech_threshold: f32) -> Self {
        let (level, _) = watch::channel(0.0);
        Self {
            period,
            buffer_len: (fft_size as usize / 2).max(1),
            speech_threshold,
            level: Arc::new(level),
            task: Mutex::new(None),
        }
    }

    /// Begin sampling `source`. Returns `false` if a sampler is already
    /// running; the existing one keeps going.
    pub fn start(&self, source: Arc<dyn WaveformSource>) -> bool {
        let Ok(mut slot) = self.task.lock() else {
            return false;
        };
        if slot.as_ref().is_some_and(Sampler::is_running) {
            return false;
        }

        let level = Arc::clone(&self.level);
        let cancelled = Arc::new(AtomicBool::new(false));
        let task_cancelled = Arc::clone(&cancelled);
        let period = self.period;
        let buffer_len = self.buffer_len;
        let threshold = self.speech_threshold;

        let handle = tokio::spawn(async move {
            let mut ticker = tokio::time::interval(period);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
            let mut buf = vec![128u8; buffer_len];
            let mut speaking = false;

            loop {
                ticker.tick().await;
                source.fill_time_domain(&mut buf);
                let value = rms(&buf);
                let published = level.send_if_modified(|current| {
                    if task_cancelled.load(Ordering::SeqCst) {
                        return false;
                    }
                    *current = value;
                    true
                });
                if !published {
                    return;
                }

                let now_speaking = value > threshold;
                if now_speaking != speaking {
                    speaking = now_speaking;
                    trace!(level = value, speaking, "Remote speech activity changed");
                }
            }
        });
        *slot = Some(Sampler { handle, cancelled });
        debug!(period_ms = self.period.as_millis() as u64, "Volume meter started");
        true
    }

    /// Stop sampling and reset the level to 0. Idempotent.
    ///
    /// The level stays 0 afterwards even if a sample was mid-flight on
    /// another worker when this was called.
    pub fn stop(&self) {
        if let Ok(mut slot) = self.task.lock() {
            if let Some(sampler) = slot.take() {
                sampler.cancel();
                debug!("Volume meter stopped");
            }
        }
        self.level.send_replace(0.0);
    }

    pub fn is_running(&self) -> bool {
        self.task
            .lock()
            .map(|slot| slot.as_ref().is_some_and(Sampler::is_running))
            .unwrap_or(false)
    }

    /// Latest published level.
    pub fn current(&self) -> f32 {
        *self.level.borrow()
    }

    pub fn subscribe(&self) -> watch::Receiver<f32> {
        self.level.subscribe()
    }

    /// Whether the latest level is above the speech threshold.
    pub fn is_speaking(&self) -> bool {
        self.current() > self.speech_threshold
    }
}

impl Drop for VolumeMeter {
    fn drop(&mut self) {
        if let Ok(mut slot) = self.task.lock() {
            if let Some(sampler) = slot.take() {
                sampler.cancel();
            }
        }
    }
}

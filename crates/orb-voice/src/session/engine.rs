//! The session state machine.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Weak};
use std::time::Duration;

use orb_common::{new_correlation_id, SessionId};
use tokio::sync::{broadcast, watch, Mutex, RwLock};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use super::types::{EngineConfig, EngineDeps, SessionStatus};
use crate::channel::{ChannelContext, ControlChannel};
use crate::error::{SignalingError, VoiceError};
use crate::events::{EventBus, SessionEvent};
use crate::media::{MediaCapture, PeerTransport, RemoteAudio};
use crate::tools::{ToolHandler, ToolRegistry};
use crate::transcript::{ConversationEntry, TranscriptStore};
use crate::volume::VolumeMeter;

/// Handles owned by one live (or half-built) session.
#[derive(Default)]
struct Resources {
    session_id: Option<SessionId>,
    capture: Option<Arc<dyn MediaCapture>>,
    transport: Option<Arc<dyn PeerTransport>>,
    channel: Option<ControlChannel>,
    channel_task: Option<JoinHandle<()>>,
    /// Waits for the remote track, then starts the volume meter.
    audio_task: Option<JoinHandle<()>>,
}

struct EngineInner {
    config: EngineConfig,
    deps: EngineDeps,
    status: watch::Sender<SessionStatus>,
    volume: VolumeMeter,
    transcript: Arc<RwLock<TranscriptStore>>,
    raw_log: Arc<RwLock<Vec<serde_json::Value>>>,
    tools: Arc<ToolRegistry>,
    events: EventBus,
    /// Serialises lifecycle transitions.
    resources: Mutex<Resources>,
    /// Bumped by every accepted `start()` and every `stop()`. A start stage
    /// whose epoch is stale has been cancelled.
    epoch: AtomicU64,
}

impl EngineInner {
    fn is_current(&self, epoch: u64) -> bool {
        self.epoch.load(Ordering::SeqCst) == epoch
    }

    /// Publish `status` if it differs from the current one.
    fn set_status(&self, status: SessionStatus) {
        let changed = self.status.send_if_modified(|current| {
            if *current == status {
                false
            } else {
                *current = status.clone();
                true
            }
        });
        if changed {
            info!(status = ?status, "Session status changed");
            self.events.publish(SessionEvent::StatusChanged(status));
        }
    }

    /// Release everything a session may hold. Safe on a half-built session.
    async fn release(&self, res: &mut Resources) {
        if let Some(task) = res.audio_task.take() {
            task.abort();
        }
        self.volume.stop();
        if let Some(task) = res.channel_task.take() {
            task.abort();
        }
        res.channel = None;
        if let Some(transport) = res.transport.take() {
            transport.close();
        }
        if let Some(capture) = res.capture.take() {
            capture.stop();
        }
        res.session_id = None;

        let had_entries = {
            let mut transcript = self.transcript.write().await;
            let had = !transcript.is_empty();
            transcript.clear();
            had
        };
        self.raw_log.write().await.clear();
        if had_entries {
            self.events.publish(SessionEvent::TranscriptUpdated);
        }
    }
}

impl Drop for EngineInner {
    fn drop(&mut self) {
        let res = self.resources.get_mut();
        if let Some(task) = res.audio_task.take() {
            task.abort();
        }
        if let Some(task) = res.channel_task.take() {
            task.abort();
        }
        if let Some(transport) = res.transport.take() {
            transport.close();
        }
        if let Some(capture) = res.capture.take() {
            capture.stop();
        }
    }
}

/// Realtime voice session: owns the lifecycle and wires media, signaling,
/// the control channel, the transcript and the volume meter together.
///
/// Cheap to clone; clones share one session.
#[derive(Clone)]
pub struct SessionEngine {
    inner: Arc<EngineInner>,
}

impl SessionEngine {
    pub fn new(config: EngineConfig, deps: EngineDeps) -> Self {
        let (status, _) = watch::channel(SessionStatus::Idle);
        let volume = VolumeMeter::new(
            config.volume_interval,
            config.fft_size,
            config.speech_threshold,
        );
        let transcript = Arc::new(RwLock::new(TranscriptStore::new(Arc::clone(&deps.clock))));
        let events = EventBus::new(config.event_capacity.max(1));

        Self {
            inner: Arc::new(EngineInner {
                config,
                deps,
                status,
                volume,
                transcript,
                raw_log: Arc::new(RwLock::new(Vec::new())),
                tools: Arc::new(ToolRegistry::new()),
                events,
                resources: Mutex::new(Resources::default()),
                epoch: AtomicU64::new(0),
            }),
        }
    }

    // -- lifecycle ------------------------------------------------------------

    /// Establish a session.
    ///
    /// A no-op unless the status is `Idle` or `Error`. On failure every
    /// acquired resource is released and the status becomes `Error`; the
    /// error is also returned. A concurrent [`stop`](Self::stop) cancels the
    /// attempt with [`VoiceError::Superseded`].
    pub async fn start(&self) -> Result<(), VoiceError> {
        let Some(epoch) = self.begin_attempt().await else {
            debug!(status = ?self.status(), "start() ignored; session busy");
            return Ok(());
        };

        let attempt = new_correlation_id();
        info!(attempt = %attempt, "Starting voice session");

        match self.establish(epoch).await {
            Ok(session_id) => {
                info!(attempt = %attempt, session_id = %session_id, "Voice session active");
                Ok(())
            }
            Err(VoiceError::Superseded) => {
                debug!(attempt = %attempt, "Session start cancelled by stop()");
                Err(VoiceError::Superseded)
            }
            Err(e) => {
                warn!(attempt = %attempt, error = %e, "Voice session failed to start");
                self.fail(epoch, &e).await;
                Err(e)
            }
        }
    }

    /// Tear everything down and return to `Idle`. Idempotent; cancels an
    /// in-flight `start()`.
    pub async fn stop(&self) {
        let inner = &self.inner;
        let mut res = inner.resources.lock().await;
        inner.epoch.fetch_add(1, Ordering::SeqCst);
        if let Some(id) = res.session_id.as_ref() {
            info!(session_id = %id, "Stopping voice session");
        }
        inner.release(&mut res).await;
        inner.set_status(SessionStatus::Idle);
    }

    /// `stop()` when active, otherwise `start()`.
    pub async fn toggle(&self) -> Result<(), VoiceError> {
        if self.is_active() {
            self.stop().await;
            Ok(())
        } else {
            self.start().await
        }
    }

    async fn begin_attempt(&self) -> Option<u64> {
        let inner = &self.inner;
        let _res = inner.resources.lock().await;
        if !inner.status.borrow().can_start() {
            return None;
        }
        let epoch = inner.epoch.fetch_add(1, Ordering::SeqCst) + 1;
        inner.set_status(SessionStatus::RequestingMedia);
        Some(epoch)
    }

    /// Move to `next` if this attempt is still current.
    async fn advance(&self, epoch: u64, next: SessionStatus) -> Result<(), VoiceError> {
        let _res = self.inner.resources.lock().await;
        if !self.inner.is_current(epoch) {
            return Err(VoiceError::Superseded);
        }
        self.inner.set_status(next);
        Ok(())
    }

    async fn establish(&self, epoch: u64) -> Result<SessionId, VoiceError> {
        let inner = &self.inner;
        let config = &inner.config;
        let deps = &inner.deps;

        let capture = deps.media.open_microphone().await?;
        {
            let mut res = inner.resources.lock().await;
            if !inner.is_current(epoch) {
                capture.stop();
                return Err(VoiceError::Superseded);
            }
            debug!(device = %capture.label(), "Microphone open");
            res.capture = Some(Arc::clone(&capture));
        }
        self.advance(epoch, SessionStatus::FetchingCredential).await?;

        let credential = tokio::time::timeout(config.credential_timeout, deps.credentials.fetch())
            .await
            .map_err(|_| {
                VoiceError::Credential(format!(
                    "timed out after {}",
                    fmt_secs(config.credential_timeout)
                ))
            })??;
        self.advance(epoch, SessionStatus::Negotiating).await?;

        let transport = deps.transports.connect(Arc::clone(&capture)).await?;
        {
            let mut res = inner.resources.lock().await;
            if !inner.is_current(epoch) {
                transport.close();
                return Err(VoiceError::Superseded);
            }
            res.transport = Some(Arc::clone(&transport));
        }

        // The channel must exist before the offer so it is negotiated.
        let link = transport.open_data_channel(&config.data_channel_label)?;
        let offer = transport.create_offer().await?;
        let answer = tokio::time::timeout(
            config.negotiation_timeout,
            deps.negotiator.negotiate(&credential, &offer),
        )
        .await
        .map_err(|_| SignalingError::Timeout(config.negotiation_timeout))??;
        transport.apply_answer(answer).await?;

        let mut res = inner.resources.lock().await;
        if !inner.is_current(epoch) {
            return Err(VoiceError::Superseded);
        }

        let channel = ControlChannel::new(config.data_channel_label.clone(), link.outbound);
        let task = channel.clone().spawn(link.inbound, self.channel_context());
        res.channel = Some(channel);
        res.channel_task = Some(task);

        res.audio_task = Some(tokio::spawn(attach_remote_audio(
            Arc::downgrade(&self.inner),
            epoch,
            transport.remote_audio(),
        )));

        let session_id = SessionId::new();
        res.session_id = Some(session_id.clone());
        inner.set_status(SessionStatus::Active);
        Ok(session_id)
    }

    /// Tear down a failed attempt and surface the error as status.
    async fn fail(&self, epoch: u64, error: &VoiceError) {
        let inner = &self.inner;
        let mut res = inner.resources.lock().await;
        if !inner.is_current(epoch) {
            return;
        }
        inner.release(&mut res).await;
        inner.set_status(SessionStatus::Error(error.to_string()));
    }

    fn channel_context(&self) -> ChannelContext {
        ChannelContext {
            transcript: Arc::clone(&self.inner.transcript),
            raw_log: Arc::clone(&self.inner.raw_log),
            tools: Arc::clone(&self.inner.tools),
            events: self.inner.events.clone(),
            session_update: self.inner.config.session_update(),
        }
    }

    // -- tools ----------------------------------------------------------------

    /// Add or replace a tool handler. Takes effect for the next call, even
    /// mid-session.
    pub async fn register_tool(&self, name: impl Into<String>, handler: Arc<dyn ToolHandler>) {
        self.inner.tools.register(name, handler).await;
    }

    pub async fn register_tool_fn<F, Fut>(&self, name: impl Into<String>, f: F)
    where
        F: Fn(serde_json::Value) -> Fut + Send + Sync + 'static,
        Fut: std::future::Future<Output = Result<serde_json::Value, String>> + Send + 'static,
    {
        self.inner.tools.register_fn(name, f).await;
    }

    pub fn tools(&self) -> Arc<ToolRegistry> {
        Arc::clone(&self.inner.tools)
    }

    // -- observation ----------------------------------------------------------

    pub fn status(&self) -> SessionStatus {
        self.inner.status.borrow().clone()
    }

    pub fn watch_status(&self) -> watch::Receiver<SessionStatus> {
        self.inner.status.subscribe()
    }

    pub fn is_active(&self) -> bool {
        *self.inner.status.borrow() == SessionStatus::Active
    }

    /// Latest volume sample in `[0, 1]`.
    pub fn volume(&self) -> f32 {
        self.inner.volume.current()
    }

    pub fn watch_volume(&self) -> watch::Receiver<f32> {
        self.inner.volume.subscribe()
    }

    pub fn is_speaking(&self) -> bool {
        self.inner.volume.is_speaking()
    }

    /// Snapshot of the full transcript, placeholders included.
    pub async fn conversation(&self) -> Vec<ConversationEntry> {
        self.inner.transcript.read().await.entries().to_vec()
    }

    /// Snapshot of the entries a UI should render.
    pub async fn visible_conversation(&self) -> Vec<ConversationEntry> {
        self.inner.transcript.read().await.visible()
    }

    /// Every decoded inbound control message of the current session.
    pub async fn messages(&self) -> Vec<serde_json::Value> {
        self.inner.raw_log.read().await.clone()
    }

    pub async fn session_id(&self) -> Option<SessionId> {
        self.inner.resources.lock().await.session_id.clone()
    }

    pub fn subscribe(&self) -> broadcast::Receiver<SessionEvent> {
        self.inner.events.subscribe()
    }

    pub fn config(&self) -> &EngineConfig {
        &self.inner.config
    }
}

/// Start the volume meter once the remote track arrives, provided the
/// attempt that asked for it is still the live session.
async fn attach_remote_audio(inner: Weak<EngineInner>, epoch: u64, mut tracks: RemoteAudio) {
    let source = {
        let Ok(track) = tracks.wait_for(Option::is_some).await else {
            debug!("Transport ended without a remote audio track; volume stays at 0");
            return;
        };
        track.as_ref().map(Arc::clone)
    };
    let (Some(source), Some(inner)) = (source, inner.upgrade()) else {
        return;
    };

    let _res = inner.resources.lock().await;
    if inner.is_current(epoch) && inner.volume.start(source) {
        debug!("Remote audio track attached");
    }
}

fn fmt_secs(d: Duration) -> String {
    format!("{}s", d.as_secs_f32())
}

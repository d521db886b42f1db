//! In-memory stand-ins for the media stack and network collaborators.

#![allow(dead_code)]

use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use orb_voice::{
    Clock, CredentialProvider, DataChannelEvent, DataChannelLink, EngineConfig, EngineDeps,
    EphemeralCredential, MediaCapture, MediaDevices, Negotiator, PeerTransport, SessionDescription,
    RemoteAudio, SessionEngine, SignalingError, SystemClock, TransportFactory, VoiceError,
    WaveformSource,
};
use tokio::sync::{mpsc, watch};

// ---------------------------------------------------------------------------
// Media
// ---------------------------------------------------------------------------

#[derive(Default)]
pub struct FakeCapture {
    pub stops: AtomicUsize,
}

impl MediaCapture for FakeCapture {
    fn label(&self) -> String {
        "fake-mic".into()
    }

    fn stop(&self) {
        self.stops.fetch_add(1, Ordering::SeqCst);
    }
}

#[derive(Default)]
pub struct FakeMedia {
    pub deny: AtomicBool,
    pub captures: Mutex<Vec<Arc<FakeCapture>>>,
}

impl FakeMedia {
    pub fn opened(&self) -> usize {
        self.captures.lock().unwrap().len()
    }

    pub fn last(&self) -> Arc<FakeCapture> {
        Arc::clone(self.captures.lock().unwrap().last().unwrap())
    }
}

#[async_trait]
impl MediaDevices for FakeMedia {
    async fn open_microphone(&self) -> Result<Arc<dyn MediaCapture>, VoiceError> {
        if self.deny.load(Ordering::SeqCst) {
            return Err(VoiceError::PermissionDenied("NotAllowedError".into()));
        }
        let capture = Arc::new(FakeCapture::default());
        self.captures.lock().unwrap().push(Arc::clone(&capture));
        Ok(capture)
    }
}

/// Full-scale square wave.
pub struct LoudSource;

impl WaveformSource for LoudSource {
    fn fill_time_domain(&self, buf: &mut [u8]) {
        for (i, b) in buf.iter_mut().enumerate() {
            *b = if i % 2 == 0 { 0 } else { 255 };
        }
    }
}

// ---------------------------------------------------------------------------
// Credentials and signaling
// ---------------------------------------------------------------------------

#[derive(Default)]
pub struct FakeCredentials {
    pub fail: AtomicBool,
    pub delay: Mutex<Option<Duration>>,
    pub calls: AtomicUsize,
}

#[async_trait]
impl CredentialProvider for FakeCredentials {
    async fn fetch(&self) -> Result<EphemeralCredential, VoiceError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let delay = *self.delay.lock().unwrap();
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }
        if self.fail.load(Ordering::SeqCst) {
            return Err(VoiceError::Credential("HTTP 500 Internal Server Error".into()));
        }
        Ok(EphemeralCredential::new("ek_test"))
    }
}

/// Answers with queued results, then with a fixed answer.
#[derive(Default)]
pub struct FakeNegotiator {
    pub queued: Mutex<VecDeque<Result<SessionDescription, SignalingError>>>,
    pub delay: Mutex<Option<Duration>>,
    pub calls: AtomicUsize,
    pub last_token: Mutex<Option<String>>,
}

impl FakeNegotiator {
    pub fn fail_next(&self, status: u16) {
        self.queued.lock().unwrap().push_back(Err(SignalingError::Status {
            status,
            reason: "Internal Server Error".into(),
        }));
    }
}

#[async_trait]
impl Negotiator for FakeNegotiator {
    async fn negotiate(
        &self,
        credential: &EphemeralCredential,
        _offer: &SessionDescription,
    ) -> Result<SessionDescription, SignalingError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        *self.last_token.lock().unwrap() = Some(credential.value.clone());
        let delay = *self.delay.lock().unwrap();
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }
        let next = self.queued.lock().unwrap().pop_front();
        next.unwrap_or_else(|| Ok(SessionDescription("v=0 answer".into())))
    }
}

// ---------------------------------------------------------------------------
// Transport
// ---------------------------------------------------------------------------

/// The remote end of a fake data channel.
pub struct RemotePeer {
    pub to_local: mpsc::Sender<DataChannelEvent>,
    pub from_local: mpsc::Receiver<String>,
}

impl RemotePeer {
    pub async fn open(&self) {
        self.to_local.send(DataChannelEvent::Open).await.unwrap();
    }

    pub async fn send_json(&self, value: serde_json::Value) {
        self.to_local
            .send(DataChannelEvent::Message(value.to_string()))
            .await
            .unwrap();
    }

    pub async fn send_raw(&self, text: &str) {
        self.to_local
            .send(DataChannelEvent::Message(text.to_string()))
            .await
            .unwrap();
    }

    /// Next outbound message, decoded.
    pub async fn recv_json(&mut self) -> serde_json::Value {
        let text = tokio::time::timeout(Duration::from_secs(2), self.from_local.recv())
            .await
            .expect("no outbound message")
            .expect("channel closed");
        serde_json::from_str(&text).unwrap()
    }
}

pub struct FakeTransport {
    pub closes: AtomicUsize,
    pub answer: Mutex<Option<SessionDescription>>,
    pub labels: Mutex<Vec<String>>,
    peer: Mutex<Option<RemotePeer>>,
    audio: watch::Sender<Option<Arc<dyn WaveformSource>>>,
}

impl FakeTransport {
    /// Deliver a loud remote track, as a peer does some time after the
    /// answer is applied.
    pub fn supply_audio(&self) {
        self.audio.send_replace(Some(Arc::new(LoudSource)));
    }

    pub fn take_peer(&self) -> RemotePeer {
        self.peer.lock().unwrap().take().expect("data channel not opened")
    }

    pub fn is_closed(&self) -> bool {
        self.closes.load(Ordering::SeqCst) > 0
    }
}

#[async_trait]
impl PeerTransport for FakeTransport {
    fn open_data_channel(&self, label: &str) -> Result<DataChannelLink, VoiceError> {
        let (out_tx, out_rx) = mpsc::channel(64);
        let (in_tx, in_rx) = mpsc::channel(64);
        self.labels.lock().unwrap().push(label.to_string());
        *self.peer.lock().unwrap() = Some(RemotePeer {
            to_local: in_tx,
            from_local: out_rx,
        });
        Ok(DataChannelLink {
            outbound: out_tx,
            inbound: in_rx,
        })
    }

    async fn create_offer(&self) -> Result<SessionDescription, VoiceError> {
        Ok(SessionDescription("v=0 offer".into()))
    }

    async fn apply_answer(&self, answer: SessionDescription) -> Result<(), VoiceError> {
        *self.answer.lock().unwrap() = Some(answer);
        Ok(())
    }

    fn remote_audio(&self) -> RemoteAudio {
        self.audio.subscribe()
    }

    fn close(&self) {
        self.closes.fetch_add(1, Ordering::SeqCst);
    }
}

#[derive(Default)]
pub struct FakeTransports {
    /// Supply the remote track as soon as the transport is built.
    pub with_audio: AtomicBool,
    pub transports: Mutex<Vec<Arc<FakeTransport>>>,
}

impl FakeTransports {
    pub fn count(&self) -> usize {
        self.transports.lock().unwrap().len()
    }

    pub fn last(&self) -> Arc<FakeTransport> {
        Arc::clone(self.transports.lock().unwrap().last().unwrap())
    }
}

#[async_trait]
impl TransportFactory for FakeTransports {
    async fn connect(
        &self,
        _capture: Arc<dyn MediaCapture>,
    ) -> Result<Arc<dyn PeerTransport>, VoiceError> {
        let (audio, _) = watch::channel(None);
        let transport = Arc::new(FakeTransport {
            closes: AtomicUsize::new(0),
            answer: Mutex::new(None),
            labels: Mutex::new(Vec::new()),
            peer: Mutex::new(None),
            audio,
        });
        if self.with_audio.load(Ordering::SeqCst) {
            transport.supply_audio();
        }
        self.transports.lock().unwrap().push(Arc::clone(&transport));
        Ok(transport)
    }
}

// ---------------------------------------------------------------------------
// Harness
// ---------------------------------------------------------------------------

pub struct Harness {
    pub engine: SessionEngine,
    pub media: Arc<FakeMedia>,
    pub credentials: Arc<FakeCredentials>,
    pub negotiator: Arc<FakeNegotiator>,
    pub transports: Arc<FakeTransports>,
}

pub fn harness() -> Harness {
    harness_with(fast_config())
}

pub fn fast_config() -> EngineConfig {
    EngineConfig {
        volume_interval: Duration::from_millis(10),
        credential_timeout: Duration::from_millis(500),
        negotiation_timeout: Duration::from_millis(500),
        ..EngineConfig::default()
    }
}

pub fn harness_with(config: EngineConfig) -> Harness {
    let media = Arc::new(FakeMedia::default());
    let credentials = Arc::new(FakeCredentials::default());
    let negotiator = Arc::new(FakeNegotiator::default());
    let transports = Arc::new(FakeTransports::default());
    let clock: Arc<dyn Clock> = Arc::new(SystemClock);

    let deps = EngineDeps {
        media: media.clone(),
        credentials: credentials.clone(),
        negotiator: negotiator.clone(),
        transports: transports.clone(),
        clock,
    };

    Harness {
        engine: SessionEngine::new(config, deps),
        media,
        credentials,
        negotiator,
        transports,
    }
}

/// Poll `f` against the engine until it holds or two seconds pass.
pub async fn eventually<F, Fut>(engine: &SessionEngine, f: F)
where
    F: Fn(SessionEngine) -> Fut,
    Fut: std::future::Future<Output = bool>,
{
    let deadline = tokio::time::Instant::now() + Duration::from_secs(2);
    while !f(engine.clone()).await {
        assert!(
            tokio::time::Instant::now() < deadline,
            "condition not met in time"
        );
        tokio::time::sleep(Duration::from_millis(5)).await;
    }
}

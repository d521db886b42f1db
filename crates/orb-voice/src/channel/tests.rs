use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{mpsc, RwLock};

use super::*;
use crate::clock::SystemClock;
use crate::events::{EventBus, SessionEvent};
use crate::media::DataChannelEvent;
use crate::tools::ToolRegistry;
use crate::transcript::{Role, TranscriptStore};

fn context(tools: Arc<ToolRegistry>) -> ChannelContext {
    ChannelContext {
        transcript: Arc::new(RwLock::new(TranscriptStore::new(Arc::new(SystemClock)))),
        raw_log: Arc::new(RwLock::new(Vec::new())),
        tools,
        events: EventBus::new(64),
        session_update: SessionUpdate {
            modalities: vec!["text".into(), "audio".into()],
            tools: vec![],
            input_audio_transcription: None,
        },
    }
}

fn channel() -> (ControlChannel, mpsc::Receiver<String>) {
    let (tx, rx) = mpsc::channel(16);
    (ControlChannel::new("response", tx), rx)
}

const CALL: &str = r#"{"type":"response.function_call_arguments.done","name":"getTime","call_id":"call_1","arguments":"{\"tz\":\"UTC\"}"}"#;

#[tokio::test]
async fn malformed_message_is_rejected_and_not_logged() {
    let ctx = context(Arc::new(ToolRegistry::new()));
    let (ch, _rx) = channel();

    assert!(ctx.handle_message(&ch, "not json").await.is_err());
    assert!(ctx.raw_log.read().await.is_empty());
}

#[tokio::test]
async fn unknown_types_are_logged_but_ignored() {
    let ctx = context(Arc::new(ToolRegistry::new()));
    let (ch, _rx) = channel();

    ctx.handle_message(&ch, r#"{"type":"session.created"}"#)
        .await
        .unwrap();
    assert_eq!(ctx.raw_log.read().await.len(), 1);
    assert!(ctx.transcript.read().await.is_empty());
}

#[tokio::test]
async fn registered_tool_gets_exactly_one_result() {
    let tools = Arc::new(ToolRegistry::new());
    tools
        .register_fn("getTime", |args| async move {
            Ok(serde_json::json!({ "tz": args["tz"], "time": "12:00" }))
        })
        .await;
    let ctx = context(tools);
    let (ch, mut rx) = channel();

    ctx.handle_message(&ch, CALL).await.unwrap();

    let sent: serde_json::Value = serde_json::from_str(&rx.try_recv().unwrap()).unwrap();
    assert_eq!(sent["type"], "conversation.item.create");
    assert_eq!(sent["item"]["call_id"], "call_1");
    let output: serde_json::Value =
        serde_json::from_str(sent["item"]["output"].as_str().unwrap()).unwrap();
    assert_eq!(output["tz"], "UTC");
    assert!(rx.try_recv().is_err());
}

#[tokio::test]
async fn unregistered_tool_sends_nothing() {
    let ctx = context(Arc::new(ToolRegistry::new()));
    let (ch, mut rx) = channel();

    ctx.handle_message(&ch, CALL).await.unwrap();
    assert!(rx.try_recv().is_err());
}

#[tokio::test]
async fn failing_tool_sends_nothing() {
    let tools = Arc::new(ToolRegistry::new());
    tools
        .register_fn("getTime", |_| async { Err("clock broken".to_string()) })
        .await;
    let ctx = context(tools);
    let mut events = ctx.events.subscribe();
    let (ch, mut rx) = channel();

    ctx.handle_message(&ch, CALL).await.unwrap();
    assert!(rx.try_recv().is_err());
    assert_eq!(
        events.try_recv().unwrap(),
        SessionEvent::ToolInvoked {
            name: "getTime".into(),
            call_id: "call_1".into()
        }
    );
}

#[tokio::test]
async fn unparseable_arguments_are_a_decode_error() {
    let calls = Arc::new(AtomicUsize::new(0));
    let tools = Arc::new(ToolRegistry::new());
    let counter = Arc::clone(&calls);
    tools
        .register_fn("getTime", move |_| {
            counter.fetch_add(1, Ordering::SeqCst);
            async { Ok(serde_json::Value::Null) }
        })
        .await;
    let ctx = context(tools);
    let (ch, _rx) = channel();

    let bad = r#"{"type":"response.function_call_arguments.done","name":"getTime","call_id":"c","arguments":"{oops"}"#;
    assert!(matches!(
        ctx.handle_message(&ch, bad).await,
        Err(VoiceError::ProtocolDecode(_))
    ));
    assert_eq!(calls.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn loop_configures_on_open_and_survives_bad_frames() {
    let ctx = context(Arc::new(ToolRegistry::new()));
    let transcript = Arc::clone(&ctx.transcript);
    let mut events = ctx.events.subscribe();
    let (ch, mut out_rx) = channel();
    let (in_tx, in_rx) = mpsc::channel(16);

    let handle = ch.spawn(in_rx, ctx);

    in_tx.send(DataChannelEvent::Open).await.unwrap();
    in_tx
        .send(DataChannelEvent::Message("{garbage".into()))
        .await
        .unwrap();
    for delta in ["Hi", " there"] {
        let msg = serde_json::json!({"type": "response.audio_transcript.delta", "delta": delta});
        in_tx
            .send(DataChannelEvent::Message(msg.to_string()))
            .await
            .unwrap();
    }
    in_tx
        .send(DataChannelEvent::Message(
            r#"{"type":"response.audio_transcript.done"}"#.into(),
        ))
        .await
        .unwrap();
    in_tx.send(DataChannelEvent::Closed).await.unwrap();

    tokio::time::timeout(Duration::from_secs(2), handle)
        .await
        .expect("loop did not finish")
        .unwrap();

    let update: serde_json::Value = serde_json::from_str(&out_rx.try_recv().unwrap()).unwrap();
    assert_eq!(update["type"], "session.update");
    assert_eq!(update["session"]["modalities"][0], "text");

    let t = transcript.read().await;
    assert_eq!(t.len(), 1);
    assert_eq!(t.entries()[0].role, Role::Assistant);
    assert_eq!(t.entries()[0].text, "Hi there");
    assert!(t.entries()[0].is_final);

    assert_eq!(events.recv().await.unwrap(), SessionEvent::ChannelOpened);
    let mut last = None;
    while let Ok(event) = events.try_recv() {
        last = Some(event);
    }
    assert_eq!(last, Some(SessionEvent::ChannelClosed));
}

#[tokio::test]
async fn send_after_close_is_a_transport_error() {
    let (ch, rx) = channel();
    drop(rx);
    assert!(ch.is_closed());
    let err = ch
        .send_tool_result("c", &serde_json::json!(null))
        .await
        .unwrap_err();
    assert!(matches!(err, VoiceError::Transport(_)));
}

// Integration tests for the per-turn upstream session
//
// Each test runs the relay against a scripted local WebSocket server that
// stands in for the realtime API.

mod common;

use common::{
    assistant_item, audio_delta, response_end, settings_for, spawn_upstream,
    stalled_handshake_url, text_delta, unused_url, upstream_error, Step,
};
use serde_json::json;
use std::time::{Duration, Instant};
use voice_relay::{Completion, RealtimeRelay, RelayError, TurnInput};

#[tokio::test]
async fn test_turn_aggregates_text_and_audio_in_order() {
    let upstream = spawn_upstream(vec![
        Step::Send(json!({ "type": "session.created", "session": { "id": "sess_1" } })),
        Step::Send(assistant_item("Hello")),
        Step::Send(text_delta(", world")),
        Step::Send(audio_delta(b"AAAA")),
        Step::Send(audio_delta(b"BB")),
        Step::Send(response_end()),
    ])
    .await;

    let relay = RealtimeRelay::new(settings_for(&upstream.url));
    let reply = relay
        .relay_turn(TurnInput::Text("Hi there".into()))
        .await
        .unwrap();

    assert_eq!(reply.text, "Hello, world");
    assert_eq!(reply.audio, b"AAAABB".to_vec(), "chunks must keep arrival order");
    assert_eq!(reply.mime_type, "audio/mp3");
    assert_eq!(reply.completion, Completion::Complete);
}

#[tokio::test]
async fn test_turn_sends_one_item_then_response_request() {
    let upstream = spawn_upstream(vec![Step::Send(response_end())]).await;

    let relay = RealtimeRelay::new(settings_for(&upstream.url));
    relay
        .relay_turn(TurnInput::Text("What's up?".into()))
        .await
        .unwrap();

    let received = upstream.received();
    assert_eq!(received.len(), 2);
    assert_eq!(received[0]["type"], "conversation.item.create");
    assert_eq!(received[0]["item"]["role"], "user");
    assert_eq!(received[0]["item"]["content"][0]["type"], "input_text");
    assert_eq!(received[0]["item"]["content"][0]["text"], "What's up?");
    assert_eq!(received[1], json!({ "type": "response.create" }));

    let handshake = upstream.handshake().expect("handshake recorded");
    assert_eq!(handshake.authorization.as_deref(), Some("Bearer sk-test"));
    assert_eq!(handshake.beta.as_deref(), Some("realtime=v1"));
    assert!(handshake.uri.ends_with("?model=mock-model"));
}

#[tokio::test]
async fn test_audio_turn_forwards_input_audio() {
    let upstream = spawn_upstream(vec![Step::Send(response_end())]).await;

    let relay = RealtimeRelay::new(settings_for(&upstream.url));
    relay
        .relay_turn(TurnInput::Audio("AAECAw==".into()))
        .await
        .unwrap();

    let received = upstream.received();
    assert_eq!(received[0]["item"]["content"][0]["type"], "input_audio");
    assert_eq!(received[0]["item"]["content"][0]["audio"], "AAECAw==");
}

#[tokio::test]
async fn test_terminal_event_followed_by_close_yields_one_reply() {
    let upstream = spawn_upstream(vec![
        Step::Send(text_delta("done")),
        Step::Send(response_end()),
        Step::Close,
    ])
    .await;

    let relay = RealtimeRelay::new(settings_for(&upstream.url));
    let reply = relay.relay_turn(TurnInput::Text("hi".into())).await.unwrap();

    assert_eq!(reply.completion, Completion::Complete);
    assert_eq!(reply.text, "done");
}

#[tokio::test]
async fn test_upstream_close_completes_with_partial_reply() {
    let upstream = spawn_upstream(vec![
        Step::Send(text_delta("partial")),
        Step::Send(audio_delta(b"RIFFxxxxWAVE")),
        Step::Close,
    ])
    .await;

    let relay = RealtimeRelay::new(settings_for(&upstream.url));
    let reply = relay.relay_turn(TurnInput::Text("hi".into())).await.unwrap();

    assert_eq!(reply.completion, Completion::Closed);
    assert_eq!(reply.text, "partial");
    assert_eq!(reply.mime_type, "audio/wav");
}

#[tokio::test]
async fn test_upstream_error_short_circuits() {
    let upstream = spawn_upstream(vec![
        Step::Send(text_delta("ignored")),
        Step::Send(upstream_error("Invalid 'item.content'")),
        Step::Send(audio_delta(b"late")),
        Step::Send(response_end()),
    ])
    .await;

    let relay = RealtimeRelay::new(settings_for(&upstream.url));
    let started = Instant::now();
    let outcome = relay.relay_turn(TurnInput::Text("hi".into())).await;

    match outcome {
        Err(RelayError::Upstream(message)) => assert_eq!(message, "Invalid 'item.content'"),
        other => panic!("unexpected outcome: {:?}", other),
    }
    assert!(started.elapsed() < Duration::from_secs(2), "must not wait for the timeout");
}

#[tokio::test]
async fn test_error_frame_with_null_fields_fails_turn() {
    let upstream = spawn_upstream(vec![
        Step::Send(json!({
            "type": "error",
            "error": { "type": "server_error", "code": null, "message": null }
        })),
        Step::Send(text_delta("after the error")),
        Step::Send(response_end()),
    ])
    .await;

    let relay = RealtimeRelay::new(settings_for(&upstream.url));
    let outcome = relay.relay_turn(TurnInput::Text("hi".into())).await;

    match outcome {
        Err(RelayError::Upstream(message)) => assert_eq!(message, "Upstream service error"),
        other => panic!("unexpected outcome: {:?}", other),
    }
}

#[tokio::test]
async fn test_error_frame_with_numeric_code_fails_turn() {
    let upstream = spawn_upstream(vec![
        Step::Send(json!({
            "type": "error",
            "error": { "type": "server_error", "code": 123, "message": null }
        })),
        Step::Send(response_end()),
    ])
    .await;

    let relay = RealtimeRelay::new(settings_for(&upstream.url));
    let outcome = relay.relay_turn(TurnInput::Text("hi".into())).await;

    match outcome {
        Err(RelayError::Upstream(message)) => assert_eq!(message, "Upstream service error (123)"),
        other => panic!("unexpected outcome: {:?}", other),
    }
}

#[tokio::test]
async fn test_stalled_handshake_times_out_with_empty_reply() {
    let url = stalled_handshake_url().await;

    let mut settings = settings_for(&url);
    settings.turn_timeout = Duration::from_millis(300);
    settings.close_grace = Duration::from_secs(2);

    let relay = RealtimeRelay::new(settings);
    let started = Instant::now();
    let reply = relay.relay_turn(TurnInput::Text("hi".into())).await.unwrap();

    assert_eq!(reply.completion, Completion::Timeout);
    assert!(reply.text.is_empty());
    assert!(reply.audio.is_empty());
    assert!(
        started.elapsed() < Duration::from_millis(1500),
        "reply must not wait for the close grace period"
    );
}

#[tokio::test]
async fn test_silent_upstream_times_out_with_empty_reply() {
    let upstream = spawn_upstream(vec![Step::Wait(Duration::from_secs(5))]).await;

    let mut settings = settings_for(&upstream.url);
    settings.turn_timeout = Duration::from_millis(300);

    let relay = RealtimeRelay::new(settings);
    let started = Instant::now();
    let reply = relay.relay_turn(TurnInput::Text("hi".into())).await.unwrap();

    assert_eq!(reply.completion, Completion::Timeout);
    assert!(reply.text.is_empty());
    assert!(reply.audio.is_empty());
    assert!(started.elapsed() < Duration::from_secs(2));
}

#[tokio::test]
async fn test_timeout_keeps_what_arrived() {
    let upstream = spawn_upstream(vec![
        Step::Send(text_delta("so far")),
        Step::Send(audio_delta(&[1, 2, 3])),
        Step::Wait(Duration::from_secs(5)),
    ])
    .await;

    let mut settings = settings_for(&upstream.url);
    settings.turn_timeout = Duration::from_millis(500);

    let relay = RealtimeRelay::new(settings);
    let reply = relay.relay_turn(TurnInput::Text("hi".into())).await.unwrap();

    assert_eq!(reply.completion, Completion::Timeout);
    assert_eq!(reply.text, "so far");
    assert_eq!(reply.audio, vec![1, 2, 3]);
}

#[tokio::test]
async fn test_unreachable_upstream_is_a_connection_error() {
    let relay = RealtimeRelay::new(settings_for(&unused_url().await));
    let outcome = relay.relay_turn(TurnInput::Text("hi".into())).await;

    assert!(matches!(outcome, Err(RelayError::Connection)));
}

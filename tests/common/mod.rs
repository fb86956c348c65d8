//! Shared test utilities: a scripted stand-in for the upstream realtime API

#![allow(dead_code)]

use base64::Engine;
use futures::{SinkExt, StreamExt};
use serde_json::{json, Value};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::net::TcpListener;
use tokio_tungstenite::tungstenite::handshake::server::{ErrorResponse, Request, Response};
use tokio_tungstenite::tungstenite::Message;
use voice_relay::RelaySettings;

/// One scripted action the mock performs after receiving the turn
pub enum Step {
    Send(Value),
    Close,
    Wait(Duration),
}

#[derive(Debug, Clone, Default)]
pub struct Handshake {
    pub uri: String,
    pub authorization: Option<String>,
    pub beta: Option<String>,
}

pub struct MockUpstream {
    pub url: String,
    /// Client events received, in order
    pub received: Arc<Mutex<Vec<Value>>>,
    pub handshake: Arc<Mutex<Option<Handshake>>>,
}

impl MockUpstream {
    pub fn received(&self) -> Vec<Value> {
        self.received.lock().unwrap().clone()
    }

    pub fn handshake(&self) -> Option<Handshake> {
        self.handshake.lock().unwrap().clone()
    }
}

/// Accept a single session, read the item and response request, then play
/// `script`.
pub async fn spawn_upstream(script: Vec<Step>) -> MockUpstream {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();

    let received = Arc::new(Mutex::new(Vec::new()));
    let handshake = Arc::new(Mutex::new(None));

    let received_task = Arc::clone(&received);
    let handshake_task = Arc::clone(&handshake);

    tokio::spawn(async move {
        let Ok((stream, _)) = listener.accept().await else {
            return;
        };

        let callback = move |req: &Request, resp: Response| -> Result<Response, ErrorResponse> {
            let header = |name: &str| {
                req.headers()
                    .get(name)
                    .and_then(|v| v.to_str().ok())
                    .map(str::to_string)
            };
            *handshake_task.lock().unwrap() = Some(Handshake {
                uri: req.uri().to_string(),
                authorization: header("authorization"),
                beta: header("openai-beta"),
            });
            Ok(resp)
        };

        let Ok(ws) = tokio_tungstenite::accept_hdr_async(stream, callback).await else {
            return;
        };
        let (mut write, mut read) = ws.split();

        for _ in 0..2 {
            match read.next().await {
                Some(Ok(Message::Text(text))) => {
                    let value: Value = serde_json::from_str(&text).unwrap();
                    received_task.lock().unwrap().push(value);
                }
                _ => return,
            }
        }

        for step in script {
            match step {
                Step::Send(event) => {
                    if write.send(Message::Text(event.to_string().into())).await.is_err() {
                        return;
                    }
                }
                Step::Close => {
                    let _ = write.send(Message::Close(None)).await;
                }
                Step::Wait(duration) => tokio::time::sleep(duration).await,
            }
        }

        // Keep the socket alive until the relay closes it
        while let Some(Ok(msg)) = read.next().await {
            if msg.is_close() {
                break;
            }
        }
    });

    MockUpstream {
        url: format!("ws://{}/v1/realtime", addr),
        received,
        handshake,
    }
}

/// Relay settings pointed at a mock, with short timeouts
pub fn settings_for(url: &str) -> RelaySettings {
    let mut settings = RelaySettings::new("sk-test");
    settings.url = url.to_string();
    settings.model = "mock-model".to_string();
    settings.turn_timeout = Duration::from_secs(3);
    settings.close_grace = Duration::from_millis(200);
    settings
}

/// An address nothing is listening on
pub async fn unused_url() -> String {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);
    format!("ws://{}/v1/realtime", addr)
}

/// A server that accepts TCP connections but never answers the WebSocket
/// upgrade.
pub async fn stalled_handshake_url() -> String {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();

    tokio::spawn(async move {
        let mut held = Vec::new();
        while let Ok((stream, _)) = listener.accept().await {
            held.push(stream);
        }
    });

    format!("ws://{}/v1/realtime", addr)
}

pub fn audio_delta(bytes: &[u8]) -> Value {
    json!({
        "type": "response.audio.delta",
        "response_id": "resp_1",
        "item_id": "item_1",
        "output_index": 0,
        "content_index": 0,
        "delta": base64::engine::general_purpose::STANDARD.encode(bytes),
    })
}

pub fn assistant_item(text: &str) -> Value {
    json!({
        "type": "conversation.item.create",
        "item": {
            "type": "message",
            "role": "assistant",
            "content": [{ "type": "text", "text": text }]
        }
    })
}

pub fn text_delta(text: &str) -> Value {
    json!({ "type": "response.text.delta", "delta": text })
}

pub fn response_end() -> Value {
    json!({ "type": "response.end" })
}

pub fn upstream_error(message: &str) -> Value {
    json!({
        "type": "error",
        "error": { "type": "invalid_request_error", "message": message }
    })
}

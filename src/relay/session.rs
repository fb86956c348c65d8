//! One upstream realtime session per relayed turn.
//!
//! The session runs in its own task: connect, send the user's item and a
//! response request, fold events into the [`Turn`] until it resolves, then
//! close the socket. The HTTP handler only waits for the turn's outcome, so
//! it replies as soon as the turn resolves while the close handshake finishes
//! in the background.

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use futures::stream::{SplitSink, SplitStream};
use futures::{SinkExt, StreamExt};
use tokio::net::TcpStream;
use tokio::time::{sleep_until, timeout, timeout_at, Instant};
use tokio_tungstenite::tungstenite::client::IntoClientRequest;
use tokio_tungstenite::tungstenite::handshake::client::Request;
use tokio_tungstenite::tungstenite::http::{header::AUTHORIZATION, HeaderValue};
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream};
use tracing::{debug, error, info, warn};

use super::messages::{ClientEvent, ServerEvent};
use super::payload::TurnInput;
use super::turn::{Completion, Flow, Turn, TurnOutcome};
use crate::error::RelayError;

pub const DEFAULT_UPSTREAM_URL: &str = "wss://api.openai.com/v1/realtime";
pub const DEFAULT_MODEL: &str = "gpt-4o-realtime-preview-2024-10-01";
pub const DEFAULT_TURN_TIMEOUT: Duration = Duration::from_secs(10);
pub const DEFAULT_CLOSE_GRACE: Duration = Duration::from_secs(2);

type WsStream = WebSocketStream<MaybeTlsStream<TcpStream>>;
type WsSink = SplitSink<WsStream, Message>;
type WsSource = SplitStream<WsStream>;

/// Upstream connection settings shared by every turn.
#[derive(Clone)]
pub struct RelaySettings {
    pub url: String,
    pub model: String,
    pub api_key: String,
    /// Wall-clock budget for a whole turn, handshake included
    pub turn_timeout: Duration,
    /// How long to wait for upstream to acknowledge our close frame
    pub close_grace: Duration,
}

impl RelaySettings {
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            url: DEFAULT_UPSTREAM_URL.to_string(),
            model: DEFAULT_MODEL.to_string(),
            api_key: api_key.into(),
            turn_timeout: DEFAULT_TURN_TIMEOUT,
            close_grace: DEFAULT_CLOSE_GRACE,
        }
    }

    /// Session URL with the model query parameter.
    pub fn endpoint(&self) -> String {
        let separator = if self.url.contains('?') { '&' } else { '?' };
        format!("{}{}model={}", self.url, separator, self.model)
    }

    fn build_request(&self) -> Result<Request, RelayError> {
        let mut request = self.endpoint().into_client_request().map_err(|e| {
            error!("Invalid upstream URL {}: {}", self.url, e);
            RelayError::Connection
        })?;

        let bearer = HeaderValue::from_str(&format!("Bearer {}", self.api_key)).map_err(|e| {
            error!("Upstream credential is not a valid header value: {}", e);
            RelayError::Connection
        })?;

        let headers = request.headers_mut();
        headers.insert(AUTHORIZATION, bearer);
        headers.insert("openai-beta", HeaderValue::from_static("realtime=v1"));

        Ok(request)
    }
}

impl fmt::Debug for RelaySettings {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RelaySettings")
            .field("url", &self.url)
            .field("model", &self.model)
            .field("api_key", &"<redacted>")
            .field("turn_timeout", &self.turn_timeout)
            .field("close_grace", &self.close_grace)
            .finish()
    }
}

/// Relays single conversational turns to the upstream realtime API.
#[derive(Debug, Clone)]
pub struct RealtimeRelay {
    settings: Arc<RelaySettings>,
}

impl RealtimeRelay {
    pub fn new(settings: RelaySettings) -> Self {
        Self {
            settings: Arc::new(settings),
        }
    }

    pub fn settings(&self) -> &RelaySettings {
        &self.settings
    }

    /// Run one turn and wait for its single outcome.
    pub async fn relay_turn(&self, input: TurnInput) -> TurnOutcome {
        let (turn, outcome) = Turn::new();
        info!(turn_id = %turn.id(), input = input.kind(), "Relaying turn");

        tokio::spawn(run_session(Arc::clone(&self.settings), input, turn));

        match outcome.await {
            Ok(outcome) => outcome,
            Err(_) => {
                error!("Relay session dropped without resolving the turn");
                Err(RelayError::Internal)
            }
        }
    }
}

async fn run_session(settings: Arc<RelaySettings>, input: TurnInput, mut turn: Turn) {
    let deadline = Instant::now() + settings.turn_timeout;

    let request = match settings.build_request() {
        Ok(request) => request,
        Err(e) => {
            turn.fail(e);
            return;
        }
    };

    debug!(turn_id = %turn.id(), url = %settings.url, "Connecting to upstream");
    let ws = match timeout_at(deadline, tokio_tungstenite::connect_async(request)).await {
        Ok(Ok((ws, _response))) => ws,
        Ok(Err(e)) => {
            error!(turn_id = %turn.id(), "Upstream connection failed: {}", e);
            turn.fail(RelayError::Connection);
            return;
        }
        Err(_) => {
            warn!(turn_id = %turn.id(), "Turn timed out before upstream connected");
            turn.complete(Completion::Timeout);
            return;
        }
    };
    info!(turn_id = %turn.id(), "Connected to upstream");

    let (mut sink, mut stream) = ws.split();

    turn.begin_sending();
    for event in [input.into_event(), ClientEvent::ResponseCreate] {
        if let Err(e) = send_event(&mut sink, &event).await {
            turn.fail(e);
            close_session(sink, stream, &mut turn, settings.close_grace).await;
            return;
        }
    }
    turn.begin_accumulating();

    let turn_deadline = sleep_until(deadline);
    tokio::pin!(turn_deadline);

    loop {
        tokio::select! {
            _ = &mut turn_deadline => {
                warn!(turn_id = %turn.id(), "Turn timeout reached, closing upstream session");
                turn.complete(Completion::Timeout);
                break;
            }

            msg = stream.next() => match msg {
                Some(Ok(Message::Text(text))) => {
                    match serde_json::from_str::<ServerEvent>(&text) {
                        Ok(event) => {
                            if turn.apply(event) == Flow::Done {
                                break;
                            }
                        }
                        Err(e) => warn!(turn_id = %turn.id(), "Failed to parse upstream event: {}", e),
                    }
                }
                Some(Ok(Message::Close(frame))) => {
                    info!(turn_id = %turn.id(), ?frame, "Upstream closed the session");
                    turn.complete(Completion::Closed);
                    break;
                }
                // tungstenite answers pings itself
                Some(Ok(_)) => {}
                Some(Err(e)) => {
                    error!(turn_id = %turn.id(), "Upstream socket error: {}", e);
                    turn.fail(RelayError::Connection);
                    break;
                }
                None => {
                    info!(turn_id = %turn.id(), "Upstream stream ended");
                    turn.complete(Completion::Closed);
                    break;
                }
            }
        }
    }

    close_session(sink, stream, &mut turn, settings.close_grace).await;
}

async fn send_event(sink: &mut WsSink, event: &ClientEvent) -> Result<(), RelayError> {
    let json = serde_json::to_string(event)?;
    sink.send(Message::Text(json.into())).await.map_err(|e| {
        error!("Failed to send upstream event: {}", e);
        RelayError::Connection
    })
}

/// Close the socket and drain it until upstream acknowledges or `grace`
/// passes. The close counts as a completion signal, which is a no-op for a
/// turn that already resolved.
async fn close_session(mut sink: WsSink, mut stream: WsSource, turn: &mut Turn, grace: Duration) {
    if let Err(e) = sink.send(Message::Close(None)).await {
        debug!(turn_id = %turn.id(), "Close frame not sent: {}", e);
    }

    let drained = timeout(grace, async {
        while let Some(msg) = stream.next().await {
            if matches!(msg, Ok(Message::Close(_)) | Err(_)) {
                break;
            }
        }
    })
    .await;

    if drained.is_err() {
        debug!(turn_id = %turn.id(), "Upstream did not acknowledge close in time");
    }

    turn.complete(Completion::Closed);
    debug!(turn_id = %turn.id(), "Upstream session closed");
}

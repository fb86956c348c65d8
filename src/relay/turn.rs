//! Per-turn state: phase tracking, reply accumulation and the single-fire
//! completion token.

use tokio::sync::oneshot;
use tracing::{debug, info, warn};
use uuid::Uuid;

use super::messages::{describe_upstream_error, ServerEvent};
use crate::audio::guess_mime_type;
use crate::error::RelayError;

/// Result a turn resolves to, delivered exactly once.
pub type TurnOutcome = Result<TurnReply, RelayError>;

/// How a successful turn ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Completion {
    /// Upstream sent its terminal event
    Complete,
    /// Upstream closed the socket before a terminal event
    Closed,
    /// The turn deadline passed; the reply holds whatever arrived
    Timeout,
}

impl Completion {
    pub fn as_str(&self) -> &'static str {
        match self {
            Completion::Complete => "complete",
            Completion::Closed => "closed",
            Completion::Timeout => "timeout",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TurnPhase {
    /// Connecting to upstream
    Open,
    /// Forwarding the user's item and the response request
    Sending,
    /// Collecting deltas
    Accumulating,
    Completed(Completion),
    Failed,
}

/// Aggregated reply for one turn.
#[derive(Debug, Clone)]
pub struct TurnReply {
    pub text: String,
    pub audio: Vec<u8>,
    pub mime_type: &'static str,
    pub completion: Completion,
}

/// Text and audio fragments in the order they arrived.
#[derive(Debug, Default)]
pub struct TurnAccumulator {
    text: String,
    audio: Vec<u8>,
}

impl TurnAccumulator {
    pub fn push_text(&mut self, fragment: &str) {
        self.text.push_str(fragment);
    }

    pub fn push_audio(&mut self, chunk: &[u8]) {
        self.audio.extend_from_slice(chunk);
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn audio(&self) -> &[u8] {
        &self.audio
    }

    pub fn into_reply(self, completion: Completion) -> TurnReply {
        let mime_type = guess_mime_type(&self.audio);
        TurnReply {
            text: self.text,
            audio: self.audio,
            mime_type,
            completion,
        }
    }
}

/// Hands the turn outcome to the waiting handler. Only the first call to
/// [`CompletionToken::fire`] delivers; later calls are no-ops.
#[derive(Debug)]
pub struct CompletionToken {
    tx: Option<oneshot::Sender<TurnOutcome>>,
}

impl CompletionToken {
    pub fn new() -> (Self, oneshot::Receiver<TurnOutcome>) {
        let (tx, rx) = oneshot::channel();
        (Self { tx: Some(tx) }, rx)
    }

    /// Returns `true` if this call delivered the outcome.
    pub fn fire(&mut self, outcome: TurnOutcome) -> bool {
        match self.tx.take() {
            Some(tx) => {
                if tx.send(outcome).is_err() {
                    debug!("Turn outcome receiver already dropped");
                }
                true
            }
            None => false,
        }
    }
}

/// Whether the session loop should keep reading upstream events.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Flow {
    Continue,
    Done,
}

/// One relayed conversational turn.
pub struct Turn {
    id: Uuid,
    phase: TurnPhase,
    acc: TurnAccumulator,
    token: CompletionToken,
}

impl Turn {
    pub fn new() -> (Self, oneshot::Receiver<TurnOutcome>) {
        let (token, rx) = CompletionToken::new();
        (
            Self {
                id: Uuid::new_v4(),
                phase: TurnPhase::Open,
                acc: TurnAccumulator::default(),
                token,
            },
            rx,
        )
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn phase(&self) -> TurnPhase {
        self.phase
    }

    pub fn is_finished(&self) -> bool {
        matches!(self.phase, TurnPhase::Completed(_) | TurnPhase::Failed)
    }

    pub fn begin_sending(&mut self) {
        if self.phase == TurnPhase::Open {
            self.phase = TurnPhase::Sending;
        }
    }

    pub fn begin_accumulating(&mut self) {
        if self.phase == TurnPhase::Sending {
            self.phase = TurnPhase::Accumulating;
        }
    }

    /// Resolve the turn successfully with everything accumulated so far.
    ///
    /// Returns `false` if the turn was already resolved.
    pub fn complete(&mut self, completion: Completion) -> bool {
        if self.is_finished() {
            debug!(turn_id = %self.id, completion = completion.as_str(), "Turn already resolved");
            return false;
        }

        self.phase = TurnPhase::Completed(completion);
        let reply = std::mem::take(&mut self.acc).into_reply(completion);
        info!(
            turn_id = %self.id,
            completion = completion.as_str(),
            text_len = reply.text.len(),
            audio_bytes = reply.audio.len(),
            mime_type = reply.mime_type,
            "Turn completed"
        );
        self.token.fire(Ok(reply))
    }

    /// Resolve the turn with an error. Returns `false` if already resolved.
    pub fn fail(&mut self, err: RelayError) -> bool {
        if self.is_finished() {
            debug!(turn_id = %self.id, error = %err, "Turn already resolved");
            return false;
        }

        self.phase = TurnPhase::Failed;
        warn!(turn_id = %self.id, error = %err, "Turn failed");
        self.token.fire(Err(err))
    }

    /// Fold one upstream event into the turn.
    pub fn apply(&mut self, event: ServerEvent) -> Flow {
        if self.is_finished() {
            return Flow::Done;
        }

        match event {
            ServerEvent::Error { error } => {
                self.fail(RelayError::Upstream(describe_upstream_error(error.as_ref())));
                return Flow::Done;
            }
            ServerEvent::ItemCreated { item } => {
                if let Some(text) = item.assistant_text() {
                    self.acc.push_text(&text);
                }
            }
            ServerEvent::TextDelta { delta } | ServerEvent::AudioTranscriptDelta { delta } => {
                self.acc.push_text(&delta);
            }
            ServerEvent::AudioDelta { delta } => match ServerEvent::decode_audio_delta(&delta) {
                Ok(chunk) => {
                    debug!(turn_id = %self.id, bytes = chunk.len(), "Received audio chunk");
                    self.acc.push_audio(&chunk);
                }
                Err(e) => warn!(turn_id = %self.id, "Skipping undecodable audio delta: {}", e),
            },
            ServerEvent::ResponseEnd => {
                self.complete(Completion::Complete);
                return Flow::Done;
            }
            ServerEvent::Unknown => {}
        }

        Flow::Continue
    }

    pub fn accumulated(&self) -> &TurnAccumulator {
        &self.acc
    }
}

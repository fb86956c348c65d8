//! Upstream realtime relay
//!
//! Bridges one HTTP request to one short-lived realtime WebSocket session:
//! - `messages` - the upstream event subset a turn uses
//! - `turn` - turn phases, reply accumulation, single-fire completion
//! - `payload` - turn input and compressed audio decoding
//! - `session` - the per-turn upstream session

pub mod messages;
pub mod payload;
pub mod session;
pub mod turn;

pub use messages::{ClientEvent, ConversationItem, ServerEvent};
pub use payload::{compress_audio, decompress_audio, TurnInput};
pub use session::{RealtimeRelay, RelaySettings};
pub use turn::{Completion, CompletionToken, Turn, TurnOutcome, TurnPhase, TurnReply};

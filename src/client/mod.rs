//! Chat client
//!
//! The controller owns the transcript and the turn lifecycle; transport,
//! playback and speech are injected so the same flow runs in the terminal
//! client and in tests.

pub mod api;
pub mod controller;
pub mod output;

pub use api::{RelayClient, TurnTransport};
pub use controller::{ChatController, ChatMessage, ControllerState, Role, TurnResult};
pub use output::{AudioOutput, ConsoleSpeech, SpeechSynthesizer, WavFileOutput};

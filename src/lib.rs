pub mod audio;
pub mod client;
pub mod config;
pub mod error;
pub mod http;
pub mod relay;

pub use audio::{guess_mime_type, pcm16_to_wav, AudioFile, WavFormat};
pub use client::{ChatController, RelayClient, TurnTransport};
pub use config::Config;
pub use error::RelayError;
pub use http::{create_router, AppState, ChatRequest, ChatResponse};
pub use relay::{Completion, RealtimeRelay, RelaySettings, TurnInput, TurnReply};

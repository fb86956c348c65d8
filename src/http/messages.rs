use base64::Engine;
use serde::{Deserialize, Serialize};

use crate::error::RelayError;
use crate::relay::{decompress_audio, TurnInput, TurnReply};

/// Body of `POST /api/chat`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChatRequest {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,

    /// Base64 16-bit PCM, or `base64(zlib(...))` of it when `is_compressed`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub audio_data: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub is_compressed: Option<bool>,

    /// Accepted for wire compatibility, not used
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub chunk_index: Option<u64>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub total_chunks: Option<u64>,
}

impl ChatRequest {
    pub fn text(message: impl Into<String>) -> Self {
        Self {
            message: Some(message.into()),
            ..Default::default()
        }
    }

    pub fn audio(audio_data: String, is_compressed: bool) -> Self {
        Self {
            audio_data: Some(audio_data),
            is_compressed: Some(is_compressed),
            ..Default::default()
        }
    }

    /// Audio wins over text when both are present.
    pub fn into_turn_input(self) -> Result<TurnInput, RelayError> {
        match self.audio_data.filter(|audio| !audio.is_empty()) {
            Some(audio) if self.is_compressed.unwrap_or(false) => {
                Ok(TurnInput::Audio(decompress_audio(&audio)?))
            }
            Some(audio) => Ok(TurnInput::Audio(audio)),
            None => match self.message {
                Some(message) if !message.trim().is_empty() => Ok(TurnInput::Text(message)),
                _ => Err(RelayError::BadRequest(
                    "Request must include a message or audioData".to_string(),
                )),
            },
        }
    }
}

/// Aggregated reply for one turn.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChatResponse {
    pub response: String,
    pub audio_data: String,
    pub audio_mime_type: String,
}

impl From<TurnReply> for ChatResponse {
    fn from(reply: TurnReply) -> Self {
        Self {
            response: reply.text,
            audio_data: base64::engine::general_purpose::STANDARD.encode(&reply.audio),
            audio_mime_type: reply.mime_type.to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
}

//! Upstream realtime protocol events.
//!
//! Only the subset a single relayed turn needs is modelled. Every other
//! server event deserializes to [`ServerEvent::Unknown`] and is ignored.

use base64::Engine;
use serde::{Deserialize, Serialize};

// ============================================================================
// Client Events (sent upstream)
// ============================================================================

#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type")]
pub enum ClientEvent {
    #[serde(rename = "conversation.item.create")]
    ConversationItemCreate { item: ConversationItem },

    #[serde(rename = "response.create")]
    ResponseCreate,
}

// ============================================================================
// Server Events (received from upstream)
// ============================================================================

#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "type")]
pub enum ServerEvent {
    /// Any frame tagged `error` fails the turn, whatever its payload holds
    #[serde(rename = "error")]
    Error {
        #[serde(default)]
        error: Option<ApiError>,
    },

    /// Assistant items carry text content parts
    #[serde(
        rename = "conversation.item.create",
        alias = "conversation.item.created"
    )]
    ItemCreated { item: ConversationItem },

    #[serde(rename = "response.text.delta")]
    TextDelta { delta: String },

    #[serde(rename = "response.audio_transcript.delta")]
    AudioTranscriptDelta { delta: String },

    /// Base64-encoded PCM chunk
    #[serde(rename = "response.audio.delta")]
    AudioDelta { delta: String },

    /// No further deltas will arrive for this turn
    #[serde(rename = "response.end", alias = "response.done")]
    ResponseEnd,

    #[serde(other)]
    Unknown,
}

impl ServerEvent {
    pub fn decode_audio_delta(delta: &str) -> Result<Vec<u8>, base64::DecodeError> {
        base64::engine::general_purpose::STANDARD.decode(delta)
    }
}

// ============================================================================
// Supporting Types
// ============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConversationItem {
    #[serde(rename = "type", default = "default_item_type")]
    pub item_type: String,
    #[serde(default)]
    pub role: String,
    #[serde(default)]
    pub content: Vec<ContentPart>,
}

fn default_item_type() -> String {
    "message".to_string()
}

impl ConversationItem {
    pub fn user_text(text: impl Into<String>) -> Self {
        Self {
            item_type: default_item_type(),
            role: "user".to_string(),
            content: vec![ContentPart::InputText { text: text.into() }],
        }
    }

    pub fn user_audio(audio_base64: impl Into<String>) -> Self {
        Self {
            item_type: default_item_type(),
            role: "user".to_string(),
            content: vec![ContentPart::InputAudio {
                audio: audio_base64.into(),
            }],
        }
    }

    /// Concatenated text of an assistant item, `None` for any other role.
    pub fn assistant_text(&self) -> Option<String> {
        if self.role != "assistant" {
            return None;
        }

        let text: String = self
            .content
            .iter()
            .filter_map(|part| match part {
                ContentPart::Text { text } | ContentPart::InputText { text } => Some(text.as_str()),
                _ => None,
            })
            .collect();

        (!text.is_empty()).then_some(text)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum ContentPart {
    #[serde(rename = "input_text")]
    InputText { text: String },

    #[serde(rename = "input_audio")]
    InputAudio { audio: String },

    #[serde(rename = "text")]
    Text { text: String },

    #[serde(other)]
    Other,
}

/// Reported when an error frame carries neither a message nor a code
pub const GENERIC_UPSTREAM_ERROR: &str = "Upstream service error";

/// Upstream error payload. Every field is optional; the upstream is not
/// consistent about nulls or code types.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ApiError {
    #[serde(default)]
    pub code: Option<serde_json::Value>,
    #[serde(default)]
    pub message: Option<String>,
}

impl ApiError {
    /// The message relayed to the caller: upstream's own text when present,
    /// else the code, else a generic message.
    pub fn describe(&self) -> String {
        if let Some(message) = self.message.as_deref().filter(|m| !m.trim().is_empty()) {
            return message.to_string();
        }

        match &self.code {
            Some(serde_json::Value::String(code)) if !code.is_empty() => {
                format!("{} ({})", GENERIC_UPSTREAM_ERROR, code)
            }
            None | Some(serde_json::Value::Null) | Some(serde_json::Value::String(_)) => {
                GENERIC_UPSTREAM_ERROR.to_string()
            }
            Some(code) => format!("{} ({})", GENERIC_UPSTREAM_ERROR, code),
        }
    }
}

/// Message for an `error` event, with or without a payload.
pub fn describe_upstream_error(error: Option<&ApiError>) -> String {
    error.map(ApiError::describe).unwrap_or_else(|| GENERIC_UPSTREAM_ERROR.to_string())
}

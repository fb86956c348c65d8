//! Turn input decoding, including the optional zlib-compressed audio leg.
//!
//! A compressed payload is `base64(zlib(audio_base64))`: inflating it yields
//! the base64 audio text that is forwarded upstream unchanged.

use std::io::{Read, Write};

use base64::Engine;
use flate2::{read::ZlibDecoder, write::ZlibEncoder, Compression};

use super::messages::{ClientEvent, ConversationItem};
use crate::error::RelayError;

/// The user's side of one turn.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TurnInput {
    Text(String),
    /// Base64-encoded 16-bit PCM
    Audio(String),
}

impl TurnInput {
    /// The `conversation.item.create` event carrying this input.
    pub fn into_event(self) -> ClientEvent {
        let item = match self {
            TurnInput::Text(text) => ConversationItem::user_text(text),
            TurnInput::Audio(audio) => ConversationItem::user_audio(audio),
        };
        ClientEvent::ConversationItemCreate { item }
    }

    pub fn kind(&self) -> &'static str {
        match self {
            TurnInput::Text(_) => "text",
            TurnInput::Audio(_) => "audio",
        }
    }
}

/// Inflate a compressed audio payload back to its base64 audio text.
pub fn decompress_audio(payload: &str) -> Result<String, RelayError> {
    let compressed = base64::engine::general_purpose::STANDARD
        .decode(payload.trim())
        .map_err(|e| RelayError::Decompression(format!("invalid base64: {}", e)))?;

    let mut inflated = Vec::new();
    ZlibDecoder::new(compressed.as_slice())
        .read_to_end(&mut inflated)
        .map_err(|e| RelayError::Decompression(e.to_string()))?;

    String::from_utf8(inflated)
        .map_err(|_| RelayError::Decompression("inflated payload is not UTF-8".to_string()))
}

/// Compress base64 audio text for transport. Inverse of [`decompress_audio`].
pub fn compress_audio(audio_base64: &str) -> std::io::Result<String> {
    let mut encoder = ZlibEncoder::new(Vec::new(), Compression::default());
    encoder.write_all(audio_base64.as_bytes())?;
    let compressed = encoder.finish()?;
    Ok(base64::engine::general_purpose::STANDARD.encode(compressed))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_compressed_audio_inflates_to_identical_input() {
        let pcm: Vec<u8> = (0..4096u32).map(|i| (i % 251) as u8).collect();
        let audio = base64::engine::general_purpose::STANDARD.encode(&pcm);

        let compressed = compress_audio(&audio).unwrap();
        assert_ne!(compressed, audio);

        let restored = decompress_audio(&compressed).unwrap();
        assert_eq!(restored, audio);
    }

    #[test]
    fn test_invalid_base64_is_a_decompression_error() {
        let err = decompress_audio("%%%").unwrap_err();
        assert!(matches!(err, RelayError::Decompression(_)));
    }

    #[test]
    fn test_non_zlib_payload_is_a_decompression_error() {
        let not_zlib = base64::engine::general_purpose::STANDARD.encode(b"plain bytes");
        let err = decompress_audio(&not_zlib).unwrap_err();
        assert!(matches!(err, RelayError::Decompression(_)));
    }

    #[test]
    fn test_input_kinds_map_to_content_parts() {
        let text = serde_json::to_value(TurnInput::Text("hi".into()).into_event()).unwrap();
        assert_eq!(text["item"]["content"][0]["type"], "input_text");

        let audio = serde_json::to_value(TurnInput::Audio("AAAA".into()).into_event()).unwrap();
        assert_eq!(audio["item"]["content"][0]["type"], "input_audio");
    }
}

/// MIME type reported when no signature matches.
pub const DEFAULT_AUDIO_MIME: &str = "audio/mp3";

/// Guess the container of an audio buffer from its leading bytes.
///
/// Best effort only: truncated or unknown headers fall through to
/// [`DEFAULT_AUDIO_MIME`].
pub fn guess_mime_type(audio: &[u8]) -> &'static str {
    match audio {
        [0xFF, 0xF2 | 0xF3 | 0xFB, ..] => "audio/mpeg",
        [b'R', b'I', b'F', b'F', ..] => "audio/wav",
        [b'O', b'g', b'g', b'S', ..] => "audio/ogg",
        [b'f', b'L', b'a', b'C', ..] => "audio/flac",
        _ => DEFAULT_AUDIO_MIME,
    }
}

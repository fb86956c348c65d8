pub mod file;
pub mod mime;
pub mod pcm;
pub mod wav;

pub use file::AudioFile;
pub use mime::{guess_mime_type, DEFAULT_AUDIO_MIME};
pub use pcm::{downmix_to_mono, f32_to_pcm16, resample};
pub use wav::{pcm16_to_wav, WavFormat, DEFAULT_SAMPLE_RATE, WAV_HEADER_LEN};

//! PCM → WAV framing.
//!
//! The upstream service streams raw little-endian 16-bit PCM with no
//! container. Players need a RIFF/WAVE header in front of it, so replies are
//! wrapped with the canonical 44-byte header before playback.

/// Size of the canonical PCM WAV header.
pub const WAV_HEADER_LEN: usize = 44;

/// Sample rate the upstream realtime API produces.
pub const DEFAULT_SAMPLE_RATE: u32 = 24_000;

const BITS_PER_SAMPLE: u16 = 16;

/// Layout of the PCM payload being framed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WavFormat {
    pub sample_rate: u32,
    pub channels: u16,
}

impl Default for WavFormat {
    fn default() -> Self {
        Self {
            sample_rate: DEFAULT_SAMPLE_RATE,
            channels: 1,
        }
    }
}

impl WavFormat {
    pub fn byte_rate(&self) -> u32 {
        self.sample_rate * u32::from(self.channels) * u32::from(BITS_PER_SAMPLE / 8)
    }

    pub fn block_align(&self) -> u16 {
        self.channels * (BITS_PER_SAMPLE / 8)
    }

    /// Build the 44-byte header for a payload of `data_len` bytes.
    pub fn header(&self, data_len: u32) -> [u8; WAV_HEADER_LEN] {
        let mut header = [0u8; WAV_HEADER_LEN];

        // RIFF chunk descriptor
        header[0..4].copy_from_slice(b"RIFF");
        header[4..8].copy_from_slice(&data_len.saturating_add(36).to_le_bytes());
        header[8..12].copy_from_slice(b"WAVE");

        // fmt sub-chunk
        header[12..16].copy_from_slice(b"fmt ");
        header[16..20].copy_from_slice(&16u32.to_le_bytes());
        header[20..22].copy_from_slice(&1u16.to_le_bytes()); // PCM
        header[22..24].copy_from_slice(&self.channels.to_le_bytes());
        header[24..28].copy_from_slice(&self.sample_rate.to_le_bytes());
        header[28..32].copy_from_slice(&self.byte_rate().to_le_bytes());
        header[32..34].copy_from_slice(&self.block_align().to_le_bytes());
        header[34..36].copy_from_slice(&BITS_PER_SAMPLE.to_le_bytes());

        // data sub-chunk
        header[36..40].copy_from_slice(b"data");
        header[40..44].copy_from_slice(&data_len.to_le_bytes());

        header
    }

    /// Prefix `pcm` with a header, producing a self-contained WAV file.
    pub fn frame(&self, pcm: &[u8]) -> Vec<u8> {
        let data_len = u32::try_from(pcm.len()).unwrap_or(u32::MAX);
        let mut wav = Vec::with_capacity(WAV_HEADER_LEN + pcm.len());
        wav.extend_from_slice(&self.header(data_len));
        wav.extend_from_slice(pcm);
        wav
    }
}

/// Frame 24kHz mono 16-bit PCM as WAV.
pub fn pcm16_to_wav(pcm: &[u8]) -> Vec<u8> {
    WavFormat::default().frame(pcm)
}

//! Where a reply ends up: audio playback, or spoken text as a fallback.

use anyhow::{Context, Result};
use std::fs;
use std::io::Cursor;
use std::path::PathBuf;
use tracing::info;

/// Plays a complete WAV file. An error makes the controller fall back to
/// speech synthesis.
pub trait AudioOutput: Send {
    fn play(&mut self, wav: &[u8]) -> Result<()>;
}

/// Speaks text when no playable audio is available.
pub trait SpeechSynthesizer: Send {
    fn speak(&mut self, text: &str);
}

/// Validates each reply and saves it as `reply-NNN.wav` in a directory.
pub struct WavFileOutput {
    dir: PathBuf,
    next_index: usize,
}

impl WavFileOutput {
    pub fn new(dir: impl Into<PathBuf>) -> Result<Self> {
        let dir = dir.into();
        fs::create_dir_all(&dir)
            .with_context(|| format!("Failed to create output directory {}", dir.display()))?;
        Ok(Self { dir, next_index: 0 })
    }
}

impl AudioOutput for WavFileOutput {
    fn play(&mut self, wav: &[u8]) -> Result<()> {
        let reader = hound::WavReader::new(Cursor::new(wav)).context("Reply is not a valid WAV")?;
        let spec = reader.spec();
        let duration_secs = reader.duration() as f64 / f64::from(spec.sample_rate.max(1));

        let path = self.dir.join(format!("reply-{:03}.wav", self.next_index));
        fs::write(&path, wav).with_context(|| format!("Failed to write {}", path.display()))?;
        self.next_index += 1;

        info!("Saved {:.1}s reply audio to {}", duration_secs, path.display());
        Ok(())
    }
}

/// Prints the text that would have been spoken.
#[derive(Debug, Default)]
pub struct ConsoleSpeech;

impl SpeechSynthesizer for ConsoleSpeech {
    fn speak(&mut self, text: &str) {
        if !text.is_empty() {
            println!("(spoken) {}", text);
        }
    }
}

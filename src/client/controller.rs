use anyhow::{Context, Result};
use base64::Engine;
use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::{debug, info, warn};

use super::api::TurnTransport;
use super::output::{AudioOutput, SpeechSynthesizer};
use crate::audio::{f32_to_pcm16, pcm16_to_wav, DEFAULT_SAMPLE_RATE};
use crate::http::{ChatRequest, ChatResponse};
use crate::relay::compress_audio;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Assistant,
}

/// One entry of the on-screen transcript
#[derive(Debug, Clone, Serialize)]
pub struct ChatMessage {
    pub role: Role,
    pub content: String,
    pub timestamp: DateTime<Utc>,
}

impl ChatMessage {
    fn new(role: Role, content: impl Into<String>) -> Self {
        Self {
            role,
            content: content.into(),
            timestamp: Utc::now(),
        }
    }
}

/// Input is only accepted while `Idle`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ControllerState {
    Idle,
    Recording,
    AwaitingReply,
}

/// What happened to a turn once it finished.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TurnResult {
    /// Nothing to send (blank text or empty recording)
    Skipped,
    /// Reply audio was handed to the audio output
    Played,
    /// Reply text was spoken because audio was missing or unplayable
    Spoken,
    /// The relay call failed; the transcript holds the error entry
    Failed(String),
}

/// Drives one chat session: collects input, sends turns, renders replies.
pub struct ChatController<T, O, S> {
    transport: T,
    output: O,
    speech: S,
    transcript: Vec<ChatMessage>,
    state: ControllerState,
    recording: Vec<f32>,
    compress_audio: bool,
}

impl<T, O, S> ChatController<T, O, S>
where
    T: TurnTransport,
    O: AudioOutput,
    S: SpeechSynthesizer,
{
    pub fn new(transport: T, output: O, speech: S) -> Self {
        Self {
            transport,
            output,
            speech,
            transcript: Vec::new(),
            state: ControllerState::Idle,
            recording: Vec::new(),
            compress_audio: false,
        }
    }

    /// Deflate recorded audio before sending it.
    pub fn with_compression(mut self, enabled: bool) -> Self {
        self.compress_audio = enabled;
        self
    }

    pub fn transcript(&self) -> &[ChatMessage] {
        &self.transcript
    }

    pub fn state(&self) -> ControllerState {
        self.state
    }

    pub fn is_busy(&self) -> bool {
        self.state != ControllerState::Idle
    }

    pub async fn send_text(&mut self, input: &str) -> Result<TurnResult> {
        self.ensure_idle()?;

        let text = input.trim();
        if text.is_empty() {
            return Ok(TurnResult::Skipped);
        }

        self.transcript.push(ChatMessage::new(Role::User, text));
        Ok(self.run_turn(ChatRequest::text(text)).await)
    }

    pub fn start_recording(&mut self) -> Result<()> {
        self.ensure_idle()?;
        self.recording.clear();
        self.state = ControllerState::Recording;
        info!("Recording started");
        Ok(())
    }

    /// Append captured samples (mono, 24kHz, [-1.0, 1.0]).
    pub fn push_samples(&mut self, samples: &[f32]) {
        if self.state == ControllerState::Recording {
            self.recording.extend_from_slice(samples);
        } else {
            debug!("Ignoring {} samples while not recording", samples.len());
        }
    }

    /// Stop capturing and send the recording as one audio turn.
    pub async fn stop_recording(&mut self) -> Result<TurnResult> {
        if self.state != ControllerState::Recording {
            anyhow::bail!("Not recording");
        }

        let samples = std::mem::take(&mut self.recording);
        self.state = ControllerState::Idle;
        if samples.is_empty() {
            info!("Recording stopped with no audio captured");
            return Ok(TurnResult::Skipped);
        }

        let duration_secs = samples.len() as f64 / f64::from(DEFAULT_SAMPLE_RATE);
        info!("Recording stopped: {:.1}s", duration_secs);

        let pcm = f32_to_pcm16(&samples);
        let mut audio = base64::engine::general_purpose::STANDARD.encode(&pcm);
        if self.compress_audio {
            let original_len = audio.len();
            audio = compress_audio(&audio).context("Failed to compress recording")?;
            debug!("Compressed audio payload {} -> {} bytes", original_len, audio.len());
        }

        self.transcript.push(ChatMessage::new(
            Role::User,
            format!("[voice message, {:.1}s]", duration_secs),
        ));
        Ok(self
            .run_turn(ChatRequest::audio(audio, self.compress_audio))
            .await)
    }

    fn ensure_idle(&self) -> Result<()> {
        match self.state {
            ControllerState::Idle => Ok(()),
            ControllerState::Recording => anyhow::bail!("Recording in progress"),
            ControllerState::AwaitingReply => anyhow::bail!("A turn is already in flight"),
        }
    }

    async fn run_turn(&mut self, request: ChatRequest) -> TurnResult {
        self.state = ControllerState::AwaitingReply;
        let result = self.transport.send_turn(&request).await;
        self.state = ControllerState::Idle;

        match result {
            Ok(reply) => {
                self.transcript
                    .push(ChatMessage::new(Role::Assistant, reply.response.clone()));
                self.render_reply(&reply)
            }
            Err(e) => {
                let message = format!("{:#}", e);
                warn!("Turn failed: {}", message);
                self.transcript
                    .push(ChatMessage::new(Role::Assistant, format!("Error: {}", message)));
                TurnResult::Failed(message)
            }
        }
    }

    fn render_reply(&mut self, reply: &ChatResponse) -> TurnResult {
        if reply.audio_data.is_empty() {
            warn!("No audio data received");
            self.speech.speak(&reply.response);
            return TurnResult::Spoken;
        }

        match self.play_audio(&reply.audio_data) {
            Ok(()) => TurnResult::Played,
            Err(e) => {
                warn!("Audio playback failed, falling back to speech: {:#}", e);
                self.speech.speak(&reply.response);
                TurnResult::Spoken
            }
        }
    }

    fn play_audio(&mut self, audio_base64: &str) -> Result<()> {
        let pcm = base64::engine::general_purpose::STANDARD
            .decode(audio_base64)
            .context("Reply audio is not valid base64")?;
        debug!("Playing {} bytes of reply audio", pcm.len());
        self.output.play(&pcm16_to_wav(&pcm))
    }
}

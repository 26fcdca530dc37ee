//! Voice capture pipeline driver.
//!
//! Drives one recording through the capture device, clip store, and
//! transcription adapter, then hands the transcript to the request
//! orchestrator. Shares the orchestrator's single-flight rule: if a typed
//! request is in flight when the transcript is ready, the dispatch is
//! rejected rather than queued.

use std::sync::Arc;

use parley_audio::CaptureDevice;
use parley_chat::{AskOutcome, RequestOrchestrator, SupportBackend};
use parley_core::types::Message;
use parley_storage::{ClipStore, SessionStore};
use parley_transcribe::TranscriptionService;

use crate::error::VoiceError;
use crate::state::{VoiceMachine, VoiceState};

/// User message appended when a recorded clip could not be transcribed.
pub const UNTRANSCRIBED_NOTE: &str = "🎤 Voice message (could not be transcribed)";

/// How a finished recording resolved.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VoiceOutcome {
    /// Transcription succeeded and the transcript was dispatched.
    Dispatched(AskOutcome),
    /// Transcription failed; an annotated user message was appended and no
    /// request was sent.
    TranscriptionFailed,
}

/// The voice capture pipeline.
pub struct VoicePipeline<D, T, B> {
    device: D,
    transcriber: T,
    orchestrator: Arc<RequestOrchestrator<B>>,
    session: Arc<SessionStore>,
    clips: ClipStore,
    machine: VoiceMachine,
}

impl<D, T, B> VoicePipeline<D, T, B>
where
    D: CaptureDevice,
    T: TranscriptionService,
    B: SupportBackend,
{
    pub fn new(
        device: D,
        transcriber: T,
        orchestrator: Arc<RequestOrchestrator<B>>,
        session: Arc<SessionStore>,
        clips: ClipStore,
    ) -> Self {
        Self {
            device,
            transcriber,
            orchestrator,
            session,
            clips,
            machine: VoiceMachine::new(),
        }
    }

    /// Returns the current pipeline state.
    pub fn state(&self) -> VoiceState {
        self.machine.current()
    }

    /// Acquire the input device and start recording.
    ///
    /// Fails with `CaptureUnavailable` if the device cannot be acquired,
    /// leaving the pipeline idle.
    pub async fn start_recording(&self) -> Result<(), VoiceError> {
        self.machine.transition(VoiceState::Recording)?;
        if let Err(e) = self.device.start().await {
            self.machine.reset();
            return Err(e.into());
        }
        tracing::info!("Voice recording started");
        Ok(())
    }

    /// Discard the in-progress recording and release the device.
    ///
    /// The only supported cancellation point; nothing is appended.
    pub async fn cancel_recording(&self) -> Result<(), VoiceError> {
        self.machine.transition(VoiceState::Idle)?;
        match self.device.stop().await {
            Ok(clip) => {
                tracing::info!(samples = clip.samples.len(), "Voice recording cancelled")
            }
            Err(e) => tracing::warn!(error = %e, "Device release failed during cancel"),
        }
        Ok(())
    }

    /// Finalize the recording, transcribe it, and dispatch the transcript.
    ///
    /// On transcription success the orchestrator appends one user message
    /// carrying both transcript and clip reference, then the bot reply. On
    /// transcription failure a user message noting the untranscribable clip
    /// (still carrying the clip reference) is appended and no request is
    /// sent. The pipeline returns to idle on every path.
    pub async fn stop_recording(&self) -> Result<VoiceOutcome, VoiceError> {
        self.machine.transition(VoiceState::Transcribing)?;
        let result = self.finish().await;
        self.machine.reset();
        result
    }

    async fn finish(&self) -> Result<VoiceOutcome, VoiceError> {
        let clip = self.device.stop().await?;
        let audio_url = self.clips.save(&clip.samples, clip.sample_rate)?;

        match self
            .transcriber
            .transcribe(&clip.samples, clip.sample_rate)
            .await
        {
            Ok(transcript) => {
                tracing::info!(
                    duration_secs = transcript.duration_secs,
                    "Voice clip transcribed"
                );
                let outcome = self
                    .orchestrator
                    .ask_with_audio(&transcript.text, Some(audio_url))
                    .await?;
                Ok(VoiceOutcome::Dispatched(outcome))
            }
            Err(e) => {
                tracing::warn!(error = %e, "Voice transcription failed");
                self.session
                    .append(&Message::user_with_audio(UNTRANSCRIBED_NOTE, audio_url))?;
                Ok(VoiceOutcome::TranscriptionFailed)
            }
        }
    }
}

// =============================================================================
// Tests
// =============================================================================

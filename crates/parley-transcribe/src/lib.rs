//! Parley transcribe crate - speech-to-text adapter.
//!
//! Provides a trait-based abstraction for transcribing captured audio, along
//! with a mock implementation for testing without a real speech-to-text
//! engine. The engine itself is an external collaborator consumed, not
//! implemented, here.

use std::future::Future;

use parley_core::error::ParleyError;

// =============================================================================
// Result type
// =============================================================================

/// The result of transcribing one audio clip.
#[derive(Debug, Clone, PartialEq)]
pub struct Transcript {
    /// Transcribed text.
    pub text: String,
    /// Detected or configured language.
    pub language: String,
    /// Duration of the transcribed audio in seconds.
    pub duration_secs: f32,
}

// =============================================================================
// Trait
// =============================================================================

/// Service for converting captured audio into text.
pub trait TranscriptionService: Send + Sync {
    /// Transcribe audio data into text.
    ///
    /// # Arguments
    /// * `samples` - PCM audio samples as f32 values in [-1.0, 1.0].
    /// * `sample_rate` - Sample rate of the audio in Hz (e.g. 16000).
    fn transcribe(
        &self,
        samples: &[f32],
        sample_rate: u32,
    ) -> impl Future<Output = Result<Transcript, ParleyError>> + Send;
}

// =============================================================================
// Mock implementation
// =============================================================================

/// Mock transcription service returning a fixed transcript.
///
/// Empty audio and a zero sample rate fail, as a real engine would; a
/// failure mode is available for exercising the pipeline's fallback path.
#[derive(Debug, Clone)]
pub struct MockTranscriptionService {
    text: String,
    fail: bool,
}

impl Default for MockTranscriptionService {
    fn default() -> Self {
        Self::new()
    }
}

impl MockTranscriptionService {
    pub fn new() -> Self {
        Self {
            text: "[mock transcript]".to_string(),
            fail: false,
        }
    }

    /// Return the given text from every transcription.
    pub fn with_text(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            fail: false,
        }
    }

    /// Fail every transcription.
    pub fn failing() -> Self {
        Self {
            text: String::new(),
            fail: true,
        }
    }
}

impl TranscriptionService for MockTranscriptionService {
    async fn transcribe(
        &self,
        samples: &[f32],
        sample_rate: u32,
    ) -> Result<Transcript, ParleyError> {
        if self.fail {
            return Err(ParleyError::TranscriptionFailed(
                "no usable result".to_string(),
            ));
        }
        if samples.is_empty() {
            return Err(ParleyError::TranscriptionFailed(
                "cannot transcribe empty audio".to_string(),
            ));
        }
        if sample_rate == 0 {
            return Err(ParleyError::TranscriptionFailed(
                "sample rate must be greater than 0".to_string(),
            ));
        }

        let duration_secs = samples.len() as f32 / sample_rate as f32;
        tracing::debug!(duration_secs, "Mock transcription generated");

        Ok(Transcript {
            text: self.text.clone(),
            language: "en".to_string(),
            duration_secs,
        })
    }
}

// =============================================================================
// Tests
// =============================================================================

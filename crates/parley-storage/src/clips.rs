//! Clip store: recorded voice messages persisted as WAV files.
//!
//! Each saved clip gets a fresh UUID filename under the clip directory. The
//! returned path is the audio reference carried on the user message, so the
//! presentation layer can play the clip back.

use std::path::{Path, PathBuf};

use tracing::debug;
use uuid::Uuid;

use parley_core::error::ParleyError;

/// File-backed store for recorded audio clips.
#[derive(Debug, Clone)]
pub struct ClipStore {
    dir: PathBuf,
}

impl ClipStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    /// Write a mono clip as 16-bit PCM WAV and return its path.
    pub fn save(&self, samples: &[f32], sample_rate: u32) -> Result<String, ParleyError> {
        if sample_rate == 0 {
            return Err(ParleyError::Audio(
                "Sample rate must be greater than 0".to_string(),
            ));
        }

        std::fs::create_dir_all(&self.dir)?;
        let path = self.dir.join(format!("{}.wav", Uuid::new_v4()));
        std::fs::write(&path, encode_wav(samples, sample_rate))?;

        debug!(
            path = %path.display(),
            samples = samples.len(),
            "Audio clip saved"
        );
        Ok(path.to_string_lossy().into_owned())
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }
}

/// Encode f32 samples in [-1.0, 1.0] as a mono 16-bit PCM WAV file.
fn encode_wav(samples: &[f32], sample_rate: u32) -> Vec<u8> {
    let data_len = (samples.len() * 2) as u32;
    let byte_rate = sample_rate * 2;

    let mut out = Vec::with_capacity(44 + samples.len() * 2);
    out.extend_from_slice(b"RIFF");
    out.extend_from_slice(&(36 + data_len).to_le_bytes());
    out.extend_from_slice(b"WAVE");

    out.extend_from_slice(b"fmt ");
    out.extend_from_slice(&16u32.to_le_bytes()); // fmt chunk size
    out.extend_from_slice(&1u16.to_le_bytes()); // PCM
    out.extend_from_slice(&1u16.to_le_bytes()); // mono
    out.extend_from_slice(&sample_rate.to_le_bytes());
    out.extend_from_slice(&byte_rate.to_le_bytes());
    out.extend_from_slice(&2u16.to_le_bytes()); // block align
    out.extend_from_slice(&16u16.to_le_bytes()); // bits per sample

    out.extend_from_slice(b"data");
    out.extend_from_slice(&data_len.to_le_bytes());
    for sample in samples {
        let value = (sample.clamp(-1.0, 1.0) * i16::MAX as f32) as i16;
        out.extend_from_slice(&value.to_le_bytes());
    }
    out
}

// =============================================================================
// Tests
// =============================================================================

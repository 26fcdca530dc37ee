//! Parley audio crate - audio capture abstraction for voice messages.
//!
//! Provides a trait-based abstraction over the microphone capability, along
//! with a mock device for testing without real audio hardware. The real
//! input device is an external collaborator; this crate defines only the
//! seam the voice pipeline consumes.

use std::future::Future;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

use parley_core::error::ParleyError;

// =============================================================================
// Types
// =============================================================================

/// A finalized recording: raw PCM samples plus their sample rate.
#[derive(Debug, Clone, PartialEq)]
pub struct AudioClip {
    /// PCM audio samples as f32 values in [-1.0, 1.0].
    pub samples: Vec<f32>,
    /// Sample rate in Hz (e.g. 16000).
    pub sample_rate: u32,
}

impl AudioClip {
    /// Duration of the clip in seconds.
    pub fn duration_secs(&self) -> f32 {
        if self.sample_rate == 0 {
            return 0.0;
        }
        self.samples.len() as f32 / self.sample_rate as f32
    }
}

// =============================================================================
// Trait
// =============================================================================

/// An audio input device the voice pipeline can record from.
///
/// `start` acquires the device and begins capturing; failure to acquire
/// (missing hardware, denied permission) is a `CaptureUnavailable` error.
/// `stop` finalizes the capture into a single clip and releases the device.
pub trait CaptureDevice: Send + Sync {
    /// Acquire the input device and begin capturing.
    fn start(&self) -> impl Future<Output = Result<(), ParleyError>> + Send;

    /// Stop capturing, release the device, and return the recorded clip.
    fn stop(&self) -> impl Future<Output = Result<AudioClip, ParleyError>> + Send;

    /// Check whether a capture is currently in progress.
    fn is_active(&self) -> bool;
}

// =============================================================================
// Mock implementation
// =============================================================================

/// Mock capture device for testing.
///
/// Simulates capture without hardware: `start` flips an atomic active flag
/// (or fails when configured unavailable), `stop` returns canned samples.
#[derive(Debug, Clone)]
pub struct MockCaptureDevice {
    active: Arc<AtomicBool>,
    available: bool,
    samples: Arc<Mutex<Vec<f32>>>,
    sample_rate: u32,
}

impl Default for MockCaptureDevice {
    fn default() -> Self {
        Self::new()
    }
}

impl MockCaptureDevice {
    /// An available device yielding one second of silence at 16 kHz.
    pub fn new() -> Self {
        Self {
            active: Arc::new(AtomicBool::new(false)),
            available: true,
            samples: Arc::new(Mutex::new(vec![0.0; 16_000])),
            sample_rate: 16_000,
        }
    }

    /// A device whose acquisition always fails, as when the microphone
    /// permission is denied.
    pub fn unavailable() -> Self {
        Self {
            available: false,
            ..Self::new()
        }
    }

    /// Replace the canned samples returned by `stop`.
    pub fn with_samples(self, samples: Vec<f32>) -> Self {
        *self.samples.lock().expect("samples mutex poisoned") = samples;
        self
    }
}

impl CaptureDevice for MockCaptureDevice {
    async fn start(&self) -> Result<(), ParleyError> {
        if !self.available {
            return Err(ParleyError::CaptureUnavailable(
                "audio input device could not be acquired".to_string(),
            ));
        }
        if self.active.swap(true, Ordering::SeqCst) {
            return Err(ParleyError::Audio(
                "capture is already active".to_string(),
            ));
        }
        tracing::debug!("Mock audio capture started");
        Ok(())
    }

    async fn stop(&self) -> Result<AudioClip, ParleyError> {
        if !self.active.swap(false, Ordering::SeqCst) {
            return Err(ParleyError::Audio("capture is not active".to_string()));
        }
        let samples = self.samples.lock().expect("samples mutex poisoned").clone();
        tracing::debug!(samples = samples.len(), "Mock audio capture stopped");
        Ok(AudioClip {
            samples,
            sample_rate: self.sample_rate,
        })
    }

    fn is_active(&self) -> bool {
        self.active.load(Ordering::SeqCst)
    }
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_clip_duration() {
        let clip = AudioClip {
            samples: vec![0.0; 32_000],
            sample_rate: 16_000,
        };
        assert!((clip.duration_secs() - 2.0).abs() < 0.01);
    }

    #[test]
    fn test_clip_duration_zero_rate() {
        let clip = AudioClip {
            samples: vec![0.0; 100],
            sample_rate: 0,
        };
        assert_eq!(clip.duration_secs(), 0.0);
    }

    #[tokio::test]
    async fn test_start_stop_cycle() {
        let device = MockCaptureDevice::new();
        assert!(!device.is_active());

        device.start().await.unwrap();
        assert!(device.is_active());

        let clip = device.stop().await.unwrap();
        assert!(!device.is_active());
        assert_eq!(clip.sample_rate, 16_000);
        assert_eq!(clip.samples.len(), 16_000);
    }

    #[tokio::test]
    async fn test_unavailable_device_fails_start() {
        let device = MockCaptureDevice::unavailable();
        let result = device.start().await;
        assert!(matches!(result, Err(ParleyError::CaptureUnavailable(_))));
        assert!(!device.is_active());
    }

    #[tokio::test]
    async fn test_double_start_rejected() {
        let device = MockCaptureDevice::new();
        device.start().await.unwrap();
        let result = device.start().await;
        assert!(matches!(result, Err(ParleyError::Audio(_))));
        // First capture still active.
        assert!(device.is_active());
    }

    #[tokio::test]
    async fn test_stop_without_start_rejected() {
        let device = MockCaptureDevice::new();
        let result = device.stop().await;
        assert!(matches!(result, Err(ParleyError::Audio(_))));
    }

    #[tokio::test]
    async fn test_with_samples_returns_canned_clip() {
        let device = MockCaptureDevice::new().with_samples(vec![0.25, -0.25, 0.5]);
        device.start().await.unwrap();
        let clip = device.stop().await.unwrap();
        assert_eq!(clip.samples, vec![0.25, -0.25, 0.5]);
    }

    #[tokio::test]
    async fn test_clone_shares_state() {
        let a = MockCaptureDevice::new();
        let b = a.clone();
        a.start().await.unwrap();
        assert!(b.is_active());
        b.stop().await.unwrap();
        assert!(!a.is_active());
    }
}

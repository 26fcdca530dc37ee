//! Parley voice crate - the voice-capture-to-transcript pipeline.
//!
//! Records audio through the capture device, persists the finished clip,
//! transcribes it, and feeds the transcript into the request orchestrator
//! over the same single-flight path as typed input.

pub mod error;
pub mod pipeline;
pub mod state;

pub use error::VoiceError;
pub use pipeline::{VoiceOutcome, VoicePipeline};
pub use state::{VoiceMachine, VoiceState};

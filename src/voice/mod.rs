//! Client-side voice processing
//!
//! Handles microphone capture, clip encoding, one-shot clip delivery,
//! and reply playback. The server side of the pipeline lives in
//! `crate::turn`.

mod bridge;
mod capture;
mod encoding;
mod playback;

pub use bridge::{DeliveryBridge, Settlement, SettlementGate, settlement};
pub use capture::{AudioCapture, RecordingSession, SessionState, CAPTURE_SAMPLE_RATE};
pub use encoding::{AudioClip, ClipFormat, negotiate_format, samples_to_wav};
pub use playback::AudioPlayback;

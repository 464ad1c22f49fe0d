//! The voice turn pipeline
//!
//! A turn is one full cycle of user input (spoken or typed) through
//! transcription, completion, and synthesis, producing one assistant
//! reply. The orchestrator chains the three capability backends with
//! per-stage fault isolation; the queue serializes turns arriving from
//! the streaming channel.

mod orchestrator;
mod queue;

use serde::Deserialize;

use crate::providers::{AudioFormat, TokenUsage};

pub use orchestrator::{MAX_SYNTHESIS_CHARS, TurnOrchestrator};
pub use queue::TurnQueue;

/// Input to a turn: a finished audio clip or a typed message
#[derive(Debug, Clone)]
pub enum TurnInput {
    /// Raw audio bytes plus their container/codec tag
    Audio { data: Vec<u8>, format: String },
    /// A plain transcript string
    Text(String),
}

/// Caller-supplied generation options, all defaulted when absent
#[derive(Debug, Clone, Default, Deserialize)]
pub struct TurnOptions {
    pub max_tokens: Option<u32>,
    pub temperature: Option<f32>,
    pub top_p: Option<f32>,
    pub voice: Option<String>,
    pub audio_format: Option<String>,
}

/// A unit of work submitted to the turn queue, immutable once enqueued
#[derive(Debug, Clone)]
pub struct TurnRequest {
    pub input: TurnInput,
    pub options: TurnOptions,
}

/// A completed turn's reply
#[derive(Debug, Clone)]
pub struct TurnReply {
    /// The transcript, present when the turn started from audio
    pub transcript: Option<String>,
    /// Assistant reply text
    pub message: String,
    /// Synthesized reply audio; absent when synthesis degraded
    pub audio: Option<Vec<u8>>,
    /// Format of `audio`
    pub audio_format: AudioFormat,
    /// Token accounting from the completion stage
    pub usage: TokenUsage,
    /// Why synthesis was skipped, when it was
    pub synthesis_error: Option<String>,
}

/// Terminal outcome of a turn that did not fail
#[derive(Debug, Clone)]
pub enum TurnOutcome {
    /// The clip contained no recognizable speech; history untouched
    NoSpeech,
    /// A full reply, possibly without audio
    Reply(TurnReply),
}

//! Murmur Gateway - voice assistant gateway
//!
//! This library provides the core functionality for the Murmur gateway:
//! - Native microphone capture with one-shot clip delivery
//! - The voice turn pipeline (transcribe, complete, synthesize)
//! - A serialized turn queue for streaming audio submissions
//! - A bounded, in-memory conversation history ledger
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────┐
//! │                     Client                           │
//! │   Capture  │  Delivery Bridge  │  Playback          │
//! └────────────────────┬────────────────────────────────┘
//!                      │ HTTP / WebSocket
//! ┌────────────────────▼────────────────────────────────┐
//! │                 Murmur Gateway                       │
//! │   Turn Queue  │  Orchestrator  │  History Ledger    │
//! └────────────────────┬────────────────────────────────┘
//!                      │
//! ┌────────────────────▼────────────────────────────────┐
//! │              Capability Backends                     │
//! │   STT (Whisper)  │  LLM  │  TTS                    │
//! └─────────────────────────────────────────────────────┘
//! ```

pub mod api;
pub mod client;
pub mod config;
pub mod context;
pub mod error;
pub mod history;
pub mod providers;
pub mod turn;
pub mod voice;

pub use config::Config;
pub use context::{ContextBuilder, ContextConfig, SYSTEM_PROMPT};
pub use error::{Error, Result};
pub use history::{HistoryEntry, HistoryLedger};
pub use providers::{
    AudioFormat, ChatCompletion, ChatMessage, Completion, CompletionOptions, Role, SpeechToText,
    TextToSpeech, TokenUsage, Voice,
};
pub use turn::{
    TurnInput, TurnOptions, TurnOrchestrator, TurnOutcome, TurnQueue, TurnReply, TurnRequest,
};
pub use voice::{AudioClip, ClipFormat, DeliveryBridge, Settlement, SettlementGate};

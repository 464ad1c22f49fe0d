//! Capability interfaces for the external services the pipeline consumes
//!
//! Speech-to-text, chat completion, and text-to-speech are swappable
//! backends reached through these traits; the orchestrator never sees a
//! concrete vendor. Backend errors carry the stage they belong to
//! (`Error::Transcription` / `Completion` / `Synthesis`) so failures stay
//! attributable upstream.

pub mod openai;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::Result;

pub use openai::OpenAiBackend;

/// Role of a chat message author
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    System,
    User,
    Assistant,
}

impl Role {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::System => "system",
            Self::User => "user",
            Self::Assistant => "assistant",
        }
    }
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A single message in a completion request
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: Role,
    pub content: String,
}

impl ChatMessage {
    #[must_use]
    pub fn new(role: Role, content: impl Into<String>) -> Self {
        Self {
            role,
            content: content.into(),
        }
    }
}

/// Generation options passed to the completion backend
#[derive(Debug, Clone)]
pub struct CompletionOptions {
    pub max_tokens: u32,
    pub temperature: f32,
    pub top_p: f32,
    pub frequency_penalty: f32,
}

impl Default for CompletionOptions {
    fn default() -> Self {
        Self {
            max_tokens: 1000,
            temperature: 0.7,
            top_p: 1.0,
            frequency_penalty: 0.0,
        }
    }
}

/// Token accounting reported by the completion backend
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct TokenUsage {
    #[serde(default)]
    pub prompt_tokens: u32,
    #[serde(default)]
    pub completion_tokens: u32,
    #[serde(default)]
    pub total_tokens: u32,
}

/// A completed reply plus its token accounting
#[derive(Debug, Clone)]
pub struct Completion {
    pub text: String,
    pub usage: TokenUsage,
}

/// Synthesis voices accepted by the pipeline
///
/// Unrecognized request values are silently replaced by the default
/// rather than failing the turn.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Voice {
    Alloy,
    Echo,
    Fable,
    Onyx,
    Nova,
    Shimmer,
}

impl Voice {
    /// All voices, in presentation order
    pub const ALL: [Self; 6] = [
        Self::Alloy,
        Self::Echo,
        Self::Fable,
        Self::Onyx,
        Self::Nova,
        Self::Shimmer,
    ];

    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Alloy => "alloy",
            Self::Echo => "echo",
            Self::Fable => "fable",
            Self::Onyx => "onyx",
            Self::Nova => "nova",
            Self::Shimmer => "shimmer",
        }
    }

    #[must_use]
    pub fn parse(s: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|v| v.as_str() == s)
    }

    /// Resolve a request value, substituting the default when absent or
    /// unrecognized
    #[must_use]
    pub fn from_request(value: Option<&str>, default: Self) -> Self {
        value.and_then(Self::parse).unwrap_or(default)
    }
}

impl std::fmt::Display for Voice {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Synthesis output formats accepted by the pipeline
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AudioFormat {
    Mp3,
    Opus,
    Aac,
    Flac,
}

impl AudioFormat {
    /// All formats, in presentation order
    pub const ALL: [Self; 4] = [Self::Mp3, Self::Opus, Self::Aac, Self::Flac];

    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Mp3 => "mp3",
            Self::Opus => "opus",
            Self::Aac => "aac",
            Self::Flac => "flac",
        }
    }

    #[must_use]
    pub const fn mime(self) -> &'static str {
        match self {
            Self::Mp3 => "audio/mpeg",
            Self::Opus => "audio/opus",
            Self::Aac => "audio/aac",
            Self::Flac => "audio/flac",
        }
    }

    #[must_use]
    pub fn parse(s: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|f| f.as_str() == s)
    }

    /// Resolve a request value, substituting the default when absent or
    /// unrecognized
    #[must_use]
    pub fn from_request(value: Option<&str>, default: Self) -> Self {
        value.and_then(Self::parse).unwrap_or(default)
    }
}

impl std::fmt::Display for AudioFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Input container/codec tags the transcription backend accepts
pub const SUPPORTED_INPUT_FORMATS: [&str; 8] =
    ["mp3", "mp4", "mpeg", "mpga", "m4a", "wav", "webm", "ogg"];

/// Transcribes a finished audio clip to text
#[async_trait]
pub trait SpeechToText: Send + Sync {
    /// Transcribe audio bytes tagged with a container/codec hint
    ///
    /// # Errors
    ///
    /// Returns `Error::Transcription` if the backend fails
    async fn transcribe(&self, audio: &[u8], format_hint: &str) -> Result<String>;
}

/// Produces an assistant reply for an ordered message sequence
#[async_trait]
pub trait ChatCompletion: Send + Sync {
    /// Complete the conversation with the given generation options
    ///
    /// # Errors
    ///
    /// Returns `Error::Completion` if the backend fails
    async fn complete(
        &self,
        messages: &[ChatMessage],
        options: &CompletionOptions,
    ) -> Result<Completion>;
}

/// Synthesizes speech from reply text
#[async_trait]
pub trait TextToSpeech: Send + Sync {
    /// Synthesize `text` with the given voice and output format
    ///
    /// Text longer than 4000 characters is a caller-side precondition
    /// violation and must be rejected before reaching this trait.
    ///
    /// # Errors
    ///
    /// Returns `Error::Synthesis` if the backend fails
    async fn synthesize(&self, text: &str, voice: Voice, format: AudioFormat) -> Result<Vec<u8>>;
}

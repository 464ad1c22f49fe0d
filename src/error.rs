//! Error types for the Murmur gateway

use thiserror::Error;

/// Result type alias for Murmur operations
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur in the Murmur gateway
#[derive(Debug, Error)]
pub enum Error {
    /// Configuration error
    #[error("configuration error: {0}")]
    Config(String),

    /// Capture device could not be acquired
    #[error("device unavailable: {0}")]
    DeviceUnavailable(String),

    /// The delivery bridge never received a finalized clip
    #[error("delivery timeout: no finalized clip within {0:?}")]
    DeliveryTimeout(std::time::Duration),

    /// Audio encode/decode/resample error
    #[error("audio error: {0}")]
    Audio(String),

    /// Speech-to-text backend failure
    #[error("transcription error: {0}")]
    Transcription(String),

    /// Chat completion backend failure
    #[error("completion error: {0}")]
    Completion(String),

    /// Text-to-speech backend failure (non-fatal within a turn)
    #[error("synthesis error: {0}")]
    Synthesis(String),

    /// Caller-side precondition violation (empty message, oversize text)
    #[error("invalid input: {0}")]
    InvalidInput(String),

    /// Gateway returned an error response to the native client
    #[error("gateway error: {0}")]
    Gateway(String),

    /// IO error
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// HTTP error
    #[error("http error: {0}")]
    Http(#[from] reqwest::Error),

    /// Serialization error
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// TOML parsing error
    #[error("toml error: {0}")]
    Toml(#[from] toml::de::Error),
}

impl Error {
    /// Pipeline stage this error is attributed to, if any.
    ///
    /// Used by the API layer to name the failing stage in structured
    /// error responses.
    #[must_use]
    pub const fn stage(&self) -> Option<&'static str> {
        match self {
            Self::Transcription(_) => Some("transcribe"),
            Self::Completion(_) => Some("complete"),
            Self::Synthesis(_) => Some("synthesize"),
            _ => None,
        }
    }
}

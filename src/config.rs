//! Configuration for the Murmur gateway
//!
//! Settings come from an optional TOML file
//! (`~/.config/murmur/config.toml`) overlaid by environment variables.
//! All file fields are optional — the file is a partial overlay on top of
//! defaults.

use std::path::PathBuf;

use serde::Deserialize;

use crate::{Error, Result};

/// Murmur gateway configuration
#[derive(Debug, Clone)]
pub struct Config {
    /// HTTP API server configuration
    pub server: ServerConfig,

    /// Chat completion configuration
    pub llm: LlmConfig,

    /// Voice pipeline configuration
    pub voice: VoiceConfig,

    /// Conversation history configuration
    pub history: HistoryConfig,

    /// API keys for external services
    pub api_keys: ApiKeys,
}

/// HTTP API server configuration
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Port to listen on
    pub port: u16,
}

/// Chat completion configuration
#[derive(Debug, Clone)]
pub struct LlmConfig {
    /// Model identifier (e.g. "gpt-4o-mini")
    pub model: String,

    /// Default max tokens per reply
    pub max_tokens: u32,

    /// Default sampling temperature
    pub temperature: f32,
}

/// Voice pipeline configuration
#[derive(Debug, Clone)]
pub struct VoiceConfig {
    /// STT model (e.g. "whisper-1")
    pub stt_model: String,

    /// TTS model (e.g. "tts-1")
    pub tts_model: String,

    /// Default TTS voice identifier
    pub tts_voice: String,

    /// Default TTS output format
    pub tts_format: String,

    /// Bounded wait for a finalized clip, in milliseconds
    pub delivery_timeout_ms: u64,
}

/// Conversation history configuration
#[derive(Debug, Clone)]
pub struct HistoryConfig {
    /// Maximum ledger length before oldest-first eviction
    pub max_entries: usize,

    /// Number of recent entries included in completion context
    pub context_window: usize,
}

/// API keys for external services
#[derive(Debug, Clone, Default)]
pub struct ApiKeys {
    /// `OpenAI` API key (Whisper, chat completions, TTS)
    pub openai: Option<String>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            server: ServerConfig { port: 3001 },
            llm: LlmConfig {
                model: "gpt-4o-mini".to_string(),
                max_tokens: 1000,
                temperature: 0.7,
            },
            voice: VoiceConfig {
                stt_model: "whisper-1".to_string(),
                tts_model: "tts-1".to_string(),
                tts_voice: "alloy".to_string(),
                tts_format: "mp3".to_string(),
                delivery_timeout_ms: 5000,
            },
            history: HistoryConfig {
                max_entries: 100,
                context_window: 10,
            },
            api_keys: ApiKeys::default(),
        }
    }
}

impl Config {
    /// Load configuration from the default file location and environment
    ///
    /// # Errors
    ///
    /// Returns error if the config file exists but cannot be parsed
    pub fn load() -> Result<Self> {
        let file = match Self::config_path() {
            Some(path) if path.exists() => {
                let content = std::fs::read_to_string(&path)?;
                let parsed: ConfigFile = toml::from_str(&content)?;
                tracing::debug!(path = %path.display(), "loaded config file");
                parsed
            }
            _ => ConfigFile::default(),
        };

        Ok(Self::from_file(file))
    }

    /// Default config file path (`~/.config/murmur/config.toml`)
    #[must_use]
    pub fn config_path() -> Option<PathBuf> {
        directories::ProjectDirs::from("dev", "murmur", "murmur")
            .map(|dirs| dirs.config_dir().join("config.toml"))
    }

    /// Merge a parsed config file with defaults and environment overrides
    fn from_file(file: ConfigFile) -> Self {
        let defaults = Self::default();

        let openai = std::env::var("OPENAI_API_KEY")
            .ok()
            .filter(|k| !k.is_empty())
            .or(file.api_keys.openai);

        let port = std::env::var("MURMUR_PORT")
            .ok()
            .and_then(|p| p.parse().ok())
            .or(file.server.port)
            .unwrap_or(defaults.server.port);

        Self {
            server: ServerConfig { port },
            llm: LlmConfig {
                model: file.llm.model.unwrap_or(defaults.llm.model),
                max_tokens: file.llm.max_tokens.unwrap_or(defaults.llm.max_tokens),
                temperature: file.llm.temperature.unwrap_or(defaults.llm.temperature),
            },
            voice: VoiceConfig {
                stt_model: file.voice.stt_model.unwrap_or(defaults.voice.stt_model),
                tts_model: file.voice.tts_model.unwrap_or(defaults.voice.tts_model),
                tts_voice: file.voice.tts_voice.unwrap_or(defaults.voice.tts_voice),
                tts_format: file.voice.tts_format.unwrap_or(defaults.voice.tts_format),
                delivery_timeout_ms: file
                    .voice
                    .delivery_timeout_ms
                    .unwrap_or(defaults.voice.delivery_timeout_ms),
            },
            history: HistoryConfig {
                max_entries: file
                    .history
                    .max_entries
                    .unwrap_or(defaults.history.max_entries),
                context_window: file
                    .history
                    .context_window
                    .unwrap_or(defaults.history.context_window),
            },
            api_keys: ApiKeys { openai },
        }
    }

    /// The `OpenAI` API key, required to run the gateway
    ///
    /// # Errors
    ///
    /// Returns error if no key is configured
    pub fn require_openai_key(&self) -> Result<&str> {
        self.api_keys
            .openai
            .as_deref()
            .ok_or_else(|| Error::Config("OPENAI_API_KEY not set".to_string()))
    }
}

/// Top-level TOML configuration file schema
#[derive(Debug, Default, Deserialize)]
struct ConfigFile {
    #[serde(default)]
    server: ServerFileConfig,

    #[serde(default)]
    llm: LlmFileConfig,

    #[serde(default)]
    voice: VoiceFileConfig,

    #[serde(default)]
    history: HistoryFileConfig,

    #[serde(default)]
    api_keys: ApiKeysFileConfig,
}

/// Server section of the config file
#[derive(Debug, Default, Deserialize)]
struct ServerFileConfig {
    port: Option<u16>,
}

/// LLM section of the config file
#[derive(Debug, Default, Deserialize)]
struct LlmFileConfig {
    model: Option<String>,
    max_tokens: Option<u32>,
    temperature: Option<f32>,
}

/// Voice section of the config file
#[derive(Debug, Default, Deserialize)]
struct VoiceFileConfig {
    stt_model: Option<String>,
    tts_model: Option<String>,
    tts_voice: Option<String>,
    tts_format: Option<String>,
    delivery_timeout_ms: Option<u64>,
}

/// History section of the config file
#[derive(Debug, Default, Deserialize)]
struct HistoryFileConfig {
    max_entries: Option<usize>,
    context_window: Option<usize>,
}

/// API keys section of the config file
#[derive(Debug, Default, Deserialize)]
struct ApiKeysFileConfig {
    openai: Option<String>,
}

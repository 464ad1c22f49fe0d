//! Three-stage turn orchestration: transcribe, complete, synthesize

use std::sync::Arc;

use crate::context::ContextBuilder;
use crate::history::HistoryLedger;
use crate::providers::{
    AudioFormat, ChatCompletion, ChatMessage, Completion, CompletionOptions, SpeechToText,
    TextToSpeech, Voice,
};
use crate::{Error, Result};

use super::{TurnInput, TurnOptions, TurnOutcome, TurnReply};

/// Synthesis inputs above this are rejected before any network call
pub const MAX_SYNTHESIS_CHARS: usize = 4000;

/// Runs the transcribe → complete → synthesize pipeline for one turn
///
/// Stateless and reentrant apart from the shared history ledger, whose
/// pair-append is atomic. Concurrent `run_turn` calls are safe; full
/// serialization, where wanted, is the turn queue's job.
pub struct TurnOrchestrator {
    stt: Arc<dyn SpeechToText>,
    llm: Arc<dyn ChatCompletion>,
    tts: Arc<dyn TextToSpeech>,
    ledger: Arc<HistoryLedger>,
    context: ContextBuilder,
    default_options: CompletionOptions,
    default_voice: Voice,
    default_format: AudioFormat,
}

impl TurnOrchestrator {
    pub fn new(
        stt: Arc<dyn SpeechToText>,
        llm: Arc<dyn ChatCompletion>,
        tts: Arc<dyn TextToSpeech>,
        ledger: Arc<HistoryLedger>,
        context: ContextBuilder,
    ) -> Self {
        Self {
            stt,
            llm,
            tts,
            ledger,
            context,
            default_options: CompletionOptions::default(),
            default_voice: Voice::Alloy,
            default_format: AudioFormat::Mp3,
        }
    }

    /// Override the default generation options
    #[must_use]
    pub fn with_defaults(
        mut self,
        options: CompletionOptions,
        voice: Voice,
        format: AudioFormat,
    ) -> Self {
        self.default_options = options;
        self.default_voice = voice;
        self.default_format = format;
        self
    }

    /// The shared history ledger
    #[must_use]
    pub fn ledger(&self) -> &Arc<HistoryLedger> {
        &self.ledger
    }

    /// Run one full turn
    ///
    /// Stage faults stay isolated: a transcription failure never reaches
    /// completion, a completion failure leaves the ledger untouched, and
    /// a synthesis failure downgrades the reply to text-only instead of
    /// failing the turn.
    ///
    /// # Errors
    ///
    /// Returns `InvalidInput` for an empty text message, `Transcription`
    /// or `Completion` for stage failures.
    pub async fn run_turn(&self, input: TurnInput, options: &TurnOptions) -> Result<TurnOutcome> {
        let (text, transcript) = match input {
            TurnInput::Audio { data, format } => {
                if data.is_empty() {
                    tracing::debug!("empty clip, skipping pipeline");
                    return Ok(TurnOutcome::NoSpeech);
                }
                let text = self.stt.transcribe(&data, &format).await?;
                if text.trim().is_empty() {
                    tracing::info!("no speech detected in clip");
                    return Ok(TurnOutcome::NoSpeech);
                }
                let transcript = text.trim().to_string();
                (transcript.clone(), Some(transcript))
            }
            TurnInput::Text(message) => {
                if message.trim().is_empty() {
                    return Err(Error::InvalidInput("message must not be empty".to_string()));
                }
                (message, None)
            }
        };

        let completion = self.complete_and_record(&text, &[], options).await?;

        let voice = Voice::from_request(options.voice.as_deref(), self.default_voice);
        let format = AudioFormat::from_request(options.audio_format.as_deref(), self.default_format);

        let (audio, synthesis_error) = match self.synthesize(&completion.text, voice, format).await
        {
            Ok(bytes) => (Some(bytes), None),
            Err(e) => {
                tracing::warn!(error = %e, "synthesis failed, returning text-only reply");
                (None, Some(e.to_string()))
            }
        };

        Ok(TurnOutcome::Reply(TurnReply {
            transcript,
            message: completion.text,
            audio,
            audio_format: format,
            usage: completion.usage,
            synthesis_error,
        }))
    }

    /// Run the completion stage and record the turn
    ///
    /// The user/assistant pair is appended only after the backend
    /// succeeds, atomically, so a failed completion leaves no partial
    /// pair behind.
    ///
    /// # Errors
    ///
    /// Returns `Error::Completion` if the backend fails
    pub async fn complete_and_record(
        &self,
        user_text: &str,
        extra_context: &[ChatMessage],
        options: &TurnOptions,
    ) -> Result<Completion> {
        let messages = self.context.build(&self.ledger, extra_context, user_text);

        let completion_options = CompletionOptions {
            max_tokens: options.max_tokens.unwrap_or(self.default_options.max_tokens),
            temperature: options
                .temperature
                .unwrap_or(self.default_options.temperature),
            top_p: options.top_p.unwrap_or(self.default_options.top_p),
            frequency_penalty: self.default_options.frequency_penalty,
        };

        let completion = self.llm.complete(&messages, &completion_options).await?;

        self.ledger.append_pair(user_text, &completion.text);

        Ok(completion)
    }

    /// Run the synthesis stage with its input guards
    ///
    /// # Errors
    ///
    /// Returns `InvalidInput` for empty or oversize text before any
    /// network call, `Error::Synthesis` if the backend fails
    pub async fn synthesize(
        &self,
        text: &str,
        voice: Voice,
        format: AudioFormat,
    ) -> Result<Vec<u8>> {
        if text.is_empty() {
            return Err(Error::InvalidInput(
                "synthesis text must not be empty".to_string(),
            ));
        }
        let chars = text.chars().count();
        if chars > MAX_SYNTHESIS_CHARS {
            return Err(Error::InvalidInput(format!(
                "synthesis text too long ({chars} chars, max {MAX_SYNTHESIS_CHARS})"
            )));
        }

        self.tts.synthesize(text, voice, format).await
    }

    /// Run the transcription stage alone
    ///
    /// # Errors
    ///
    /// Returns `InvalidInput` for empty audio, `Error::Transcription` if
    /// the backend fails
    pub async fn transcribe(&self, audio: &[u8], format_hint: &str) -> Result<String> {
        if audio.is_empty() {
            return Err(Error::InvalidInput("audio data must not be empty".to_string()));
        }
        self.stt.transcribe(audio, format_hint).await
    }

    /// Default voice used when a request names none
    #[must_use]
    pub const fn default_voice(&self) -> Voice {
        self.default_voice
    }

    /// Default output format used when a request names none
    #[must_use]
    pub const fn default_format(&self) -> AudioFormat {
        self.default_format
    }
}

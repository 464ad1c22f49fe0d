//! `OpenAI` backend for transcription, completion, and synthesis

use async_trait::async_trait;
use serde::Deserialize;

use crate::{Error, Result};

use super::{
    AudioFormat, ChatCompletion, ChatMessage, Completion, CompletionOptions, SpeechToText,
    TextToSpeech, TokenUsage, Voice,
};

const API_BASE: &str = "https://api.openai.com/v1";

/// Response from the Whisper transcription API
#[derive(Deserialize)]
struct WhisperResponse {
    text: String,
}

/// Response from the chat completions API
#[derive(Deserialize)]
struct ChatResponse {
    choices: Vec<ChatChoice>,
    #[serde(default)]
    usage: Option<TokenUsage>,
}

#[derive(Deserialize)]
struct ChatChoice {
    message: ChatChoiceMessage,
}

#[derive(Deserialize)]
struct ChatChoiceMessage {
    content: Option<String>,
}

/// All three pipeline capabilities backed by the `OpenAI` API
pub struct OpenAiBackend {
    client: reqwest::Client,
    api_key: String,
    chat_model: String,
    stt_model: String,
    tts_model: String,
}

impl OpenAiBackend {
    /// Create a new backend
    ///
    /// # Errors
    ///
    /// Returns error if the API key is empty
    pub fn new(
        api_key: String,
        chat_model: String,
        stt_model: String,
        tts_model: String,
    ) -> Result<Self> {
        if api_key.is_empty() {
            return Err(Error::Config("OpenAI API key required".to_string()));
        }

        Ok(Self {
            client: reqwest::Client::new(),
            api_key,
            chat_model,
            stt_model,
            tts_model,
        })
    }

    /// The configured chat model identifier
    #[must_use]
    pub fn chat_model(&self) -> &str {
        &self.chat_model
    }

    fn bearer(&self) -> String {
        format!("Bearer {}", self.api_key)
    }
}

/// Map a container/codec tag to the MIME type the upload carries
fn mime_for_hint(format_hint: &str) -> &'static str {
    match format_hint {
        "wav" => "audio/wav",
        "mp3" | "mpeg" | "mpga" => "audio/mpeg",
        "mp4" | "m4a" => "audio/mp4",
        "ogg" => "audio/ogg",
        _ => "audio/webm",
    }
}

#[async_trait]
impl SpeechToText for OpenAiBackend {
    async fn transcribe(&self, audio: &[u8], format_hint: &str) -> Result<String> {
        tracing::debug!(
            audio_bytes = audio.len(),
            format = format_hint,
            "starting Whisper transcription"
        );

        let form = reqwest::multipart::Form::new()
            .part(
                "file",
                reqwest::multipart::Part::bytes(audio.to_vec())
                    .file_name(format!("audio.{format_hint}"))
                    .mime_str(mime_for_hint(format_hint))
                    .map_err(|e| Error::Transcription(e.to_string()))?,
            )
            .text("model", self.stt_model.clone());

        let response = self
            .client
            .post(format!("{API_BASE}/audio/transcriptions"))
            .header("Authorization", self.bearer())
            .multipart(form)
            .send()
            .await
            .map_err(|e| Error::Transcription(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            tracing::error!(status = %status, body = %body, "Whisper API error");
            return Err(Error::Transcription(format!(
                "Whisper API error {status}: {body}"
            )));
        }

        let result: WhisperResponse = response
            .json()
            .await
            .map_err(|e| Error::Transcription(e.to_string()))?;

        tracing::info!(transcript = %result.text, "transcription complete");
        Ok(result.text)
    }
}

#[async_trait]
impl ChatCompletion for OpenAiBackend {
    async fn complete(
        &self,
        messages: &[ChatMessage],
        options: &CompletionOptions,
    ) -> Result<Completion> {
        #[derive(serde::Serialize)]
        struct ChatRequest<'a> {
            model: &'a str,
            messages: &'a [ChatMessage],
            max_tokens: u32,
            temperature: f32,
            top_p: f32,
            frequency_penalty: f32,
            stream: bool,
        }

        let request = ChatRequest {
            model: &self.chat_model,
            messages,
            max_tokens: options.max_tokens,
            temperature: options.temperature,
            top_p: options.top_p,
            frequency_penalty: options.frequency_penalty,
            stream: false,
        };

        tracing::debug!(
            model = %self.chat_model,
            messages = messages.len(),
            "starting chat completion"
        );

        let response = self
            .client
            .post(format!("{API_BASE}/chat/completions"))
            .header("Authorization", self.bearer())
            .json(&request)
            .send()
            .await
            .map_err(|e| Error::Completion(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            tracing::error!(status = %status, body = %body, "chat API error");
            return Err(Error::Completion(format!(
                "chat API error {status}: {body}"
            )));
        }

        let result: ChatResponse = response
            .json()
            .await
            .map_err(|e| Error::Completion(e.to_string()))?;

        let text = result
            .choices
            .into_iter()
            .next()
            .and_then(|c| c.message.content)
            .ok_or_else(|| Error::Completion("empty completion response".to_string()))?;

        let usage = result.usage.unwrap_or_default();
        tracing::debug!(
            completion_tokens = usage.completion_tokens,
            total_tokens = usage.total_tokens,
            "completion finished"
        );

        Ok(Completion { text, usage })
    }
}

#[async_trait]
impl TextToSpeech for OpenAiBackend {
    async fn synthesize(&self, text: &str, voice: Voice, format: AudioFormat) -> Result<Vec<u8>> {
        #[derive(serde::Serialize)]
        struct SpeechRequest<'a> {
            model: &'a str,
            input: &'a str,
            voice: &'a str,
            response_format: &'a str,
        }

        let request = SpeechRequest {
            model: &self.tts_model,
            input: text,
            voice: voice.as_str(),
            response_format: format.as_str(),
        };

        tracing::debug!(chars = text.chars().count(), voice = %voice, format = %format, "starting synthesis");

        let response = self
            .client
            .post(format!("{API_BASE}/audio/speech"))
            .header("Authorization", self.bearer())
            .json(&request)
            .send()
            .await
            .map_err(|e| Error::Synthesis(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            tracing::error!(status = %status, body = %body, "TTS API error");
            return Err(Error::Synthesis(format!("TTS API error {status}: {body}")));
        }

        let audio = response
            .bytes()
            .await
            .map_err(|e| Error::Synthesis(e.to_string()))?;

        Ok(audio.to_vec())
    }
}

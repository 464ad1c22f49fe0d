//! Shared test utilities: mock capability backends and pipeline wiring

use std::sync::Arc;
use std::sync::Mutex;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;

use murmur_gateway::providers::{
    AudioFormat, ChatCompletion, ChatMessage, Completion, CompletionOptions, SpeechToText,
    TextToSpeech, TokenUsage, Voice,
};
use murmur_gateway::{
    ContextBuilder, ContextConfig, Error, HistoryLedger, Result, TurnOrchestrator,
};

/// Mock speech-to-text backend
pub struct MockStt {
    pub transcript: String,
    pub fail: bool,
    pub calls: AtomicUsize,
}

impl MockStt {
    pub fn returning(transcript: &str) -> Arc<Self> {
        Arc::new(Self {
            transcript: transcript.to_string(),
            fail: false,
            calls: AtomicUsize::new(0),
        })
    }

    pub fn failing() -> Arc<Self> {
        Arc::new(Self {
            transcript: String::new(),
            fail: true,
            calls: AtomicUsize::new(0),
        })
    }

    pub fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl SpeechToText for MockStt {
    async fn transcribe(&self, _audio: &[u8], _format_hint: &str) -> Result<String> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if self.fail {
            return Err(Error::Transcription("mock transcription failure".to_string()));
        }
        Ok(self.transcript.clone())
    }
}

/// Mock chat completion backend
///
/// Tracks reentrancy: `reentered` flips if two `complete` calls ever
/// overlap, which the queue tests assert never happens.
pub struct MockLlm {
    pub reply: String,
    pub fail: bool,
    pub delay: Duration,
    pub calls: AtomicUsize,
    active: AtomicUsize,
    reentered: AtomicBool,
}

impl MockLlm {
    pub fn returning(reply: &str) -> Arc<Self> {
        Arc::new(Self {
            reply: reply.to_string(),
            fail: false,
            delay: Duration::ZERO,
            calls: AtomicUsize::new(0),
            active: AtomicUsize::new(0),
            reentered: AtomicBool::new(false),
        })
    }

    pub fn returning_slow(reply: &str, delay: Duration) -> Arc<Self> {
        Arc::new(Self {
            reply: reply.to_string(),
            fail: false,
            delay,
            calls: AtomicUsize::new(0),
            active: AtomicUsize::new(0),
            reentered: AtomicBool::new(false),
        })
    }

    pub fn failing() -> Arc<Self> {
        Arc::new(Self {
            reply: String::new(),
            fail: true,
            delay: Duration::ZERO,
            calls: AtomicUsize::new(0),
            active: AtomicUsize::new(0),
            reentered: AtomicBool::new(false),
        })
    }

    pub fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn was_reentered(&self) -> bool {
        self.reentered.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl ChatCompletion for MockLlm {
    async fn complete(
        &self,
        _messages: &[ChatMessage],
        _options: &CompletionOptions,
    ) -> Result<Completion> {
        if self.active.fetch_add(1, Ordering::SeqCst) > 0 {
            self.reentered.store(true, Ordering::SeqCst);
        }
        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.active.fetch_sub(1, Ordering::SeqCst);

        if self.fail {
            return Err(Error::Completion("mock completion failure".to_string()));
        }
        Ok(Completion {
            text: self.reply.clone(),
            usage: TokenUsage {
                prompt_tokens: 10,
                completion_tokens: 5,
                total_tokens: 15,
            },
        })
    }
}

/// Mock text-to-speech backend
pub struct MockTts {
    pub audio: Vec<u8>,
    pub fail: bool,
    pub calls: AtomicUsize,
    pub seen: Mutex<Vec<(Voice, AudioFormat)>>,
}

impl MockTts {
    pub fn returning(audio: &[u8]) -> Arc<Self> {
        Arc::new(Self {
            audio: audio.to_vec(),
            fail: false,
            calls: AtomicUsize::new(0),
            seen: Mutex::new(Vec::new()),
        })
    }

    pub fn failing() -> Arc<Self> {
        Arc::new(Self {
            audio: Vec::new(),
            fail: true,
            calls: AtomicUsize::new(0),
            seen: Mutex::new(Vec::new()),
        })
    }

    pub fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn last_seen(&self) -> Option<(Voice, AudioFormat)> {
        self.seen.lock().unwrap().last().copied()
    }
}

#[async_trait]
impl TextToSpeech for MockTts {
    async fn synthesize(&self, _text: &str, voice: Voice, format: AudioFormat) -> Result<Vec<u8>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.seen.lock().unwrap().push((voice, format));
        if self.fail {
            return Err(Error::Synthesis("mock synthesis failure".to_string()));
        }
        Ok(self.audio.clone())
    }
}

/// Wire an orchestrator over mock backends with a fresh ledger
pub fn build_orchestrator(
    stt: Arc<MockStt>,
    llm: Arc<MockLlm>,
    tts: Arc<MockTts>,
) -> (Arc<TurnOrchestrator>, Arc<HistoryLedger>) {
    let ledger = Arc::new(HistoryLedger::new(100));
    let orchestrator = Arc::new(TurnOrchestrator::new(
        stt,
        llm,
        tts,
        ledger.clone(),
        ContextBuilder::new(ContextConfig::default()),
    ));
    (orchestrator, ledger)
}

//! Microphone capture and the recording session state machine

use std::sync::{Arc, Mutex};

use chrono::{DateTime, Utc};
use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use cpal::{SampleRate, Stream, StreamConfig};
use uuid::Uuid;

use crate::{Error, Result};

use super::bridge::{Settlement, SettlementGate, settlement};
use super::encoding::{AudioClip, ClipFormat, negotiate_format, resample, samples_to_wav};

/// Sample rate clips are normalized to before encoding (16kHz for speech)
pub const CAPTURE_SAMPLE_RATE: u32 = 16000;

/// Lifecycle of one microphone capture attempt
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Idle,
    Capturing,
    Stopping,
    Delivered,
    Failed,
}

/// One microphone capture attempt: ordered raw chunks plus the
/// negotiated encoding
///
/// Pure accumulation and assembly; device wiring lives in
/// [`AudioCapture`] so the session is testable without hardware.
pub struct RecordingSession {
    id: Uuid,
    state: SessionState,
    chunks: Vec<Vec<f32>>,
    format: ClipFormat,
    sample_rate: u32,
    started_at: DateTime<Utc>,
}

impl RecordingSession {
    #[must_use]
    pub fn new(format: ClipFormat, sample_rate: u32) -> Self {
        Self {
            id: Uuid::new_v4(),
            state: SessionState::Capturing,
            chunks: Vec::new(),
            format,
            sample_rate,
            started_at: Utc::now(),
        }
    }

    #[must_use]
    pub const fn id(&self) -> Uuid {
        self.id
    }

    #[must_use]
    pub const fn state(&self) -> SessionState {
        self.state
    }

    #[must_use]
    pub const fn format(&self) -> ClipFormat {
        self.format
    }

    #[must_use]
    pub const fn started_at(&self) -> DateTime<Utc> {
        self.started_at
    }

    #[must_use]
    pub fn chunk_count(&self) -> usize {
        self.chunks.len()
    }

    /// Total samples collected so far
    #[must_use]
    pub fn sample_count(&self) -> usize {
        self.chunks.iter().map(Vec::len).sum()
    }

    /// Append one device-callback chunk; empty chunks are dropped
    pub fn push_chunk(&mut self, chunk: &[f32]) {
        if chunk.is_empty() || self.state != SessionState::Capturing {
            return;
        }
        self.chunks.push(chunk.to_vec());
    }

    /// Mark that no further chunks will be accepted
    pub fn begin_stop(&mut self) {
        if self.state == SessionState::Capturing {
            self.state = SessionState::Stopping;
        }
    }

    /// Assemble the finished clip, consuming the session and its chunks
    ///
    /// Zero collected chunks yield the distinguished empty clip, not an
    /// error: downstream stages read it as "no speech".
    ///
    /// # Errors
    ///
    /// Returns error if resampling or encoding fails
    pub fn finalize(self) -> Result<AudioClip> {
        if self.chunks.is_empty() {
            return Ok(AudioClip::empty(self.format));
        }

        let samples: Vec<f32> = self.chunks.into_iter().flatten().collect();
        let normalized = resample(&samples, self.sample_rate, CAPTURE_SAMPLE_RATE)?;

        let bytes = match self.format {
            // Opus formats have no in-tree encoder; negotiation never
            // selects them (see encoding::negotiate_format).
            ClipFormat::Wav | ClipFormat::OpusWebm | ClipFormat::OpusOgg => {
                samples_to_wav(&normalized, CAPTURE_SAMPLE_RATE)?
            }
        };

        Ok(AudioClip::new(bytes, ClipFormat::Wav))
    }
}

struct ActiveCapture {
    stream: Stream,
    session: Arc<Mutex<Option<RecordingSession>>>,
    gate: SettlementGate<AudioClip>,
}

/// Captures audio from the default input device
///
/// Owns the microphone handle exclusively: at most one session is in
/// `Capturing`/`Stopping` at a time, and the device is released before a
/// new session may start.
pub struct AudioCapture {
    config: StreamConfig,
    device_rate: u32,
    active: Option<ActiveCapture>,
    last_state: SessionState,
}

impl AudioCapture {
    /// Create a new audio capture instance
    ///
    /// # Errors
    ///
    /// Returns `DeviceUnavailable` if no input device can be acquired
    pub fn new() -> Result<Self> {
        let host = cpal::default_host();

        let device = host
            .default_input_device()
            .ok_or_else(|| Error::DeviceUnavailable("no input device available".to_string()))?;

        let supported_config = device
            .supported_input_configs()
            .map_err(|e| Error::DeviceUnavailable(e.to_string()))?
            .find(|c| {
                c.channels() == 1
                    && c.min_sample_rate() <= SampleRate(CAPTURE_SAMPLE_RATE)
                    && c.max_sample_rate() >= SampleRate(CAPTURE_SAMPLE_RATE)
            })
            .ok_or_else(|| {
                Error::DeviceUnavailable("no suitable input config found".to_string())
            })?;

        let config = supported_config
            .with_sample_rate(SampleRate(CAPTURE_SAMPLE_RATE))
            .config();

        tracing::debug!(
            device = device.name().unwrap_or_default(),
            sample_rate = config.sample_rate.0,
            channels = config.channels,
            "audio capture initialized"
        );

        Ok(Self {
            device_rate: config.sample_rate.0,
            config,
            active: None,
            last_state: SessionState::Idle,
        })
    }

    /// Start a recording session
    ///
    /// Returns the settlement the delivery bridge awaits; the finished
    /// clip is settled into it on [`stop`](Self::stop).
    ///
    /// # Errors
    ///
    /// Returns `InvalidInput` if a session is already active,
    /// `DeviceUnavailable` if the device cannot be opened
    pub fn start(&mut self) -> Result<Settlement<AudioClip>> {
        if self.active.is_some() {
            return Err(Error::InvalidInput(
                "a recording session is already active".to_string(),
            ));
        }

        let format = negotiate_format();
        let session = Arc::new(Mutex::new(Some(RecordingSession::new(
            format,
            self.device_rate,
        ))));

        let host = cpal::default_host();
        let device = host
            .default_input_device()
            .ok_or_else(|| Error::DeviceUnavailable("no input device".to_string()))?;

        let callback_session = Arc::clone(&session);
        let stream = device
            .build_input_stream(
                &self.config,
                move |data: &[f32], _: &cpal::InputCallbackInfo| {
                    if let Ok(mut guard) = callback_session.lock() {
                        if let Some(session) = guard.as_mut() {
                            session.push_chunk(data);
                        }
                    }
                },
                |err| {
                    tracing::error!(error = %err, "audio capture error");
                },
                None,
            )
            .map_err(|e| Error::DeviceUnavailable(e.to_string()))?;

        stream
            .play()
            .map_err(|e| Error::DeviceUnavailable(e.to_string()))?;

        let (gate, settlement) = settlement();
        self.active = Some(ActiveCapture {
            stream,
            session,
            gate,
        });
        self.last_state = SessionState::Capturing;

        tracing::debug!(format = format.tag(), "recording started");
        Ok(settlement)
    }

    /// Stop the active session
    ///
    /// Releases the device immediately, then assembles the clip and
    /// settles it into the session's gate exactly once. If assembly
    /// fails the gate is dropped unsettled and the bridge reports the
    /// failure.
    ///
    /// # Errors
    ///
    /// Returns `InvalidInput` if no session is active
    pub fn stop(&mut self) -> Result<()> {
        let Some(active) = self.active.take() else {
            return Err(Error::InvalidInput("no active recording session".to_string()));
        };

        let session = active.session.lock().ok().and_then(|mut guard| guard.take());

        // Release the device before assembly so the microphone indicator
        // turns off even if encoding fails.
        drop(active.stream);
        tracing::debug!("recording stopped, device released");

        let Some(mut session) = session else {
            self.last_state = SessionState::Failed;
            return Ok(());
        };

        session.begin_stop();
        match session.finalize() {
            Ok(clip) => {
                self.last_state = SessionState::Delivered;
                active.gate.settle(clip);
            }
            Err(e) => {
                self.last_state = SessionState::Failed;
                tracing::error!(error = %e, "clip assembly failed");
            }
        }

        Ok(())
    }

    /// Whether a session is currently active
    #[must_use]
    pub const fn is_capturing(&self) -> bool {
        self.active.is_some()
    }

    /// State of the active or most recent session
    #[must_use]
    pub const fn session_state(&self) -> SessionState {
        self.last_state
    }
}

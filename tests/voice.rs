//! Voice capture and delivery tests, no audio hardware required

use std::io::Cursor;
use std::time::Duration;

use murmur_gateway::voice::{
    CAPTURE_SAMPLE_RATE, ClipFormat, DeliveryBridge, RecordingSession, SessionState,
    negotiate_format, samples_to_wav, settlement,
};
use murmur_gateway::Error;

/// Generate sine wave audio samples
fn sine_samples(frequency: f32, count: usize, amplitude: f32) -> Vec<f32> {
    (0..count)
        .map(|i| {
            let t = i as f32 / CAPTURE_SAMPLE_RATE as f32;
            amplitude * (2.0 * std::f32::consts::PI * frequency * t).sin()
        })
        .collect()
}

fn wav_sample_count(bytes: &[u8]) -> usize {
    let reader = hound::WavReader::new(Cursor::new(bytes)).unwrap();
    reader.len() as usize
}

#[test]
fn clip_samples_equal_sum_of_chunk_lengths() {
    let mut session = RecordingSession::new(ClipFormat::Wav, CAPTURE_SAMPLE_RATE);

    let chunks = [
        sine_samples(440.0, 100, 0.3),
        sine_samples(440.0, 256, 0.3),
        sine_samples(440.0, 57, 0.3),
    ];
    for chunk in &chunks {
        session.push_chunk(chunk);
    }

    assert_eq!(session.chunk_count(), 3);
    assert_eq!(session.sample_count(), 413);

    let clip = session.finalize().unwrap();
    assert!(!clip.is_empty());
    // Source rate matches the target rate, so no resampling happens and
    // the encoded clip carries exactly the collected samples.
    assert_eq!(wav_sample_count(clip.bytes()), 413);
}

#[test]
fn empty_chunks_are_dropped() {
    let mut session = RecordingSession::new(ClipFormat::Wav, CAPTURE_SAMPLE_RATE);
    session.push_chunk(&[]);
    session.push_chunk(&sine_samples(440.0, 10, 0.3));
    session.push_chunk(&[]);

    assert_eq!(session.chunk_count(), 1);
    assert_eq!(session.sample_count(), 10);
}

#[test]
fn zero_chunk_session_yields_empty_clip_marker() {
    let session = RecordingSession::new(ClipFormat::Wav, CAPTURE_SAMPLE_RATE);
    let clip = session.finalize().unwrap();

    assert!(clip.is_empty());
    assert_eq!(clip.bytes().len(), 0);
}

#[test]
fn chunks_after_stop_are_ignored() {
    let mut session = RecordingSession::new(ClipFormat::Wav, CAPTURE_SAMPLE_RATE);
    session.push_chunk(&sine_samples(440.0, 50, 0.3));

    session.begin_stop();
    assert_eq!(session.state(), SessionState::Stopping);

    session.push_chunk(&sine_samples(440.0, 50, 0.3));
    assert_eq!(session.sample_count(), 50);
}

#[test]
fn negotiation_prefers_opus_but_commits_to_wav() {
    // Opus encoders are not in-tree, so the guaranteed fallback wins
    assert_eq!(negotiate_format(), ClipFormat::Wav);
}

#[test]
fn wav_round_trip_preserves_sample_count() {
    let samples = sine_samples(440.0, 1600, 0.5);
    let wav = samples_to_wav(&samples, CAPTURE_SAMPLE_RATE).unwrap();

    assert_eq!(&wav[0..4], b"RIFF");
    assert_eq!(wav_sample_count(&wav), 1600);
}

#[tokio::test]
async fn settlement_fires_at_most_once() {
    let (gate, s) = settlement::<u32>();

    assert!(!gate.is_settled());
    assert!(gate.settle(1));
    assert!(gate.is_settled());

    // Second finalize signal for the same session must not resolve again
    assert!(!gate.settle(2));

    let bridge = DeliveryBridge::new(Duration::from_millis(100));
    assert_eq!(bridge.deliver(s).await.unwrap(), 1);
}

#[tokio::test]
async fn cloned_gates_share_one_resolution() {
    let (gate, s) = settlement::<u32>();
    let clone = gate.clone();

    assert!(clone.settle(7));
    assert!(!gate.settle(8));

    let bridge = DeliveryBridge::default();
    assert_eq!(bridge.deliver(s).await.unwrap(), 7);
}

#[tokio::test]
async fn unsettled_gate_times_out_with_typed_failure() {
    let (gate, s) = settlement::<u32>();

    let bridge = DeliveryBridge::new(Duration::from_millis(20));
    let err = bridge.deliver(s).await.unwrap_err();

    assert!(matches!(err, Error::DeliveryTimeout(_)));
    // Settling after the timeout resolves nothing
    assert!(!gate.settle(1));
}

#[tokio::test]
async fn dropped_gate_is_a_capture_failure_not_a_timeout() {
    let (gate, s) = settlement::<u32>();
    drop(gate);

    let bridge = DeliveryBridge::new(Duration::from_secs(5));
    let err = bridge.deliver(s).await.unwrap_err();

    assert!(matches!(err, Error::Audio(_)));
}

#[tokio::test]
async fn settlement_resolves_on_first_of_signal_or_timeout() {
    let (gate, s) = settlement::<&'static str>();

    // Finalize arrives well before the bound
    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(5)).await;
        gate.settle("clip");
    });

    let bridge = DeliveryBridge::new(Duration::from_secs(5));
    assert_eq!(bridge.deliver(s).await.unwrap(), "clip");
}

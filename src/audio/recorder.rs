use std::io::Cursor;

use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tracing::info;

use super::backend::{
    AudioFrame, CaptureBackend, CaptureBackendFactory, CaptureConfig, CaptureSource,
};
use crate::error::CaptureError;

/// One finished answer, encoded as an in-memory WAV file ready for upload
#[derive(Debug, Clone)]
pub struct AnswerRecording {
    /// Complete WAV file bytes (16-bit PCM)
    pub wav: Vec<u8>,
    /// Total duration in seconds
    pub duration_secs: f64,
    /// Sample rate in Hz
    pub sample_rate: u32,
    /// Number of channels
    pub channels: u16,
}

struct ActiveCapture {
    backend: Box<dyn CaptureBackend>,
    collector: JoinHandle<Vec<AudioFrame>>,
}

/// Assembles captured audio frames into a single submittable unit
///
/// One capture at a time: `start` acquires the microphone and begins
/// collecting frames, `stop` releases the device and finalizes the
/// accumulated audio into an [`AnswerRecording`] exactly once. Stopping
/// when no capture is active is a no-op that yields `None`.
pub struct AnswerRecorder {
    config: CaptureConfig,
    active: Mutex<Option<ActiveCapture>>,
}

impl AnswerRecorder {
    pub fn new(config: CaptureConfig) -> Self {
        Self {
            config,
            active: Mutex::new(None),
        }
    }

    /// Start capturing from the default microphone
    pub async fn start(&self) -> Result<(), CaptureError> {
        let backend =
            CaptureBackendFactory::create(CaptureSource::Microphone, self.config.clone())?;
        self.start_with(backend).await
    }

    /// Start capturing from the given backend (injection point for tests)
    pub async fn start_with(
        &self,
        mut backend: Box<dyn CaptureBackend>,
    ) -> Result<(), CaptureError> {
        let mut active = self.active.lock().await;
        if active.is_some() {
            return Err(CaptureError::Stream(
                "recording already in progress".to_string(),
            ));
        }

        let mut frame_rx = backend.start().await?;

        let collector = tokio::spawn(async move {
            let mut frames = Vec::new();
            while let Some(frame) = frame_rx.recv().await {
                frames.push(frame);
            }
            frames
        });

        info!("Recording started ({})", backend.name());
        *active = Some(ActiveCapture { backend, collector });

        Ok(())
    }

    /// Whether a capture is currently running
    pub async fn is_recording(&self) -> bool {
        self.active.lock().await.is_some()
    }

    /// Stop the capture and finalize the accumulated audio
    ///
    /// The device is released on every path before frames are encoded.
    pub async fn stop(&self) -> Result<Option<AnswerRecording>, CaptureError> {
        let taken = self.active.lock().await.take();
        let Some(mut capture) = taken else {
            return Ok(None);
        };

        // Release the device first; drain whatever arrived either way
        let stop_result = capture.backend.stop().await;
        let frames = capture
            .collector
            .await
            .map_err(|e| CaptureError::Stream(format!("frame collector failed: {e}")))?;
        stop_result?;

        let recording = encode_recording(frames)?;
        info!(
            "Recording finalized: {:.1}s at {} Hz ({} bytes)",
            recording.duration_secs,
            recording.sample_rate,
            recording.wav.len()
        );

        Ok(Some(recording))
    }
}

/// Encode collected frames as a WAV file in memory
fn encode_recording(frames: Vec<AudioFrame>) -> Result<AnswerRecording, CaptureError> {
    let first = frames
        .first()
        .ok_or_else(|| CaptureError::Stream("no audio captured".to_string()))?;

    let sample_rate = first.sample_rate;
    let channels = first.channels;

    let spec = hound::WavSpec {
        channels,
        sample_rate,
        bits_per_sample: 16,
        sample_format: hound::SampleFormat::Int,
    };

    let mut cursor = Cursor::new(Vec::new());
    let mut writer = hound::WavWriter::new(&mut cursor, spec)
        .map_err(|e| CaptureError::Stream(format!("failed to create WAV writer: {e}")))?;

    let mut sample_count: usize = 0;
    for frame in &frames {
        for &sample in &frame.samples {
            writer
                .write_sample(sample)
                .map_err(|e| CaptureError::Stream(format!("failed to write sample: {e}")))?;
        }
        sample_count += frame.samples.len();
    }

    writer
        .finalize()
        .map_err(|e| CaptureError::Stream(format!("failed to finalize WAV: {e}")))?;

    let duration_secs = sample_count as f64 / (sample_rate as f64 * channels as f64);

    Ok(AnswerRecording {
        wav: cursor.into_inner(),
        duration_secs,
        sample_rate,
        channels,
    })
}

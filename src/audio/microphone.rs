use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use cpal::Sample;
use tokio::sync::{mpsc, oneshot};
use tracing::{error, info, warn};

use super::backend::{AudioFrame, CaptureBackend, CaptureConfig};
use crate::error::CaptureError;

/// Microphone capture backend built on cpal
///
/// The cpal stream is not `Send`, so a dedicated thread owns it for the
/// lifetime of the capture. Stopping flips the shared flag, the thread
/// drops the stream (releasing the device and closing the frame channel),
/// and `stop` joins it.
pub struct MicrophoneBackend {
    config: CaptureConfig,
    is_capturing: Arc<AtomicBool>,
    worker: Option<thread::JoinHandle<()>>,
}

impl MicrophoneBackend {
    pub fn new(config: CaptureConfig) -> Self {
        Self {
            config,
            is_capturing: Arc::new(AtomicBool::new(false)),
            worker: None,
        }
    }

    fn join_worker(&mut self) {
        if let Some(worker) = self.worker.take() {
            if worker.join().is_err() {
                error!("Capture thread panicked");
            }
        }
    }
}

#[async_trait::async_trait]
impl CaptureBackend for MicrophoneBackend {
    async fn start(&mut self) -> Result<mpsc::Receiver<AudioFrame>, CaptureError> {
        if self.is_capturing.load(Ordering::SeqCst) {
            return Err(CaptureError::Stream("capture already started".to_string()));
        }

        let host = cpal::default_host();
        let device = host
            .default_input_device()
            .ok_or(CaptureError::DeviceUnavailable)?;

        let device_name = device.name().unwrap_or_else(|_| "unknown".to_string());
        let supported = device
            .default_input_config()
            .map_err(classify_config_error)?;

        info!(
            "Starting microphone capture on {} ({} Hz, {} ch)",
            device_name,
            supported.sample_rate().0,
            supported.channels()
        );

        let (frame_tx, frame_rx) = mpsc::channel(64);
        let (ready_tx, ready_rx) = oneshot::channel();
        let is_capturing = Arc::clone(&self.is_capturing);
        let config = self.config.clone();

        let worker = thread::spawn(move || {
            run_capture(device, supported, config, frame_tx, ready_tx, is_capturing);
        });
        self.worker = Some(worker);

        match ready_rx.await {
            Ok(Ok(())) => Ok(frame_rx),
            Ok(Err(e)) => {
                self.join_worker();
                Err(e)
            }
            Err(_) => {
                self.join_worker();
                Err(CaptureError::Stream(
                    "capture thread exited before starting".to_string(),
                ))
            }
        }
    }

    async fn stop(&mut self) -> Result<(), CaptureError> {
        if !self.is_capturing.swap(false, Ordering::SeqCst) {
            warn!("Microphone capture not active");
        }

        if let Some(worker) = self.worker.take() {
            tokio::task::spawn_blocking(move || worker.join())
                .await
                .map_err(|e| CaptureError::Stream(format!("failed to join capture thread: {e}")))?
                .map_err(|_| CaptureError::Stream("capture thread panicked".to_string()))?;
        }

        Ok(())
    }

    fn is_capturing(&self) -> bool {
        self.is_capturing.load(Ordering::SeqCst)
    }

    fn name(&self) -> &str {
        "microphone (cpal)"
    }
}

/// Capture thread body: builds the input stream, reports readiness, then
/// parks until the capturing flag drops. Dropping the stream releases the
/// device and closes the frame channel.
fn run_capture(
    device: cpal::Device,
    supported: cpal::SupportedStreamConfig,
    config: CaptureConfig,
    frame_tx: mpsc::Sender<AudioFrame>,
    ready_tx: oneshot::Sender<Result<(), CaptureError>>,
    is_capturing: Arc<AtomicBool>,
) {
    let sample_format = supported.sample_format();
    let stream_config: cpal::StreamConfig = supported.into();
    let frame_samples =
        (stream_config.sample_rate.0 as u64 * config.frame_duration_ms / 1000).max(1) as usize;

    let built = match sample_format {
        cpal::SampleFormat::F32 => build_capture_stream::<f32>(
            &device,
            stream_config,
            frame_samples,
            frame_tx,
            Arc::clone(&is_capturing),
        ),
        cpal::SampleFormat::I16 => build_capture_stream::<i16>(
            &device,
            stream_config,
            frame_samples,
            frame_tx,
            Arc::clone(&is_capturing),
        ),
        cpal::SampleFormat::U16 => build_capture_stream::<u16>(
            &device,
            stream_config,
            frame_samples,
            frame_tx,
            Arc::clone(&is_capturing),
        ),
        other => {
            let _ = ready_tx.send(Err(CaptureError::Stream(format!(
                "unsupported sample format: {other:?}"
            ))));
            return;
        }
    };

    let stream = match built {
        Ok(stream) => stream,
        Err(e) => {
            let _ = ready_tx.send(Err(classify_build_error(e)));
            return;
        }
    };

    if let Err(e) = stream.play() {
        let _ = ready_tx.send(Err(CaptureError::Stream(e.to_string())));
        return;
    }

    is_capturing.store(true, Ordering::SeqCst);
    if ready_tx.send(Ok(())).is_err() {
        is_capturing.store(false, Ordering::SeqCst);
        return;
    }

    while is_capturing.load(Ordering::SeqCst) {
        thread::sleep(Duration::from_millis(50));
    }

    drop(stream);
    info!("Microphone capture stopped");
}

/// Build an input stream that downmixes to mono i16 and batches samples
/// into fixed-size frames
fn build_capture_stream<T>(
    device: &cpal::Device,
    config: cpal::StreamConfig,
    frame_samples: usize,
    frame_tx: mpsc::Sender<AudioFrame>,
    is_capturing: Arc<AtomicBool>,
) -> Result<cpal::Stream, cpal::BuildStreamError>
where
    T: cpal::SizedSample,
    i16: cpal::FromSample<T>,
{
    let channels = config.channels as usize;
    let sample_rate = config.sample_rate.0;
    let mut buffer: Vec<i16> = Vec::with_capacity(frame_samples);
    let mut samples_sent: u64 = 0;

    device.build_input_stream(
        &config,
        move |data: &[T], _: &cpal::InputCallbackInfo| {
            if !is_capturing.load(Ordering::SeqCst) {
                return;
            }

            for frame in data.chunks(channels) {
                let sum: i32 = frame.iter().map(|s| i16::from_sample(*s) as i32).sum();
                buffer.push((sum / channels.max(1) as i32) as i16);

                if buffer.len() >= frame_samples {
                    let samples = std::mem::take(&mut buffer);
                    let timestamp_ms = samples_sent * 1000 / sample_rate as u64;
                    samples_sent += samples.len() as u64;

                    // try_send: never block the audio callback; a full
                    // channel drops the frame
                    let _ = frame_tx.try_send(AudioFrame {
                        samples,
                        sample_rate,
                        channels: 1,
                        timestamp_ms,
                    });
                }
            }
        },
        |err| error!("Audio input stream error: {}", err),
        None,
    )
}

fn classify_build_error(err: cpal::BuildStreamError) -> CaptureError {
    match err {
        cpal::BuildStreamError::DeviceNotAvailable => CaptureError::DeviceUnavailable,
        other => classify_by_message(other.to_string()),
    }
}

fn classify_config_error(err: cpal::DefaultStreamConfigError) -> CaptureError {
    match err {
        cpal::DefaultStreamConfigError::DeviceNotAvailable => CaptureError::DeviceUnavailable,
        other => classify_by_message(other.to_string()),
    }
}

/// Hosts report OS-level denials as backend-specific errors, so the text
/// is the only signal available for classification.
fn classify_by_message(message: String) -> CaptureError {
    let lower = message.to_lowercase();
    if lower.contains("permission") || lower.contains("denied") || lower.contains("access") {
        CaptureError::PermissionDenied
    } else {
        CaptureError::Stream(message)
    }
}

use tokio::sync::mpsc;

use crate::error::CaptureError;

/// Audio sample data (16-bit PCM, mono)
#[derive(Debug, Clone)]
pub struct AudioFrame {
    /// Raw audio samples (i16 PCM)
    pub samples: Vec<i16>,
    /// Sample rate in Hz
    pub sample_rate: u32,
    /// Number of channels
    pub channels: u16,
    /// Timestamp in milliseconds since capture started
    pub timestamp_ms: u64,
}

/// Configuration for a capture backend
#[derive(Debug, Clone)]
pub struct CaptureConfig {
    /// Target channel count (answers are downmixed to mono)
    pub channels: u16,
    /// Frame size in milliseconds (affects latency)
    pub frame_duration_ms: u64,
}

impl Default for CaptureConfig {
    fn default() -> Self {
        Self {
            channels: 1,            // Mono
            frame_duration_ms: 100, // 100ms frames
        }
    }
}

/// Audio capture backend trait
///
/// Implementations own the device for the duration of a capture and must
/// release it deterministically on `stop`, on every path. The microphone
/// implementation uses cpal; tests implement this trait with scripted
/// frame sequences.
#[async_trait::async_trait]
pub trait CaptureBackend: Send + Sync {
    /// Start capturing audio
    ///
    /// Returns a channel receiver that will receive audio frames. The
    /// channel closes when the backend stops. Failures are classified:
    /// a missing or lost device is `DeviceUnavailable`, an OS denial is
    /// `PermissionDenied`, anything else is a generic capture failure.
    /// A failed start leaves nothing acquired.
    async fn start(&mut self) -> Result<mpsc::Receiver<AudioFrame>, CaptureError>;

    /// Stop capturing audio and release the device
    async fn stop(&mut self) -> Result<(), CaptureError>;

    /// Check if backend is currently capturing
    fn is_capturing(&self) -> bool;

    /// Get backend name for logging
    fn name(&self) -> &str;
}

/// Audio source type
#[derive(Debug, Clone)]
pub enum CaptureSource {
    /// Microphone input (cpal default input device)
    Microphone,
}

/// Capture backend factory
pub struct CaptureBackendFactory;

impl CaptureBackendFactory {
    pub fn create(
        source: CaptureSource,
        config: CaptureConfig,
    ) -> Result<Box<dyn CaptureBackend>, CaptureError> {
        match source {
            CaptureSource::Microphone => {
                let backend = super::microphone::MicrophoneBackend::new(config);
                Ok(Box::new(backend))
            }
        }
    }
}

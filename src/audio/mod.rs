pub mod backend;
pub mod microphone;
pub mod recorder;

pub use backend::{AudioFrame, CaptureBackend, CaptureBackendFactory, CaptureConfig, CaptureSource};
pub use microphone::MicrophoneBackend;
pub use recorder::{AnswerRecorder, AnswerRecording};

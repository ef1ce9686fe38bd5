pub mod api;
pub mod audio;
pub mod config;
pub mod error;
pub mod http;
pub mod session;

pub use api::{
    AnswerExchange, BackendClient, ChatMessage, Feedback, Interview, InterviewBackend,
    InterviewMode, QuestionRecord, Speaker,
};
pub use audio::{
    AnswerRecorder, AnswerRecording, AudioFrame, CaptureBackend, CaptureBackendFactory,
    CaptureConfig, CaptureSource,
};
pub use config::Config;
pub use error::{ApiError, CaptureError, SessionError};
pub use http::{create_router, AppState, SessionEntry};
pub use session::{
    InterviewSession, ProgressionPolicy, Question, QuestionSource, SessionConfig, SessionPhase,
    SessionSnapshot, Stage, TranscriptTurn, Verdict, BEHAVIORAL_OPENING, CODING_OPENING,
};

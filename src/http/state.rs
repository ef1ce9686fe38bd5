use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;
use uuid::Uuid;

use crate::api::InterviewBackend;
use crate::audio::AnswerRecorder;
use crate::session::{InterviewSession, SessionConfig};

/// One active session paired with the recorder feeding it
pub struct SessionEntry {
    pub session: Arc<InterviewSession>,
    pub recorder: Arc<AnswerRecorder>,
}

/// Shared application state for HTTP handlers
#[derive(Clone)]
pub struct AppState {
    /// Active sessions (interview_id -> entry)
    pub sessions: Arc<RwLock<HashMap<Uuid, Arc<SessionEntry>>>>,

    /// Interview backend shared by all sessions
    pub backend: Arc<dyn InterviewBackend>,

    /// Settings applied to newly started sessions
    pub session_config: SessionConfig,
}

impl AppState {
    pub fn new(backend: Arc<dyn InterviewBackend>, session_config: SessionConfig) -> Self {
        Self {
            sessions: Arc::new(RwLock::new(HashMap::new())),
            backend,
            session_config,
        }
    }
}

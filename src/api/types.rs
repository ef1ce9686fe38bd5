use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::ApiError;

/// Interview kind, fixed for the lifetime of a session
///
/// Determines both question sourcing (synthesized vs fetched) and the
/// progression policy applied to each answer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum InterviewMode {
    Coding,
    Behavioral,
}

impl InterviewMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            InterviewMode::Coding => "coding",
            InterviewMode::Behavioral => "behavioral",
        }
    }
}

/// An interview as returned by the backend
///
/// Immutable once loaded; creation and editing happen outside this service.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Interview {
    pub id: Uuid,

    pub title: String,

    /// Free-text context (the problem statement for coding interviews)
    pub context: String,

    #[serde(rename = "interview_type")]
    pub mode: InterviewMode,
}

/// Wire shape of a stored question
///
/// The backend's `type` field is a free-text category ("behavioral",
/// "trees", ...) and is not trusted for mode decisions.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QuestionRecord {
    pub id: Uuid,

    pub description: String,

    #[serde(rename = "type", default)]
    pub category: String,
}

/// Who authored a transcript turn
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Speaker {
    User,
    Assistant,
}

/// One chat turn as returned by the backend
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: Speaker,
    pub content: String,
}

/// The validated result of one answer submission: the transcribed user
/// turn followed by the assistant's reply.
#[derive(Debug, Clone)]
pub struct AnswerExchange {
    pub user: ChatMessage,
    pub assistant: ChatMessage,
}

impl AnswerExchange {
    /// Validate the backend's chat payload shape.
    ///
    /// The first two turns must be user then assistant; extra elements are
    /// ignored, anything shorter or mis-ordered is malformed.
    pub fn from_turns(turns: Vec<ChatMessage>) -> Result<Self, ApiError> {
        let mut turns = turns.into_iter();

        let user = turns
            .next()
            .ok_or_else(|| ApiError::MalformedResponse("empty chat response".into()))?;
        let assistant = turns.next().ok_or_else(|| {
            ApiError::MalformedResponse("chat response is missing the assistant turn".into())
        })?;

        if user.role != Speaker::User || assistant.role != Speaker::Assistant {
            return Err(ApiError::MalformedResponse(
                "chat response turns are not ordered user, assistant".into(),
            ));
        }

        Ok(Self { user, assistant })
    }
}

/// Feedback payload, displayed verbatim
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Feedback {
    pub overall_feedback: String,

    pub tone_summary: String,

    pub speech_rate: Option<String>,
}

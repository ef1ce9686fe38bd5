use serde::Serialize;
use uuid::Uuid;

use crate::api::{InterviewMode, QuestionRecord};

/// A question as driven by the session
#[derive(Debug, Clone, Serialize)]
pub struct Question {
    pub id: String,
    pub kind: InterviewMode,
    pub content: String,
    pub language: Option<String>,
}

/// Where a session's question sequence comes from
///
/// Behavioral interviews use the stored list fetched from the backend;
/// coding interviews get exactly one question synthesized from the
/// interview context. Both variants resolve through the same path, so the
/// session controller never branches on mode after load.
#[derive(Debug)]
pub enum QuestionSource {
    /// Stored questions fetched from the backend
    Fetched(Vec<QuestionRecord>),
    /// A single question synthesized from the interview context
    Synthesized { interview_id: Uuid, context: String },
}

impl QuestionSource {
    /// Resolve into the ordered question sequence
    pub fn resolve(self) -> Vec<Question> {
        match self {
            QuestionSource::Fetched(records) => records
                .into_iter()
                .map(|record| Question {
                    id: record.id.to_string(),
                    kind: InterviewMode::Behavioral,
                    content: record.description,
                    language: None,
                })
                .collect(),
            QuestionSource::Synthesized {
                interview_id,
                context,
            } => vec![Question {
                id: format!("{interview_id}-code"),
                kind: InterviewMode::Coding,
                content: context,
                language: Some("python".to_string()),
            }],
        }
    }
}

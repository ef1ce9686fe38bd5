pub mod client;
pub mod types;

pub use client::{BackendClient, InterviewBackend};
pub use types::{
    AnswerExchange, ChatMessage, Feedback, Interview, InterviewMode, QuestionRecord, Speaker,
};

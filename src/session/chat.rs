use chrono::{DateTime, Utc};
use serde::Serialize;

use super::progression::Stage;
use super::source::Question;
use crate::api::{AnswerExchange, InterviewMode, Speaker};

/// Opening line seeded into every coding-question chat
pub const CODING_OPENING: &str =
    "Let's begin the coding interview. Start by sharing how you understand the problem.";

/// Opening line seeded into every behavioral-question chat
pub const BEHAVIORAL_OPENING: &str =
    "Welcome to your behavioral interview! Please record your answer to the question displayed above.";

/// One entry in a question's transcript
#[derive(Debug, Clone, Serialize)]
pub struct TranscriptTurn {
    pub speaker: Speaker,

    pub text: String,

    /// When this turn was recorded
    pub timestamp: DateTime<Utc>,
}

/// Per-question chat state
///
/// Rebuilt whole whenever the active question changes; within one
/// question's lifetime the transcript is append-only.
#[derive(Debug)]
pub struct QuestionChat {
    question: Question,
    mode: InterviewMode,
    turns: Vec<TranscriptTurn>,
    stage: Stage,
    answered: bool,
    error: Option<String>,
}

impl QuestionChat {
    /// Fresh chat for a question, seeded with the mode's opening line
    pub fn new(mode: InterviewMode, question: Question) -> Self {
        let opening = match mode {
            InterviewMode::Coding => CODING_OPENING,
            InterviewMode::Behavioral => BEHAVIORAL_OPENING,
        };

        Self {
            question,
            mode,
            turns: vec![TranscriptTurn {
                speaker: Speaker::Assistant,
                text: opening.to_string(),
                timestamp: Utc::now(),
            }],
            stage: Stage::Understand,
            answered: false,
            error: None,
        }
    }

    pub fn question(&self) -> &Question {
        &self.question
    }

    pub fn mode(&self) -> InterviewMode {
        self.mode
    }

    pub fn turns(&self) -> &[TranscriptTurn] {
        &self.turns
    }

    pub fn stage(&self) -> Stage {
        self.stage
    }

    pub fn answered(&self) -> bool {
        self.answered
    }

    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    pub fn set_error(&mut self, message: String) {
        self.error = Some(message);
    }

    /// Append the submitted exchange: exactly one user turn followed by
    /// one assistant turn. Closes the answered gate and clears any error.
    pub fn record_exchange(&mut self, exchange: &AnswerExchange) {
        let now = Utc::now();

        self.turns.push(TranscriptTurn {
            speaker: Speaker::User,
            text: exchange.user.content.clone(),
            timestamp: now,
        });
        self.turns.push(TranscriptTurn {
            speaker: Speaker::Assistant,
            text: exchange.assistant.content.clone(),
            timestamp: now,
        });

        self.answered = true;
        self.error = None;
    }

    /// Move to the next stage of the same question and re-open the
    /// answered gate (coding mode)
    pub fn advance_stage(&mut self, next: Stage) {
        self.stage = next;
        self.answered = false;
    }
}

//! Interview session orchestration
//!
//! This module provides the session state machine:
//! - Question sourcing (fetched list vs synthesized coding question)
//! - Per-question chat state with the answered gate
//! - Mode progression policy (UMPIRE stages / completion sentinels)
//! - Session lifecycle (Loading -> Active -> Completed) and feedback

mod chat;
mod config;
mod progression;
mod session;
mod source;

pub use chat::{QuestionChat, TranscriptTurn, BEHAVIORAL_OPENING, CODING_OPENING};
pub use config::SessionConfig;
pub use progression::{ProgressionPolicy, Stage, Verdict};
pub use session::{InterviewSession, SessionPhase, SessionSnapshot};
pub use source::{Question, QuestionSource};

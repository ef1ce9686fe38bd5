use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;

use serde::Serialize;
use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tracing::{info, warn};
use uuid::Uuid;

use super::chat::{QuestionChat, TranscriptTurn};
use super::config::SessionConfig;
use super::progression::{ProgressionPolicy, Verdict};
use super::source::{Question, QuestionSource};
use crate::api::{Feedback, Interview, InterviewBackend, InterviewMode};
use crate::audio::AnswerRecording;
use crate::error::SessionError;

/// Session lifecycle phase
///
/// Mutated only by whole-value replacement under the phase lock, so
/// readers never observe a half-applied transition.
#[derive(Debug, Clone)]
pub enum SessionPhase {
    Loading,
    Active { question_index: usize },
    Completed { feedback: Option<Feedback> },
}

/// An interview practice session
///
/// Owns the question sequence, the current index, and the per-question
/// chat. Answers flow in through [`submit_answer`]; the progression
/// verdict is applied after the display delay by a deferred task that is
/// epoch-guarded, so a question change or teardown makes it a no-op
/// instead of mutating stale state.
///
/// [`submit_answer`]: InterviewSession::submit_answer
pub struct InterviewSession {
    interview: Interview,
    questions: Vec<Question>,
    config: SessionConfig,
    backend: Arc<dyn InterviewBackend>,

    phase: Mutex<SessionPhase>,
    chat: Mutex<QuestionChat>,

    /// In-flight submission flag; together with the answered gate this
    /// holds submissions to at most one outstanding per question
    submitting: AtomicBool,

    /// Bumped on every question change and on completion; outcome
    /// application is dropped when its captured epoch no longer matches
    epoch: AtomicU64,

    /// Serializes outcome application so a deferred task and a manual
    /// advance cannot both act on the same observation
    outcome_lock: Mutex<()>,

    generating_feedback: AtomicBool,

    /// Pending deferred-outcome task, aborted on teardown
    outcome_task: Mutex<Option<JoinHandle<()>>>,
}

/// Serializable view of the session for the control API
#[derive(Debug, Clone, Serialize)]
pub struct SessionSnapshot {
    pub interview_id: Uuid,
    pub title: String,
    pub mode: InterviewMode,
    pub status: String,
    pub question: Option<Question>,
    pub current: usize,
    pub total: usize,
    pub stage: Option<String>,
    pub answered: bool,
    pub error: Option<String>,
    pub generating_feedback: bool,
    pub feedback: Option<Feedback>,
}

impl InterviewSession {
    /// Load a session: fetch the interview, source its questions, and
    /// activate on the first one.
    ///
    /// Any fetch failure is terminal for the session; no partially
    /// active state is ever returned.
    pub async fn load(
        backend: Arc<dyn InterviewBackend>,
        interview_id: Uuid,
        config: SessionConfig,
    ) -> Result<Self, SessionError> {
        info!("Loading interview session {}", interview_id);

        let interview = backend
            .fetch_interview(interview_id)
            .await
            .map_err(SessionError::LoadFailed)?;

        let source = match interview.mode {
            InterviewMode::Behavioral => {
                let records = backend
                    .fetch_questions(interview_id)
                    .await
                    .map_err(SessionError::LoadFailed)?;
                QuestionSource::Fetched(records)
            }
            InterviewMode::Coding => QuestionSource::Synthesized {
                interview_id: interview.id,
                context: interview.context.clone(),
            },
        };

        let questions = source.resolve();
        if questions.is_empty() {
            return Err(SessionError::NoQuestions);
        }

        let chat = QuestionChat::new(interview.mode, questions[0].clone());

        let session = Self {
            interview,
            questions,
            config,
            backend,
            phase: Mutex::new(SessionPhase::Loading),
            chat: Mutex::new(chat),
            submitting: AtomicBool::new(false),
            epoch: AtomicU64::new(0),
            outcome_lock: Mutex::new(()),
            generating_feedback: AtomicBool::new(false),
            outcome_task: Mutex::new(None),
        };

        *session.phase.lock().await = SessionPhase::Active { question_index: 0 };

        info!(
            "Session {} active: {} question(s), mode={}",
            session.interview.id,
            session.questions.len(),
            session.interview.mode.as_str()
        );

        Ok(session)
    }

    pub fn interview(&self) -> &Interview {
        &self.interview
    }

    pub fn mode(&self) -> InterviewMode {
        self.interview.mode
    }

    pub fn capture_config(&self) -> &crate::audio::CaptureConfig {
        &self.config.capture
    }

    pub async fn phase(&self) -> SessionPhase {
        self.phase.lock().await.clone()
    }

    /// The question currently being asked, if the session is active
    pub async fn active_question(&self) -> Option<Question> {
        match *self.phase.lock().await {
            SessionPhase::Active { question_index } => {
                self.questions.get(question_index).cloned()
            }
            _ => None,
        }
    }

    /// Display progress: (current question number, total questions).
    /// The denominator is never zero.
    pub async fn progress(&self) -> (usize, usize) {
        let total = self.questions.len().max(1);
        match *self.phase.lock().await {
            SessionPhase::Loading => (0, total),
            SessionPhase::Active { question_index } => (question_index + 1, total),
            SessionPhase::Completed { .. } => (total, total),
        }
    }

    /// The transcript of the current question's chat
    pub async fn transcript(&self) -> Vec<TranscriptTurn> {
        self.chat.lock().await.turns().to_vec()
    }

    /// Submit one recorded answer for the current question
    ///
    /// No-op when the question was already answered or another submission
    /// is in flight. On success the exchange is appended to the
    /// transcript and the progression verdict is scheduled; on failure the
    /// error is surfaced inline and the user may re-record.
    pub async fn submit_answer(
        self: Arc<Self>,
        recording: AnswerRecording,
    ) -> Result<(), SessionError> {
        match *self.phase.lock().await {
            SessionPhase::Active { .. } => {}
            _ => return Err(SessionError::NotActive),
        }

        {
            let chat = self.chat.lock().await;
            if chat.answered() {
                info!(
                    "Ignoring duplicate submission for question {}",
                    chat.question().id
                );
                return Ok(());
            }
        }

        if self.submitting.swap(true, Ordering::SeqCst) {
            info!("Submission already in flight, ignoring");
            return Ok(());
        }

        let result = self
            .backend
            .submit_answer(self.interview.id, self.interview.mode, recording)
            .await;

        let outcome = match result {
            Ok(exchange) => {
                let verdict = {
                    let mut chat = self.chat.lock().await;
                    chat.record_exchange(&exchange);
                    ProgressionPolicy::evaluate(
                        self.interview.mode,
                        chat.stage(),
                        &exchange.assistant.content,
                    )
                };

                Arc::clone(&self).schedule_verdict(verdict).await;
                Ok(())
            }
            Err(api_err) => {
                let err = SessionError::Submission(api_err);
                self.chat.lock().await.set_error(err.to_string());
                Err(err)
            }
        };

        self.submitting.store(false, Ordering::SeqCst);
        outcome
    }

    /// The explicit "Next Question" affordance: behavioral mode only,
    /// after an answer, never past the last question. Applies immediately,
    /// without the display delay.
    pub async fn advance_manually(&self) -> Result<(), SessionError> {
        if self.interview.mode != InterviewMode::Behavioral {
            return Err(SessionError::InvalidOperation(
                "Manual advance is only available in behavioral interviews".to_string(),
            ));
        }

        let question_index = match *self.phase.lock().await {
            SessionPhase::Active { question_index } => question_index,
            _ => return Err(SessionError::NotActive),
        };

        if !self.chat.lock().await.answered() {
            return Err(SessionError::InvalidOperation(
                "Record an answer before moving on".to_string(),
            ));
        }

        if question_index + 1 >= self.questions.len() {
            return Err(SessionError::InvalidOperation(
                "Already on the last question".to_string(),
            ));
        }

        let epoch = self.epoch.load(Ordering::SeqCst);
        self.handle_outcome(false, epoch).await;

        Ok(())
    }

    /// Tear the session down: any pending deferred outcome is cancelled
    /// and can no longer mutate state.
    pub async fn teardown(&self) {
        self.epoch.fetch_add(1, Ordering::SeqCst);
        if let Some(task) = self.outcome_task.lock().await.take() {
            task.abort();
        }
        info!("Session {} torn down", self.interview.id);
    }

    pub async fn snapshot(&self) -> SessionSnapshot {
        let phase = self.phase.lock().await.clone();
        let chat = self.chat.lock().await;

        let total = self.questions.len().max(1);
        let (status, question, current, feedback) = match phase {
            SessionPhase::Loading => ("loading", None, 0, None),
            SessionPhase::Active { question_index } => (
                "active",
                self.questions.get(question_index).cloned(),
                question_index + 1,
                None,
            ),
            SessionPhase::Completed { feedback } => ("completed", None, total, feedback),
        };

        let stage = match (self.interview.mode, status) {
            (InterviewMode::Coding, "active") => Some(chat.stage().label().to_string()),
            _ => None,
        };

        SessionSnapshot {
            interview_id: self.interview.id,
            title: self.interview.title.clone(),
            mode: self.interview.mode,
            status: status.to_string(),
            question,
            current,
            total,
            stage,
            answered: chat.answered(),
            error: chat.error().map(str::to_string),
            generating_feedback: self.generating_feedback.load(Ordering::SeqCst),
            feedback,
        }
    }

    /// Schedule the verdict's effect after the display delay
    ///
    /// The task captures the current epoch; if the question or session
    /// has moved on by the time it fires, it does nothing.
    async fn schedule_verdict(self: Arc<Self>, verdict: Verdict) {
        let session = Arc::clone(&self);
        let epoch = self.epoch.load(Ordering::SeqCst);
        let delay = self.config.display_delay;

        let task = tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            session.apply_verdict(verdict, epoch).await;
        });

        if let Some(previous) = self.outcome_task.lock().await.replace(task) {
            previous.abort();
        }
    }

    async fn apply_verdict(&self, verdict: Verdict, epoch: u64) {
        match verdict {
            Verdict::AdvanceStage(next) => {
                let _guard = self.outcome_lock.lock().await;
                if self.epoch.load(Ordering::SeqCst) != epoch {
                    return;
                }

                info!("Advancing to stage {}", next.label());
                self.chat.lock().await.advance_stage(next);
            }
            Verdict::NextQuestion => self.handle_outcome(false, epoch).await,
            Verdict::Complete => self.handle_outcome(true, epoch).await,
        }
    }

    /// Consume one finished question interaction
    ///
    /// On the last question, or when forced, the session completes with a
    /// single feedback request; otherwise the index advances by exactly
    /// one and the chat is rebuilt. Stale or duplicate deliveries (wrong
    /// epoch, already completed) are dropped.
    async fn handle_outcome(&self, force_complete: bool, epoch: u64) {
        let _guard = self.outcome_lock.lock().await;

        if self.epoch.load(Ordering::SeqCst) != epoch {
            return;
        }

        let question_index = match *self.phase.lock().await {
            SessionPhase::Active { question_index } => question_index,
            _ => return,
        };

        let is_last = question_index == self.questions.len() - 1;

        if force_complete || is_last {
            self.complete().await;
        } else {
            self.advance_question(question_index + 1).await;
        }
    }

    async fn advance_question(&self, next_index: usize) {
        // Bump the epoch first so anything still referencing the old
        // question goes stale
        self.epoch.fetch_add(1, Ordering::SeqCst);

        info!(
            "Advancing to question {}/{}",
            next_index + 1,
            self.questions.len()
        );

        let question = self.questions[next_index].clone();
        *self.chat.lock().await = QuestionChat::new(self.interview.mode, question);
        *self.phase.lock().await = SessionPhase::Active {
            question_index: next_index,
        };
    }

    /// Terminal transition: one feedback request, then Completed, with
    /// the feedback marked absent if the request failed. Never a stuck
    /// state.
    async fn complete(&self) {
        self.epoch.fetch_add(1, Ordering::SeqCst);
        self.generating_feedback.store(true, Ordering::SeqCst);

        let feedback = match self.backend.request_feedback(self.interview.id).await {
            Ok(feedback) => Some(feedback),
            Err(e) => {
                warn!(
                    "Feedback generation failed for interview {}: {}",
                    self.interview.id, e
                );
                None
            }
        };

        self.generating_feedback.store(false, Ordering::SeqCst);
        *self.phase.lock().await = SessionPhase::Completed { feedback };

        info!("Interview session {} completed", self.interview.id);
    }
}

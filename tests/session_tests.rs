// Integration tests for session orchestration
//
// A scripted backend fake stands in for the interview service so the
// state machine can be driven end to end: question advancement, UMPIRE
// stage walking, sentinel completion, duplicate-submission guarding, and
// feedback degradation.

use async_trait::async_trait;
use prepstage::{
    AnswerExchange, AnswerRecording, ApiError, ChatMessage, Feedback, Interview, InterviewBackend,
    InterviewMode, InterviewSession, QuestionRecord, SessionConfig, SessionError, SessionPhase,
    Speaker,
};
use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::time::sleep;
use uuid::Uuid;

const ORDINARY_REPLY: &str = "Thank you for your response. Here's your next question:";
const COMPLETION_REPLY: &str =
    "Thank you! You've completed the interview. Please wait while we generate your feedback.";

struct FakeBackend {
    interview: Interview,
    questions: Vec<QuestionRecord>,
    replies: Mutex<VecDeque<String>>,
    submit_calls: AtomicUsize,
    feedback_calls: AtomicUsize,
    fail_interview: AtomicBool,
    fail_submission: AtomicBool,
    fail_feedback: AtomicBool,
}

impl FakeBackend {
    fn behavioral(question_count: usize, replies: &[&str]) -> Arc<Self> {
        let interview_id = Uuid::new_v4();
        let questions = (0..question_count)
            .map(|i| QuestionRecord {
                id: Uuid::new_v4(),
                description: format!("Question {}", i + 1),
                category: "behavioral".to_string(),
            })
            .collect();

        Arc::new(Self {
            interview: Interview {
                id: interview_id,
                title: "Behavioral practice".to_string(),
                context: "Mid-level backend role".to_string(),
                mode: InterviewMode::Behavioral,
            },
            questions,
            replies: Mutex::new(replies.iter().map(|r| r.to_string()).collect()),
            submit_calls: AtomicUsize::new(0),
            feedback_calls: AtomicUsize::new(0),
            fail_interview: AtomicBool::new(false),
            fail_submission: AtomicBool::new(false),
            fail_feedback: AtomicBool::new(false),
        })
    }

    fn coding(context: &str) -> Arc<Self> {
        Arc::new(Self {
            interview: Interview {
                id: Uuid::new_v4(),
                title: "Coding practice".to_string(),
                context: context.to_string(),
                mode: InterviewMode::Coding,
            },
            questions: Vec::new(),
            replies: Mutex::new(VecDeque::new()),
            submit_calls: AtomicUsize::new(0),
            feedback_calls: AtomicUsize::new(0),
            fail_interview: AtomicBool::new(false),
            fail_submission: AtomicBool::new(false),
            fail_feedback: AtomicBool::new(false),
        })
    }
}

#[async_trait]
impl InterviewBackend for FakeBackend {
    async fn fetch_interview(&self, _interview_id: Uuid) -> Result<Interview, ApiError> {
        if self.fail_interview.load(Ordering::SeqCst) {
            return Err(ApiError::Status(reqwest::StatusCode::NOT_FOUND));
        }
        Ok(self.interview.clone())
    }

    async fn fetch_questions(&self, _interview_id: Uuid) -> Result<Vec<QuestionRecord>, ApiError> {
        Ok(self.questions.clone())
    }

    async fn submit_answer(
        &self,
        _interview_id: Uuid,
        _mode: InterviewMode,
        _recording: AnswerRecording,
    ) -> Result<AnswerExchange, ApiError> {
        self.submit_calls.fetch_add(1, Ordering::SeqCst);

        if self.fail_submission.load(Ordering::SeqCst) {
            return Err(ApiError::Status(reqwest::StatusCode::BAD_GATEWAY));
        }

        let reply = self
            .replies
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| ORDINARY_REPLY.to_string());

        Ok(AnswerExchange {
            user: ChatMessage {
                role: Speaker::User,
                content: "transcribed answer".to_string(),
            },
            assistant: ChatMessage {
                role: Speaker::Assistant,
                content: reply,
            },
        })
    }

    async fn request_feedback(&self, _interview_id: Uuid) -> Result<Feedback, ApiError> {
        self.feedback_calls.fetch_add(1, Ordering::SeqCst);

        if self.fail_feedback.load(Ordering::SeqCst) {
            return Err(ApiError::Status(reqwest::StatusCode::BAD_GATEWAY));
        }

        Ok(Feedback {
            overall_feedback: "Clear structure, good examples.".to_string(),
            tone_summary: "Calm and confident.".to_string(),
            speech_rate: Some("Slightly fast".to_string()),
        })
    }
}

fn recording() -> AnswerRecording {
    AnswerRecording {
        wav: vec![0u8; 64],
        duration_secs: 1.5,
        sample_rate: 16000,
        channels: 1,
    }
}

fn fast_config() -> SessionConfig {
    SessionConfig {
        display_delay: Duration::from_millis(10),
        ..SessionConfig::default()
    }
}

async fn load_session(backend: &Arc<FakeBackend>, config: SessionConfig) -> Arc<InterviewSession> {
    let session = InterviewSession::load(
        Arc::clone(backend) as Arc<dyn InterviewBackend>,
        backend.interview.id,
        config,
    )
    .await
    .expect("session loads");
    Arc::new(session)
}

/// Submit an answer and wait out the display delay so the deferred
/// verdict has been applied.
async fn submit_and_settle(session: &Arc<InterviewSession>) {
    Arc::clone(session).submit_answer(recording()).await.unwrap();
    sleep(Duration::from_millis(100)).await;
}

// ============================================================================
// Loading
// ============================================================================

#[tokio::test]
async fn test_behavioral_load_uses_fetched_questions() {
    let backend = FakeBackend::behavioral(3, &[]);
    let session = load_session(&backend, fast_config()).await;

    assert_eq!(session.progress().await, (1, 3));
    let question = session.active_question().await.unwrap();
    assert_eq!(question.content, "Question 1");
    assert_eq!(question.kind, InterviewMode::Behavioral);
    assert!(question.language.is_none());
}

#[tokio::test]
async fn test_coding_load_synthesizes_one_question() {
    let backend = FakeBackend::coding("Reverse a linked list in place.");
    let session = load_session(&backend, fast_config()).await;

    assert_eq!(session.progress().await, (1, 1));
    let question = session.active_question().await.unwrap();
    assert_eq!(question.id, format!("{}-code", backend.interview.id));
    assert_eq!(question.content, "Reverse a linked list in place.");
    assert_eq!(question.kind, InterviewMode::Coding);
    assert_eq!(question.language.as_deref(), Some("python"));
}

#[tokio::test]
async fn test_fetch_failure_is_terminal() {
    let backend = FakeBackend::behavioral(2, &[]);
    backend.fail_interview.store(true, Ordering::SeqCst);

    let result = InterviewSession::load(
        Arc::clone(&backend) as Arc<dyn InterviewBackend>,
        backend.interview.id,
        fast_config(),
    )
    .await;

    assert!(matches!(result, Err(SessionError::LoadFailed(_))));
}

#[tokio::test]
async fn test_empty_behavioral_question_list_fails_load() {
    let backend = FakeBackend::behavioral(0, &[]);

    let result = InterviewSession::load(
        Arc::clone(&backend) as Arc<dyn InterviewBackend>,
        backend.interview.id,
        fast_config(),
    )
    .await;

    assert!(matches!(result, Err(SessionError::NoQuestions)));
}

// ============================================================================
// Behavioral progression
// ============================================================================

#[tokio::test]
async fn test_behavioral_session_advances_then_completes_on_sentinel() {
    let backend =
        FakeBackend::behavioral(3, &[ORDINARY_REPLY, ORDINARY_REPLY, COMPLETION_REPLY]);
    let session = load_session(&backend, fast_config()).await;

    // Submissions 1 and 2: ordinary replies, index advances 0 -> 1 -> 2
    submit_and_settle(&session).await;
    assert_eq!(session.progress().await, (2, 3));
    assert_eq!(
        session.active_question().await.unwrap().content,
        "Question 2"
    );

    submit_and_settle(&session).await;
    assert_eq!(session.progress().await, (3, 3));

    // Submission 3 carries the completion sentinel
    submit_and_settle(&session).await;

    match session.phase().await {
        SessionPhase::Completed { feedback } => assert!(feedback.is_some()),
        other => panic!("expected completed session, got {:?}", other),
    }
    assert_eq!(backend.submit_calls.load(Ordering::SeqCst), 3);
    assert_eq!(backend.feedback_calls.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn test_behavioral_sentinel_completes_regardless_of_position() {
    let backend = FakeBackend::behavioral(3, &[COMPLETION_REPLY]);
    let session = load_session(&backend, fast_config()).await;

    submit_and_settle(&session).await;

    assert!(matches!(
        session.phase().await,
        SessionPhase::Completed { .. }
    ));
    assert_eq!(backend.submit_calls.load(Ordering::SeqCst), 1);
    assert_eq!(backend.feedback_calls.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn test_behavioral_last_question_completes_without_sentinel() {
    let backend = FakeBackend::behavioral(1, &[ORDINARY_REPLY]);
    let session = load_session(&backend, fast_config()).await;

    submit_and_settle(&session).await;

    assert!(matches!(
        session.phase().await,
        SessionPhase::Completed { .. }
    ));
    assert_eq!(backend.feedback_calls.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn test_chat_resets_on_question_change() {
    let backend = FakeBackend::behavioral(2, &[ORDINARY_REPLY]);
    let session = load_session(&backend, fast_config()).await;

    submit_and_settle(&session).await;

    // New question: fresh transcript seeded with the opening line only
    let transcript = session.transcript().await;
    assert_eq!(transcript.len(), 1);
    assert_eq!(transcript[0].speaker, Speaker::Assistant);
    assert_eq!(transcript[0].text, prepstage::BEHAVIORAL_OPENING);

    let snapshot = session.snapshot().await;
    assert!(!snapshot.answered);
    assert!(snapshot.error.is_none());
}

// ============================================================================
// Coding progression
// ============================================================================

#[tokio::test]
async fn test_coding_session_walks_stages_and_completes_on_sixth() {
    let backend = FakeBackend::coding("Implement an LRU cache.");
    let session = load_session(&backend, fast_config()).await;

    let expected = ["Match", "Plan", "Implement", "Review", "Evaluate"];
    for stage in expected {
        submit_and_settle(&session).await;

        // Still the same single question, next stage, gate re-opened
        let snapshot = session.snapshot().await;
        assert_eq!(snapshot.status, "active");
        assert_eq!((snapshot.current, snapshot.total), (1, 1));
        assert_eq!(snapshot.stage.as_deref(), Some(stage));
        assert!(!snapshot.answered);
    }

    // Sixth submission, at Evaluate, ends the session
    submit_and_settle(&session).await;

    assert!(matches!(
        session.phase().await,
        SessionPhase::Completed { .. }
    ));
    assert_eq!(backend.submit_calls.load(Ordering::SeqCst), 6);
    assert_eq!(backend.feedback_calls.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn test_coding_transcript_grows_within_the_question() {
    let backend = FakeBackend::coding("Implement an LRU cache.");
    let session = load_session(&backend, fast_config()).await;

    assert_eq!(session.transcript().await.len(), 1); // opening line

    submit_and_settle(&session).await;
    // Same question, so the transcript keeps the history: opening + 2
    assert_eq!(session.transcript().await.len(), 3);

    submit_and_settle(&session).await;
    assert_eq!(session.transcript().await.len(), 5);
}

// ============================================================================
// Guards
// ============================================================================

#[tokio::test]
async fn test_duplicate_submission_makes_no_network_call() {
    // Long delay keeps the answered gate closed during the second call
    let config = SessionConfig {
        display_delay: Duration::from_secs(5),
        ..SessionConfig::default()
    };
    let backend = FakeBackend::behavioral(2, &[ORDINARY_REPLY]);
    let session = load_session(&backend, config).await;

    Arc::clone(&session).submit_answer(recording()).await.unwrap();
    assert_eq!(backend.submit_calls.load(Ordering::SeqCst), 1);

    // Answered gate is closed; this must be a silent no-op
    Arc::clone(&session).submit_answer(recording()).await.unwrap();
    assert_eq!(backend.submit_calls.load(Ordering::SeqCst), 1);

    // Exactly two transcript entries were appended
    assert_eq!(session.transcript().await.len(), 3);
}

#[tokio::test]
async fn test_completed_session_rejects_further_submissions() {
    let backend = FakeBackend::behavioral(1, &[COMPLETION_REPLY]);
    let session = load_session(&backend, fast_config()).await;

    submit_and_settle(&session).await;
    assert!(matches!(
        session.phase().await,
        SessionPhase::Completed { .. }
    ));

    let result = Arc::clone(&session).submit_answer(recording()).await;
    assert!(matches!(result, Err(SessionError::NotActive)));
    assert_eq!(backend.submit_calls.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn test_failed_submission_surfaces_error_and_allows_retry() {
    let backend = FakeBackend::behavioral(2, &[ORDINARY_REPLY]);
    let session = load_session(&backend, fast_config()).await;

    backend.fail_submission.store(true, Ordering::SeqCst);
    let result = Arc::clone(&session).submit_answer(recording()).await;
    assert!(matches!(result, Err(SessionError::Submission(_))));

    // No partial transcript, gate still open, error visible
    let snapshot = session.snapshot().await;
    assert_eq!(session.transcript().await.len(), 1);
    assert!(!snapshot.answered);
    assert!(snapshot.error.is_some());

    // Retry succeeds and clears the error
    backend.fail_submission.store(false, Ordering::SeqCst);
    submit_and_settle(&session).await;
    assert_eq!(session.progress().await, (2, 2));
    assert!(session.snapshot().await.error.is_none());
}

// ============================================================================
// Manual advance
// ============================================================================

#[tokio::test]
async fn test_manual_advance_moves_on_immediately() {
    // Long delay: the deferred verdict must not fire before the manual
    // advance, and must be stale afterwards
    let config = SessionConfig {
        display_delay: Duration::from_millis(200),
        ..SessionConfig::default()
    };
    let backend = FakeBackend::behavioral(2, &[ORDINARY_REPLY]);
    let session = load_session(&backend, config).await;

    Arc::clone(&session).submit_answer(recording()).await.unwrap();
    session.advance_manually().await.unwrap();

    assert_eq!(session.progress().await, (2, 2));

    // The stale deferred verdict fires and must change nothing
    sleep(Duration::from_millis(300)).await;
    assert_eq!(session.progress().await, (2, 2));
    assert!(matches!(
        session.phase().await,
        SessionPhase::Active { question_index: 1 }
    ));
    assert_eq!(backend.feedback_calls.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn test_manual_advance_requires_an_answer() {
    let backend = FakeBackend::behavioral(2, &[]);
    let session = load_session(&backend, fast_config()).await;

    let result = session.advance_manually().await;
    assert!(matches!(result, Err(SessionError::InvalidOperation(_))));
}

#[tokio::test]
async fn test_manual_advance_rejected_in_coding_mode() {
    let backend = FakeBackend::coding("Implement an LRU cache.");
    let session = load_session(&backend, fast_config()).await;

    let result = session.advance_manually().await;
    assert!(matches!(result, Err(SessionError::InvalidOperation(_))));
}

#[tokio::test]
async fn test_manual_advance_rejected_on_last_question() {
    let backend = FakeBackend::behavioral(1, &[ORDINARY_REPLY]);
    let session = load_session(&backend, SessionConfig {
        display_delay: Duration::from_secs(5),
        ..SessionConfig::default()
    })
    .await;

    Arc::clone(&session).submit_answer(recording()).await.unwrap();

    let result = session.advance_manually().await;
    assert!(matches!(result, Err(SessionError::InvalidOperation(_))));
}

// ============================================================================
// Feedback degradation
// ============================================================================

#[tokio::test]
async fn test_feedback_failure_still_completes_the_session() {
    let backend = FakeBackend::behavioral(1, &[ORDINARY_REPLY]);
    backend.fail_feedback.store(true, Ordering::SeqCst);
    let session = load_session(&backend, fast_config()).await;

    submit_and_settle(&session).await;

    match session.phase().await {
        SessionPhase::Completed { feedback } => assert!(feedback.is_none()),
        other => panic!("expected completed session, got {:?}", other),
    }

    let snapshot = session.snapshot().await;
    assert_eq!(snapshot.status, "completed");
    assert!(snapshot.feedback.is_none());
    assert!(!snapshot.generating_feedback);
    assert_eq!(backend.feedback_calls.load(Ordering::SeqCst), 1);
}

// ============================================================================
// Teardown
// ============================================================================

#[tokio::test]
async fn test_teardown_cancels_the_pending_outcome() {
    let config = SessionConfig {
        display_delay: Duration::from_millis(100),
        ..SessionConfig::default()
    };
    let backend = FakeBackend::behavioral(1, &[COMPLETION_REPLY]);
    let session = load_session(&backend, config).await;

    Arc::clone(&session).submit_answer(recording()).await.unwrap();
    session.teardown().await;

    // The completion (and its feedback request) never fires
    sleep(Duration::from_millis(250)).await;
    assert!(matches!(
        session.phase().await,
        SessionPhase::Active { question_index: 0 }
    ));
    assert_eq!(backend.feedback_calls.load(Ordering::SeqCst), 0);
}

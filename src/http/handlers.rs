use super::state::{AppState, SessionEntry};
use crate::audio::AnswerRecorder;
use crate::error::{CaptureError, SessionError};
use crate::session::InterviewSession;
use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Json},
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{error, info};
use uuid::Uuid;

// ============================================================================
// Request/Response Types
// ============================================================================

#[derive(Debug, Deserialize)]
pub struct StartSessionRequest {
    /// Interview to run a session for
    pub interview_id: Uuid,
}

#[derive(Debug, Serialize)]
pub struct CloseSessionResponse {
    pub interview_id: Uuid,
    pub status: String,
}

#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub code: Option<String>,
}

impl ErrorResponse {
    fn new(error: impl Into<String>) -> Self {
        Self {
            error: error.into(),
            code: None,
        }
    }
}

fn session_error_response(err: &SessionError) -> (StatusCode, Json<ErrorResponse>) {
    let status = match err {
        SessionError::LoadFailed(_) | SessionError::Submission(_) => StatusCode::BAD_GATEWAY,
        SessionError::NoQuestions => StatusCode::UNPROCESSABLE_ENTITY,
        SessionError::NotActive => StatusCode::CONFLICT,
        SessionError::InvalidOperation(_) => StatusCode::BAD_REQUEST,
    };
    (status, Json(ErrorResponse::new(err.to_string())))
}

fn capture_error_response(err: &CaptureError) -> (StatusCode, Json<ErrorResponse>) {
    let status = match err {
        CaptureError::DeviceUnavailable => StatusCode::SERVICE_UNAVAILABLE,
        CaptureError::PermissionDenied => StatusCode::FORBIDDEN,
        CaptureError::Stream(_) => StatusCode::INTERNAL_SERVER_ERROR,
    };
    (
        status,
        Json(ErrorResponse {
            error: err.to_string(),
            code: Some(err.code().to_string()),
        }),
    )
}

async fn find_entry(state: &AppState, interview_id: &Uuid) -> Option<Arc<SessionEntry>> {
    state.sessions.read().await.get(interview_id).cloned()
}

fn not_found(interview_id: &Uuid) -> (StatusCode, Json<ErrorResponse>) {
    (
        StatusCode::NOT_FOUND,
        Json(ErrorResponse::new(format!(
            "No session for interview {}",
            interview_id
        ))),
    )
}

// ============================================================================
// Handlers
// ============================================================================

/// POST /sessions
/// Load an interview and start a session for it
pub async fn start_session(
    State(state): State<AppState>,
    Json(req): Json<StartSessionRequest>,
) -> impl IntoResponse {
    info!("Starting session for interview: {}", req.interview_id);

    // Check if a session already exists
    {
        let sessions = state.sessions.read().await;
        if sessions.contains_key(&req.interview_id) {
            return (
                StatusCode::CONFLICT,
                Json(ErrorResponse::new(format!(
                    "Session for interview {} already exists",
                    req.interview_id
                ))),
            )
                .into_response();
        }
    }

    let session = match InterviewSession::load(
        Arc::clone(&state.backend),
        req.interview_id,
        state.session_config.clone(),
    )
    .await
    {
        Ok(session) => Arc::new(session),
        Err(e) => {
            error!("Failed to load session: {}", e);
            return session_error_response(&e).into_response();
        }
    };

    let entry = Arc::new(SessionEntry {
        recorder: Arc::new(AnswerRecorder::new(session.capture_config().clone())),
        session,
    });

    {
        let mut sessions = state.sessions.write().await;
        sessions.insert(req.interview_id, Arc::clone(&entry));
    }

    info!("Session started for interview: {}", req.interview_id);

    (StatusCode::CREATED, Json(entry.session.snapshot().await)).into_response()
}

/// GET /sessions/:interview_id
/// Current phase, progress, and chat status of a session
pub async fn get_session(
    State(state): State<AppState>,
    Path(interview_id): Path<Uuid>,
) -> impl IntoResponse {
    match find_entry(&state, &interview_id).await {
        Some(entry) => (StatusCode::OK, Json(entry.session.snapshot().await)).into_response(),
        None => not_found(&interview_id).into_response(),
    }
}

/// GET /sessions/:interview_id/transcript
/// Transcript of the current question's chat
pub async fn get_transcript(
    State(state): State<AppState>,
    Path(interview_id): Path<Uuid>,
) -> impl IntoResponse {
    match find_entry(&state, &interview_id).await {
        Some(entry) => (StatusCode::OK, Json(entry.session.transcript().await)).into_response(),
        None => not_found(&interview_id).into_response(),
    }
}

/// POST /sessions/:interview_id/record/start
/// Begin capturing an answer from the microphone
pub async fn start_recording(
    State(state): State<AppState>,
    Path(interview_id): Path<Uuid>,
) -> impl IntoResponse {
    let Some(entry) = find_entry(&state, &interview_id).await else {
        return not_found(&interview_id).into_response();
    };

    // Completed sessions accept no further recordings
    if entry.session.active_question().await.is_none() {
        return session_error_response(&SessionError::NotActive).into_response();
    }

    match entry.recorder.start().await {
        Ok(()) => (StatusCode::OK, Json(entry.session.snapshot().await)).into_response(),
        Err(e) => {
            error!("Failed to start recording: {}", e);
            capture_error_response(&e).into_response()
        }
    }
}

/// POST /sessions/:interview_id/record/stop
/// Finalize the capture and submit the answer
pub async fn stop_recording(
    State(state): State<AppState>,
    Path(interview_id): Path<Uuid>,
) -> impl IntoResponse {
    let Some(entry) = find_entry(&state, &interview_id).await else {
        return not_found(&interview_id).into_response();
    };

    let recording = match entry.recorder.stop().await {
        Ok(Some(recording)) => recording,
        Ok(None) => {
            return (
                StatusCode::CONFLICT,
                Json(ErrorResponse::new("No recording in progress")),
            )
                .into_response();
        }
        Err(e) => {
            error!("Failed to stop recording: {}", e);
            return capture_error_response(&e).into_response();
        }
    };

    match Arc::clone(&entry.session).submit_answer(recording).await {
        Ok(()) => (StatusCode::OK, Json(entry.session.snapshot().await)).into_response(),
        Err(e) => {
            error!("Answer submission failed: {}", e);
            session_error_response(&e).into_response()
        }
    }
}

/// POST /sessions/:interview_id/next
/// Manually advance to the next question (behavioral mode)
pub async fn next_question(
    State(state): State<AppState>,
    Path(interview_id): Path<Uuid>,
) -> impl IntoResponse {
    let Some(entry) = find_entry(&state, &interview_id).await else {
        return not_found(&interview_id).into_response();
    };

    match entry.session.advance_manually().await {
        Ok(()) => (StatusCode::OK, Json(entry.session.snapshot().await)).into_response(),
        Err(e) => session_error_response(&e).into_response(),
    }
}

/// DELETE /sessions/:interview_id
/// Tear a session down, cancelling any pending deferred actions
pub async fn close_session(
    State(state): State<AppState>,
    Path(interview_id): Path<Uuid>,
) -> impl IntoResponse {
    let entry = {
        let mut sessions = state.sessions.write().await;
        sessions.remove(&interview_id)
    };

    match entry {
        Some(entry) => {
            // Drop any in-progress capture before the session goes away
            if let Err(e) = entry.recorder.stop().await {
                error!("Failed to stop recorder during teardown: {}", e);
            }
            entry.session.teardown().await;

            info!("Session closed for interview: {}", interview_id);
            (
                StatusCode::OK,
                Json(CloseSessionResponse {
                    interview_id,
                    status: "closed".to_string(),
                }),
            )
                .into_response()
        }
        None => not_found(&interview_id).into_response(),
    }
}

/// GET /health
/// Health check endpoint
pub async fn health_check() -> impl IntoResponse {
    (StatusCode::OK, "OK")
}

use async_trait::async_trait;
use reqwest::multipart::{Form, Part};
use reqwest::Client;
use serde::de::DeserializeOwned;
use tracing::info;
use uuid::Uuid;

use super::types::{AnswerExchange, ChatMessage, Feedback, Interview, InterviewMode, QuestionRecord};
use crate::audio::AnswerRecording;
use crate::error::ApiError;

/// The interview backend as seen by the session core
///
/// Session orchestration depends on this trait, not on the HTTP client,
/// so the state machine is testable without a live backend.
#[async_trait]
pub trait InterviewBackend: Send + Sync {
    /// Fetch an interview by id
    async fn fetch_interview(&self, interview_id: Uuid) -> Result<Interview, ApiError>;

    /// Fetch the stored question list for an interview (behavioral mode)
    async fn fetch_questions(&self, interview_id: Uuid) -> Result<Vec<QuestionRecord>, ApiError>;

    /// Upload one recorded answer and return the resulting two-turn exchange
    async fn submit_answer(
        &self,
        interview_id: Uuid,
        mode: InterviewMode,
        recording: AnswerRecording,
    ) -> Result<AnswerExchange, ApiError>;

    /// Ask the backend to generate feedback for a finished interview
    async fn request_feedback(&self, interview_id: Uuid) -> Result<Feedback, ApiError>;
}

/// HTTP client for the interview backend
///
/// Base URL and bearer token are explicit constructor dependencies and are
/// attached to every call. Token absence or expiry surfaces as an ordinary
/// status error, never a special case.
pub struct BackendClient {
    client: Client,
    base_url: String,
    auth_token: String,
}

impl BackendClient {
    pub fn new(base_url: impl Into<String>, auth_token: impl Into<String>) -> Self {
        let base_url = base_url.into().trim_end_matches('/').to_string();

        Self {
            client: Client::new(),
            base_url,
            auth_token: auth_token.into(),
        }
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    async fn get_json<T: DeserializeOwned>(&self, path: &str) -> Result<T, ApiError> {
        let response = self
            .client
            .get(self.url(path))
            .bearer_auth(&self.auth_token)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            return Err(ApiError::Status(status));
        }

        Ok(response.json().await?)
    }
}

#[async_trait]
impl InterviewBackend for BackendClient {
    async fn fetch_interview(&self, interview_id: Uuid) -> Result<Interview, ApiError> {
        info!("Fetching interview {}", interview_id);
        self.get_json(&format!("/interviews/{}", interview_id)).await
    }

    async fn fetch_questions(&self, interview_id: Uuid) -> Result<Vec<QuestionRecord>, ApiError> {
        info!("Fetching questions for interview {}", interview_id);
        self.get_json(&format!("/questions/?interview_id={}", interview_id))
            .await
    }

    async fn submit_answer(
        &self,
        interview_id: Uuid,
        mode: InterviewMode,
        recording: AnswerRecording,
    ) -> Result<AnswerExchange, ApiError> {
        let path = match mode {
            InterviewMode::Coding => format!("/interviews/{}/chat/coding", interview_id),
            InterviewMode::Behavioral => format!("/interviews/{}/chat", interview_id),
        };

        info!(
            "Submitting answer for interview {} ({:.1}s of audio, mode={})",
            interview_id,
            recording.duration_secs,
            mode.as_str()
        );

        let part = Part::bytes(recording.wav)
            .file_name("answer.wav")
            .mime_str("audio/wav")?;
        let form = Form::new().part("file", part);

        let response = self
            .client
            .post(self.url(&path))
            .bearer_auth(&self.auth_token)
            .multipart(form)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            return Err(ApiError::Status(status));
        }

        let turns: Vec<ChatMessage> = response.json().await?;
        AnswerExchange::from_turns(turns)
    }

    async fn request_feedback(&self, interview_id: Uuid) -> Result<Feedback, ApiError> {
        info!("Requesting feedback for interview {}", interview_id);

        let response = self
            .client
            .post(self.url(&format!("/interviews/{}/feedback", interview_id)))
            .bearer_auth(&self.auth_token)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            return Err(ApiError::Status(status));
        }

        Ok(response.json().await?)
    }
}

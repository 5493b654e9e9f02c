//! Question generation endpoints

use std::sync::Arc;

use axum::extract::State;
use axum::routing::post;
use axum::{Json, Router};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::{ApiError, ApiState};
use crate::question::InterviewSetup;

/// Cap on batch generation
const MAX_BATCH: usize = 5;

/// Build the question router
pub fn router(state: Arc<ApiState>) -> Router {
    Router::new()
        .route("/api/generate", post(generate))
        .route("/api/question/next", post(next_question))
        .route("/api/question/followup", post(follow_up))
        .with_state(state)
}

/// Common question request fields
#[derive(Debug, Deserialize)]
pub struct QuestionRequest {
    #[serde(default)]
    pub role: String,
    #[serde(default)]
    pub track: String,
    #[serde(default)]
    pub level: String,
    #[serde(default)]
    pub language: String,
    #[serde(default)]
    pub session_id: String,
    #[serde(default)]
    pub recent_questions: Vec<String>,
    /// Batch size; only `/api/generate` honors it
    #[serde(default)]
    pub count: Option<usize>,
    /// Previous question; only follow-up requires it
    #[serde(default)]
    pub question: String,
    /// Candidate answer; only follow-up requires it
    #[serde(default)]
    pub answer: String,
}

impl QuestionRequest {
    /// Validate and convert into an [`InterviewSetup`]
    pub(super) fn setup(&self) -> Result<InterviewSetup, ApiError> {
        if self.role.trim().is_empty() || self.track.trim().is_empty() || self.level.trim().is_empty()
        {
            return Err(ApiError::BadRequest(
                "role, track, and level are required".to_string(),
            ));
        }
        let track = self
            .track
            .parse()
            .map_err(|e: crate::Error| ApiError::BadRequest(e.to_string()))?;
        let level = self
            .level
            .parse()
            .map_err(|e: crate::Error| ApiError::BadRequest(e.to_string()))?;
        let language = self
            .language
            .parse()
            .map_err(|e: crate::Error| ApiError::BadRequest(e.to_string()))?;

        // Anonymous callers get a throwaway session with no cross-request
        // memory, matching the client contract for a missing session id.
        let session_id = if self.session_id.trim().is_empty() {
            format!("anon-{}", Uuid::new_v4())
        } else {
            self.session_id.trim().to_string()
        };

        Ok(InterviewSetup {
            role: self.role.trim().to_string(),
            track,
            level,
            language,
            session_id,
        })
    }
}

/// Batch question response
#[derive(Debug, Serialize)]
pub struct GenerateResponse {
    pub questions: Vec<String>,
}

/// Single question response
#[derive(Debug, Serialize)]
pub struct QuestionResponse {
    pub question: String,
    #[serde(rename = "type")]
    pub kind: &'static str,
}

async fn generate(
    State(state): State<Arc<ApiState>>,
    Json(request): Json<QuestionRequest>,
) -> Result<Json<GenerateResponse>, ApiError> {
    let setup = request.setup()?;
    let count = request.count.unwrap_or(1).clamp(1, MAX_BATCH);

    let mut questions = Vec::with_capacity(count);
    for _ in 0..count {
        // Session memory records each accepted question, so consecutive
        // calls avoid each other without extra plumbing.
        let question = state
            .coach
            .next_question(&setup, &request.recent_questions)
            .await?;
        questions.push(question);
    }

    prune_sessions(&state);
    Ok(Json(GenerateResponse { questions }))
}

async fn next_question(
    State(state): State<Arc<ApiState>>,
    Json(request): Json<QuestionRequest>,
) -> Result<Json<QuestionResponse>, ApiError> {
    let setup = request.setup()?;
    let question = state
        .coach
        .next_question(&setup, &request.recent_questions)
        .await?;

    prune_sessions(&state);
    Ok(Json(QuestionResponse {
        question,
        kind: "next",
    }))
}

async fn follow_up(
    State(state): State<Arc<ApiState>>,
    Json(request): Json<QuestionRequest>,
) -> Result<Json<QuestionResponse>, ApiError> {
    let setup = request.setup()?;
    if request.answer.trim().is_empty() {
        return Err(ApiError::BadRequest("answer is required".to_string()));
    }
    let question = if request.question.trim().is_empty() {
        state
            .sessions
            .get(&setup.session_id)
            .ok()
            .flatten()
            .and_then(|s| s.last_question)
            .ok_or_else(|| ApiError::BadRequest("question is required for follow-up".to_string()))?
    } else {
        request.question.trim().to_string()
    };

    let follow_up = state
        .coach
        .follow_up(&setup, &question, &request.answer)
        .await?;

    prune_sessions(&state);
    Ok(Json(QuestionResponse {
        question: follow_up,
        kind: "followup",
    }))
}

/// Best-effort LRU prune after writes
fn prune_sessions(state: &ApiState) {
    if let Err(e) = state.sessions.prune(state.session_limit) {
        tracing::warn!(error = %e, "session prune failed");
    }
}

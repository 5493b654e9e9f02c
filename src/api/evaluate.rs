//! Answer evaluation and sample answer endpoints

use std::sync::Arc;

use axum::extract::State;
use axum::routing::post;
use axum::{Json, Router};
use serde::{Deserialize, Serialize};

use super::questions::QuestionRequest;
use super::{ApiError, ApiState};

/// Build the evaluation router
pub fn router(state: Arc<ApiState>) -> Router {
    Router::new()
        .route("/api/evaluate", post(evaluate))
        .route("/api/answer", post(sample_answer))
        .with_state(state)
}

/// Evaluation response
#[derive(Debug, Serialize)]
pub struct EvaluateResponse {
    pub score: u8,
    pub feedback: String,
    #[serde(skip_serializing_if = "std::ops::Not::not")]
    pub fallback: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub detail: Option<String>,
}

/// Sample answer response
#[derive(Debug, Serialize)]
pub struct AnswerResponse {
    pub answer: String,
}

/// Evaluation request: the question fields plus the candidate answer
#[derive(Debug, Deserialize)]
pub struct EvaluateRequest {
    #[serde(flatten)]
    pub question: QuestionRequest,
}

async fn evaluate(
    State(state): State<Arc<ApiState>>,
    Json(request): Json<EvaluateRequest>,
) -> Result<Json<EvaluateResponse>, ApiError> {
    let setup = request.question.setup()?;
    let answer = request.question.answer.trim();
    if answer.is_empty() {
        return Err(ApiError::BadRequest("answer is required".to_string()));
    }
    let question = request.question.question.trim();

    let evaluation = state.coach.evaluate(&setup, question, answer).await?;
    let detail = evaluation
        .fallback
        .then(|| "LLM feedback unavailable; local fallback evaluation used.".to_string());

    Ok(Json(EvaluateResponse {
        score: evaluation.score,
        feedback: evaluation.feedback,
        fallback: evaluation.fallback,
        detail,
    }))
}

async fn sample_answer(
    State(state): State<Arc<ApiState>>,
    Json(request): Json<EvaluateRequest>,
) -> Result<Json<AnswerResponse>, ApiError> {
    let setup = request.question.setup()?;
    let question = request.question.question.trim();
    if question.is_empty() {
        return Err(ApiError::BadRequest("question is required".to_string()));
    }

    let answer = state.coach.sample_answer(&setup, question).await?;
    Ok(Json(AnswerResponse { answer }))
}

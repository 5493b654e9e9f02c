//! HTTP API server for the Atlas studio
//!
//! Mirrors the studio client contract: question generation, evaluation,
//! sample answers, speech synthesis/transcription proxies, media upload,
//! and health.

pub mod evaluate;
pub mod health;
pub mod questions;
pub mod upload;
pub mod voice;

use std::path::PathBuf;
use std::sync::Arc;

use axum::Json;
use axum::Router;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde::Serialize;
use tokio::net::TcpListener;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use crate::db::SessionRepo;
use crate::question::InterviewCoach;
use crate::speech::{SpeechSynthesizer, SpeechTranscriber};
use crate::{Error, Result};

/// Shared state for API handlers
pub struct ApiState {
    /// Question/evaluation service
    pub coach: Arc<InterviewCoach>,
    /// Session store (for pruning)
    pub sessions: SessionRepo,
    /// TTS client; `None` when the speech service is unconfigured
    pub synthesizer: Option<Arc<SpeechSynthesizer>>,
    /// STT client; `None` when the speech service is unconfigured
    pub transcriber: Option<Arc<SpeechTranscriber>>,
    /// Directory for uploaded interview recordings
    pub uploads_dir: PathBuf,
    /// Maximum sessions kept before pruning
    pub session_limit: usize,
}

/// Build the full API router
#[must_use]
pub fn router(state: Arc<ApiState>) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .merge(questions::router(Arc::clone(&state)))
        .merge(evaluate::router(Arc::clone(&state)))
        .merge(voice::router(Arc::clone(&state)))
        .merge(upload::router(state))
        .merge(health::router())
        .layer(cors)
        .layer(TraceLayer::new_for_http())
}

/// The API server
pub struct ApiServer {
    state: Arc<ApiState>,
    port: u16,
}

impl ApiServer {
    /// Create a server for a state and port
    #[must_use]
    pub const fn new(state: Arc<ApiState>, port: u16) -> Self {
        Self { state, port }
    }

    /// Run the API server
    ///
    /// # Errors
    ///
    /// Returns error if the server fails to bind or run
    pub async fn run(self) -> Result<()> {
        let addr = format!("0.0.0.0:{}", self.port);
        let listener = TcpListener::bind(&addr)
            .await
            .map_err(|e| Error::Config(format!("failed to bind API server: {e}")))?;

        tracing::info!(port = self.port, "API server listening");

        axum::serve(listener, router(self.state))
            .await
            .map_err(|e| Error::Config(format!("API server error: {e}")))?;

        Ok(())
    }

    /// Run the API server in a background task
    #[must_use]
    pub fn spawn(self) -> tokio::task::JoinHandle<Result<()>> {
        tokio::spawn(async move { self.run().await })
    }
}

/// API error with a JSON body and mapped status code
#[derive(Debug)]
pub enum ApiError {
    BadRequest(String),
    NotConfigured(String),
    RateLimited(String),
    Timeout(String),
    Upstream(String),
    Internal(String),
}

impl From<Error> for ApiError {
    fn from(error: Error) -> Self {
        match error {
            Error::Unconfigured(msg) => Self::NotConfigured(msg),
            Error::RateLimited(msg) => Self::RateLimited(msg),
            Error::Timeout(msg) => Self::Timeout(msg),
            Error::Upstream(msg) => Self::Upstream(msg),
            Error::Config(msg) | Error::Question(msg) => Self::BadRequest(msg),
            other => Self::Internal(other.to_string()),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        #[derive(Serialize)]
        struct ErrorResponse {
            error: ErrorBody,
        }

        #[derive(Serialize)]
        struct ErrorBody {
            code: &'static str,
            message: String,
        }

        let (status, code, message) = match self {
            Self::BadRequest(msg) => (StatusCode::BAD_REQUEST, "bad_request", msg),
            Self::NotConfigured(msg) => (StatusCode::SERVICE_UNAVAILABLE, "not_configured", msg),
            Self::RateLimited(msg) => (StatusCode::TOO_MANY_REQUESTS, "rate_limited", msg),
            Self::Timeout(msg) => (StatusCode::GATEWAY_TIMEOUT, "timed_out", msg),
            Self::Upstream(msg) => (StatusCode::BAD_GATEWAY, "upstream_error", msg),
            Self::Internal(msg) => (StatusCode::INTERNAL_SERVER_ERROR, "internal_error", msg),
        };

        (
            status,
            Json(ErrorResponse {
                error: ErrorBody { code, message },
            }),
        )
            .into_response()
    }
}

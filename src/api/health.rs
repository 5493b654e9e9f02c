//! Health endpoint

use axum::routing::get;
use axum::{Json, Router};
use serde::Serialize;

/// Health response
#[derive(Debug, Serialize)]
pub struct Health {
    pub status: &'static str,
}

/// Build the health router
#[must_use]
pub fn router() -> Router {
    Router::new().route("/api/health", get(health))
}

async fn health() -> Json<Health> {
    Json(Health { status: "ok" })
}

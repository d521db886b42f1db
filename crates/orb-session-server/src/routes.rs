//! HTTP routes.

use std::sync::Arc;

use axum::extract::State;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::post;
use axum::{Json, Router};
use tracing::{error, info};

use crate::mint::SessionMinter;

pub const SESSION_PATH: &str = "/api/session";

pub fn router(minter: Arc<SessionMinter>) -> Router {
    Router::new()
        .route(SESSION_PATH, post(create_session))
        .with_state(minter)
}

/// POST /api/session: mint a session and return the upstream JSON.
async fn create_session(State(minter): State<Arc<SessionMinter>>) -> Response {
    match minter.mint().await {
        Ok(session) => {
            info!(id = ?session.get("id"), "Session minted");
            Json(session).into_response()
        }
        Err(e) => {
            error!(error = %e, "Failed to mint session");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(serde_json::json!({ "error": "Failed to fetch session data" })),
            )
                .into_response()
        }
    }
}

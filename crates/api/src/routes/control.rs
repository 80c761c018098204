//! Detection Control Routes

use axum::{extract::State, Json};
use dms::DrowsinessState;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use crate::AppState;

/// Acknowledgement for control requests
#[derive(Debug, Serialize, Deserialize)]
pub struct MessageResponse {
    pub message: String,
}

impl MessageResponse {
    fn new(message: &str) -> Self {
        Self {
            message: message.to_string(),
        }
    }
}

/// Start a detection session. Camera errors surface later through `/status`.
pub async fn start_detection(State(state): State<Arc<AppState>>) -> Json<MessageResponse> {
    state.session.start().await;
    Json(MessageResponse::new("Detection started"))
}

/// Stop the active session, if any
pub async fn stop_detection(State(state): State<Arc<AppState>>) -> Json<MessageResponse> {
    state.session.stop();
    Json(MessageResponse::new("Detection stopped"))
}

/// Latest published driver state
pub async fn get_status(State(state): State<Arc<AppState>>) -> Json<DrowsinessState> {
    Json(state.session.status())
}

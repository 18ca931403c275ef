//! src/api/handlers.rs
//!
//! The six axum handlers behind `ApiServer`'s router (spec.md §6).

use axum::extract::State;
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::Json;
use serde::Serialize;

use super::ApiState;
use crate::domain::ClientMessage;

pub async fn get_message(State(state): State<ApiState>) -> impl IntoResponse {
    Json(state.snapshot().messages)
}

pub async fn post_message(
    State(state): State<ApiState>,
    Json(msg): Json<ClientMessage>,
) -> impl IntoResponse {
    match state.forward(&msg).await {
        Ok(()) => StatusCode::OK,
        Err(e) => {
            tracing::warn!(error = %e, "failed to forward admin message");
            StatusCode::BAD_REQUEST
        }
    }
}

pub async fn get_node(State(state): State<ApiState>) -> impl IntoResponse {
    Json(state.snapshot().peers)
}

pub async fn post_node(State(state): State<ApiState>, body: String) -> impl IntoResponse {
    let addr = body.trim();
    if addr.parse::<std::net::SocketAddr>().is_err() {
        return StatusCode::BAD_REQUEST;
    }
    let msg = ClientMessage {
        peer: Some(addr.to_string()),
        ..Default::default()
    };
    match state.forward(&msg).await {
        Ok(()) => StatusCode::OK,
        Err(e) => {
            tracing::warn!(error = %e, "failed to forward new peer");
            StatusCode::BAD_REQUEST
        }
    }
}

pub async fn get_destination(State(state): State<ApiState>) -> impl IntoResponse {
    Json(state.snapshot().destinations)
}

#[derive(Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct FileEntry {
    name: String,
    hash: String,
}

pub async fn get_file(State(state): State<ApiState>) -> impl IntoResponse {
    let files: Vec<FileEntry> = state
        .snapshot()
        .files
        .into_iter()
        .map(|(name, hash)| FileEntry { name, hash })
        .collect();
    Json(files)
}

pub async fn get_id(State(state): State<ApiState>) -> impl IntoResponse {
    state.snapshot().name
}

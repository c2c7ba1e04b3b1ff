//! Router assembly.
//!
//! SYSTEM CONTEXT
//! ==============
//! The relay exposes one websocket per board plus a board-creation endpoint
//! and a health probe. Everything a client does to elements goes over the
//! websocket.

pub mod ws;

use axum::Router;
use axum::extract::State;
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::routing::{get, post};
use axum::Json;
use serde::Serialize;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use uuid::Uuid;

use crate::state::AppState;

#[cfg(test)]
#[path = "mod_test.rs"]
mod tests;

pub fn app(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/api/boards", post(create_board))
        .route("/api/boards/{id}/ws", get(ws::handle_ws))
        .route("/healthz", get(healthz))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

#[derive(Debug, Serialize)]
struct CreatedBoard {
    id: Uuid,
}

async fn create_board(State(state): State<AppState>) -> impl IntoResponse {
    let id = state.store.create_board().await;
    (StatusCode::CREATED, Json(CreatedBoard { id }))
}

async fn healthz() -> StatusCode {
    StatusCode::OK
}

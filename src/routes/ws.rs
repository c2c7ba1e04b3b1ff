//! WebSocket handler — per-board element relay.
//!
//! DESIGN
//! ======
//! On upgrade the connection is already subscribed to its board, then it
//! enters a `select!` loop:
//! - Incoming client frames → decode the element write → apply to the store
//!   → reply `done` or a structured `error` to the sender
//! - Board feed events → encode as `element:*` frames → forward to client
//!
//! The sender's own writes come back to it through the feed like everyone
//! else's, so the reply carries only what the feed cannot (the new id).
//!
//! LIFECYCLE
//! =========
//! 1. Upgrade: subscribe (404 for unknown boards), snapshot is sent first
//! 2. Client frames → reply; feed events → forward
//! 3. Close, socket error, or feed end (slow client) → unsubscribe

use axum::extract::ws::{Message, WebSocket, WebSocketUpgrade};
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use tracing::{error, info, warn};
use uuid::Uuid;

use crate::frame::{Data, FRAME_CODE, FRAME_MESSAGE, Frame, Status};
use crate::state::AppState;
use crate::store::{RemoteStore, StoreError, Subscription};
use crate::wire::{self, WriteRequest};

#[cfg(test)]
#[path = "ws_test.rs"]
mod tests;

// =============================================================================
// UPGRADE
// =============================================================================

pub async fn handle_ws(State(state): State<AppState>, Path(board_id): Path<Uuid>, ws: WebSocketUpgrade) -> Response {
    let sub = match state.store.subscribe(board_id).await {
        Ok(sub) => sub,
        Err(StoreError::BoardNotFound(_)) => return (StatusCode::NOT_FOUND, "board not found").into_response(),
        Err(e) => {
            error!(%board_id, error = %e, "ws: subscribe failed");
            return (StatusCode::INTERNAL_SERVER_ERROR, "subscribe failed").into_response();
        }
    };

    ws.on_upgrade(move |socket| run_ws(socket, state, board_id, sub))
}

// =============================================================================
// CONNECTION
// =============================================================================

async fn run_ws(mut socket: WebSocket, state: AppState, board_id: Uuid, mut sub: Subscription) {
    let client_id = Uuid::new_v4();
    info!(%client_id, %board_id, "ws: client connected");

    loop {
        tokio::select! {
            msg = socket.recv() => {
                let Some(Ok(msg)) = msg else { break };
                match msg {
                    Message::Text(text) => {
                        let reply = process_inbound_text(&state, board_id, client_id, text.as_str()).await;
                        if send_frame(&mut socket, &reply).await.is_err() {
                            break;
                        }
                    }
                    Message::Close(_) => break,
                    _ => {}
                }
            }
            event = sub.next() => {
                let Some(event) = event else {
                    warn!(%client_id, %board_id, "ws: board feed ended; disconnecting");
                    break;
                };
                match wire::event_frame(board_id, &event) {
                    Ok(frame) => {
                        if send_frame(&mut socket, &frame).await.is_err() {
                            break;
                        }
                    }
                    Err(e) => warn!(%client_id, error = %e, "ws: failed to encode feed event"),
                }
            }
        }
    }

    sub.close();
    info!(%client_id, %board_id, "ws: client disconnected");
}

// =============================================================================
// FRAME DISPATCH
// =============================================================================

/// Parse and apply one inbound text frame and return the reply for the sender.
async fn process_inbound_text(state: &AppState, board_id: Uuid, client_id: Uuid, text: &str) -> Frame {
    let req: Frame = match serde_json::from_str(text) {
        Ok(r) => r,
        Err(e) => {
            warn!(%client_id, error = %e, "ws: invalid inbound frame");
            return Frame::request("gateway:error", Data::new())
                .with_board_id(board_id)
                .with_data(FRAME_MESSAGE, format!("invalid json: {e}"));
        }
    };
    info!(%client_id, id = %req.id, syscall = %req.syscall, "ws: recv frame");

    if req.prefix() != "element" {
        return req.error(format!("unknown prefix: {}", req.prefix()));
    }
    let write = match wire::decode_request(&req) {
        Ok(write) => write,
        Err(e) => return req.error_from(&e),
    };

    match apply_write(state, board_id, write).await {
        Ok(data) => req.done_with(data),
        Err(e) => req.error_from(&e),
    }
}

async fn apply_write(state: &AppState, board_id: Uuid, write: WriteRequest) -> Result<Data, StoreError> {
    match write {
        WriteRequest::Create { payload, owner_id } => {
            let id = state.store.create_element(board_id, payload, &owner_id).await?;
            Ok(wire::created_reply(&id))
        }
        WriteRequest::Update { id, payload } => {
            state.store.update_element_payload(board_id, &id, payload).await?;
            Ok(Data::new())
        }
        WriteRequest::Delete { id } => {
            state.store.delete_element(board_id, &id).await?;
            Ok(Data::new())
        }
    }
}

// =============================================================================
// SEND
// =============================================================================

async fn send_frame(socket: &mut WebSocket, frame: &Frame) -> Result<(), ()> {
    let json = match serde_json::to_string(frame) {
        Ok(j) => j,
        Err(e) => {
            warn!(error = %e, "ws: failed to serialize frame");
            return Err(());
        }
    };
    if frame.status == Status::Error {
        let code = frame.str_field(FRAME_CODE).unwrap_or("-");
        let message = frame.str_field(FRAME_MESSAGE).unwrap_or("-");
        warn!(id = %frame.id, syscall = %frame.syscall, code, message, "ws: send frame status=Error");
    } else {
        info!(id = %frame.id, syscall = %frame.syscall, status = ?frame.status, "ws: send frame");
    }
    socket.send(Message::Text(json.into())).await.map_err(|e| {
        warn!(error = %e, "ws: send failed");
    })
}

//! Websocket client for a relay-hosted store.
//!
//! DESIGN
//! ======
//! Every `subscribe` opens its own socket to `/api/boards/{id}/ws`. A pump
//! task decodes feed frames into the subscription's channel; it stops when
//! the socket ends or the subscription is dropped, which ends the feed.
//!
//! Writes share one lazily opened socket per board. A single writer task
//! owns it: requests go out in the order they were handed over, and
//! terminal replies are matched back to callers by `parent_id`. Feed frames
//! that also arrive on that socket are ignored. When the socket ends, every
//! unanswered caller gets `Closed`; the next write opens a fresh socket.

use std::collections::HashMap;

use canvas::element::{ElementId, Payload};
use futures_util::{SinkExt, StreamExt};
use tokio::net::TcpStream;
use tokio::sync::{Mutex, mpsc, oneshot};
use tokio_tungstenite::tungstenite::{self, Message};
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream, connect_async};
use tracing::{debug, info, warn};
use uuid::Uuid;

use super::{RemoteStore, StoreError, Subscription};
use crate::config::Config;
use crate::frame::{FRAME_CODE, FRAME_MESSAGE, Frame, Status};
use crate::wire::{self, WriteRequest};

#[cfg(test)]
#[path = "ws_test.rs"]
mod tests;

type WsStream = WebSocketStream<MaybeTlsStream<TcpStream>>;

/// A request handed to a board's writer task.
struct Outbound {
    frame: Frame,
    reply: oneshot::Sender<Result<Frame, StoreError>>,
}

pub struct WsStore {
    base_url: String,
    writers: Mutex<HashMap<Uuid, mpsc::Sender<Outbound>>>,
    subscriber_capacity: usize,
    outbox_capacity: usize,
}

impl WsStore {
    /// Client for the relay at `base_url`, e.g. `ws://127.0.0.1:3000`.
    #[must_use]
    pub fn new(base_url: impl Into<String>, config: &Config) -> Self {
        let base_url = base_url.into().trim_end_matches('/').to_owned();
        Self {
            base_url,
            writers: Mutex::new(HashMap::new()),
            subscriber_capacity: config.subscriber_channel_capacity,
            outbox_capacity: config.outbox_channel_capacity,
        }
    }

    fn board_url(&self, board: Uuid) -> String {
        format!("{}/api/boards/{board}/ws", self.base_url)
    }

    async fn open(&self, board: Uuid) -> Result<WsStream, StoreError> {
        match connect_async(self.board_url(board)).await {
            Ok((stream, _)) => Ok(stream),
            Err(tungstenite::Error::Http(resp)) if resp.status().as_u16() == 404 => Err(StoreError::BoardNotFound(board)),
            Err(e) => Err(StoreError::Transport(e.to_string())),
        }
    }

    /// The board's writer channel, opening the socket if none is live.
    ///
    /// The connect runs outside the `writers` lock so a slow board cannot
    /// hold up writes to the others. If two callers race to open the same
    /// board, the first writer registered wins and the spare socket is closed.
    async fn writer(&self, board: Uuid) -> Result<mpsc::Sender<Outbound>, StoreError> {
        if let Some(tx) = self.live_writer(board).await {
            return Ok(tx);
        }

        let mut stream = self.open(board).await?;

        let mut writers = self.writers.lock().await;
        let raced = writers.get(&board).filter(|tx| !tx.is_closed()).cloned();
        if let Some(tx) = raced {
            drop(writers);
            if let Err(e) = stream.close(None).await {
                debug!(board_id = %board, error = %e, "ws store: closing spare writer socket failed");
            }
            return Ok(tx);
        }
        let (tx, rx) = mpsc::channel(self.outbox_capacity);
        tokio::spawn(run_writer(board, stream, rx));
        writers.insert(board, tx.clone());
        Ok(tx)
    }

    async fn live_writer(&self, board: Uuid) -> Option<mpsc::Sender<Outbound>> {
        let writers = self.writers.lock().await;
        writers.get(&board).filter(|tx| !tx.is_closed()).cloned()
    }

    async fn request(&self, board: Uuid, req: &WriteRequest) -> Result<Frame, StoreError> {
        let frame = wire::request_frame(board, req).map_err(|e| StoreError::Transport(e.to_string()))?;
        let writer = self.writer(board).await?;

        let (reply_tx, reply_rx) = oneshot::channel();
        writer
            .send(Outbound { frame, reply: reply_tx })
            .await
            .map_err(|_| StoreError::Closed)?;
        let reply = reply_rx.await.map_err(|_| StoreError::Closed)??;

        match reply.status {
            Status::Done => Ok(reply),
            _ => Err(rejection(&reply)),
        }
    }
}

#[async_trait::async_trait]
impl RemoteStore for WsStore {
    async fn subscribe(&self, board: Uuid) -> Result<Subscription, StoreError> {
        let stream = self.open(board).await?;
        let (tx, rx) = mpsc::channel(self.subscriber_capacity);
        let pump = tokio::spawn(run_feed(board, stream, tx));
        info!(board_id = %board, "ws store: subscribed");
        Ok(Subscription::new(board, Vec::new(), rx).with_pump(pump))
    }

    async fn create_element(&self, board: Uuid, payload: Payload, owner_id: &str) -> Result<ElementId, StoreError> {
        let reply = self.request(board, &WriteRequest::Create { payload, owner_id: owner_id.to_owned() }).await?;
        wire::created_id(&reply).map_err(|e| StoreError::Transport(e.to_string()))
    }

    async fn update_element_payload(&self, board: Uuid, id: &ElementId, payload: Payload) -> Result<(), StoreError> {
        self.request(board, &WriteRequest::Update { id: id.clone(), payload }).await?;
        Ok(())
    }

    async fn delete_element(&self, board: Uuid, id: &ElementId) -> Result<(), StoreError> {
        self.request(board, &WriteRequest::Delete { id: id.clone() }).await?;
        Ok(())
    }
}

// =============================================================================
// TASKS
// =============================================================================

async fn run_feed(board: Uuid, mut stream: WsStream, tx: mpsc::Sender<canvas::doc::ChangeEvent>) {
    while let Some(msg) = stream.next().await {
        let text = match msg {
            Ok(Message::Text(text)) => text,
            Ok(Message::Close(_)) => break,
            Ok(_) => continue,
            Err(e) => {
                warn!(board_id = %board, error = %e, "ws store: feed socket error");
                break;
            }
        };
        let Some(frame) = parse_frame(text.as_str()) else { continue };
        if frame.status != Status::Request {
            continue;
        }
        match wire::decode_event(&frame) {
            Ok(event) => {
                if tx.send(event).await.is_err() {
                    break;
                }
            }
            Err(e) => warn!(board_id = %board, syscall = %frame.syscall, error = %e, "ws store: undecodable feed frame"),
        }
    }
    debug!(board_id = %board, "ws store: feed ended");
}

async fn run_writer(board: Uuid, mut stream: WsStream, mut rx: mpsc::Receiver<Outbound>) {
    let mut pending: HashMap<Uuid, oneshot::Sender<Result<Frame, StoreError>>> = HashMap::new();

    loop {
        tokio::select! {
            out = rx.recv() => {
                let Some(Outbound { frame, reply }) = out else { break };
                let json = match serde_json::to_string(&frame) {
                    Ok(json) => json,
                    Err(e) => {
                        let _ = reply.send(Err(StoreError::Transport(e.to_string())));
                        continue;
                    }
                };
                if let Err(e) = stream.send(Message::Text(json.into())).await {
                    let _ = reply.send(Err(StoreError::Transport(e.to_string())));
                    break;
                }
                pending.insert(frame.id, reply);
            }
            msg = stream.next() => {
                let text = match msg {
                    Some(Ok(Message::Text(text))) => text,
                    Some(Ok(Message::Close(_)) | Err(_)) | None => break,
                    Some(Ok(_)) => continue,
                };
                let Some(frame) = parse_frame(text.as_str()) else { continue };
                if !frame.status.is_terminal() {
                    continue;
                }
                let Some(reply) = frame.parent_id.and_then(|parent| pending.remove(&parent)) else { continue };
                let _ = reply.send(Ok(frame));
            }
        }
    }

    for (_, reply) in pending.drain() {
        let _ = reply.send(Err(StoreError::Closed));
    }
    debug!(board_id = %board, "ws store: writer closed");
}

// =============================================================================
// HELPERS
// =============================================================================

fn parse_frame(text: &str) -> Option<Frame> {
    match serde_json::from_str(text) {
        Ok(frame) => Some(frame),
        Err(e) => {
            warn!(error = %e, "ws store: invalid frame from relay");
            None
        }
    }
}

fn rejection(reply: &Frame) -> StoreError {
    StoreError::Rejected {
        code: reply.str_field(FRAME_CODE).unwrap_or("-").to_owned(),
        message: reply.str_field(FRAME_MESSAGE).unwrap_or("-").to_owned(),
    }
}

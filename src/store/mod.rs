//! Remote store contract for whiteboard elements.
//!
//! DESIGN
//! ======
//! A whiteboard is a thin view over a hosted real-time document store. The
//! store owns durable ids and timestamps and is the only point where edits
//! from different clients are serialized. Clients talk to it through
//! [`RemoteStore`]:
//!
//! - `subscribe` yields a [`Subscription`]: the current elements as `Added`
//!   events, then live `Added | Modified | Removed` events in store order.
//! - `create_element` assigns the durable id and returns it.
//! - `update_element_payload` replaces a payload; the variant never changes.
//! - `delete_element` removes one element. Connections that reference it are
//!   left in place.
//!
//! [`MemoryStore`] hosts boards in-process (the relay server uses it).
//! [`WsStore`] reaches a relay over a websocket.

pub mod memory;
pub mod ws;

use std::collections::VecDeque;

use canvas::doc::ChangeEvent;
use canvas::element::{ElementId, ElementKind, ModelError, Payload};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use uuid::Uuid;

use crate::frame::ErrorCode;

pub use memory::MemoryStore;
pub use ws::WsStore;

// =============================================================================
// ERRORS
// =============================================================================

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("board not found: {0}")]
    BoardNotFound(Uuid),
    #[error("element not found: {0}")]
    ElementNotFound(ElementId),
    #[error("variant mismatch for {id}: stored {existing:?}, got {incoming:?}")]
    VariantMismatch { id: ElementId, existing: ElementKind, incoming: ElementKind },
    #[error(transparent)]
    Invalid(#[from] ModelError),
    #[error("transport error: {0}")]
    Transport(String),
    #[error("rejected by store ({code}): {message}")]
    Rejected { code: String, message: String },
    #[error("store connection closed")]
    Closed,
}

impl ErrorCode for StoreError {
    fn error_code(&self) -> &'static str {
        match self {
            Self::BoardNotFound(_) => "E_BOARD_NOT_FOUND",
            Self::ElementNotFound(_) => "E_ELEMENT_NOT_FOUND",
            Self::VariantMismatch { .. } => "E_VARIANT_MISMATCH",
            Self::Invalid(_) => "E_INVALID_PAYLOAD",
            Self::Transport(_) => "E_TRANSPORT",
            Self::Rejected { .. } => "E_REJECTED",
            Self::Closed => "E_CLOSED",
        }
    }

    fn retryable(&self) -> bool {
        matches!(self, Self::Transport(_))
    }
}

// =============================================================================
// CONTRACT
// =============================================================================

#[async_trait::async_trait]
pub trait RemoteStore: Send + Sync {
    /// Open a change feed for `board`: a snapshot followed by live events.
    async fn subscribe(&self, board: Uuid) -> Result<Subscription, StoreError>;

    /// Durably create an element and return its store-assigned id.
    async fn create_element(&self, board: Uuid, payload: Payload, owner_id: &str) -> Result<ElementId, StoreError>;

    /// Replace an element's payload. The variant must match the stored one.
    async fn update_element_payload(&self, board: Uuid, id: &ElementId, payload: Payload) -> Result<(), StoreError>;

    async fn delete_element(&self, board: Uuid, id: &ElementId) -> Result<(), StoreError>;
}

// =============================================================================
// SUBSCRIPTION
// =============================================================================

/// One open change feed.
///
/// Dropping it unsubscribes. `next` returns `None` once the feed has ended,
/// either because the store went away or because it was closed here.
#[derive(Debug)]
pub struct Subscription {
    board: Uuid,
    snapshot: VecDeque<ChangeEvent>,
    rx: mpsc::Receiver<ChangeEvent>,
    pump: Option<JoinHandle<()>>,
}

impl Subscription {
    pub(crate) fn new(board: Uuid, snapshot: Vec<ChangeEvent>, rx: mpsc::Receiver<ChangeEvent>) -> Self {
        Self { board, snapshot: snapshot.into(), rx, pump: None }
    }

    /// Tie a background feeder task to this subscription's lifetime.
    pub(crate) fn with_pump(mut self, pump: JoinHandle<()>) -> Self {
        self.pump = Some(pump);
        self
    }

    #[must_use]
    pub fn board(&self) -> Uuid {
        self.board
    }

    /// Next event: snapshot entries first, then live events.
    pub async fn next(&mut self) -> Option<ChangeEvent> {
        if let Some(event) = self.snapshot.pop_front() {
            return Some(event);
        }
        self.rx.recv().await
    }

    /// Stop the feed. Events already buffered are discarded.
    pub fn close(&mut self) {
        self.snapshot.clear();
        self.rx.close();
        while self.rx.try_recv().is_ok() {}
        if let Some(pump) = self.pump.take() {
            pump.abort();
        }
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        if let Some(pump) = self.pump.take() {
            pump.abort();
        }
    }
}

//! In-process hosted store.
//!
//! DESIGN
//! ======
//! Each board holds its elements and the senders of its open subscriptions.
//! Every write takes the board map's write lock, so writes to one store are
//! serialized and subscribers see them in the same order. A subscription's
//! snapshot is taken under the same lock that registers it, so no event can
//! fall between snapshot and live feed.
//!
//! Fan-out uses `try_send`. A subscriber whose channel is full is dropped
//! rather than allowed to stall the board; its feed then ends and the client
//! sees the subscription as lost.

use std::collections::HashMap;
use std::sync::Arc;

use canvas::doc::ChangeEvent;
use canvas::element::{self, Element, ElementId, Payload};
use tokio::sync::{RwLock, mpsc};
use tracing::{debug, info, warn};
use uuid::Uuid;

use super::{RemoteStore, StoreError, Subscription};
use crate::config::Config;
use crate::frame::now_ms;

#[cfg(test)]
#[path = "memory_test.rs"]
mod tests;

// =============================================================================
// BOARD STATE
// =============================================================================

#[derive(Default)]
struct BoardState {
    elements: HashMap<ElementId, Element>,
    subscribers: HashMap<Uuid, mpsc::Sender<ChangeEvent>>,
    /// Last timestamp handed out on this board.
    clock: i64,
}

impl BoardState {
    /// Next write timestamp. Strictly increasing per board even if the wall
    /// clock stalls or steps back.
    fn tick(&mut self) -> i64 {
        self.clock = now_ms().max(self.clock + 1);
        self.clock
    }

    fn broadcast(&mut self, board_id: Uuid, event: &ChangeEvent) {
        self.subscribers.retain(|sub_id, tx| match tx.try_send(event.clone()) {
            Ok(()) => true,
            Err(mpsc::error::TrySendError::Full(_)) => {
                warn!(%board_id, %sub_id, "subscriber channel full; dropping subscriber");
                false
            }
            Err(mpsc::error::TrySendError::Closed(_)) => {
                debug!(%board_id, %sub_id, "subscriber gone");
                false
            }
        });
    }

    /// Snapshot in creation order.
    fn snapshot(&self) -> Vec<ChangeEvent> {
        let mut els: Vec<&Element> = self.elements.values().collect();
        els.sort_by(|a, b| a.created_at.cmp(&b.created_at).then_with(|| a.id.cmp(&b.id)));
        els.into_iter().cloned().map(ChangeEvent::Added).collect()
    }
}

// =============================================================================
// STORE
// =============================================================================

#[derive(Clone)]
pub struct MemoryStore {
    boards: Arc<RwLock<HashMap<Uuid, BoardState>>>,
    subscriber_capacity: usize,
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new(&Config::default())
    }
}

impl MemoryStore {
    #[must_use]
    pub fn new(config: &Config) -> Self {
        Self { boards: Arc::new(RwLock::new(HashMap::new())), subscriber_capacity: config.subscriber_channel_capacity }
    }

    /// Create an empty board and return its id.
    pub async fn create_board(&self) -> Uuid {
        let id = Uuid::new_v4();
        self.boards.write().await.insert(id, BoardState::default());
        info!(board_id = %id, "created board");
        id
    }

    pub async fn has_board(&self, board: Uuid) -> bool {
        self.boards.read().await.contains_key(&board)
    }

    /// Current elements of a board, in creation order.
    ///
    /// # Errors
    ///
    /// Returns `BoardNotFound` for unknown boards.
    pub async fn elements(&self, board: Uuid) -> Result<Vec<Element>, StoreError> {
        let boards = self.boards.read().await;
        let state = boards.get(&board).ok_or(StoreError::BoardNotFound(board))?;
        let mut els: Vec<Element> = state.elements.values().cloned().collect();
        els.sort_by(|a, b| a.created_at.cmp(&b.created_at).then_with(|| a.id.cmp(&b.id)));
        Ok(els)
    }
}

#[async_trait::async_trait]
impl RemoteStore for MemoryStore {
    async fn subscribe(&self, board: Uuid) -> Result<Subscription, StoreError> {
        let mut boards = self.boards.write().await;
        let state = boards.get_mut(&board).ok_or(StoreError::BoardNotFound(board))?;

        let (tx, rx) = mpsc::channel(self.subscriber_capacity);
        let sub_id = Uuid::new_v4();
        let snapshot = state.snapshot();
        state.subscribers.insert(sub_id, tx);

        info!(board_id = %board, %sub_id, elements = snapshot.len(), "subscriber joined");
        Ok(Subscription::new(board, snapshot, rx))
    }

    async fn create_element(&self, board: Uuid, payload: Payload, owner_id: &str) -> Result<ElementId, StoreError> {
        let mut boards = self.boards.write().await;
        let state = boards.get_mut(&board).ok_or(StoreError::BoardNotFound(board))?;

        let payload = element::validate(payload, |id| state.elements.get(id).map(Element::kind))?;
        let id = ElementId::new(Uuid::new_v4().to_string());
        let ts = state.tick();
        let el = Element { id: id.clone(), payload, owner_id: owner_id.to_owned(), created_at: ts, updated_at: ts };

        debug!(board_id = %board, element_id = %id, variant = el.kind().as_str(), "element created");
        state.elements.insert(id.clone(), el.clone());
        state.broadcast(board, &ChangeEvent::Added(el));
        Ok(id)
    }

    async fn update_element_payload(&self, board: Uuid, id: &ElementId, payload: Payload) -> Result<(), StoreError> {
        let mut boards = self.boards.write().await;
        let state = boards.get_mut(&board).ok_or(StoreError::BoardNotFound(board))?;

        let current = state.elements.get(id).ok_or_else(|| StoreError::ElementNotFound(id.clone()))?;
        let (existing, incoming) = (current.kind(), payload.kind());
        if existing != incoming {
            return Err(StoreError::VariantMismatch { id: id.clone(), existing, incoming });
        }
        let payload = element::validate_update(&current.payload, payload)?;
        let ts = state.tick();

        let Some(el) = state.elements.get_mut(id) else {
            return Err(StoreError::ElementNotFound(id.clone()));
        };
        el.payload = payload;
        el.updated_at = ts;
        let event = ChangeEvent::Modified(el.clone());
        state.broadcast(board, &event);
        Ok(())
    }

    async fn delete_element(&self, board: Uuid, id: &ElementId) -> Result<(), StoreError> {
        let mut boards = self.boards.write().await;
        let state = boards.get_mut(&board).ok_or(StoreError::BoardNotFound(board))?;

        if state.elements.remove(id).is_none() {
            return Err(StoreError::ElementNotFound(id.clone()));
        }
        debug!(board_id = %board, element_id = %id, "element deleted");
        state.broadcast(board, &ChangeEvent::Removed(id.clone()));
        Ok(())
    }
}

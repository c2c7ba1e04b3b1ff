//! One whiteboard view: an interaction engine bound to a sync bridge.
//!
//! Input handlers run against the engine through [`WhiteboardSession::input`];
//! whatever they queue in the outbox is published right after. Bridge events
//! are applied with `pump` (whatever is waiting) or `next` (wait for one).
//! `close` ends any gesture and tears the subscription down.

use std::sync::Arc;

use canvas::engine::{Action, EngineCore};
use tracing::{debug, warn};
use uuid::Uuid;

use crate::config::Config;
use crate::store::{RemoteStore, StoreError};
use crate::sync::{BridgeEvent, SyncBridge, SyncError};

#[cfg(test)]
#[path = "session_test.rs"]
mod tests;

pub struct WhiteboardSession {
    engine: EngineCore,
    bridge: SyncBridge,
}

impl WhiteboardSession {
    /// Open `board` for `owner_id`.
    ///
    /// # Errors
    ///
    /// Returns the store's error if the board cannot be subscribed.
    pub async fn open(
        store: Arc<dyn RemoteStore>,
        board: Uuid,
        owner_id: impl Into<String>,
        config: &Config,
    ) -> Result<Self, StoreError> {
        let bridge = SyncBridge::subscribe(store, board, config).await?;
        Ok(Self { engine: EngineCore::for_owner(owner_id), bridge })
    }

    #[must_use]
    pub fn engine(&self) -> &EngineCore {
        &self.engine
    }

    #[must_use]
    pub fn board(&self) -> Uuid {
        self.bridge.board()
    }

    /// Run one input handler against the engine and publish what it queued.
    pub fn input<F>(&mut self, handler: F) -> Vec<Action>
    where
        F: FnOnce(&mut EngineCore) -> Vec<Action>,
    {
        let actions = handler(&mut self.engine);
        for action in &actions {
            if let Action::Rejected(e) = action {
                warn!(board_id = %self.board(), error = %e, "session: local edit rejected");
            }
        }
        self.flush();
        actions
    }

    /// Publish every queued local write, in issue order.
    pub fn flush(&mut self) {
        for write in self.engine.take_pending() {
            if let Err(e) = self.bridge.publish(write) {
                warn!(board_id = %self.board(), error = %e, "session: write not published");
            }
        }
    }

    /// Apply every bridge event that is already waiting.
    ///
    /// # Errors
    ///
    /// Returns `SubscriptionLost` if the feed ended; the view is unusable.
    pub fn pump(&mut self) -> Result<Vec<Action>, SyncError> {
        let mut actions = Vec::new();
        while let Some(event) = self.bridge.try_next_event() {
            actions.extend(self.apply(event)?);
        }
        Ok(actions)
    }

    /// Wait for one bridge event and apply it.
    ///
    /// # Errors
    ///
    /// Returns `SubscriptionLost` if the feed ended and `Closed` after `close`.
    pub async fn next(&mut self) -> Result<Vec<Action>, SyncError> {
        match self.bridge.next_event().await {
            Some(event) => self.apply(event),
            None => Err(SyncError::Closed),
        }
    }

    fn apply(&mut self, event: BridgeEvent) -> Result<Vec<Action>, SyncError> {
        match event {
            BridgeEvent::Remote(change) => Ok(self.engine.apply_remote(change)),
            BridgeEvent::Created { temp_id, id } => {
                debug!(board_id = %self.board(), %temp_id, element_id = %id, "session: create confirmed");
                Ok(self.engine.confirm_created(&temp_id, &id))
            }
            // Already logged by the writer. Local state is kept as is.
            BridgeEvent::WriteFailed(_) => Ok(Vec::new()),
            BridgeEvent::SubscriptionLost => Err(SyncError::SubscriptionLost(self.board())),
        }
    }

    /// End any gesture and tear down the subscription. Idempotent.
    pub fn close(&mut self) -> Vec<Action> {
        let actions = self.engine.teardown();
        self.bridge.close();
        actions
    }
}

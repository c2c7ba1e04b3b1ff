//! SyncBridge — connects one whiteboard view to the remote store.
//!
//! DESIGN
//! ======
//! Two tasks per bridge:
//!
//! - Reader: forwards the subscription (snapshot, then live events) as
//!   `BridgeEvent::Remote`. When the feed ends without the bridge being
//!   closed it emits `SubscriptionLost`, which is fatal to the view.
//! - Writer: sends published writes to the store one at a time, in issue
//!   order. A create's durable id is recorded before the next write is sent,
//!   so later writes that still name the temporary id (or a connection
//!   endpoint pointing at it) are rewritten to the durable one.
//!
//! A failed write is logged and surfaced as `WriteFailed`. It is never
//! retried and the optimistic local state is not rolled back.
//!
//! TEARDOWN
//! ========
//! `close` (or drop) stops the reader and discards undelivered events; no
//! event is observable afterwards. Writes already published still reach the
//! store: the writer drains its queue and then exits.

use std::collections::HashMap;
use std::sync::Arc;

use canvas::doc::{ChangeEvent, Mutation, PendingWrite, WriteToken};
use canvas::element::{ElementId, Payload};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::config::Config;
use crate::store::{RemoteStore, StoreError};

#[cfg(test)]
#[path = "sync_test.rs"]
mod tests;

// =============================================================================
// TYPES
// =============================================================================

#[derive(Debug, thiserror::Error)]
pub enum SyncError {
    #[error("remote write {} failed: {source}", .token.0)]
    RemoteWriteFailed { token: WriteToken, source: StoreError },
    #[error("write {} dropped: outbox full", .token.0)]
    Backlogged { token: WriteToken },
    #[error("subscription to board {0} lost")]
    SubscriptionLost(Uuid),
    #[error("bridge closed")]
    Closed,
}

/// What the bridge reports back to the view.
#[derive(Debug)]
pub enum BridgeEvent {
    /// A change from the remote feed, in store order.
    Remote(ChangeEvent),
    /// A create was accepted; the element's durable id is `id`.
    Created { temp_id: ElementId, id: ElementId },
    /// A write was rejected or could not be delivered.
    WriteFailed(SyncError),
    /// The feed ended while the bridge was open.
    SubscriptionLost,
}

pub struct SyncBridge {
    board: Uuid,
    outbox: Option<mpsc::Sender<PendingWrite>>,
    events: mpsc::Receiver<BridgeEvent>,
    reader: JoinHandle<()>,
    closed: bool,
}

// =============================================================================
// LIFECYCLE
// =============================================================================

impl SyncBridge {
    /// Subscribe to `board` and start the reader and writer tasks.
    ///
    /// # Errors
    ///
    /// Returns the store's error if the subscription cannot be opened.
    pub async fn subscribe(store: Arc<dyn RemoteStore>, board: Uuid, config: &Config) -> Result<Self, StoreError> {
        let mut sub = store.subscribe(board).await?;
        let (events_tx, events) = mpsc::channel(config.subscriber_channel_capacity);
        let (outbox, outbox_rx) = mpsc::channel(config.outbox_channel_capacity);

        let reader_tx = events_tx.clone();
        let reader = tokio::spawn(async move {
            while let Some(event) = sub.next().await {
                if reader_tx.send(BridgeEvent::Remote(event)).await.is_err() {
                    return;
                }
            }
            warn!(board_id = %board, "sync: subscription ended");
            let _ = reader_tx.send(BridgeEvent::SubscriptionLost).await;
        });
        tokio::spawn(run_writer(store, board, outbox_rx, events_tx));

        info!(board_id = %board, "sync: bridge open");
        Ok(Self { board, outbox: Some(outbox), events, reader, closed: false })
    }

    #[must_use]
    pub fn board(&self) -> Uuid {
        self.board
    }

    #[must_use]
    pub fn is_closed(&self) -> bool {
        self.closed
    }

    /// Tear down the subscription. Idempotent.
    pub fn close(&mut self) {
        if self.closed {
            return;
        }
        self.closed = true;
        self.reader.abort();
        self.outbox = None;
        self.events.close();
        while self.events.try_recv().is_ok() {}
        info!(board_id = %self.board, "sync: bridge closed");
    }
}

impl Drop for SyncBridge {
    fn drop(&mut self) {
        self.reader.abort();
    }
}

// =============================================================================
// PUBLISH / EVENTS
// =============================================================================

impl SyncBridge {
    /// Queue a write for the store without waiting for it.
    ///
    /// # Errors
    ///
    /// Returns `Closed` after teardown and `Backlogged` if the writer's queue
    /// is full; the write is dropped in both cases.
    pub fn publish(&self, write: PendingWrite) -> Result<(), SyncError> {
        let Some(outbox) = &self.outbox else {
            return Err(SyncError::Closed);
        };
        let token = write.token;
        outbox.try_send(write).map_err(|e| match e {
            mpsc::error::TrySendError::Full(_) => SyncError::Backlogged { token },
            mpsc::error::TrySendError::Closed(_) => SyncError::Closed,
        })
    }

    /// Wait for the next event. `None` once the bridge is closed.
    pub async fn next_event(&mut self) -> Option<BridgeEvent> {
        if self.closed {
            return None;
        }
        self.events.recv().await
    }

    /// Next event if one is already waiting.
    pub fn try_next_event(&mut self) -> Option<BridgeEvent> {
        if self.closed {
            return None;
        }
        self.events.try_recv().ok()
    }
}

// =============================================================================
// WRITER
// =============================================================================

async fn run_writer(
    store: Arc<dyn RemoteStore>,
    board: Uuid,
    mut outbox: mpsc::Receiver<PendingWrite>,
    events: mpsc::Sender<BridgeEvent>,
) {
    // temporary id -> durable id for creates confirmed by this writer
    let mut resolved: HashMap<ElementId, ElementId> = HashMap::new();

    while let Some(PendingWrite { token, mut mutation }) = outbox.recv().await {
        for temp in temporary_refs(&mutation) {
            if let Some(durable) = resolved.get(&temp) {
                mutation.retarget(&temp, durable);
            }
        }

        let target = mutation.target().clone();
        let result = match mutation {
            Mutation::Create { temp_id, payload, owner_id } => store
                .create_element(board, payload, &owner_id)
                .await
                .map(|id| {
                    debug!(board_id = %board, %temp_id, element_id = %id, "sync: create confirmed");
                    resolved.insert(temp_id.clone(), id.clone());
                    Some(BridgeEvent::Created { temp_id, id })
                }),
            Mutation::Update { id, payload } => store.update_element_payload(board, &id, payload).await.map(|()| None),
            Mutation::Delete { id } => store.delete_element(board, &id).await.map(|()| None),
        };

        let event = match result {
            Ok(Some(event)) => event,
            Ok(None) => continue,
            Err(source) => {
                warn!(board_id = %board, token = token.0, element_id = %target, error = %source, "sync: remote write failed");
                BridgeEvent::WriteFailed(SyncError::RemoteWriteFailed { token, source })
            }
        };
        // The view may be gone; remaining writes are still delivered.
        let _ = events.send(event).await;
    }
    debug!(board_id = %board, "sync: writer drained");
}

/// Temporary ids a mutation refers to, as target or connection endpoint.
fn temporary_refs(mutation: &Mutation) -> Vec<ElementId> {
    let mut refs = Vec::new();
    let payload = match mutation {
        Mutation::Create { payload, .. } => Some(payload),
        Mutation::Update { id, payload } => {
            refs.push(id.clone());
            Some(payload)
        }
        Mutation::Delete { id } => {
            refs.push(id.clone());
            None
        }
    };
    if let Some(Payload::Connection(c)) = payload {
        refs.push(c.from_id.clone());
        refs.push(c.to_id.clone());
    }
    refs.retain(ElementId::is_temporary);
    refs
}

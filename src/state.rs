//! Shared application state.
//!
//! DESIGN
//! ======
//! `AppState` is injected into Axum handlers via the `State` extractor. It
//! holds the hosted element store, which owns every live board and its
//! subscribers. Configuration is consumed when the store is built.

use crate::config::Config;
use crate::store::MemoryStore;

/// Clone is required by Axum; the store clones as a shared handle.
#[derive(Clone)]
pub struct AppState {
    pub store: MemoryStore,
}

impl AppState {
    #[must_use]
    pub fn new(config: &Config) -> Self {
        Self { store: MemoryStore::new(config) }
    }
}

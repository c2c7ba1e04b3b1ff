//! Element store: the local cache of one whiteboard's elements.
//!
//! `DocStore` owns the authoritative in-memory copy of `{id → Element}`.
//! Data flows in from two directions:
//!
//! - Remote change events (`apply_remote`) are applied directly in arrival
//!   order. The last event applied wins; timestamps are never compared.
//! - Local edits (`create`, `mutate_local`, `delete`) are validated, applied
//!   optimistically, and queued in an outbox as [`PendingWrite`]s. The sync
//!   layer drains the outbox and publishes each write. A write that later
//!   fails is not rolled back.
//!
//! Elements created locally carry a temporary id until `confirm_created`
//! rekeys them to the id assigned by the remote store.

#[cfg(test)]
#[path = "doc_test.rs"]
mod doc_test;

use std::collections::HashMap;

use crate::element::{self, Element, ElementId, ElementKind, ElementPatch, ModelError, Payload};

/// A change notification from the remote feed.
#[derive(Debug, Clone, PartialEq)]
pub enum ChangeEvent {
    Added(Element),
    Modified(Element),
    Removed(ElementId),
}

/// Handle identifying one optimistic write until the remote store answers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct WriteToken(pub u64);

/// A write request destined for the remote store.
#[derive(Debug, Clone, PartialEq)]
pub enum Mutation {
    /// Durable creation of an element currently held under `temp_id`.
    Create { temp_id: ElementId, payload: Payload, owner_id: String },
    /// Replace an element's payload.
    Update { id: ElementId, payload: Payload },
    /// Remove an element.
    Delete { id: ElementId },
}

impl Mutation {
    /// The element this write targets.
    #[must_use]
    pub fn target(&self) -> &ElementId {
        match self {
            Self::Create { temp_id, .. } => temp_id,
            Self::Update { id, .. } | Self::Delete { id } => id,
        }
    }

    /// Rewrite every reference to `from` (target id and connection endpoints)
    /// to `to`. A create keeps its own temporary id.
    pub fn retarget(&mut self, from: &ElementId, to: &ElementId) {
        match self {
            Self::Create { payload, .. } => retarget_payload(payload, from, to),
            Self::Update { id, payload } => {
                retarget_endpoint(id, from, to);
                retarget_payload(payload, from, to);
            }
            Self::Delete { id } => retarget_endpoint(id, from, to),
        }
    }
}

/// An outbox entry: one mutation plus the token returned to the caller.
#[derive(Debug, Clone, PartialEq)]
pub struct PendingWrite {
    pub token: WriteToken,
    pub mutation: Mutation,
}

/// In-memory store of whiteboard elements plus the outbox of unsent writes.
#[derive(Debug, Default)]
pub struct DocStore {
    elements: HashMap<ElementId, Element>,
    outbox: Vec<PendingWrite>,
    next_token: u64,
}

impl DocStore {
    /// Create an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    // --- Remote feed ---

    /// Apply one remote change event. Returns `true` if the cache changed.
    ///
    /// A `Modified` event for an unknown id is treated as an insert. A
    /// `Modified` event that would change an element's variant is ignored.
    pub fn apply_remote(&mut self, event: ChangeEvent) -> bool {
        match event {
            ChangeEvent::Added(el) => {
                self.elements.insert(el.id.clone(), el);
                true
            }
            ChangeEvent::Modified(el) => {
                if let Some(existing) = self.elements.get(&el.id) {
                    if existing.kind() != el.kind() {
                        return false;
                    }
                }
                self.elements.insert(el.id.clone(), el);
                true
            }
            ChangeEvent::Removed(id) => self.elements.remove(&id).is_some(),
        }
    }

    // --- Local edits ---

    /// Validate a payload against the current cache.
    ///
    /// # Errors
    ///
    /// See [`element::validate`].
    pub fn validate(&self, payload: Payload) -> Result<Payload, ModelError> {
        element::validate(payload, |id| self.elements.get(id).map(Element::kind))
    }

    /// Optimistically create an element under a fresh temporary id.
    ///
    /// # Errors
    ///
    /// Returns `InvalidPayload` if validation fails; nothing is applied.
    pub fn create(&mut self, payload: Payload, owner_id: &str) -> Result<(ElementId, WriteToken), ModelError> {
        let payload = self.validate(payload)?;
        let temp_id = ElementId::temporary();
        self.elements.insert(
            temp_id.clone(),
            Element {
                id: temp_id.clone(),
                payload: payload.clone(),
                owner_id: owner_id.to_owned(),
                created_at: 0,
                updated_at: 0,
            },
        );
        let token = self.enqueue(Mutation::Create { temp_id: temp_id.clone(), payload, owner_id: owner_id.to_owned() });
        Ok((temp_id, token))
    }

    /// Optimistically apply a patch to an existing element.
    ///
    /// Connection endpoints cannot be changed by a patch and their existence
    /// is not re-checked; editing the label of an orphaned connection works.
    ///
    /// # Errors
    ///
    /// Returns `NotFound` for unknown ids and `InvalidPayload` if the patched
    /// payload fails validation. Nothing is applied on error.
    pub fn mutate_local(&mut self, id: &ElementId, patch: &ElementPatch) -> Result<WriteToken, ModelError> {
        let current = self
            .elements
            .get(id)
            .ok_or_else(|| ModelError::NotFound(id.clone()))?;
        let next = element::validate_update(&current.payload, patch.apply(&current.payload)?)?;

        if let Some(el) = self.elements.get_mut(id) {
            el.payload = next.clone();
        }
        Ok(self.enqueue(Mutation::Update { id: id.clone(), payload: next }))
    }

    /// Remove an element locally and queue its remote deletion.
    ///
    /// Connections that reference `id` are left in place.
    ///
    /// # Errors
    ///
    /// Returns `NotFound` if `id` is not in the cache.
    pub fn delete(&mut self, id: &ElementId) -> Result<WriteToken, ModelError> {
        if self.elements.remove(id).is_none() {
            return Err(ModelError::NotFound(id.clone()));
        }
        Ok(self.enqueue(Mutation::Delete { id: id.clone() }))
    }

    /// Rekey a locally created element to the id assigned by the remote store.
    ///
    /// If the remote echo for `durable` already arrived, the temporary copy is
    /// dropped in favour of it. Queued writes and connection endpoints that
    /// name `temp` are rewritten. Returns `false` if `temp` is unknown.
    pub fn confirm_created(&mut self, temp: &ElementId, durable: &ElementId) -> bool {
        let Some(mut el) = self.elements.remove(temp) else {
            self.retarget_outbox(temp, durable);
            return false;
        };
        if !self.elements.contains_key(durable) {
            el.id = durable.clone();
            self.elements.insert(durable.clone(), el);
        }
        for other in self.elements.values_mut() {
            retarget_payload(&mut other.payload, temp, durable);
        }
        self.retarget_outbox(temp, durable);
        true
    }

    /// Drain queued writes in the order they were issued.
    pub fn take_pending(&mut self) -> Vec<PendingWrite> {
        std::mem::take(&mut self.outbox)
    }

    /// Whether any writes are waiting to be published.
    #[must_use]
    pub fn has_pending(&self) -> bool {
        !self.outbox.is_empty()
    }

    fn enqueue(&mut self, mutation: Mutation) -> WriteToken {
        self.next_token += 1;
        let token = WriteToken(self.next_token);
        self.outbox.push(PendingWrite { token, mutation });
        token
    }

    fn retarget_outbox(&mut self, temp: &ElementId, durable: &ElementId) {
        for write in &mut self.outbox {
            write.mutation.retarget(temp, durable);
        }
    }

    // --- Queries ---

    /// Return a reference to an element by id.
    #[must_use]
    pub fn get(&self, id: &ElementId) -> Option<&Element> {
        self.elements.get(id)
    }

    #[must_use]
    pub fn contains(&self, id: &ElementId) -> bool {
        self.elements.contains_key(id)
    }

    /// Return all elements in draw order: connections, drawings, cards, then
    /// text, ties broken by id.
    #[must_use]
    pub fn sorted_elements(&self) -> Vec<&Element> {
        let mut els: Vec<&Element> = self.elements.values().collect();
        els.sort_by(|a, b| {
            layer(a.kind())
                .cmp(&layer(b.kind()))
                .then_with(|| a.id.cmp(&b.id))
        });
        els
    }

    /// Number of elements currently in the store.
    #[must_use]
    pub fn len(&self) -> usize {
        self.elements.len()
    }

    /// Returns `true` if the store contains no elements.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.elements.is_empty()
    }
}

fn layer(kind: ElementKind) -> u8 {
    match kind {
        ElementKind::Connection => 0,
        ElementKind::Drawing => 1,
        ElementKind::Card => 2,
        ElementKind::Text => 3,
    }
}

fn retarget_payload(payload: &mut Payload, from: &ElementId, to: &ElementId) {
    if let Payload::Connection(c) = payload {
        retarget_endpoint(&mut c.from_id, from, to);
        retarget_endpoint(&mut c.to_id, from, to);
    }
}

fn retarget_endpoint(endpoint: &mut ElementId, from: &ElementId, to: &ElementId) {
    if endpoint == from {
        *endpoint = to.clone();
    }
}

//! Element frames on the relay protocol.
//!
//! DESIGN
//! ======
//! Shared by the relay route and the websocket store client so both ends
//! agree on one encoding.
//!
//! Feed (relay → client), request status, `board_id` set:
//! - `element:added`    `{element}`
//! - `element:modified` `{element}`
//! - `element:removed`  `{id}`
//!
//! Writes (client → relay), answered by `done` or a structured `error`:
//! - `element:create` `{variant, payload, owner_id}` → done `{id}`
//! - `element:update` `{id, variant, payload}`
//! - `element:delete` `{id}`
//!
//! `element` uses the element wire shape
//! `{id, variant, payload, ownerId, createdAt, updatedAt}`.

use canvas::doc::ChangeEvent;
use canvas::element::{Element, ElementId, ElementKind, ModelError, Payload};
use serde_json::Value;
use uuid::Uuid;

use crate::frame::{Data, ErrorCode, Frame};

#[cfg(test)]
#[path = "wire_test.rs"]
mod tests;

pub const ELEMENT_ADDED: &str = "element:added";
pub const ELEMENT_MODIFIED: &str = "element:modified";
pub const ELEMENT_REMOVED: &str = "element:removed";
pub const ELEMENT_CREATE: &str = "element:create";
pub const ELEMENT_UPDATE: &str = "element:update";
pub const ELEMENT_DELETE: &str = "element:delete";

const KEY_ELEMENT: &str = "element";
const KEY_ID: &str = "id";
const KEY_VARIANT: &str = "variant";
const KEY_PAYLOAD: &str = "payload";
const KEY_OWNER_ID: &str = "owner_id";

#[derive(Debug, thiserror::Error)]
pub enum WireError {
    #[error("missing field: {0}")]
    MissingField(&'static str),
    #[error("unknown syscall: {0}")]
    UnknownSyscall(String),
    #[error("malformed frame data: {0}")]
    Json(#[from] serde_json::Error),
    #[error(transparent)]
    Model(#[from] ModelError),
}

impl ErrorCode for WireError {
    fn error_code(&self) -> &'static str {
        match self {
            Self::MissingField(_) => "E_MISSING_FIELD",
            Self::UnknownSyscall(_) => "E_UNKNOWN_SYSCALL",
            Self::Json(_) => "E_MALFORMED",
            Self::Model(_) => "E_INVALID_PAYLOAD",
        }
    }
}

/// A decoded client write.
#[derive(Debug, Clone, PartialEq)]
pub enum WriteRequest {
    Create { payload: Payload, owner_id: String },
    Update { id: ElementId, payload: Payload },
    Delete { id: ElementId },
}

// =============================================================================
// FEED
// =============================================================================

/// Encode one change event as a feed frame.
///
/// # Errors
///
/// Returns `Json` if the element cannot be serialized.
pub fn event_frame(board: Uuid, event: &ChangeEvent) -> Result<Frame, WireError> {
    let frame = match event {
        ChangeEvent::Added(el) => Frame::request(ELEMENT_ADDED, Data::new()).with_data(KEY_ELEMENT, serde_json::to_value(el)?),
        ChangeEvent::Modified(el) => {
            Frame::request(ELEMENT_MODIFIED, Data::new()).with_data(KEY_ELEMENT, serde_json::to_value(el)?)
        }
        ChangeEvent::Removed(id) => Frame::request(ELEMENT_REMOVED, Data::new()).with_data(KEY_ID, id.as_str()),
    };
    Ok(frame.with_board_id(board))
}

/// Decode a feed frame back into a change event.
///
/// # Errors
///
/// Returns `UnknownSyscall` for frames that are not feed frames, and
/// `MissingField`/`Json`/`Model` for malformed data.
pub fn decode_event(frame: &Frame) -> Result<ChangeEvent, WireError> {
    match frame.syscall.as_str() {
        ELEMENT_ADDED => Ok(ChangeEvent::Added(element_field(frame)?)),
        ELEMENT_MODIFIED => Ok(ChangeEvent::Modified(element_field(frame)?)),
        ELEMENT_REMOVED => Ok(ChangeEvent::Removed(id_field(frame)?)),
        other => Err(WireError::UnknownSyscall(other.to_owned())),
    }
}

// =============================================================================
// WRITES
// =============================================================================

/// Encode a client write as a request frame.
///
/// # Errors
///
/// Returns `Json` if the payload cannot be serialized.
pub fn request_frame(board: Uuid, req: &WriteRequest) -> Result<Frame, WireError> {
    let frame = match req {
        WriteRequest::Create { payload, owner_id } => Frame::request(ELEMENT_CREATE, Data::new())
            .with_data(KEY_VARIANT, payload.kind().as_str())
            .with_data(KEY_PAYLOAD, serde_json::to_value(payload)?)
            .with_data(KEY_OWNER_ID, owner_id.as_str()),
        WriteRequest::Update { id, payload } => Frame::request(ELEMENT_UPDATE, Data::new())
            .with_data(KEY_ID, id.as_str())
            .with_data(KEY_VARIANT, payload.kind().as_str())
            .with_data(KEY_PAYLOAD, serde_json::to_value(payload)?),
        WriteRequest::Delete { id } => Frame::request(ELEMENT_DELETE, Data::new()).with_data(KEY_ID, id.as_str()),
    };
    Ok(frame.with_board_id(board))
}

/// Decode a client write request.
///
/// # Errors
///
/// Returns `UnknownSyscall` for unsupported operations and
/// `MissingField`/`Json`/`Model` for malformed data.
pub fn decode_request(frame: &Frame) -> Result<WriteRequest, WireError> {
    match frame.syscall.as_str() {
        ELEMENT_CREATE => {
            let owner_id = frame.str_field(KEY_OWNER_ID).ok_or(WireError::MissingField(KEY_OWNER_ID))?;
            Ok(WriteRequest::Create { payload: payload_field(frame)?, owner_id: owner_id.to_owned() })
        }
        ELEMENT_UPDATE => Ok(WriteRequest::Update { id: id_field(frame)?, payload: payload_field(frame)? }),
        ELEMENT_DELETE => Ok(WriteRequest::Delete { id: id_field(frame)? }),
        other => Err(WireError::UnknownSyscall(other.to_owned())),
    }
}

/// Data for the `done` reply to a create.
#[must_use]
pub fn created_reply(id: &ElementId) -> Data {
    Data::from([(KEY_ID.to_owned(), Value::String(id.as_str().to_owned()))])
}

/// Durable id carried by a create's `done` reply.
///
/// # Errors
///
/// Returns `MissingField` if the reply has no id.
pub fn created_id(reply: &Frame) -> Result<ElementId, WireError> {
    id_field(reply)
}

// =============================================================================
// FIELDS
// =============================================================================

fn id_field(frame: &Frame) -> Result<ElementId, WireError> {
    frame
        .str_field(KEY_ID)
        .filter(|id| !id.is_empty())
        .map(ElementId::from)
        .ok_or(WireError::MissingField(KEY_ID))
}

fn element_field(frame: &Frame) -> Result<Element, WireError> {
    let value = frame.data.get(KEY_ELEMENT).ok_or(WireError::MissingField(KEY_ELEMENT))?;
    Ok(serde_json::from_value(value.clone())?)
}

fn payload_field(frame: &Frame) -> Result<Payload, WireError> {
    let variant = frame.data.get(KEY_VARIANT).ok_or(WireError::MissingField(KEY_VARIANT))?;
    let kind: ElementKind = serde_json::from_value(variant.clone())?;
    let value = frame.data.get(KEY_PAYLOAD).ok_or(WireError::MissingField(KEY_PAYLOAD))?;
    Ok(Payload::from_parts(kind, value.clone())?)
}

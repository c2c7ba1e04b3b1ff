//! Frame — the relay's wire message.
//!
//! DESIGN
//! ======
//! One JSON object per websocket text message, in both directions:
//! `{id, parent_id, ts, board_id?, syscall, status, data}`.
//!
//! - A client write is a `request`; the relay answers with exactly one
//!   `done` or `error` whose `parent_id` is the request's `id`.
//! - Feed pushes are `request` frames with no parent.
//! - `syscall` is `prefix:op`; the relay routes on the prefix.
//! - `data` is a flat map. Element bodies ride as one nested value.

use std::collections::HashMap;
use std::time::{SystemTime, UNIX_EPOCH};

use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

#[cfg(test)]
#[path = "frame_test.rs"]
mod tests;

/// `data` key holding a human-readable error.
pub const FRAME_MESSAGE: &str = "message";

/// `data` key holding a grepable `E_*` code.
pub const FRAME_CODE: &str = "code";

/// `data` key holding whether resending the same request could succeed.
pub const FRAME_RETRYABLE: &str = "retryable";

pub type Data = HashMap<String, Value>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Status {
    Request,
    Done,
    Error,
}

impl Status {
    /// Whether this status answers a request.
    #[must_use]
    pub fn is_terminal(self) -> bool {
        self != Status::Request
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Frame {
    pub id: Uuid,
    pub parent_id: Option<Uuid>,
    /// Unix milliseconds at construction.
    pub ts: i64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub board_id: Option<Uuid>,
    pub syscall: String,
    pub status: Status,
    #[serde(default)]
    pub data: Data,
}

/// Maps an error onto the `code` / `retryable` fields of an error frame.
pub trait ErrorCode: std::fmt::Display {
    fn error_code(&self) -> &'static str;

    fn retryable(&self) -> bool {
        false
    }
}

/// Unix milliseconds; 0 if the clock is before the epoch.
pub(crate) fn now_ms() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map_or(0, |d| i64::try_from(d.as_millis()).unwrap_or(i64::MAX))
}

impl Frame {
    fn new(syscall: String, status: Status, parent_id: Option<Uuid>, board_id: Option<Uuid>, data: Data) -> Self {
        Self { id: Uuid::new_v4(), parent_id, ts: now_ms(), board_id, syscall, status, data }
    }

    pub fn request(syscall: impl Into<String>, data: Data) -> Self {
        Self::new(syscall.into(), Status::Request, None, None, data)
    }

    /// Successful answer with no data.
    #[must_use]
    pub fn done(&self) -> Self {
        self.answer(Status::Done, Data::new())
    }

    #[must_use]
    pub fn done_with(&self, data: Data) -> Self {
        self.answer(Status::Done, data)
    }

    /// Failure answer carrying only a message.
    #[must_use]
    pub fn error(&self, message: impl Into<String>) -> Self {
        self.answer(Status::Error, Data::from([(FRAME_MESSAGE.to_owned(), Value::String(message.into()))]))
    }

    /// Failure answer carrying `code`, `message` and `retryable` from a typed error.
    #[must_use]
    pub fn error_from(&self, err: &(impl ErrorCode + ?Sized)) -> Self {
        let data = Data::from([
            (FRAME_CODE.to_owned(), Value::from(err.error_code())),
            (FRAME_MESSAGE.to_owned(), Value::from(err.to_string())),
            (FRAME_RETRYABLE.to_owned(), Value::from(err.retryable())),
        ]);
        self.answer(Status::Error, data)
    }

    /// Answers keep the request's syscall and board and point back at it.
    fn answer(&self, status: Status, data: Data) -> Self {
        Self::new(self.syscall.clone(), status, Some(self.id), self.board_id, data)
    }

    #[must_use]
    pub fn with_board_id(mut self, board_id: Uuid) -> Self {
        self.board_id = Some(board_id);
        self
    }

    #[must_use]
    pub fn with_data(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.data.insert(key.into(), value.into());
        self
    }

    /// `element` in `element:create`; the whole syscall if it has no `:`.
    #[must_use]
    pub fn prefix(&self) -> &str {
        self.syscall.split_once(':').map_or(self.syscall.as_str(), |(prefix, _)| prefix)
    }

    /// `create` in `element:create`; empty if the syscall has no `:`.
    #[must_use]
    pub fn op(&self) -> &str {
        self.syscall.split_once(':').map_or("", |(_, op)| op)
    }

    #[must_use]
    pub fn str_field(&self, key: &str) -> Option<&str> {
        self.data.get(key).and_then(Value::as_str)
    }
}

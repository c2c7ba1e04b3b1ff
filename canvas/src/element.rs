//! Element model: whiteboard element types, payload validation, and patches.
//!
//! An [`Element`] is one addressable object on the whiteboard. Its variant
//! (card, text, connection, drawing) is fixed at creation and carried by the
//! [`Payload`] enum; only the payload's fields ever change. Edits arrive as
//! sparse [`ElementPatch`]es which are applied to a payload and then passed
//! through [`validate`] before they reach the store.
//!
//! Connections reference their endpoints by [`ElementId`] rather than by
//! pointer, so either endpoint can be deleted without touching the
//! connection. Dangling references are tolerated and simply not rendered.

#[cfg(test)]
#[path = "element_test.rs"]
mod element_test;

use std::fmt;

use serde::ser::SerializeStruct;
use serde::{Deserialize, Serialize, Serializer};
use uuid::Uuid;

use crate::camera::Point;
use crate::consts::{MIN_CARD_HEIGHT, MIN_CARD_WIDTH};
use crate::geometry::path_bounds;

/// Prefix marking ids minted locally before the remote store confirms creation.
const TEMP_ID_PREFIX: &str = "tmp-";

// =============================================================
// Identifiers
// =============================================================

/// Opaque element identifier.
///
/// Durable ids are assigned by the remote store. Elements created locally
/// carry a temporary id until the store confirms them.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ElementId(String);

impl ElementId {
    #[must_use]
    pub fn new(raw: impl Into<String>) -> Self {
        Self(raw.into())
    }

    /// Mint a fresh temporary id for an optimistic create.
    #[must_use]
    pub fn temporary() -> Self {
        Self(format!("{TEMP_ID_PREFIX}{}", Uuid::new_v4()))
    }

    /// Whether this id was minted locally and has not been confirmed.
    #[must_use]
    pub fn is_temporary(&self) -> bool {
        self.0.starts_with(TEMP_ID_PREFIX)
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ElementId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for ElementId {
    fn from(raw: &str) -> Self {
        Self(raw.to_owned())
    }
}

impl From<String> for ElementId {
    fn from(raw: String) -> Self {
        Self(raw)
    }
}

// =============================================================
// Errors
// =============================================================

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ModelError {
    #[error("invalid payload: {0}")]
    InvalidPayload(String),
    #[error("element not found: {0}")]
    NotFound(ElementId),
}

fn invalid(msg: impl Into<String>) -> ModelError {
    ModelError::InvalidPayload(msg.into())
}

// =============================================================
// Variants and payloads
// =============================================================

/// The variant of a whiteboard element.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ElementKind {
    Card,
    Text,
    Connection,
    Drawing,
}

impl ElementKind {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Card => "card",
            Self::Text => "text",
            Self::Connection => "connection",
            Self::Drawing => "drawing",
        }
    }
}

/// A sticky note card filled with its color.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CardData {
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
    pub text: String,
    pub color: String,
}

/// Free-standing text.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TextData {
    pub x: f64,
    pub y: f64,
    pub text: String,
    pub font_size: f64,
    pub color: String,
}

/// A directed edge between two elements, referenced by id.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConnectionData {
    pub from_id: ElementId,
    pub to_id: ElementId,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub color: Option<String>,
}

/// A freehand stroke stored as SVG path data.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DrawingData {
    pub path_data: String,
    pub color: String,
    pub stroke_width: f64,
}

/// Variant-specific element data. Serializes as the bare inner object; the
/// variant travels next to it as a separate `variant` field.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum Payload {
    Card(CardData),
    Text(TextData),
    Connection(ConnectionData),
    Drawing(DrawingData),
}

impl Payload {
    /// Parse a payload object for a known variant.
    ///
    /// # Errors
    ///
    /// Returns `InvalidPayload` if required fields are missing or mistyped.
    pub fn from_parts(kind: ElementKind, value: serde_json::Value) -> Result<Self, ModelError> {
        let parsed = match kind {
            ElementKind::Card => serde_json::from_value(value).map(Self::Card),
            ElementKind::Text => serde_json::from_value(value).map(Self::Text),
            ElementKind::Connection => serde_json::from_value(value).map(Self::Connection),
            ElementKind::Drawing => serde_json::from_value(value).map(Self::Drawing),
        };
        parsed.map_err(|e| invalid(format!("{} payload: {e}", kind.as_str())))
    }

    #[must_use]
    pub fn kind(&self) -> ElementKind {
        match self {
            Self::Card(_) => ElementKind::Card,
            Self::Text(_) => ElementKind::Text,
            Self::Connection(_) => ElementKind::Connection,
            Self::Drawing(_) => ElementKind::Drawing,
        }
    }

    /// World-space origin for positioned variants.
    #[must_use]
    pub fn position(&self) -> Option<Point> {
        match self {
            Self::Card(c) => Some(Point::new(c.x, c.y)),
            Self::Text(t) => Some(Point::new(t.x, t.y)),
            Self::Connection(_) | Self::Drawing(_) => None,
        }
    }

    /// Editable text content, for variants that have one.
    #[must_use]
    pub fn text(&self) -> Option<&str> {
        match self {
            Self::Card(c) => Some(&c.text),
            Self::Text(t) => Some(&t.text),
            Self::Connection(c) => c.label.as_deref(),
            Self::Drawing(_) => None,
        }
    }

    /// A fresh card at `at` with the default size, label, and color.
    #[must_use]
    pub fn default_card(at: Point) -> Self {
        use crate::consts::{DEFAULT_CARD_COLOR, DEFAULT_CARD_HEIGHT, DEFAULT_CARD_TEXT, DEFAULT_CARD_WIDTH};
        Self::Card(CardData {
            x: at.x,
            y: at.y,
            width: DEFAULT_CARD_WIDTH,
            height: DEFAULT_CARD_HEIGHT,
            text: DEFAULT_CARD_TEXT.to_owned(),
            color: DEFAULT_CARD_COLOR.to_owned(),
        })
    }

    /// A fresh text element at `at` with the default content and style.
    #[must_use]
    pub fn default_text(at: Point) -> Self {
        use crate::consts::{DEFAULT_FONT_SIZE, DEFAULT_TEXT, DEFAULT_TEXT_COLOR};
        Self::Text(TextData {
            x: at.x,
            y: at.y,
            text: DEFAULT_TEXT.to_owned(),
            font_size: DEFAULT_FONT_SIZE,
            color: DEFAULT_TEXT_COLOR.to_owned(),
        })
    }

    /// An unlabeled, default-colored connection between two elements.
    #[must_use]
    pub fn connection(from_id: ElementId, to_id: ElementId) -> Self {
        Self::Connection(ConnectionData { from_id, to_id, label: None, color: None })
    }
}

// =============================================================
// Element
// =============================================================

/// One addressable whiteboard object as held by the store.
///
/// On the wire this is `{id, variant, payload, ownerId, createdAt, updatedAt}`
/// with timestamps in milliseconds since the Unix epoch.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(try_from = "ElementRecord")]
pub struct Element {
    pub id: ElementId,
    pub payload: Payload,
    pub owner_id: String,
    pub created_at: i64,
    pub updated_at: i64,
}

impl Element {
    #[must_use]
    pub fn kind(&self) -> ElementKind {
        self.payload.kind()
    }
}

impl Serialize for Element {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut s = serializer.serialize_struct("Element", 6)?;
        s.serialize_field("id", &self.id)?;
        s.serialize_field("variant", &self.kind())?;
        s.serialize_field("payload", &self.payload)?;
        s.serialize_field("ownerId", &self.owner_id)?;
        s.serialize_field("createdAt", &self.created_at)?;
        s.serialize_field("updatedAt", &self.updated_at)?;
        s.end()
    }
}

/// Loose wire shape used to parse an [`Element`] with variant-aware payload errors.
#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct ElementRecord {
    id: ElementId,
    variant: ElementKind,
    payload: serde_json::Value,
    owner_id: String,
    #[serde(default)]
    created_at: i64,
    #[serde(default)]
    updated_at: i64,
}

impl TryFrom<ElementRecord> for Element {
    type Error = ModelError;

    fn try_from(rec: ElementRecord) -> Result<Self, Self::Error> {
        Ok(Self {
            id: rec.id,
            payload: Payload::from_parts(rec.variant, rec.payload)?,
            owner_id: rec.owner_id,
            created_at: rec.created_at,
            updated_at: rec.updated_at,
        })
    }
}

// =============================================================
// Patches
// =============================================================

/// Sparse edit for an element payload. Only present fields are applied.
///
/// A field that the target variant does not have is rejected rather than
/// silently dropped. An empty `label` clears a connection's label.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ElementPatch {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub x: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub y: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub width: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub height: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub color: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub font_size: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub path_data: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub stroke_width: Option<f64>,
}

impl ElementPatch {
    #[must_use]
    pub fn position(x: f64, y: f64) -> Self {
        Self { x: Some(x), y: Some(y), ..Default::default() }
    }

    #[must_use]
    pub fn size(width: f64, height: f64) -> Self {
        Self { width: Some(width), height: Some(height), ..Default::default() }
    }

    #[must_use]
    pub fn text(text: impl Into<String>) -> Self {
        Self { text: Some(text.into()), ..Default::default() }
    }

    #[must_use]
    pub fn color(color: impl Into<String>) -> Self {
        Self { color: Some(color.into()), ..Default::default() }
    }

    /// Produce a new payload with this patch applied. The input is untouched.
    ///
    /// # Errors
    ///
    /// Returns `InvalidPayload` if the patch names a field the variant lacks.
    pub fn apply(&self, payload: &Payload) -> Result<Payload, ModelError> {
        let mut next = payload.clone();
        match &mut next {
            Payload::Card(c) => {
                Self::reject(&[
                    ("fontSize", self.font_size.is_some()),
                    ("label", self.label.is_some()),
                    ("pathData", self.path_data.is_some()),
                    ("strokeWidth", self.stroke_width.is_some()),
                ])?;
                set(&mut c.x, self.x);
                set(&mut c.y, self.y);
                set(&mut c.width, self.width);
                set(&mut c.height, self.height);
                set(&mut c.text, self.text.clone());
                set(&mut c.color, self.color.clone());
            }
            Payload::Text(t) => {
                Self::reject(&[
                    ("width", self.width.is_some()),
                    ("height", self.height.is_some()),
                    ("label", self.label.is_some()),
                    ("pathData", self.path_data.is_some()),
                    ("strokeWidth", self.stroke_width.is_some()),
                ])?;
                set(&mut t.x, self.x);
                set(&mut t.y, self.y);
                set(&mut t.text, self.text.clone());
                set(&mut t.font_size, self.font_size);
                set(&mut t.color, self.color.clone());
            }
            Payload::Connection(c) => {
                Self::reject(&[
                    ("x", self.x.is_some()),
                    ("y", self.y.is_some()),
                    ("width", self.width.is_some()),
                    ("height", self.height.is_some()),
                    ("text", self.text.is_some()),
                    ("fontSize", self.font_size.is_some()),
                    ("pathData", self.path_data.is_some()),
                    ("strokeWidth", self.stroke_width.is_some()),
                ])?;
                if let Some(label) = &self.label {
                    c.label = (!label.is_empty()).then(|| label.clone());
                }
                if let Some(color) = &self.color {
                    c.color = Some(color.clone());
                }
            }
            Payload::Drawing(d) => {
                Self::reject(&[
                    ("x", self.x.is_some()),
                    ("y", self.y.is_some()),
                    ("width", self.width.is_some()),
                    ("height", self.height.is_some()),
                    ("text", self.text.is_some()),
                    ("fontSize", self.font_size.is_some()),
                    ("label", self.label.is_some()),
                ])?;
                set(&mut d.path_data, self.path_data.clone());
                set(&mut d.color, self.color.clone());
                set(&mut d.stroke_width, self.stroke_width);
            }
        }
        Ok(next)
    }

    fn reject(fields: &[(&str, bool)]) -> Result<(), ModelError> {
        match fields.iter().find(|(_, present)| *present) {
            Some((name, _)) => Err(invalid(format!("field `{name}` does not apply to this element"))),
            None => Ok(()),
        }
    }
}

fn set<T>(slot: &mut T, value: Option<T>) {
    if let Some(v) = value {
        *slot = v;
    }
}

// =============================================================
// Validation
// =============================================================

/// Validate and normalize a new payload before it reaches the store.
///
/// `endpoint` reports the variant of an id present in the local cache; it is
/// used to check connection endpoints. The check is best-effort: an element
/// known to the remote store but not yet synced locally is reported as
/// missing. An endpoint must have a bounding box, so connections cannot link
/// to other connections.
///
/// Card sizes below the floor are clamped up rather than rejected.
///
/// # Errors
///
/// Returns `InvalidPayload` for empty required fields, non-finite or
/// non-positive numbers, drawings without coordinates, self-connections,
/// unknown endpoints, and endpoints that are connections.
pub fn validate<F>(payload: Payload, endpoint: F) -> Result<Payload, ModelError>
where
    F: Fn(&ElementId) -> Option<ElementKind>,
{
    let payload = validate_body(payload)?;
    if let Payload::Connection(c) = &payload {
        for id in [&c.from_id, &c.to_id] {
            match endpoint(id) {
                None => return Err(invalid(format!("connection endpoint {id} is not on this board"))),
                Some(ElementKind::Connection) => {
                    return Err(invalid(format!("connection endpoint {id} is itself a connection")));
                }
                Some(_) => {}
            }
        }
    }
    Ok(payload)
}

/// Validate a replacement for `current`, an element's stored payload.
///
/// The variant and a connection's endpoints are fixed at creation. Endpoint
/// existence is not re-checked, so an orphaned connection's label stays
/// editable.
///
/// # Errors
///
/// Returns `InvalidPayload` if the variant or endpoints differ from `current`
/// or the body fails the checks of [`validate`].
pub fn validate_update(current: &Payload, next: Payload) -> Result<Payload, ModelError> {
    match (current, &next) {
        (Payload::Connection(was), Payload::Connection(now))
            if was.from_id != now.from_id || was.to_id != now.to_id =>
        {
            return Err(invalid("connection endpoints cannot be changed"));
        }
        _ if current.kind() != next.kind() => {
            return Err(invalid(format!(
                "cannot change a {} into a {}",
                current.kind().as_str(),
                next.kind().as_str()
            )));
        }
        _ => {}
    }
    validate_body(next)
}

fn validate_body(payload: Payload) -> Result<Payload, ModelError> {
    match payload {
        Payload::Card(mut c) => {
            finite("x", c.x)?;
            finite("y", c.y)?;
            finite("width", c.width)?;
            finite("height", c.height)?;
            non_empty("color", &c.color)?;
            c.width = c.width.max(MIN_CARD_WIDTH);
            c.height = c.height.max(MIN_CARD_HEIGHT);
            Ok(Payload::Card(c))
        }
        Payload::Text(t) => {
            finite("x", t.x)?;
            finite("y", t.y)?;
            positive("fontSize", t.font_size)?;
            non_empty("color", &t.color)?;
            Ok(Payload::Text(t))
        }
        Payload::Connection(c) => {
            non_empty("fromId", c.from_id.as_str())?;
            non_empty("toId", c.to_id.as_str())?;
            if c.from_id == c.to_id {
                return Err(invalid(format!("connection cannot link {} to itself", c.from_id)));
            }
            Ok(Payload::Connection(c))
        }
        Payload::Drawing(d) => {
            non_empty("pathData", &d.path_data)?;
            if path_bounds(&d.path_data).is_none() {
                return Err(invalid("`pathData` holds no coordinates"));
            }
            non_empty("color", &d.color)?;
            positive("strokeWidth", d.stroke_width)?;
            Ok(Payload::Drawing(d))
        }
    }
}

fn finite(name: &str, value: f64) -> Result<(), ModelError> {
    if value.is_finite() { Ok(()) } else { Err(invalid(format!("`{name}` must be finite"))) }
}

fn positive(name: &str, value: f64) -> Result<(), ModelError> {
    if value.is_finite() && value > 0.0 {
        Ok(())
    } else {
        Err(invalid(format!("`{name}` must be a positive number")))
    }
}

fn non_empty(name: &str, value: &str) -> Result<(), ModelError> {
    if value.trim().is_empty() { Err(invalid(format!("`{name}` is required"))) } else { Ok(()) }
}

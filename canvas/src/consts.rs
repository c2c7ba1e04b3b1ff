//! Shared numeric constants for the canvas crate.

// ── Camera ──────────────────────────────────────────────────────

/// Smallest allowed zoom factor.
pub const MIN_ZOOM: f64 = 0.3;

/// Largest allowed zoom factor.
pub const MAX_ZOOM: f64 = 3.0;

/// Zoom change per toolbar click or wheel notch.
pub const ZOOM_STEP: f64 = 0.1;

// ── Cards ───────────────────────────────────────────────────────

/// Resize floor for card width, in world units.
pub const MIN_CARD_WIDTH: f64 = 100.0;

/// Resize floor for card height, in world units.
pub const MIN_CARD_HEIGHT: f64 = 80.0;

/// Width of a freshly placed card.
pub const DEFAULT_CARD_WIDTH: f64 = 200.0;

/// Height of a freshly placed card.
pub const DEFAULT_CARD_HEIGHT: f64 = 150.0;

/// Label of a freshly placed card.
pub const DEFAULT_CARD_TEXT: &str = "New Card";

/// Accent color of a freshly placed card.
pub const DEFAULT_CARD_COLOR: &str = "#6a994e";

/// Swatches offered on the selected card, in display order.
pub const CARD_PALETTE: [(&str, &str); 5] = [
    ("Green", "#6a994e"),
    ("Blue", "#4a90e2"),
    ("Purple", "#9b59b6"),
    ("Orange", "#e67e22"),
    ("Pink", "#e91e63"),
];

// ── Text ────────────────────────────────────────────────────────

/// Content of a freshly placed text element.
pub const DEFAULT_TEXT: &str = "New Text";

/// Font size of a freshly placed text element.
pub const DEFAULT_FONT_SIZE: f64 = 16.0;

/// Color of a freshly placed text element.
pub const DEFAULT_TEXT_COLOR: &str = "#1f2937";

/// Average glyph advance as a fraction of the font size, for box estimates.
pub const TEXT_CHAR_WIDTH_RATIO: f64 = 0.6;

/// Line height as a fraction of the font size.
pub const TEXT_LINE_HEIGHT_RATIO: f64 = 1.2;

/// Padding around a text element's glyphs, per side.
pub const TEXT_PADDING: f64 = 8.0;

// ── Connections ─────────────────────────────────────────────────

/// Stroke color for connections without an explicit color.
pub const DEFAULT_CONNECTION_COLOR: &str = "#6a994e";

/// Stroke width of a connection curve.
pub const CONNECTION_STROKE_WIDTH: f64 = 2.0;

/// Upper bound on the horizontal control-point offset of a connection curve.
pub const MAX_CONTROL_OFFSET: f64 = 100.0;

/// Font size of connection labels.
pub const CONNECTION_LABEL_FONT_SIZE: f64 = 12.0;

/// Color of connection labels.
pub const CONNECTION_LABEL_COLOR: &str = "#1f2937";

// ── Hit-testing ─────────────────────────────────────────────────

/// Side of the square resize handle in the bottom-right corner of a card.
pub const RESIZE_HANDLE_SIZE: f64 = 16.0;

/// Side of one color swatch on a selected card.
pub const SWATCH_SIZE: f64 = 16.0;

/// Gap between adjacent swatches.
pub const SWATCH_GAP: f64 = 2.0;

/// Inset of the swatch row from the card's top-right corner. The row must fit
/// inside a card at `MIN_CARD_WIDTH`.
pub const SWATCH_INSET: f64 = 6.0;

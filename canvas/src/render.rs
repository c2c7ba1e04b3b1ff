//! Rendering: draws the whiteboard scene to a 2D context.
//!
//! This module is the only place that touches [`web_sys::CanvasRenderingContext2d`].
//! It reads the element cache, the camera, and the interaction state and
//! produces pixels. It never mutates application state.
//!
//! Draw order is fixed: connections, drawings, cards, text, then selection UI
//! on top. Connections whose endpoints are missing from the cache are skipped.

#[cfg(test)]
#[path = "render_test.rs"]
mod render_test;

use std::f64::consts::PI;

use wasm_bindgen::JsValue;
use web_sys::{CanvasRenderingContext2d, Path2d};

use crate::camera::{Camera, Point};
use crate::consts::{
    CARD_PALETTE, CONNECTION_LABEL_COLOR, CONNECTION_LABEL_FONT_SIZE, CONNECTION_STROKE_WIDTH,
    DEFAULT_CONNECTION_COLOR, TEXT_PADDING,
};
use crate::doc::DocStore;
use crate::element::{CardData, ConnectionData, DrawingData, Element, Payload, TextData};
use crate::geometry::{self, ConnectionPath, Rect};
use crate::hit;
use crate::input::Interaction;

/// Arrowhead length in world units.
const ARROW_SIZE: f64 = 10.0;

/// Arrowhead half-angle in radians (~30°).
const ARROW_ANGLE: f64 = PI / 6.0;

const SELECTION_COLOR: &str = "#1E90FF";
const CONNECT_SOURCE_COLOR: &str = "#e67e22";
const CARD_FILL: &str = "#ffffff";
const CARD_EDGE_COLOR: &str = "#d1d5db";
const CARD_TEXT_COLOR: &str = "#1f2937";

/// Height of the accent band along a card's top edge, in world units.
const CARD_ACCENT_HEIGHT: f64 = 4.0;

/// Selection outline offset from the element box, in screen pixels.
const SELECTION_PAD_PX: f64 = 3.0;

/// Draw the full scene.
///
/// `viewport_w` and `viewport_h` are in CSS pixels. `dpr` is the device pixel ratio.
///
/// # Errors
///
/// Returns `Err` if any `Canvas2D` call fails.
pub fn draw(
    ctx: &CanvasRenderingContext2d,
    doc: &DocStore,
    camera: &Camera,
    ui: &Interaction,
    viewport_w: f64,
    viewport_h: f64,
    dpr: f64,
) -> Result<(), JsValue> {
    ctx.set_transform(dpr, 0.0, 0.0, dpr, 0.0, 0.0)?;
    ctx.clear_rect(0.0, 0.0, viewport_w, viewport_h);
    ctx.translate(camera.pan_x, camera.pan_y)?;
    ctx.scale(camera.zoom, camera.zoom)?;

    for el in doc.sorted_elements() {
        draw_element(ctx, el, doc)?;
    }

    if let Some(el) = ui.connect_from.as_ref().and_then(|id| doc.get(id)) {
        draw_outline(ctx, el, CONNECT_SOURCE_COLOR, camera.zoom)?;
    }
    if let Some(el) = ui.selected_id.as_ref().and_then(|id| doc.get(id)) {
        draw_outline(ctx, el, SELECTION_COLOR, camera.zoom)?;
        if let Payload::Card(card) = &el.payload {
            draw_card_controls(ctx, card, camera.zoom);
        }
    }
    Ok(())
}

fn draw_element(ctx: &CanvasRenderingContext2d, el: &Element, doc: &DocStore) -> Result<(), JsValue> {
    match &el.payload {
        Payload::Connection(c) => draw_connection(ctx, doc, c),
        Payload::Drawing(d) => draw_drawing(ctx, d),
        Payload::Card(c) => draw_card(ctx, c),
        Payload::Text(t) => draw_text(ctx, t),
    }
}

// =============================================================
// Element renderers
// =============================================================

fn draw_connection(ctx: &CanvasRenderingContext2d, doc: &DocStore, conn: &ConnectionData) -> Result<(), JsValue> {
    let Some(path) = geometry::connection_path(doc, conn) else {
        return Ok(());
    };
    let color = conn.color.as_deref().unwrap_or(DEFAULT_CONNECTION_COLOR);

    ctx.save();
    ctx.set_stroke_style_str(color);
    ctx.set_fill_style_str(color);
    ctx.set_line_width(CONNECTION_STROKE_WIDTH);

    ctx.begin_path();
    ctx.move_to(path.start.x, path.start.y);
    ctx.bezier_curve_to(path.control1.x, path.control1.y, path.control2.x, path.control2.y, path.end.x, path.end.y);
    ctx.stroke();

    let [tip, left, right] = arrowhead(&path);
    ctx.begin_path();
    ctx.move_to(tip.x, tip.y);
    ctx.line_to(left.x, left.y);
    ctx.line_to(right.x, right.y);
    ctx.close_path();
    ctx.fill();

    if let Some(label) = conn.label.as_deref().filter(|l| !l.is_empty()) {
        let at = path.label_anchor;
        ctx.set_font(&format!("{CONNECTION_LABEL_FONT_SIZE}px sans-serif"));
        ctx.set_text_align("center");
        ctx.set_text_baseline("middle");
        let w = ctx.measure_text(label)?.width() + 8.0;
        let h = CONNECTION_LABEL_FONT_SIZE + 6.0;
        ctx.set_fill_style_str("#ffffff");
        ctx.fill_rect(at.x - w / 2.0, at.y - h / 2.0, w, h);
        ctx.set_fill_style_str(CONNECTION_LABEL_COLOR);
        ctx.fill_text(label, at.x, at.y)?;
    }

    ctx.restore();
    Ok(())
}

fn draw_drawing(ctx: &CanvasRenderingContext2d, d: &DrawingData) -> Result<(), JsValue> {
    let path = Path2d::new_with_path_string(&d.path_data)?;
    ctx.save();
    ctx.set_stroke_style_str(&d.color);
    ctx.set_line_width(d.stroke_width);
    ctx.set_line_cap("round");
    ctx.set_line_join("round");
    ctx.stroke_with_path(&path);
    ctx.restore();
    Ok(())
}

fn draw_card(ctx: &CanvasRenderingContext2d, card: &CardData) -> Result<(), JsValue> {
    ctx.save();
    ctx.set_fill_style_str(CARD_FILL);
    ctx.fill_rect(card.x, card.y, card.width, card.height);
    ctx.set_stroke_style_str(CARD_EDGE_COLOR);
    ctx.set_line_width(1.0);
    ctx.stroke_rect(card.x, card.y, card.width, card.height);

    let accent = card_accent_rect(card);
    ctx.set_fill_style_str(&card.color);
    ctx.fill_rect(accent.x, accent.y, accent.width, accent.height);

    ctx.set_fill_style_str(CARD_TEXT_COLOR);
    ctx.set_font("14px sans-serif");
    ctx.set_text_align("left");
    ctx.set_text_baseline("top");
    let max_w = (card.width - 2.0 * TEXT_PADDING).max(1.0);
    let line_height = 18.0;
    let origin = card_text_origin(card);
    let mut y = origin.y;
    for line in wrap_lines(&card.text, |s| measured_width(ctx, s), max_w) {
        if y + line_height > card.y + card.height {
            break;
        }
        ctx.fill_text(&line, origin.x, y)?;
        y += line_height;
    }
    ctx.restore();
    Ok(())
}

/// The colored band across the top of a card; the rest of the card is white.
#[must_use]
pub fn card_accent_rect(card: &CardData) -> Rect {
    Rect::new(card.x, card.y, card.width, CARD_ACCENT_HEIGHT)
}

/// Top-left of a card's first text line, clear of the accent band.
#[must_use]
pub fn card_text_origin(card: &CardData) -> Point {
    Point::new(card.x + TEXT_PADDING, card.y + CARD_ACCENT_HEIGHT + TEXT_PADDING)
}

fn draw_text(ctx: &CanvasRenderingContext2d, t: &TextData) -> Result<(), JsValue> {
    ctx.save();
    ctx.set_fill_style_str(&t.color);
    ctx.set_font(&format!("{}px sans-serif", t.font_size));
    ctx.set_text_align("left");
    ctx.set_text_baseline("top");
    ctx.fill_text(&t.text, t.x + TEXT_PADDING, t.y + TEXT_PADDING)?;
    ctx.restore();
    Ok(())
}

// =============================================================
// Selection UI
// =============================================================

fn draw_outline(ctx: &CanvasRenderingContext2d, el: &Element, color: &str, zoom: f64) -> Result<(), JsValue> {
    let Some(b) = geometry::element_bounds(el) else {
        return Ok(());
    };
    let pad = SELECTION_PAD_PX / zoom;
    ctx.save();
    ctx.set_stroke_style_str(color);
    ctx.set_line_width(2.0 / zoom);
    let dash = js_sys::Array::new();
    dash.push(&(4.0 / zoom).into());
    dash.push(&(4.0 / zoom).into());
    ctx.set_line_dash(&dash)?;
    ctx.stroke_rect(b.x - pad, b.y - pad, b.width + 2.0 * pad, b.height + 2.0 * pad);
    ctx.restore();
    Ok(())
}

fn draw_card_controls(ctx: &CanvasRenderingContext2d, card: &CardData, zoom: f64) {
    ctx.save();
    ctx.set_line_width(1.0 / zoom);
    ctx.set_stroke_style_str("#ffffff");
    for (i, (_, hex)) in CARD_PALETTE.iter().enumerate() {
        let r = hit::swatch_rect(card, i);
        ctx.set_fill_style_str(hex);
        ctx.fill_rect(r.x, r.y, r.width, r.height);
        ctx.stroke_rect(r.x, r.y, r.width, r.height);
    }

    let h = hit::resize_handle_rect(card);
    ctx.set_fill_style_str(SELECTION_COLOR);
    ctx.fill_rect(h.x, h.y, h.width, h.height);
    ctx.restore();
}

// =============================================================
// Helpers
// =============================================================

/// Tip and base corners of the arrowhead at the end of a connection, pointing
/// along the curve's final tangent (from the second control point to the end).
#[must_use]
pub fn arrowhead(path: &ConnectionPath) -> [Point; 3] {
    let tip = path.end;
    let from = if path.control2 == tip { path.start } else { path.control2 };
    let angle = (tip.y - from.y).atan2(tip.x - from.x);
    [
        tip,
        Point::new(
            tip.x - ARROW_SIZE * (angle - ARROW_ANGLE).cos(),
            tip.y - ARROW_SIZE * (angle - ARROW_ANGLE).sin(),
        ),
        Point::new(
            tip.x - ARROW_SIZE * (angle + ARROW_ANGLE).cos(),
            tip.y - ARROW_SIZE * (angle + ARROW_ANGLE).sin(),
        ),
    ]
}

/// Greedy word wrap. `measure` returns the rendered width of a string.
/// Explicit newlines always break; a single word wider than `max_w` gets a
/// line of its own.
pub fn wrap_lines<F>(text: &str, measure: F, max_w: f64) -> Vec<String>
where
    F: Fn(&str) -> f64,
{
    let mut out = Vec::new();
    for raw_line in text.lines() {
        let mut line = String::new();
        for word in raw_line.split_whitespace() {
            if line.is_empty() {
                line.push_str(word);
                continue;
            }
            let candidate = format!("{line} {word}");
            if measure(&candidate) <= max_w {
                line = candidate;
            } else {
                out.push(std::mem::replace(&mut line, word.to_owned()));
            }
        }
        out.push(line);
    }
    out
}

fn measured_width(ctx: &CanvasRenderingContext2d, text: &str) -> f64 {
    match ctx.measure_text(text) {
        Ok(metrics) => metrics.width(),
        Err(_) => f64::INFINITY,
    }
}

//! Connection geometry and element bounding boxes.
//!
//! A connection is drawn as a cubic bezier from the center of its `from`
//! element to the center of its `to` element. The control points are pushed
//! horizontally by `min(distance / 3, MAX_CONTROL_OFFSET)`, giving a gentle
//! S-curve. The label sits at the straight-line midpoint of the two centers.
//!
//! Geometry is computed against the local cache only. If either endpoint is
//! missing, there is no geometry and the connection is not drawn.

#[cfg(test)]
#[path = "geometry_test.rs"]
mod geometry_test;

use crate::camera::Point;
use crate::consts::{MAX_CONTROL_OFFSET, TEXT_CHAR_WIDTH_RATIO, TEXT_LINE_HEIGHT_RATIO, TEXT_PADDING};
use crate::doc::DocStore;
use crate::element::{ConnectionData, Element, Payload, TextData};

/// Axis-aligned rectangle in world coordinates.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Rect {
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
}

impl Rect {
    #[must_use]
    pub fn new(x: f64, y: f64, width: f64, height: f64) -> Self {
        Self { x, y, width, height }
    }

    #[must_use]
    pub fn center(&self) -> Point {
        Point::new(self.x + self.width / 2.0, self.y + self.height / 2.0)
    }

    /// Inclusive containment test.
    #[must_use]
    pub fn contains(&self, pt: Point) -> bool {
        pt.x >= self.x && pt.x <= self.x + self.width && pt.y >= self.y && pt.y <= self.y + self.height
    }
}

/// Resolved curve for one connection.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ConnectionPath {
    pub start: Point,
    pub control1: Point,
    pub control2: Point,
    pub end: Point,
    /// Where a label is drawn: the midpoint of `start` and `end`.
    pub label_anchor: Point,
}

impl ConnectionPath {
    /// Build the curve between two box centers.
    #[must_use]
    pub fn between(start: Point, end: Point) -> Self {
        let offset = (start.distance(end) / 3.0).min(MAX_CONTROL_OFFSET);
        Self {
            start,
            control1: Point::new(start.x + offset, start.y),
            control2: Point::new(end.x - offset, end.y),
            end,
            label_anchor: Point::new((start.x + end.x) / 2.0, (start.y + end.y) / 2.0),
        }
    }

    /// SVG path data for this curve.
    #[must_use]
    pub fn to_svg_path(&self) -> String {
        format!(
            "M {} {} C {} {}, {} {}, {} {}",
            self.start.x,
            self.start.y,
            self.control1.x,
            self.control1.y,
            self.control2.x,
            self.control2.y,
            self.end.x,
            self.end.y
        )
    }
}

/// Compute the curve for a connection, or `None` if either endpoint is absent
/// from `doc` or has no bounding box.
#[must_use]
pub fn connection_path(doc: &DocStore, conn: &ConnectionData) -> Option<ConnectionPath> {
    let from = element_bounds(doc.get(&conn.from_id)?)?;
    let to = element_bounds(doc.get(&conn.to_id)?)?;
    Some(ConnectionPath::between(from.center(), to.center()))
}

/// World-space bounding box of an element. Connections have none.
#[must_use]
pub fn element_bounds(el: &Element) -> Option<Rect> {
    match &el.payload {
        Payload::Card(c) => Some(Rect::new(c.x, c.y, c.width, c.height)),
        Payload::Text(t) => Some(text_bounds(t)),
        Payload::Drawing(d) => path_bounds(&d.path_data),
        Payload::Connection(_) => None,
    }
}

/// Estimated box of a text element from its character count and font size.
#[must_use]
pub fn text_bounds(t: &TextData) -> Rect {
    #[allow(clippy::cast_precision_loss)]
    let chars = t.text.chars().count().max(1) as f64;
    Rect::new(
        t.x,
        t.y,
        chars * t.font_size * TEXT_CHAR_WIDTH_RATIO + 2.0 * TEXT_PADDING,
        t.font_size * TEXT_LINE_HEIGHT_RATIO + 2.0 * TEXT_PADDING,
    )
}

/// Bounds of the coordinates that appear in SVG path data.
///
/// Numbers are read pairwise as `x y` in order of appearance, which is exact
/// for the absolute `M`/`L`/`C`/`Q` commands freehand strokes are made of.
/// Returns `None` if the data holds fewer than one coordinate pair.
#[must_use]
pub fn path_bounds(path_data: &str) -> Option<Rect> {
    let numbers = path_numbers(path_data);
    let mut pairs = numbers.chunks_exact(2);
    let first = pairs.next()?;
    let (mut min_x, mut min_y, mut max_x, mut max_y) = (first[0], first[1], first[0], first[1]);
    for pair in pairs {
        min_x = min_x.min(pair[0]);
        max_x = max_x.max(pair[0]);
        min_y = min_y.min(pair[1]);
        max_y = max_y.max(pair[1]);
    }
    Some(Rect::new(min_x, min_y, max_x - min_x, max_y - min_y))
}

/// Split path data into its numeric tokens. A `-` starts a new number unless
/// it follows an exponent marker, so `10-20` reads as two numbers.
fn path_numbers(path_data: &str) -> Vec<f64> {
    fn flush(token: &mut String, out: &mut Vec<f64>) {
        if let Ok(n) = token.parse::<f64>() {
            out.push(n);
        }
        token.clear();
    }

    let mut out = Vec::new();
    let mut token = String::new();
    for c in path_data.chars() {
        let continues = c.is_ascii_digit()
            || c == '.'
            || ((c == 'e' || c == 'E') && !token.is_empty())
            || (c == '-' && (token.ends_with('e') || token.ends_with('E')));
        if continues {
            token.push(c);
        } else {
            flush(&mut token, &mut out);
            if c == '-' {
                token.push(c);
            }
        }
    }
    flush(&mut token, &mut out);
    out
}

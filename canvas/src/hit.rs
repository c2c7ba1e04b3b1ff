#[cfg(test)]
#[path = "hit_test.rs"]
mod hit_test;

use crate::camera::Point;
use crate::consts::{CARD_PALETTE, RESIZE_HANDLE_SIZE, SWATCH_GAP, SWATCH_INSET, SWATCH_SIZE};
use crate::doc::DocStore;
use crate::element::{CardData, ElementId, ElementKind, Payload};
use crate::geometry::{Rect, element_bounds};

/// Which part of an element was hit.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HitPart {
    /// The element body. Doubles as the drag handle for cards and text.
    Body,
    /// Bottom-right resize handle of the selected card.
    ResizeHandle,
    /// One of the palette swatches on the selected card, by palette index.
    Swatch(usize),
}

/// Result of a hit test.
#[derive(Debug, Clone, PartialEq)]
pub struct Hit {
    pub element_id: ElementId,
    pub kind: ElementKind,
    pub part: HitPart,
}

/// Bottom-right resize handle of a card.
#[must_use]
pub fn resize_handle_rect(card: &CardData) -> Rect {
    Rect::new(
        card.x + card.width - RESIZE_HANDLE_SIZE,
        card.y + card.height - RESIZE_HANDLE_SIZE,
        RESIZE_HANDLE_SIZE,
        RESIZE_HANDLE_SIZE,
    )
}

/// Swatch `index` of the palette row, right-aligned along the card's top edge.
#[must_use]
pub fn swatch_rect(card: &CardData, index: usize) -> Rect {
    #[allow(clippy::cast_precision_loss)]
    let from_right = (CARD_PALETTE.len() - index) as f64;
    let x = card.x + card.width - SWATCH_INSET - from_right * SWATCH_SIZE - (from_right - 1.0) * SWATCH_GAP;
    Rect::new(x, card.y + SWATCH_INSET, SWATCH_SIZE, SWATCH_SIZE)
}

/// Test which element (if any) is under `world_pt`.
///
/// Handles of the selected card are checked first, then element bodies from
/// the top of the draw order down. Connections are never hit.
#[must_use]
pub fn hit_test(world_pt: Point, doc: &DocStore, selected_id: Option<&ElementId>) -> Option<Hit> {
    if let Some(sel) = selected_id.and_then(|id| doc.get(id)) {
        if let Payload::Card(card) = &sel.payload {
            if resize_handle_rect(card).contains(world_pt) {
                return Some(Hit { element_id: sel.id.clone(), kind: ElementKind::Card, part: HitPart::ResizeHandle });
            }
            let swatch = (0..CARD_PALETTE.len()).find(|&i| swatch_rect(card, i).contains(world_pt));
            if let Some(i) = swatch {
                return Some(Hit { element_id: sel.id.clone(), kind: ElementKind::Card, part: HitPart::Swatch(i) });
            }
        }
    }

    doc.sorted_elements()
        .into_iter()
        .rev()
        .find(|el| element_bounds(el).is_some_and(|b| b.contains(world_pt)))
        .map(|el| Hit { element_id: el.id.clone(), kind: el.kind(), part: HitPart::Body })
}

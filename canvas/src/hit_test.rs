use super::*;
use crate::doc::ChangeEvent;
use crate::element::{DrawingData, Element};

fn add(doc: &mut DocStore, id: &str, payload: Payload) -> ElementId {
    doc.apply_remote(ChangeEvent::Added(Element {
        id: id.into(),
        payload,
        owner_id: "u".into(),
        created_at: 0,
        updated_at: 0,
    }));
    id.into()
}

fn card_at(x: f64, y: f64) -> Payload {
    Payload::default_card(Point::new(x, y))
}

fn data(p: &Payload) -> CardData {
    match p {
        Payload::Card(c) => c.clone(),
        other => panic!("expected card, got {other:?}"),
    }
}

fn pt(x: f64, y: f64) -> Point {
    Point::new(x, y)
}

// =============================================================
// Handle geometry
// =============================================================

#[test]
fn resize_handle_sits_in_bottom_right_corner() {
    let c = data(&card_at(0.0, 0.0));
    let r = resize_handle_rect(&c);
    assert_eq!((r.x, r.y, r.width, r.height), (184.0, 134.0, 16.0, 16.0));
}

#[test]
fn swatches_are_right_aligned_along_top_edge() {
    let c = data(&card_at(0.0, 0.0));
    let last = swatch_rect(&c, CARD_PALETTE.len() - 1);
    assert_eq!((last.x, last.y), (178.0, 6.0));
    let first = swatch_rect(&c, 0);
    assert_eq!(first.x, 178.0 - 4.0 * (16.0 + 2.0));
}

#[test]
fn swatch_row_fits_on_narrowest_card() {
    let mut c = data(&card_at(40.0, 0.0));
    c.width = crate::consts::MIN_CARD_WIDTH;
    let first = swatch_rect(&c, 0);
    let last = swatch_rect(&c, CARD_PALETTE.len() - 1);
    assert!(first.x > c.x);
    assert!(last.x + last.width < c.x + c.width);
    assert!(!first.contains(pt(c.x - 1.0, first.center().y)));
}

#[test]
fn swatches_do_not_overlap() {
    let c = data(&card_at(0.0, 0.0));
    for i in 1..CARD_PALETTE.len() {
        let prev = swatch_rect(&c, i - 1);
        let next = swatch_rect(&c, i);
        assert!(prev.x + prev.width < next.x);
    }
}

// =============================================================
// hit_test
// =============================================================

#[test]
fn empty_canvas_hits_nothing() {
    let doc = DocStore::new();
    assert!(hit_test(pt(0.0, 0.0), &doc, None).is_none());
}

#[test]
fn card_body_hit() {
    let mut doc = DocStore::new();
    let id = add(&mut doc, "a", card_at(0.0, 0.0));
    let hit = hit_test(pt(50.0, 50.0), &doc, None).unwrap();
    assert_eq!(hit, Hit { element_id: id, kind: ElementKind::Card, part: HitPart::Body });
}

#[test]
fn miss_outside_card() {
    let mut doc = DocStore::new();
    add(&mut doc, "a", card_at(0.0, 0.0));
    assert!(hit_test(pt(201.0, 50.0), &doc, None).is_none());
}

#[test]
fn resize_handle_only_on_selected_card() {
    let mut doc = DocStore::new();
    let id = add(&mut doc, "a", card_at(0.0, 0.0));
    let corner = pt(195.0, 145.0);

    let unselected = hit_test(corner, &doc, None).unwrap();
    assert_eq!(unselected.part, HitPart::Body);

    let selected = hit_test(corner, &doc, Some(&id)).unwrap();
    assert_eq!(selected.part, HitPart::ResizeHandle);
}

#[test]
fn swatch_hit_reports_palette_index() {
    let mut doc = DocStore::new();
    let id = add(&mut doc, "a", card_at(0.0, 0.0));
    let c = data(&card_at(0.0, 0.0));
    let r = swatch_rect(&c, 2);
    let hit = hit_test(r.center(), &doc, Some(&id)).unwrap();
    assert_eq!(hit.part, HitPart::Swatch(2));
}

#[test]
fn text_draws_over_card() {
    let mut doc = DocStore::new();
    add(&mut doc, "card", card_at(0.0, 0.0));
    let text = add(&mut doc, "text", Payload::default_text(pt(10.0, 10.0)));
    let hit = hit_test(pt(20.0, 20.0), &doc, None).unwrap();
    assert_eq!(hit.element_id, text);
    assert_eq!(hit.kind, ElementKind::Text);
}

#[test]
fn card_draws_over_drawing() {
    let mut doc = DocStore::new();
    add(
        &mut doc,
        "ink",
        Payload::Drawing(DrawingData { path_data: "M 0 0 L 300 300".into(), color: "#000".into(), stroke_width: 2.0 }),
    );
    let card = add(&mut doc, "card", card_at(0.0, 0.0));
    assert_eq!(hit_test(pt(10.0, 10.0), &doc, None).map(|h| h.element_id), Some(card));
    assert_eq!(hit_test(pt(250.0, 250.0), &doc, None).map(|h| h.kind), Some(ElementKind::Drawing));
}

#[test]
fn connections_are_never_hit() {
    let mut doc = DocStore::new();
    add(&mut doc, "a", card_at(0.0, 0.0));
    add(&mut doc, "b", card_at(400.0, 0.0));
    add(&mut doc, "c", Payload::connection("a".into(), "b".into()));
    // Midpoint of the curve, between the two cards.
    assert!(hit_test(pt(300.0, 75.0), &doc, None).is_none());
}

#[test]
fn stale_selection_is_ignored() {
    let mut doc = DocStore::new();
    add(&mut doc, "a", card_at(0.0, 0.0));
    let gone = ElementId::new("gone");
    let hit = hit_test(pt(50.0, 50.0), &doc, Some(&gone)).unwrap();
    assert_eq!(hit.part, HitPart::Body);
}

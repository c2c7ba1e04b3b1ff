#![allow(clippy::float_cmp)]

use serde_json::json;

use super::*;

fn card_at(x: f64, y: f64) -> Payload {
    Payload::default_card(Point::new(x, y))
}

fn card_data(p: &Payload) -> &CardData {
    match p {
        Payload::Card(c) => c,
        other => panic!("expected card, got {other:?}"),
    }
}

// =============================================================
// ElementId
// =============================================================

#[test]
fn temporary_ids_are_unique_and_flagged() {
    let a = ElementId::temporary();
    let b = ElementId::temporary();
    assert_ne!(a, b);
    assert!(a.is_temporary());
    assert!(!ElementId::new("abc123").is_temporary());
}

#[test]
fn element_id_serializes_as_bare_string() {
    let v = serde_json::to_value(ElementId::from("e-1")).unwrap();
    assert_eq!(v, json!("e-1"));
}

// =============================================================
// Defaults
// =============================================================

#[test]
fn default_card_matches_house_style() {
    let c = card_data(&card_at(10.0, 20.0)).clone();
    assert_eq!((c.x, c.y, c.width, c.height), (10.0, 20.0, 200.0, 150.0));
    assert_eq!(c.text, "New Card");
    assert_eq!(c.color, "#6a994e");
}

#[test]
fn default_text_matches_house_style() {
    let Payload::Text(t) = Payload::default_text(Point::new(1.0, 2.0)) else {
        panic!("expected text");
    };
    assert_eq!(t.text, "New Text");
    assert_eq!(t.font_size, 16.0);
    assert_eq!(t.color, "#1f2937");
}

#[test]
fn connection_starts_unlabeled() {
    let p = Payload::connection("a".into(), "b".into());
    assert_eq!(p.kind(), ElementKind::Connection);
    assert_eq!(p.text(), None);
    assert_eq!(p.position(), None);
}

// =============================================================
// Wire format
// =============================================================

#[test]
fn element_serializes_to_wire_record() {
    let el = Element {
        id: "c1".into(),
        payload: card_at(5.0, 6.0),
        owner_id: "u1".into(),
        created_at: 1_700_000_000_000,
        updated_at: 1_700_000_000_500,
    };
    let v = serde_json::to_value(&el).unwrap();
    assert_eq!(v["id"], "c1");
    assert_eq!(v["variant"], "card");
    assert_eq!(v["ownerId"], "u1");
    assert_eq!(v["createdAt"], 1_700_000_000_000_i64);
    assert_eq!(v["payload"]["x"], 5.0);
    assert_eq!(v["payload"]["width"], 200.0);
}

#[test]
fn element_round_trips_through_json() {
    let el = Element {
        id: "t1".into(),
        payload: Payload::default_text(Point::new(0.0, 0.0)),
        owner_id: "u1".into(),
        created_at: 1,
        updated_at: 2,
    };
    let text = serde_json::to_string(&el).unwrap();
    let back: Element = serde_json::from_str(&text).unwrap();
    assert_eq!(back, el);
}

#[test]
fn connection_payload_uses_camel_case_ids() {
    let v = serde_json::to_value(Payload::connection("a".into(), "b".into())).unwrap();
    assert_eq!(v, json!({ "fromId": "a", "toId": "b" }));
}

#[test]
fn element_parse_rejects_payload_for_wrong_variant() {
    let raw = json!({
        "id": "x",
        "variant": "connection",
        "payload": { "x": 0, "y": 0, "width": 10, "height": 10, "text": "", "color": "#fff" },
        "ownerId": "u",
    });
    let err = serde_json::from_value::<Element>(raw).unwrap_err();
    assert!(err.to_string().contains("connection payload"));
}

#[test]
fn element_parse_defaults_missing_timestamps() {
    let raw = json!({
        "id": "d",
        "variant": "drawing",
        "payload": { "pathData": "M 0 0 L 10 10", "color": "#000", "strokeWidth": 2 },
        "ownerId": "u",
    });
    let el: Element = serde_json::from_value(raw).unwrap();
    assert_eq!(el.created_at, 0);
    assert_eq!(el.kind(), ElementKind::Drawing);
}

#[test]
fn from_parts_rejects_missing_fields() {
    let err = Payload::from_parts(ElementKind::Text, json!({ "x": 1 })).unwrap_err();
    assert!(matches!(err, ModelError::InvalidPayload(_)));
}

// =============================================================
// Patches
// =============================================================

#[test]
fn patch_moves_card_without_touching_other_fields() {
    let next = ElementPatch::position(50.0, 60.0).apply(&card_at(0.0, 0.0)).unwrap();
    let c = card_data(&next);
    assert_eq!((c.x, c.y), (50.0, 60.0));
    assert_eq!(c.width, 200.0);
    assert_eq!(c.text, "New Card");
}

#[test]
fn patch_leaves_input_untouched() {
    let original = card_at(0.0, 0.0);
    let _next = ElementPatch::text("changed").apply(&original).unwrap();
    assert_eq!(card_data(&original).text, "New Card");
}

#[test]
fn patch_rejects_field_variant_lacks() {
    let patch = ElementPatch { font_size: Some(20.0), ..Default::default() };
    let err = patch.apply(&card_at(0.0, 0.0)).unwrap_err();
    assert!(matches!(err, ModelError::InvalidPayload(msg) if msg.contains("fontSize")));
}

#[test]
fn patch_rejects_position_on_connection() {
    let conn = Payload::connection("a".into(), "b".into());
    assert!(ElementPatch::position(1.0, 1.0).apply(&conn).is_err());
}

#[test]
fn patch_sets_and_clears_connection_label() {
    let conn = Payload::connection("a".into(), "b".into());
    let labeled = ElementPatch { label: Some("depends on".into()), ..Default::default() }
        .apply(&conn)
        .unwrap();
    assert_eq!(labeled.text(), Some("depends on"));

    let cleared = ElementPatch { label: Some(String::new()), ..Default::default() }
        .apply(&labeled)
        .unwrap();
    assert_eq!(cleared.text(), None);
}

#[test]
fn patch_deserializes_from_camel_case() {
    let patch: ElementPatch = serde_json::from_value(json!({ "fontSize": 24, "text": "hi" })).unwrap();
    assert_eq!(patch.font_size, Some(24.0));
    assert_eq!(patch.text.as_deref(), Some("hi"));
    assert_eq!(patch.x, None);
}

// =============================================================
// Validation
// =============================================================

#[test]
fn validate_clamps_small_cards_to_floor() {
    let mut c = card_data(&card_at(0.0, 0.0)).clone();
    c.width = 10.0;
    c.height = 5.0;
    let v = validate(Payload::Card(c), |_| Some(ElementKind::Card)).unwrap();
    let c = card_data(&v);
    assert_eq!((c.width, c.height), (100.0, 80.0));
}

#[test]
fn validate_rejects_non_finite_position() {
    let mut c = card_data(&card_at(0.0, 0.0)).clone();
    c.x = f64::NAN;
    assert!(validate(Payload::Card(c), |_| Some(ElementKind::Card)).is_err());
}

#[test]
fn validate_rejects_empty_color() {
    let mut c = card_data(&card_at(0.0, 0.0)).clone();
    c.color = "  ".into();
    assert!(validate(Payload::Card(c), |_| Some(ElementKind::Card)).is_err());
}

#[test]
fn validate_rejects_non_positive_font_size() {
    let Payload::Text(mut t) = Payload::default_text(Point::new(0.0, 0.0)) else {
        panic!("expected text");
    };
    t.font_size = 0.0;
    assert!(validate(Payload::Text(t), |_| Some(ElementKind::Card)).is_err());
}

#[test]
fn validate_rejects_self_connection() {
    let p = Payload::connection("a".into(), "a".into());
    let err = validate(p, |_| Some(ElementKind::Card)).unwrap_err();
    assert!(matches!(err, ModelError::InvalidPayload(msg) if msg.contains("itself")));
}

#[test]
fn validate_rejects_unknown_endpoint() {
    let p = Payload::connection("a".into(), "ghost".into());
    let err = validate(p, |id| (id.as_str() == "a").then_some(ElementKind::Card)).unwrap_err();
    assert!(matches!(err, ModelError::InvalidPayload(msg) if msg.contains("ghost")));
}

#[test]
fn validate_accepts_known_endpoints() {
    let p = Payload::connection("a".into(), "b".into());
    assert!(validate(p, |_| Some(ElementKind::Card)).is_ok());
}

#[test]
fn validate_rejects_empty_drawing_path() {
    let p = Payload::Drawing(DrawingData { path_data: String::new(), color: "#000".into(), stroke_width: 2.0 });
    assert!(validate(p, |_| Some(ElementKind::Card)).is_err());
}

#[test]
fn validate_rejects_zero_stroke_width() {
    let p = Payload::Drawing(DrawingData { path_data: "M 0 0".into(), color: "#000".into(), stroke_width: 0.0 });
    assert!(validate(p, |_| Some(ElementKind::Card)).is_err());
}

#[test]
fn validate_rejects_drawing_without_coordinates() {
    let p = Payload::Drawing(DrawingData { path_data: "M".into(), color: "#000".into(), stroke_width: 2.0 });
    let err = validate(p, |_| Some(ElementKind::Card)).unwrap_err();
    assert!(matches!(err, ModelError::InvalidPayload(msg) if msg.contains("pathData")));
}

#[test]
fn validate_rejects_connection_endpoint() {
    let p = Payload::connection("a".into(), "link".into());
    let kind = |id: &ElementId| Some(if id.as_str() == "link" { ElementKind::Connection } else { ElementKind::Card });
    let err = validate(p, kind).unwrap_err();
    assert!(matches!(err, ModelError::InvalidPayload(msg) if msg.contains("link")));
}

#[test]
fn validate_update_keeps_connection_endpoints() {
    let current = Payload::connection("a".into(), "b".into());
    let moved = Payload::connection("a".into(), "ghost".into());
    assert!(validate_update(&current, moved).is_err());

    let Payload::Connection(mut relabeled) = current.clone() else { panic!("expected connection") };
    relabeled.label = Some("depends on".into());
    assert!(validate_update(&current, Payload::Connection(relabeled)).is_ok());
}

#[test]
fn validate_update_rejects_variant_change() {
    let current = card_at(0.0, 0.0);
    let next = Payload::default_text(Point::new(0.0, 0.0));
    assert!(validate_update(&current, next).is_err());
}

#![allow(clippy::float_cmp)]

use super::*;
use crate::camera::Point;
use crate::element::CardData;

// =============================================================
// Helpers
// =============================================================

fn card(id: &str, x: f64, y: f64) -> Element {
    Element {
        id: id.into(),
        payload: Payload::default_card(Point::new(x, y)),
        owner_id: "remote".into(),
        created_at: 1,
        updated_at: 1,
    }
}

fn text(id: &str) -> Element {
    Element {
        id: id.into(),
        payload: Payload::default_text(Point::new(0.0, 0.0)),
        owner_id: "remote".into(),
        created_at: 1,
        updated_at: 1,
    }
}

fn connection(id: &str, from: &str, to: &str) -> Element {
    Element {
        id: id.into(),
        payload: Payload::connection(from.into(), to.into()),
        owner_id: "remote".into(),
        created_at: 1,
        updated_at: 1,
    }
}

fn card_of(doc: &DocStore, id: &str) -> CardData {
    match doc.get(&id.into()).map(|el| &el.payload) {
        Some(Payload::Card(c)) => c.clone(),
        other => panic!("expected card {id}, got {other:?}"),
    }
}

fn endpoints(doc: &DocStore, id: &str) -> (String, String) {
    match doc.get(&id.into()).map(|el| &el.payload) {
        Some(Payload::Connection(c)) => (c.from_id.to_string(), c.to_id.to_string()),
        other => panic!("expected connection {id}, got {other:?}"),
    }
}

fn seeded() -> DocStore {
    let mut doc = DocStore::new();
    doc.apply_remote(ChangeEvent::Added(card("a", 0.0, 0.0)));
    doc.apply_remote(ChangeEvent::Added(card("b", 400.0, 0.0)));
    doc
}

// =============================================================
// Remote feed
// =============================================================

#[test]
fn added_inserts_element() {
    let doc = seeded();
    assert_eq!(doc.len(), 2);
    assert!(doc.contains(&"a".into()));
}

#[test]
fn modified_replaces_element() {
    let mut doc = seeded();
    assert!(doc.apply_remote(ChangeEvent::Modified(card("a", 99.0, 1.0))));
    assert_eq!(card_of(&doc, "a").x, 99.0);
}

#[test]
fn modified_for_unknown_id_inserts() {
    let mut doc = DocStore::new();
    assert!(doc.apply_remote(ChangeEvent::Modified(card("late", 1.0, 2.0))));
    assert!(doc.contains(&"late".into()));
}

#[test]
fn modified_changing_variant_is_ignored() {
    let mut doc = seeded();
    let mut impostor = text("a");
    impostor.updated_at = 5;
    assert!(!doc.apply_remote(ChangeEvent::Modified(impostor)));
    assert_eq!(doc.get(&"a".into()).map(Element::kind), Some(ElementKind::Card));
}

#[test]
fn removed_deletes_element() {
    let mut doc = seeded();
    assert!(doc.apply_remote(ChangeEvent::Removed("a".into())));
    assert!(!doc.contains(&"a".into()));
}

#[test]
fn removed_for_unknown_id_is_noop() {
    let mut doc = seeded();
    assert!(!doc.apply_remote(ChangeEvent::Removed("nope".into())));
    assert_eq!(doc.len(), 2);
}

#[test]
fn last_event_applied_wins_regardless_of_timestamp() {
    let mut doc = seeded();
    let mut newer = card("a", 10.0, 0.0);
    newer.updated_at = 100;
    let mut older = card("a", 20.0, 0.0);
    older.updated_at = 50;
    doc.apply_remote(ChangeEvent::Modified(newer));
    doc.apply_remote(ChangeEvent::Modified(older));
    assert_eq!(card_of(&doc, "a").x, 20.0);
}

#[test]
fn removing_endpoint_leaves_connection_in_place() {
    let mut doc = seeded();
    doc.apply_remote(ChangeEvent::Added(connection("c", "a", "b")));
    doc.apply_remote(ChangeEvent::Removed("a".into()));
    assert!(doc.contains(&"c".into()));
}

// =============================================================
// Local edits
// =============================================================

#[test]
fn create_inserts_under_temporary_id_and_queues_write() {
    let mut doc = DocStore::new();
    let (id, token) = doc.create(Payload::default_card(Point::new(5.0, 5.0)), "me").unwrap();
    assert!(id.is_temporary());
    assert!(doc.contains(&id));
    assert_eq!(doc.get(&id).map(|el| el.owner_id.as_str()), Some("me"));

    let pending = doc.take_pending();
    assert_eq!(pending.len(), 1);
    assert_eq!(pending[0].token, token);
    assert!(matches!(&pending[0].mutation, Mutation::Create { temp_id, .. } if *temp_id == id));
    assert!(!doc.has_pending());
}

#[test]
fn create_rejects_invalid_payload_without_side_effects() {
    let mut doc = seeded();
    let err = doc.create(Payload::connection("a".into(), "ghost".into()), "me").unwrap_err();
    assert!(matches!(err, ModelError::InvalidPayload(_)));
    assert_eq!(doc.len(), 2);
    assert!(!doc.has_pending());
}

#[test]
fn create_connection_between_known_elements() {
    let mut doc = seeded();
    let (id, _) = doc.create(Payload::connection("a".into(), "b".into()), "me").unwrap();
    assert_eq!(endpoints(&doc, id.as_str()), ("a".into(), "b".into()));
}

#[test]
fn mutate_local_applies_patch_and_queues_update() {
    let mut doc = seeded();
    let token = doc.mutate_local(&"a".into(), &ElementPatch::position(7.0, 8.0)).unwrap();
    let c = card_of(&doc, "a");
    assert_eq!((c.x, c.y), (7.0, 8.0));

    let pending = doc.take_pending();
    assert_eq!(pending.len(), 1);
    assert_eq!(pending[0].token, token);
    match &pending[0].mutation {
        Mutation::Update { id, payload } => {
            assert_eq!(id.as_str(), "a");
            assert_eq!(payload.position(), Some(Point::new(7.0, 8.0)));
        }
        other => panic!("expected update, got {other:?}"),
    }
}

#[test]
fn mutate_local_unknown_id_is_not_found() {
    let mut doc = seeded();
    let err = doc.mutate_local(&"zzz".into(), &ElementPatch::text("x")).unwrap_err();
    assert_eq!(err, ModelError::NotFound("zzz".into()));
}

#[test]
fn mutate_local_clamps_resize_to_floor() {
    let mut doc = seeded();
    doc.mutate_local(&"a".into(), &ElementPatch::size(20.0, 20.0)).unwrap();
    let c = card_of(&doc, "a");
    assert_eq!((c.width, c.height), (100.0, 80.0));
}

#[test]
fn mutate_local_invalid_patch_changes_nothing() {
    let mut doc = seeded();
    let bad = ElementPatch { font_size: Some(3.0), ..Default::default() };
    assert!(doc.mutate_local(&"a".into(), &bad).is_err());
    assert_eq!(card_of(&doc, "a").x, 0.0);
    assert!(!doc.has_pending());
}

#[test]
fn label_edit_on_orphaned_connection_succeeds() {
    let mut doc = seeded();
    doc.apply_remote(ChangeEvent::Added(connection("c", "a", "b")));
    doc.apply_remote(ChangeEvent::Removed("b".into()));
    let patch = ElementPatch { label: Some("still here".into()), ..Default::default() };
    assert!(doc.mutate_local(&"c".into(), &patch).is_ok());
}

#[test]
fn delete_removes_and_queues() {
    let mut doc = seeded();
    doc.delete(&"a".into()).unwrap();
    assert!(!doc.contains(&"a".into()));
    let pending = doc.take_pending();
    assert!(matches!(&pending[0].mutation, Mutation::Delete { id } if id.as_str() == "a"));
}

#[test]
fn delete_unknown_is_not_found() {
    let mut doc = seeded();
    assert_eq!(doc.delete(&"nope".into()), Err(ModelError::NotFound("nope".into())));
}

#[test]
fn write_tokens_increase_in_issue_order() {
    let mut doc = seeded();
    let t1 = doc.mutate_local(&"a".into(), &ElementPatch::text("1")).unwrap();
    let t2 = doc.mutate_local(&"b".into(), &ElementPatch::text("2")).unwrap();
    let t3 = doc.delete(&"a".into()).unwrap();
    assert!(t1 < t2 && t2 < t3);
    let order: Vec<WriteToken> = doc.take_pending().iter().map(|w| w.token).collect();
    assert_eq!(order, vec![t1, t2, t3]);
}

// =============================================================
// Confirming creates
// =============================================================

#[test]
fn confirm_created_rekeys_element() {
    let mut doc = DocStore::new();
    let (temp, _) = doc.create(Payload::default_card(Point::new(0.0, 0.0)), "me").unwrap();
    assert!(doc.confirm_created(&temp, &"durable".into()));
    assert!(!doc.contains(&temp));
    assert_eq!(doc.get(&"durable".into()).map(|el| el.id.as_str()), Some("durable"));
}

#[test]
fn confirm_created_after_echo_keeps_single_copy() {
    let mut doc = DocStore::new();
    let (temp, _) = doc.create(Payload::default_card(Point::new(0.0, 0.0)), "me").unwrap();
    doc.apply_remote(ChangeEvent::Added(card("durable", 0.0, 0.0)));
    assert!(doc.confirm_created(&temp, &"durable".into()));
    assert_eq!(doc.len(), 1);
}

#[test]
fn confirm_created_retargets_queued_writes() {
    let mut doc = seeded();
    let (temp, _) = doc.create(Payload::default_card(Point::new(0.0, 0.0)), "me").unwrap();
    doc.mutate_local(&temp, &ElementPatch::text("renamed")).unwrap();
    doc.create(Payload::connection("a".into(), temp.clone()), "me").unwrap();

    doc.confirm_created(&temp, &"real".into());

    let pending = doc.take_pending();
    assert_eq!(pending.len(), 3);
    assert!(matches!(&pending[0].mutation, Mutation::Create { temp_id, .. } if *temp_id == temp));
    assert_eq!(pending[1].mutation.target().as_str(), "real");
    match &pending[2].mutation {
        Mutation::Create { payload: Payload::Connection(c), .. } => assert_eq!(c.to_id.as_str(), "real"),
        other => panic!("expected connection create, got {other:?}"),
    }
}

#[test]
fn confirm_created_retargets_cached_connections() {
    let mut doc = seeded();
    let (temp, _) = doc.create(Payload::default_card(Point::new(0.0, 0.0)), "me").unwrap();
    let (conn, _) = doc.create(Payload::connection(temp.clone(), "a".into()), "me").unwrap();
    doc.confirm_created(&temp, &"real".into());
    assert_eq!(endpoints(&doc, conn.as_str()), ("real".into(), "a".into()));
}

#[test]
fn confirm_created_unknown_temp_returns_false() {
    let mut doc = seeded();
    assert!(!doc.confirm_created(&"tmp-missing".into(), &"x".into()));
    assert_eq!(doc.len(), 2);
}

// =============================================================
// Queries
// =============================================================

#[test]
fn sorted_elements_follow_layer_order() {
    let mut doc = seeded();
    doc.apply_remote(ChangeEvent::Added(text("t")));
    doc.apply_remote(ChangeEvent::Added(connection("c", "a", "b")));
    let kinds: Vec<ElementKind> = doc.sorted_elements().iter().map(|el| el.kind()).collect();
    assert_eq!(
        kinds,
        vec![ElementKind::Connection, ElementKind::Card, ElementKind::Card, ElementKind::Text]
    );
}

#[test]
fn sorted_elements_breaks_ties_by_id() {
    let doc = seeded();
    let ids: Vec<&str> = doc.sorted_elements().iter().map(|el| el.id.as_str()).collect();
    assert_eq!(ids, vec!["a", "b"]);
}

#[test]
fn empty_store() {
    let doc = DocStore::new();
    assert!(doc.is_empty());
    assert_eq!(doc.len(), 0);
    assert!(doc.sorted_elements().is_empty());
}

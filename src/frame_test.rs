use super::*;

#[test]
fn request_sets_fields() {
    let frame = Frame::request("element:create", Data::new());
    assert_eq!(frame.syscall, "element:create");
    assert_eq!(frame.status, Status::Request);
    assert!(frame.parent_id.is_none());
    assert!(frame.board_id.is_none());
    assert!(frame.ts > 0);
}

#[test]
fn reply_inherits_context() {
    let board_id = Uuid::new_v4();
    let req = Frame::request("element:update", Data::new()).with_board_id(board_id);
    let done = req.done();

    assert_eq!(done.parent_id, Some(req.id));
    assert_eq!(done.board_id, Some(board_id));
    assert_eq!(done.syscall, "element:update");
    assert_eq!(done.status, Status::Done);
}

#[test]
fn done_with_carries_data() {
    let req = Frame::request("element:create", Data::new());
    let done = req.done_with(Data::from([("id".to_owned(), serde_json::json!("e1"))]));
    assert_eq!(done.str_field("id"), Some("e1"));
}

#[test]
fn terminal_statuses() {
    assert!(Status::Done.is_terminal());
    assert!(Status::Error.is_terminal());
    assert!(!Status::Request.is_terminal());
}

#[test]
fn prefix_and_op_extraction() {
    let frame = Frame::request("element:delete", Data::new());
    assert_eq!(frame.prefix(), "element");
    assert_eq!(frame.op(), "delete");

    let frame = Frame::request("noseparator", Data::new());
    assert_eq!(frame.prefix(), "noseparator");
    assert_eq!(frame.op(), "");
}

#[test]
fn json_round_trip() {
    let board_id = Uuid::new_v4();
    let original = Frame::request("element:added", Data::new())
        .with_board_id(board_id)
        .with_data("key", "value");

    let json = serde_json::to_string(&original).expect("serialize");
    let restored: Frame = serde_json::from_str(&json).expect("deserialize");

    assert_eq!(restored.id, original.id);
    assert_eq!(restored.board_id, Some(board_id));
    assert_eq!(restored.syscall, "element:added");
    assert_eq!(restored.str_field("key"), Some("value"));
}

#[test]
fn board_id_is_omitted_when_unset() {
    let json = serde_json::to_value(Frame::request("element:create", Data::new())).expect("serialize");
    assert!(json.get("board_id").is_none());
}

#[test]
fn status_serializes_lowercase() {
    let json = serde_json::to_value(Status::Done).expect("serialize");
    assert_eq!(json, serde_json::json!("done"));
}

#[test]
fn error_from_typed() {
    #[derive(Debug, thiserror::Error)]
    #[error("not found")]
    struct NotFound;

    impl ErrorCode for NotFound {
        fn error_code(&self) -> &'static str {
            "E_NOT_FOUND"
        }
    }

    let req = Frame::request("element:update", Data::new());
    let err = req.error_from(&NotFound);

    assert_eq!(err.status, Status::Error);
    assert_eq!(err.str_field(FRAME_CODE), Some("E_NOT_FOUND"));
    assert_eq!(err.str_field(FRAME_MESSAGE), Some("not found"));
    assert_eq!(err.data.get(FRAME_RETRYABLE).and_then(serde_json::Value::as_bool), Some(false));
}

#[test]
fn plain_error_has_message_only() {
    let req = Frame::request("element:bogus", Data::new());
    let err = req.error("unknown element op: bogus");
    assert_eq!(err.status, Status::Error);
    assert!(err.data.get(FRAME_CODE).is_none());
}

#[test]
fn unknown_envelope_fields_are_ignored() {
    let json = serde_json::json!({
        "id": Uuid::new_v4(),
        "parent_id": null,
        "ts": 1,
        "from": "user-1",
        "syscall": "element:delete",
        "status": "request",
        "data": { "id": "e1" }
    });
    let frame: Frame = serde_json::from_value(json).expect("deserialize");
    assert_eq!(frame.op(), "delete");
    assert!(serde_json::to_value(&frame).expect("serialize").get("from").is_none());
}

#[test]
fn only_three_statuses_exist() {
    assert!(serde_json::from_value::<Status>(serde_json::json!("item")).is_err());
    assert!(serde_json::from_value::<Status>(serde_json::json!("cancel")).is_err());
}

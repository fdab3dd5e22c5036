//! Tests for field operations

use serde_json::json;
use sluice_protocol::Payload;

use super::*;
use crate::default_registry;

fn event(value: Value) -> Event {
    Event::with_payload("raw", 0, Payload::Json(value))
}

fn json_of(event: &Event) -> &Value {
    event.payload().and_then(Payload::as_json).unwrap()
}

#[test]
fn test_delete_fields() {
    let op = DeleteField::new(vec!["password".into(), "user.token".into(), "absent".into()]);
    let out = op
        .perform(event(json!({"password": "x", "user": {"token": "t", "id": 1}, "keep": true})))
        .unwrap()
        .unwrap();
    assert_eq!(json_of(&out), &json!({"user": {"id": 1}, "keep": true}));
}

#[test]
fn test_delete_on_text_payload_is_noop() {
    let op = DeleteField::new(vec!["a".into()]);
    let e = Event::with_payload("raw", 0, Payload::Text("a".into()));
    assert_eq!(op.perform(e.clone()).unwrap(), Some(e));
}

#[test]
fn test_set_field() {
    let op = SetField::new("meta.env", json!("prod"));
    let out = op.perform(event(json!({"a": 1}))).unwrap().unwrap();
    assert_eq!(json_of(&out), &json!({"a": 1, "meta": {"env": "prod"}}));
}

#[test]
fn test_set_field_on_text_fails() {
    let op = SetField::new("env", json!("prod"));
    let e = Event::with_payload("raw", 0, Payload::Text("x".into()));
    assert!(op.perform(e).is_err());
    assert!(op.perform(Event::new("raw", 0)).is_err());
}

#[test]
fn test_factories() {
    let registry = default_registry();
    let builder = ChainBuilder::new(&registry, 8);

    assert!(DeleteFieldFactory.create(&ComponentConfig::new("delete_field"), &builder).is_err());
    let delete = ComponentConfig::new("delete_field").with_option("field", "a");
    assert!(DeleteFieldFactory.create(&delete, &builder).is_ok());

    assert!(SetFieldFactory.create(&ComponentConfig::new("set_field").with_option("field", "a"), &builder).is_err());
    let set = ComponentConfig::new("set_field")
        .with_option("field", "n")
        .with_option("value", 42);
    let Operation::Event(op) = SetFieldFactory.create(&set, &builder).unwrap() else {
        panic!("expected event operation");
    };
    let out = op.perform(event(json!({}))).unwrap().unwrap();
    assert_eq!(json_of(&out), &json!({"n": 42}));
}

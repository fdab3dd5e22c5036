//! Tests for operation chains

use futures_util::StreamExt;
use serde_json::json;
use sluice_protocol::{Event, Payload};

use super::*;
use crate::fields::{DeleteField, SetField};
use crate::filter::BasicFilter;
use crate::noop::NoopOperation;
use crate::{Operation, from_events};

fn json_event(value: serde_json::Value) -> Event {
    Event::with_payload("raw", 0, Payload::Json(value))
}

#[tokio::test]
async fn test_empty_chain_is_identity() {
    let chain = Chain::empty();
    assert!(chain.is_empty());
    assert_eq!(chain.len(), 0);

    let input = vec![Event::new("foo", 0), Event::new("bar", 0)];
    let out: Vec<_> = chain.apply(from_events(input.clone())).collect().await;
    let out: Vec<Event> = out.into_iter().map(|r| r.unwrap()).collect();
    assert_eq!(out, input);
}

#[test]
fn test_default_chain_is_empty() {
    assert!(Chain::default().is_empty());
}

#[tokio::test]
async fn test_operations_apply_in_order() {
    let chain = Chain::new(vec![
        OperationProcessor::new(Operation::event(SetField::new("a", json!(1)))),
        OperationProcessor::new(Operation::event(DeleteField::new(vec!["a".into()]))),
        OperationProcessor::new(Operation::event(SetField::new("b", json!(2)))),
    ]);
    assert_eq!(chain.names(), vec!["set_field", "delete_field", "set_field"]);

    let out: Vec<_> = chain
        .apply(from_events(vec![json_event(json!({}))]))
        .collect()
        .await;
    let event = out.into_iter().next().unwrap().unwrap();
    assert_eq!(event.payload().unwrap().as_json(), Some(&json!({"b": 2})));
}

#[tokio::test]
async fn test_filter_stops_later_operations() {
    let chain = Chain::new(vec![
        OperationProcessor::new(Operation::filter(BasicFilter::new(false))),
        OperationProcessor::new(Operation::event(NoopOperation)),
    ]);

    let out: Vec<_> = chain
        .apply(from_events(vec![Event::new("a", 0)]))
        .collect()
        .await;
    assert!(out.is_empty());
    assert_eq!(chain.get("noop").unwrap().metrics().snapshot().success, 0);
    assert!(chain.get("missing").is_none());
}

#[tokio::test]
async fn test_chain_is_reusable() {
    let chain = Chain::new(vec![OperationProcessor::new(Operation::event(NoopOperation))]);

    for _ in 0..2 {
        let out: Vec<_> = chain
            .apply(from_events(vec![Event::new("a", 0)]))
            .collect()
            .await;
        assert_eq!(out.len(), 1);
    }
    assert_eq!(chain.processors()[0].metrics().snapshot().success, 2);
}

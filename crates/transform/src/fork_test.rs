//! Tests for fork fan-out

use std::time::Duration;

use futures_util::StreamExt;
use futures_util::stream;
use serde_json::json;
use sluice_protocol::{Event, Payload};
use tokio::sync::mpsc;
use tokio_stream::wrappers::ReceiverStream;

use super::*;
use crate::fields::SetField;
use crate::filter::BasicFilter;
use crate::noop::NoopOperation;
use crate::{
    EventOperation, Operation, OperationProcessor, TransformError, TransformResult, from_events,
};

/// Appends a suffix to the event text
struct Append(&'static str);

impl EventOperation for Append {
    fn perform(&self, mut event: Event) -> TransformResult<Option<Event>> {
        let text = format!("{}{}", text(&event), self.0);
        event.set_payload(Payload::Text(text));
        Ok(Some(event))
    }

    fn name(&self) -> &'static str {
        "append"
    }
}

struct Failing;

impl EventOperation for Failing {
    fn perform(&self, _event: Event) -> TransformResult<Option<Event>> {
        Err(TransformError::failed("branch failure"))
    }

    fn name(&self) -> &'static str {
        "failing"
    }
}

fn text(event: &Event) -> String {
    event
        .payload()
        .and_then(Payload::as_text)
        .unwrap_or(event.raw())
        .to_string()
}

fn chain(ops: Vec<Operation>) -> Chain {
    Chain::new(ops.into_iter().map(OperationProcessor::new).collect())
}

fn inputs(texts: &[&str]) -> Vec<Event> {
    texts.iter().map(|t| Event::new(*t, 0)).collect()
}

async fn collect_ok(stream: EventStream) -> Vec<Event> {
    stream.map(|r| r.unwrap()).collect().await
}

// =============================================================================
// Fan-out and merge
// =============================================================================

#[tokio::test]
async fn test_emits_k_times_m_events() {
    let fork = Fork::new(
        vec![
            chain(vec![Operation::event(NoopOperation)]),
            chain(vec![Operation::event(NoopOperation)]),
            Chain::empty(),
        ],
        4,
    );

    let out = collect_ok(fork.apply(from_events(inputs(&["a", "b", "c", "d", "e"])))).await;
    assert_eq!(out.len(), 15);
}

#[tokio::test]
async fn test_two_branch_outputs_are_deterministic_as_multisets() {
    for _ in 0..2 {
        let fork = Fork::new(
            vec![
                chain(vec![Operation::event(Append("+"))]),
                chain(vec![Operation::event(Append("-"))]),
            ],
            1,
        );

        let out = collect_ok(fork.apply(from_events(inputs(&["a", "b"])))).await;
        let mut texts: Vec<String> = out.iter().map(text).collect();
        texts.sort();
        assert_eq!(texts, vec!["a+", "a-", "b+", "b-"]);
    }
}

#[tokio::test]
async fn test_order_preserved_within_branch() {
    let fork = Fork::new(
        vec![
            chain(vec![Operation::event(Append("/x"))]),
            chain(vec![Operation::event(Append("/y"))]),
        ],
        2,
    );
    let input: Vec<String> = (0..50).map(|i| i.to_string()).collect();
    let refs: Vec<&str> = input.iter().map(String::as_str).collect();

    let out = collect_ok(fork.apply(from_events(inputs(&refs)))).await;

    for suffix in ["/x", "/y"] {
        let branch: Vec<String> = out
            .iter()
            .map(text)
            .filter_map(|t| t.strip_suffix(suffix).map(str::to_string))
            .collect();
        assert_eq!(branch, input);
    }
}

// =============================================================================
// Isolation between branches
// =============================================================================

#[tokio::test]
async fn test_branch_drop_affects_only_its_copy() {
    let fork = Fork::new(
        vec![
            chain(vec![Operation::filter(BasicFilter::new(false))]),
            chain(vec![Operation::event(Append("!"))]),
        ],
        4,
    );

    let out = collect_ok(fork.apply(from_events(inputs(&["a", "b"])))).await;
    let texts: Vec<String> = out.iter().map(text).collect();
    assert_eq!(texts, vec!["a!", "b!"]);
}

#[tokio::test]
async fn test_branches_receive_deep_copies() {
    let fork = Fork::new(
        vec![
            chain(vec![Operation::event(SetField::new("branch", json!("one")))]),
            Chain::empty(),
        ],
        4,
    );
    let input = Event::with_payload("raw", 0, Payload::Json(json!({"v": 1})));

    let out = collect_ok(fork.apply(from_events(vec![input]))).await;
    let mut payloads: Vec<String> = out
        .iter()
        .map(|e| e.payload().unwrap().as_json().unwrap().to_string())
        .collect();
    payloads.sort();

    assert_eq!(payloads, vec![r#"{"branch":"one","v":1}"#, r#"{"v":1}"#]);
}

// =============================================================================
// Nesting and metrics
// =============================================================================

#[tokio::test]
async fn test_nested_fork() {
    let inner = Fork::new(
        vec![
            chain(vec![Operation::event(Append("1"))]),
            chain(vec![Operation::event(Append("2"))]),
        ],
        2,
    );
    let outer = Fork::new(
        vec![
            Chain::new(vec![OperationProcessor::new(Operation::Fork(inner))]),
            chain(vec![Operation::event(Append("3"))]),
        ],
        2,
    );

    let out = collect_ok(outer.apply(from_events(inputs(&["a", "b"])))).await;
    let mut texts: Vec<String> = out.iter().map(text).collect();
    texts.sort();
    assert_eq!(texts, vec!["a1", "a2", "a3", "b1", "b2", "b3"]);
}

#[tokio::test]
async fn test_counters_are_per_branch() {
    let fork = Fork::new(
        vec![
            chain(vec![Operation::event(NoopOperation)]),
            chain(vec![
                Operation::filter(BasicFilter::new(false)),
                Operation::event(NoopOperation),
            ]),
        ],
        4,
    );

    let out = collect_ok(fork.apply(from_events(inputs(&["a", "b", "c"])))).await;
    assert_eq!(out.len(), 3);

    let first = fork.branches()[0].processors()[0].metrics().snapshot();
    let filter = fork.branches()[1].processors()[0].metrics().snapshot();
    let after_filter = fork.branches()[1].processors()[1].metrics().snapshot();

    assert_eq!(first.success, 3);
    assert_eq!(filter.dropped, 3);
    assert_eq!(after_filter.success, 0);
}

// =============================================================================
// Errors and cancellation
// =============================================================================

#[tokio::test]
async fn test_upstream_error_forwarded_once() {
    let fork = Fork::new(vec![Chain::empty(), Chain::empty(), Chain::empty()], 4);
    let input = stream::iter(vec![
        Ok(Event::new("a", 0)),
        Err(TransformError::failed("upstream")),
    ])
    .boxed();

    let out: Vec<_> = fork.apply(input).collect().await;
    assert_eq!(out.iter().filter(|r| r.is_err()).count(), 1);
    assert_eq!(out.iter().filter(|r| r.is_ok()).count(), 3);
}

#[tokio::test]
async fn test_branch_error_reaches_output() {
    let fork = Fork::new(
        vec![Chain::empty(), chain(vec![Operation::event(Failing)])],
        4,
    );

    let out: Vec<_> = fork.apply(from_events(inputs(&["a"]))).collect().await;
    let err = out.iter().find_map(|r| r.as_ref().err()).unwrap();
    assert!(err.to_string().contains("failing"));
}

#[tokio::test]
async fn test_dropping_output_cancels_upstream() {
    let (tx, rx) = mpsc::channel::<TransformResult<Event>>(1);
    let fork = Fork::new(vec![Chain::empty(), Chain::empty()], 1);

    let mut output = fork.apply(ReceiverStream::new(rx).boxed());
    tx.send(Ok(Event::new("a", 0))).await.unwrap();
    assert!(output.next().await.unwrap().is_ok());
    drop(output);

    tokio::time::timeout(Duration::from_secs(5), tx.closed())
        .await
        .expect("fork did not release its input after the output was dropped");
}

#[tokio::test]
async fn test_zero_branches_drain_input() {
    let fork = Fork::new(Vec::new(), 4);
    let out: Vec<_> = fork.apply(from_events(inputs(&["a", "b"]))).collect().await;
    assert!(out.is_empty());
}

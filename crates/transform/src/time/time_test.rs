//! Tests for the time operation

use serde_json::json;
use sluice_protocol::Payload;

use super::*;

fn event(value: serde_json::Value) -> Event {
    Event::with_payload("raw", 5, Payload::Json(value))
}

#[test]
fn test_seconds() {
    let op = TimeOperation::new("ts", TimeFormat::Seconds);
    let out = op.perform(event(json!({"ts": 1_700_000_000.5}))).unwrap().unwrap();
    assert_eq!(out.occurrence_time_ms(), 1_700_000_000_500);
    assert_eq!(out.arrival_time_ms(), 5);
}

#[test]
fn test_milliseconds_from_string() {
    let op = TimeOperation::new("ts", TimeFormat::Milliseconds);
    let out = op.perform(event(json!({"ts": "1700000000123"}))).unwrap().unwrap();
    assert_eq!(out.occurrence_time_ms(), 1_700_000_000_123);
}

#[test]
fn test_rfc3339() {
    let op = TimeOperation::new("at", TimeFormat::parse("rfc3339"));
    let out = op
        .perform(event(json!({"at": "1970-01-01T00:00:01.250Z"})))
        .unwrap()
        .unwrap();
    assert_eq!(out.occurrence_time_ms(), 1_250);
}

#[test]
fn test_strftime_pattern() {
    let op = TimeOperation::new("at", TimeFormat::parse("%Y-%m-%d %H:%M:%S"));
    let out = op
        .perform(event(json!({"at": "1970-01-01 00:01:00"})))
        .unwrap()
        .unwrap();
    assert_eq!(out.occurrence_time_ms(), 60_000);
}

#[test]
fn test_missing_field_is_error() {
    let op = TimeOperation::new("ts", TimeFormat::Seconds);
    let err = op.perform(event(json!({}))).unwrap_err();
    assert!(matches!(err, TransformError::FieldNotFound(_)));
}

#[test]
fn test_unparsable_value_is_error() {
    let op = TimeOperation::new("ts", TimeFormat::Seconds);
    let err = op.perform(event(json!({"ts": "yesterday"}))).unwrap_err();
    assert!(err.to_string().contains("yesterday"));
}

#[test]
fn test_format_parse() {
    assert_eq!(TimeFormat::parse("seconds"), TimeFormat::Seconds);
    assert_eq!(TimeFormat::parse("milliseconds"), TimeFormat::Milliseconds);
    assert_eq!(TimeFormat::parse("%s"), TimeFormat::Pattern("%s".into()));
}

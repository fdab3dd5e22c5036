use super::*;
use sluice_protocol::Payload;
use sluice_transform::codec::{
    BasicWrapper, JsonDeserializer, JsonSerializer, TextDeserializer, TextSerializer,
};

// =============================================================================
// PreFilter
// =============================================================================

#[test]
fn test_prefilter_contains() {
    let filter = PreFilter::new(vec!["loop".into()], Vec::new());
    assert!(filter.matches("in a loop"));
    assert!(!filter.matches("foo"));
}

#[test]
fn test_prefilter_regex() {
    let filter = PreFilter::new(Vec::new(), vec![Regex::new("^DEBUG").unwrap()]);
    assert!(filter.matches("DEBUG starting"));
    assert!(!filter.matches("INFO DEBUG"));
}

#[test]
fn test_prefilter_empty_keeps_everything() {
    let filter = PreFilter::default();
    assert!(filter.is_empty());
    assert!(!filter.matches("anything"));
}

#[test]
fn test_prefilter_from_config() {
    let mut config = SourceConfig::new("app");
    config.contains_strings = vec!["healthcheck".into()];
    config.regex_patterns = vec!["^\\s*$".into()];

    let filter = PreFilter::from_config(&config).unwrap();
    assert!(filter.matches("GET /healthcheck"));
    assert!(filter.matches("   "));
    assert!(!filter.matches("GET /orders"));

    config.regex_patterns = vec!["(".into()];
    assert!(PreFilter::from_config(&config).is_err());
}

// =============================================================================
// Deserialize
// =============================================================================

#[test]
fn test_deserialize_sets_payload_and_partition() {
    let stage = DeserializerProcessor::new(
        Arc::new(JsonDeserializer::new()),
        vec![
            PartitionSpec::new("service", vec!["service".into()]),
            PartitionSpec::new("region", vec!["region".into()]).with_default("global"),
        ],
    );
    let metrics = PipelineMetrics::new();

    let event = stage
        .process(Event::new(r#"{"service":"auth","n":1}"#, 0), &metrics)
        .unwrap();

    assert_eq!(event.payload().unwrap().field_string("n").as_deref(), Some("1"));
    assert_eq!(event.partition().get("service"), Some("auth"));
    assert_eq!(event.partition().get("region"), Some("global"));
    assert_eq!(metrics.snapshot().deserialize_errors, 0);
}

#[test]
fn test_deserialize_without_specs_keeps_empty_key() {
    let stage = DeserializerProcessor::new(Arc::new(TextDeserializer), Vec::new());
    let metrics = PipelineMetrics::new();

    let event = stage.process(Event::new("plain", 0), &metrics).unwrap();
    assert!(event.partition().is_empty());
    assert_eq!(event.payload(), Some(&Payload::Text("plain".into())));
}

#[test]
fn test_deserialize_failures_dropped_and_counted() {
    let stage = DeserializerProcessor::new(Arc::new(JsonDeserializer::new()), Vec::new());
    let metrics = PipelineMetrics::new();

    assert!(stage.process(Event::new("{not json", 0), &metrics).is_none());
    assert!(stage.process(Event::new("null", 0), &metrics).is_none());
    assert!(stage.process(Event::new("{}", 0), &metrics).is_some());

    assert_eq!(metrics.snapshot().deserialize_errors, 2);
}

// =============================================================================
// Serialize
// =============================================================================

#[test]
fn test_serialize_sets_bytes() {
    let stage = SerializerProcessor::new(Arc::new(JsonSerializer));
    let metrics = PipelineMetrics::new();

    let event = Event::with_payload("raw", 0, Payload::Json(serde_json::json!({"a": 1})));
    let event = stage.process(event, &metrics).unwrap();
    assert_eq!(&event.serialized().unwrap()[..], br#"{"a":1}"#);
}

#[test]
fn test_serialize_without_payload_dropped() {
    let stage = SerializerProcessor::new(Arc::new(TextSerializer));
    let metrics = PipelineMetrics::new();

    assert!(stage.process(Event::new("raw", 0), &metrics).is_none());
    assert_eq!(metrics.snapshot().serialize_errors, 1);
}

#[test]
fn test_serialize_with_basic_wrapper() {
    let stage =
        SerializerProcessor::new(Arc::new(JsonSerializer)).with_wrapper(Arc::new(BasicWrapper));
    let metrics = PipelineMetrics::new();

    let mut event = Event::with_payload("abc", 7, Payload::Text("abc".into()));
    event.insert_metadata("route", "app");
    let event = stage.process(event, &metrics).unwrap();

    let value: serde_json::Value = serde_json::from_slice(event.serialized().unwrap()).unwrap();
    assert_eq!(
        value,
        serde_json::json!({
            "sha1_hash": "a9993e364706816aba3e25717850c26c9cd0d89d",
            "timestamp": 7,
            "arrival_time": 7,
            "metadata": {"route": "app"},
            "payload": "abc",
        })
    );
}

use super::*;

#[test]
fn test_noop_passes_event_through() {
    let event = Event::new("foo", 7);
    let out = NoopOperation::new().perform(event.clone()).unwrap();
    assert_eq!(out, Some(event));
}

#[test]
fn test_noop_name() {
    assert_eq!(NoopOperation.name(), "noop");
}

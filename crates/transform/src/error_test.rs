//! Tests for transform errors

use super::*;

#[test]
fn test_operation_error_names_operation() {
    let err = TransformError::operation("time", TransformError::field_not_found("ts"));
    let msg = err.to_string();
    assert!(msg.contains("'time'"));
    assert!(msg.contains("field 'ts' not found"));
    assert!(std::error::Error::source(&err).is_some());
}

#[test]
fn test_constructors() {
    assert!(matches!(TransformError::failed("x"), TransformError::Failed(_)));
    assert!(matches!(TransformError::config("x"), TransformError::Config(_)));
    assert!(
        TransformError::deserialize("eof")
            .to_string()
            .contains("deserialize")
    );
    assert!(
        TransformError::serialize("nan")
            .to_string()
            .contains("serialize")
    );
}

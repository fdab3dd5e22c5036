use super::*;
use sluice_protocol::{Bytes, Record};

fn serialized(text: &str) -> Event {
    let mut event = Event::from(Record::new(text, 0));
    event.set_serialized(Bytes::copy_from_slice(text.as_bytes()));
    event
}

// =============================================================================
// Capacity
// =============================================================================

#[test]
fn test_add_writes_lines() {
    let mut buffer = LineBuffer::new(10, 1024);
    buffer.add(&serialized("foo")).unwrap();
    buffer.add(&serialized("bar")).unwrap();

    assert_eq!(buffer.len(), 2);
    assert!(!buffer.is_empty());
    assert_eq!(buffer.contents(), b"foo\nbar\n");
}

#[test]
fn test_full_on_event_limit() {
    let mut buffer = LineBuffer::new(2, 1024);
    buffer.add(&serialized("a")).unwrap();
    buffer.add(&serialized("b")).unwrap();

    assert!(matches!(buffer.add(&serialized("c")), Err(BufferError::Full)));
    assert_eq!(buffer.len(), 2);
}

#[test]
fn test_full_on_byte_limit() {
    let mut buffer = LineBuffer::new(100, 8);
    buffer.add(&serialized("abc")).unwrap();
    buffer.add(&serialized("def")).unwrap();

    assert!(matches!(buffer.add(&serialized("g")), Err(BufferError::Full)));
    assert_eq!(buffer.contents(), b"abc\ndef\n");
}

#[test]
fn test_oversized_event_never_fits() {
    let mut buffer = LineBuffer::new(100, 4);
    assert!(matches!(buffer.add(&serialized("toolong")), Err(BufferError::Full)));
    assert!(buffer.is_empty());
}

#[test]
fn test_unserialized_event_rejected() {
    let mut buffer = LineBuffer::new(10, 1024);
    let event = Event::from(Record::new("raw", 0));
    assert!(matches!(buffer.add(&event), Err(BufferError::Unserialized)));
}

#[test]
fn test_from_config() {
    let config = BufferConfig {
        max_events: 1,
        max_bytes: 1024,
        compression: Compression::Lz4,
    };
    let mut buffer = LineBuffer::from_config(&config);
    assert_eq!(buffer.compression(), Compression::Lz4);

    buffer.add(&serialized("x")).unwrap();
    assert!(matches!(buffer.add(&serialized("y")), Err(BufferError::Full)));
}

// =============================================================================
// Close / clear
// =============================================================================

#[test]
fn test_close_rejects_adds() {
    let mut buffer = LineBuffer::new(10, 1024);
    buffer.add(&serialized("a")).unwrap();
    buffer.close();

    assert!(buffer.is_closed());
    assert!(matches!(buffer.add(&serialized("b")), Err(BufferError::Closed)));
    assert_eq!(buffer.contents(), b"a\n");
}

#[test]
fn test_lz4_close_compresses() {
    let mut buffer = LineBuffer::new(100, 1024).with_compression(Compression::Lz4);
    for _ in 0..20 {
        buffer.add(&serialized("repeated line")).unwrap();
    }
    let plain = buffer.contents().to_vec();

    buffer.close();
    buffer.close();

    let restored = lz4_flex::decompress_size_prepended(buffer.contents()).unwrap();
    assert_eq!(restored, plain);
    assert!(buffer.contents().len() < plain.len());
}

#[test]
fn test_clear_resets() {
    let mut buffer = LineBuffer::new(1, 1024);
    buffer.add(&serialized("a")).unwrap();
    buffer.close();
    buffer.clear();

    assert!(buffer.is_empty());
    assert!(buffer.contents().is_empty());
    assert!(!buffer.is_closed());
    buffer.add(&serialized("b")).unwrap();
}

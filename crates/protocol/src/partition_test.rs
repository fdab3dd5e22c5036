//! Tests for partition keys

use std::collections::HashMap;

use crate::PartitionKey;

#[test]
fn test_empty_key_is_default() {
    let key = PartitionKey::default();
    assert!(key.is_empty());
    assert_eq!(key, PartitionKey::empty());
    assert_eq!(key.to_string(), "");
}

#[test]
fn test_structural_equality() {
    let a: PartitionKey = [("service", "api"), ("day", "2024-01-01")].into_iter().collect();
    let mut b = PartitionKey::empty();
    b.push("service", "api");
    b.push("day", "2024-01-01");

    assert_eq!(a, b);

    let mut map = HashMap::new();
    map.insert(a, 1);
    assert_eq!(map.get(&b), Some(&1));
}

#[test]
fn test_order_matters() {
    let a: PartitionKey = [("a", "1"), ("b", "2")].into_iter().collect();
    let b: PartitionKey = [("b", "2"), ("a", "1")].into_iter().collect();
    assert_ne!(a, b);
}

#[test]
fn test_get_and_display() {
    let key: PartitionKey = [("service", "api"), ("region", "eu")].into_iter().collect();

    assert_eq!(key.get("region"), Some("eu"));
    assert_eq!(key.get("missing"), None);
    assert_eq!(key.len(), 2);
    assert_eq!(key.to_string(), "service=api/region=eu");
}

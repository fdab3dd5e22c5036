//! Partition keys
//!
//! A `PartitionKey` is the ordered list of `(name, value)` pairs computed for
//! an event after deserialization. Dispatch keeps at most one live buffer
//! per structurally-equal key.

use std::fmt;

/// Ordered, structurally-compared set of partition values
///
/// Equality and hashing consider both the pairs and their order, so
/// `[a=1, b=2]` and `[b=2, a=1]` are different keys. The empty key is the
/// default partition.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct PartitionKey(Vec<(String, String)>);

impl PartitionKey {
    /// The default (empty) partition
    #[inline]
    pub const fn empty() -> Self {
        Self(Vec::new())
    }

    /// Create a key from ordered pairs
    pub fn new(pairs: Vec<(String, String)>) -> Self {
        Self(pairs)
    }

    /// Append one pair, keeping insertion order
    pub fn push(&mut self, name: impl Into<String>, value: impl Into<String>) {
        self.0.push((name.into(), value.into()));
    }

    /// Value of the named partition, if present
    pub fn get(&self, name: &str) -> Option<&str> {
        self.0
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, v)| v.as_str())
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Iterate over `(name, value)` pairs in order
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.0.iter().map(|(n, v)| (n.as_str(), v.as_str()))
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for PartitionKey {
    fn from_iter<T: IntoIterator<Item = (K, V)>>(iter: T) -> Self {
        Self(
            iter.into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        )
    }
}

/// Renders `name=value` pairs joined by `/`, the layout used for
/// partitioned output paths
impl fmt::Display for PartitionKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, (name, value)) in self.0.iter().enumerate() {
            if i > 0 {
                f.write_str("/")?;
            }
            write!(f, "{name}={value}")?;
        }
        Ok(())
    }
}

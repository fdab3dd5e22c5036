//! Newline-delimited event buffer
//!
//! [`LineBuffer`] is the buffer behind every built-in transport. Each
//! serialized event becomes one line; the buffer reports full once either
//! the event or the byte limit would be exceeded.
//!
//! With [`Compression::Lz4`] the whole buffer is compressed when it is
//! closed, using the size-prepended lz4 block format.

use bytes::BytesMut;
use sluice_config::{BufferConfig, Compression};
use sluice_protocol::Event;

use crate::{Buffer, BufferError};

#[cfg(test)]
#[path = "buffer_test.rs"]
mod tests;

/// Buffer of newline-terminated serialized events
#[derive(Debug)]
pub struct LineBuffer {
    data: BytesMut,
    events: usize,
    max_events: usize,
    max_bytes: usize,
    compression: Compression,
    closed: bool,
}

impl LineBuffer {
    pub fn new(max_events: usize, max_bytes: usize) -> Self {
        Self {
            data: BytesMut::new(),
            events: 0,
            max_events: max_events.max(1),
            max_bytes: max_bytes.max(1),
            compression: Compression::None,
            closed: false,
        }
    }

    pub fn from_config(config: &BufferConfig) -> Self {
        Self::new(config.max_events, config.max_bytes).with_compression(config.compression)
    }

    #[must_use]
    pub fn with_compression(mut self, compression: Compression) -> Self {
        self.compression = compression;
        self
    }

    #[inline]
    pub fn compression(&self) -> Compression {
        self.compression
    }

    #[inline]
    pub fn is_closed(&self) -> bool {
        self.closed
    }

    /// Uncompressed bytes held so far
    #[inline]
    pub fn byte_len(&self) -> usize {
        self.data.len()
    }
}

impl Buffer for LineBuffer {
    fn add(&mut self, event: &Event) -> Result<(), BufferError> {
        if self.closed {
            return Err(BufferError::Closed);
        }
        let line = event.serialized().ok_or(BufferError::Unserialized)?;

        let needed = line.len() + 1;
        if self.events >= self.max_events || self.data.len() + needed > self.max_bytes {
            return Err(BufferError::Full);
        }

        self.data.reserve(needed);
        self.data.extend_from_slice(line);
        self.data.extend_from_slice(b"\n");
        self.events += 1;
        Ok(())
    }

    fn len(&self) -> usize {
        self.events
    }

    fn close(&mut self) {
        if self.closed {
            return;
        }
        self.closed = true;
        if self.compression == Compression::Lz4 && !self.data.is_empty() {
            let compressed = lz4_flex::compress_prepend_size(&self.data);
            self.data = BytesMut::from(&compressed[..]);
        }
    }

    fn clear(&mut self) {
        self.data.clear();
        self.events = 0;
        self.closed = false;
    }

    fn contents(&self) -> &[u8] {
        &self.data
    }
}

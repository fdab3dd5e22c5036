//! Raw records and the sources that produce them
//!
//! A `RecordSource` is the pull interface over the records of a single
//! invocation. The ingestion feeder is its only reader; the invocation
//! wrapper closes it when the invocation ends, whatever the outcome.

use std::io::BufRead;

use crate::{Result, SourceError};

/// Current wall-clock time in milliseconds since the Unix epoch
#[inline]
pub fn now_millis() -> i64 {
    chrono::Utc::now().timestamp_millis()
}

/// One raw record as produced by a source
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Record {
    /// Raw record text
    pub text: String,

    /// When the record entered the system (ms since epoch)
    pub arrival_time_ms: i64,
}

impl Record {
    /// Create a record with an explicit arrival time
    pub fn new(text: impl Into<String>, arrival_time_ms: i64) -> Self {
        Self {
            text: text.into(),
            arrival_time_ms,
        }
    }

    /// Create a record stamped with the current time
    pub fn now(text: impl Into<String>) -> Self {
        Self::new(text, now_millis())
    }
}

/// Pull interface over the records of one invocation
///
/// `next_record` returns `None` once the source is exhausted. A returned
/// error is fatal for the invocation.
///
/// `close` must be idempotent: it is called by the ingestion feeder when it
/// stops and again by the invocation wrapper on every exit path.
pub trait RecordSource: Send {
    /// Pull the next record, or `None` when exhausted
    fn next_record(&mut self) -> Option<Result<Record>>;

    /// Release any resources held by the source
    fn close(&mut self) -> Result<()> {
        Ok(())
    }
}

impl<S: RecordSource + ?Sized> RecordSource for Box<S> {
    fn next_record(&mut self) -> Option<Result<Record>> {
        (**self).next_record()
    }

    fn close(&mut self) -> Result<()> {
        (**self).close()
    }
}

/// Record source over an in-memory iterator
///
/// Each item becomes one record stamped at pull time.
pub struct IterSource<I> {
    inner: I,
    closed: bool,
}

impl<I> IterSource<I> {
    pub fn new(inner: I) -> Self {
        Self {
            inner,
            closed: false,
        }
    }

    /// Whether `close` has been called
    pub fn is_closed(&self) -> bool {
        self.closed
    }
}

impl<I, T> RecordSource for IterSource<I>
where
    I: Iterator<Item = T> + Send,
    T: Into<String>,
{
    fn next_record(&mut self) -> Option<Result<Record>> {
        if self.closed {
            return None;
        }
        self.inner.next().map(|text| Ok(Record::now(text)))
    }

    fn close(&mut self) -> Result<()> {
        self.closed = true;
        Ok(())
    }
}

/// Line-oriented record source over any buffered reader
///
/// Every line (without its terminator) is one record. Empty lines are
/// skipped. Invalid UTF-8 is replaced with U+FFFD rather than failing the
/// read.
pub struct ReaderSource<R> {
    reader: Option<R>,
    line: Vec<u8>,
}

impl<R: BufRead> ReaderSource<R> {
    pub fn new(reader: R) -> Self {
        Self {
            reader: Some(reader),
            line: Vec::new(),
        }
    }
}

impl<R: BufRead + Send> RecordSource for ReaderSource<R> {
    fn next_record(&mut self) -> Option<Result<Record>> {
        let reader = self.reader.as_mut()?;
        loop {
            self.line.clear();
            match reader.read_until(b'\n', &mut self.line) {
                Ok(0) => return None,
                Ok(_) => {
                    let text = String::from_utf8_lossy(&self.line);
                    let text = text.trim_end_matches(['\n', '\r']);
                    if text.is_empty() {
                        continue;
                    }
                    return Some(Ok(Record::now(text)));
                }
                Err(e) => return Some(Err(SourceError::Io(e))),
            }
        }
    }

    fn close(&mut self) -> Result<()> {
        self.reader = None;
        Ok(())
    }
}

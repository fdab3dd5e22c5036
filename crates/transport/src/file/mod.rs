//! File transport - one file per buffer, partitioned into directories
//!
//! Every sent buffer becomes a new file. The partition key selects the
//! directory, one `name=value` level per partition field:
//!
//! ```text
//! out/
//! ├── 2c1f...e0.log                 # empty partition key
//! └── region=eu/
//!     └── level=error/
//!         ├── 8a02...4f.log
//!         └── d913...77.log.lz4     # compression = "lz4"
//! ```
//!
//! Files are written under a hidden temporary name and renamed into place,
//! so readers never observe a partial file.
//!
//! ```toml
//! [transport]
//! type = "file"
//! path = "out/"
//! extension = "log"
//! ```

use std::path::{Path, PathBuf};
use std::sync::Arc;

use async_trait::async_trait;
use sluice_config::{BufferConfig, ComponentOptions, Compression, TransportConfig};
use sluice_protocol::PartitionKey;
use uuid::Uuid;

use crate::{
    Buffer, LineBuffer, PartitionedTransport, Result, Transport, TransportError, TransportFactory,
};

#[cfg(test)]
#[path = "file_test.rs"]
mod tests;

/// Default file extension
pub const DEFAULT_EXTENSION: &str = "log";

/// Factory for [`FileTransport`]
#[derive(Debug, Clone)]
pub struct FileTransportFactory {
    root: PathBuf,
    extension: String,
    buffer: BufferConfig,
    threads: usize,
}

impl FileTransportFactory {
    pub fn new(root: impl Into<PathBuf>, buffer: BufferConfig, threads: usize) -> Self {
        Self {
            root: root.into(),
            extension: DEFAULT_EXTENSION.to_string(),
            buffer,
            threads: threads.max(1),
        }
    }

    #[must_use]
    pub fn with_extension(mut self, extension: impl Into<String>) -> Self {
        self.extension = extension.into();
        self
    }

    /// Build from `[transport]` options
    ///
    /// # Errors
    /// Returns `TransportError::Config` when `path` is missing
    pub fn from_config(config: &TransportConfig) -> Result<Arc<dyn TransportFactory>> {
        let root = config
            .get_str("path")
            .ok_or_else(|| TransportError::config("file transport requires 'path'"))?;

        let mut factory = Self::new(root, config.buffer.clone(), config.threads);
        if let Some(extension) = config.get_str("extension") {
            factory = factory.with_extension(extension);
        }
        Ok(Arc::new(factory))
    }

    #[inline]
    pub fn root(&self) -> &Path {
        &self.root
    }

    fn file_name(&self) -> String {
        let id = Uuid::new_v4().simple();
        match self.buffer.compression {
            Compression::None => format!("{id}.{}", self.extension),
            Compression::Lz4 => format!("{id}.{}.lz4", self.extension),
        }
    }
}

#[async_trait]
impl TransportFactory for FileTransportFactory {
    fn new_instance(&self) -> Result<Transport> {
        Ok(Transport::Partitioned(Box::new(FileTransport {
            root: self.root.clone(),
            file_name: self.file_name(),
        })))
    }

    fn new_buffer(&self) -> Result<Box<dyn Buffer>> {
        Ok(Box::new(LineBuffer::from_config(&self.buffer)))
    }

    fn max_threads(&self) -> usize {
        self.threads
    }

    fn name(&self) -> &'static str {
        "file"
    }
}

/// Writes one buffer to one file
pub struct FileTransport {
    root: PathBuf,
    file_name: String,
}

#[async_trait]
impl PartitionedTransport for FileTransport {
    async fn send(&mut self, buffer: &dyn Buffer, partition: &PartitionKey) -> Result<()> {
        let dir = partition_dir(&self.root, partition);
        tokio::fs::create_dir_all(&dir).await?;

        let tmp = dir.join(format!(".{}.tmp", self.file_name));
        let target = dir.join(&self.file_name);

        if let Err(e) = tokio::fs::write(&tmp, buffer.contents()).await {
            let _ = tokio::fs::remove_file(&tmp).await;
            return Err(e.into());
        }
        tokio::fs::rename(&tmp, &target).await?;

        tracing::debug!(
            path = %target.display(),
            events = buffer.len(),
            bytes = buffer.contents().len(),
            "buffer written"
        );
        Ok(())
    }
}

/// Directory for a partition key: one `name=value` level per field
pub fn partition_dir(root: &Path, partition: &PartitionKey) -> PathBuf {
    let mut dir = root.to_path_buf();
    for (name, value) in partition.iter() {
        dir.push(format!("{}={}", sanitize(name), sanitize(value)));
    }
    dir
}

/// Replace characters that would escape or split a path segment
fn sanitize(segment: &str) -> String {
    let cleaned: String = segment
        .chars()
        .map(|c| match c {
            '/' | '\\' | '\0' => '_',
            c => c,
        })
        .collect();
    match cleaned.as_str() {
        "" => "_".to_string(),
        "." | ".." => cleaned.replace('.', "_"),
        _ => cleaned,
    }
}

//! File store — serves job input files as compressed FileData envelopes.
//!
//! Encoded envelopes are cached per file name so repeated fetches from a
//! worker pool compress each file once. File exchange is independent of
//! task state; workers may fetch and cache files whenever they like.

use std::path::PathBuf;
use std::sync::Arc;

use bytes::Bytes;
use dashmap::DashMap;

use hive_core::envelope::{Envelope, EnvelopeError, MessageKind};

#[derive(Debug, thiserror::Error)]
pub enum FileError {
    #[error("file not found: {0}")]
    NotFound(String),

    #[error("failed to encode {0}: {1}")]
    Encoding(String, EnvelopeError),

    #[error("failed to read {0}: {1}")]
    Io(String, std::io::Error),
}

/// Serves the input files of one job, rooted at the job directory.
#[derive(Clone)]
pub struct FileStore {
    job_id: u64,
    root: PathBuf,
    /// file name → encoded FileData envelope bytes.
    cache: Arc<DashMap<String, Bytes>>,
}

impl FileStore {
    pub fn new(job_id: u64, root: PathBuf) -> Self {
        Self {
            job_id,
            root,
            cache: Arc::new(DashMap::new()),
        }
    }

    /// Read a job input file and return it framed as a FileData envelope.
    ///
    /// File names come off the wire and are untrusted: anything that is not
    /// a bare name inside the job directory is reported as not found.
    pub fn fetch(&self, job_id: u64, file_name: &str) -> Result<Bytes, FileError> {
        if job_id != self.job_id {
            return Err(FileError::NotFound(file_name.to_string()));
        }
        if !is_bare_name(file_name) {
            tracing::warn!(file_name, "rejecting file request with path components");
            return Err(FileError::NotFound(file_name.to_string()));
        }

        if let Some(cached) = self.cache.get(file_name) {
            return Ok(cached.clone());
        }

        let path = self.root.join(file_name);
        let data = std::fs::read(&path).map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                FileError::NotFound(file_name.to_string())
            } else {
                FileError::Io(file_name.to_string(), e)
            }
        })?;

        let envelope = Envelope::encode(MessageKind::FileData, self.job_id, Some(&data))
            .map_err(|e| FileError::Encoding(file_name.to_string(), e))?;
        tracing::info!(
            file_name,
            raw = envelope.raw_size,
            compressed = envelope.compressed_size,
            "file encoded for transfer"
        );

        let bytes = Bytes::from(envelope.to_bytes());
        self.cache.insert(file_name.to_string(), bytes.clone());
        Ok(bytes)
    }

    /// Number of files with a cached encoding.
    pub fn cached_files(&self) -> usize {
        self.cache.len()
    }
}

fn is_bare_name(name: &str) -> bool {
    !name.is_empty() && !name.contains('/') && !name.contains('\\') && name != "." && name != ".."
}

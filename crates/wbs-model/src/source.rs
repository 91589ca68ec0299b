//! Acquisition of document bytes.
//!
//! The sync engine never reaches out to the network or filesystem itself; it
//! asks a [`DocumentSource`] for the freshest bytes and treats failures
//! according to their kind. A missing document is a normal condition (the
//! team may simply not have published yet); a timeout or I/O failure is an
//! environmental error worth reporting.

use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Why a document could not be fetched.
#[derive(Debug, Error)]
pub enum SourceError {
    /// No document has been published at this location.
    #[error("no WBS document found at {0}")]
    NotFound(String),

    /// The location exists but did not answer in time.
    #[error("timed out fetching WBS document from {0}")]
    Timeout(String),

    /// Any other acquisition failure.
    #[error("failed to fetch WBS document")]
    Io(#[from] std::io::Error),
}

/// Supplies the freshest available bytes of the team document.
pub trait DocumentSource: Send {
    /// Human-readable location, for logs and error messages.
    fn description(&self) -> String;

    /// Fetches the current document bytes.
    fn fetch(&self) -> Result<Vec<u8>, SourceError>;
}

/// A source backed by an in-memory byte buffer.
#[derive(Debug, Clone)]
pub struct BytesSource {
    name: String,
    bytes: Vec<u8>,
}

impl BytesSource {
    /// Wraps a byte buffer under a display name.
    #[must_use]
    pub fn new(name: impl Into<String>, bytes: Vec<u8>) -> Self {
        Self { name: name.into(), bytes }
    }
}

impl DocumentSource for BytesSource {
    fn description(&self) -> String {
        self.name.clone()
    }

    fn fetch(&self) -> Result<Vec<u8>, SourceError> {
        Ok(self.bytes.clone())
    }
}

/// A source that reads the document from a file on each fetch.
#[derive(Debug, Clone)]
pub struct FileSource {
    path: PathBuf,
}

impl FileSource {
    /// A source reading from the given path.
    #[must_use]
    pub fn new(path: impl AsRef<Path>) -> Self {
        Self { path: path.as_ref().to_path_buf() }
    }
}

impl DocumentSource for FileSource {
    fn description(&self) -> String {
        self.path.display().to_string()
    }

    fn fetch(&self) -> Result<Vec<u8>, SourceError> {
        match std::fs::read(&self.path) {
            Ok(bytes) => Ok(bytes),
            Err(e) if e.kind() == ErrorKind::NotFound => {
                Err(SourceError::NotFound(self.description()))
            }
            Err(e) if e.kind() == ErrorKind::TimedOut => {
                Err(SourceError::Timeout(self.description()))
            }
            Err(e) => Err(SourceError::Io(e)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn bytes_source_returns_its_buffer() {
        let src = BytesSource::new("inline", b"abc".to_vec());
        assert_eq!(src.fetch().unwrap(), b"abc");
        assert_eq!(src.description(), "inline");
    }

    #[test]
    fn file_source_reads_file_contents() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(b"{\"x\":1}").unwrap();
        let src = FileSource::new(file.path());
        assert_eq!(src.fetch().unwrap(), b"{\"x\":1}");
    }

    #[test]
    fn missing_file_maps_to_not_found() {
        let dir = tempfile::tempdir().unwrap();
        let src = FileSource::new(dir.path().join("nope.json"));
        assert!(matches!(src.fetch().unwrap_err(), SourceError::NotFound(_)));
    }
}

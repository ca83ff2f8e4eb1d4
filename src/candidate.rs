//! Candidate files handed to the viewer by a drop, the file dialog, or the
//! path prompt.
//!
//! A `CandidateFile` only knows its name, its size and where its bytes live.
//! Content is reached through `read_prefix` and `read_text`, which are meant
//! to run on the loader worker, never on the UI thread.

use std::fs;
use std::io::Read;
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// Failure while reading a candidate's bytes.
#[derive(Debug, thiserror::Error)]
pub enum ReadError {
    #[error("failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Where a candidate's bytes come from.
#[derive(Debug, Clone)]
pub enum FileSource {
    /// A file on disk (file dialog, path prompt, native drop).
    Path(PathBuf),
    /// Bytes delivered inline with the drop event.
    Memory(Arc<[u8]>),
}

/// A user-supplied file that has not been accepted yet.
#[derive(Debug, Clone)]
pub struct CandidateFile {
    name: Option<String>,
    size: u64,
    source: FileSource,
}

impl CandidateFile {
    /// Build a candidate for a file on disk. The size comes from metadata;
    /// a file whose metadata cannot be read gets size 0 and fails later on
    /// the actual read.
    pub fn from_path(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned());
        let size = fs::metadata(&path).map(|m| m.len()).unwrap_or(0);
        Self {
            name,
            size,
            source: FileSource::Path(path),
        }
    }

    /// Build a candidate from bytes carried by the drop payload itself.
    pub fn from_bytes(name: Option<String>, bytes: Arc<[u8]>) -> Self {
        Self {
            name,
            size: bytes.len() as u64,
            source: FileSource::Memory(bytes),
        }
    }

    pub fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    /// Name for messages and the title bar.
    pub fn display_name(&self) -> &str {
        match self.name() {
            Some(name) if !name.is_empty() => name,
            _ => "untitled",
        }
    }

    pub fn size(&self) -> u64 {
        self.size
    }

    pub fn source(&self) -> &FileSource {
        &self.source
    }

    pub fn path(&self) -> Option<&Path> {
        match &self.source {
            FileSource::Path(path) => Some(path),
            FileSource::Memory(_) => None,
        }
    }

    /// True when the name carries an extension at all. Absent and empty
    /// names count as extension-less.
    pub fn has_extension(&self) -> bool {
        self.name().is_some_and(|name| name.contains('.'))
    }

    /// Read at most `limit` bytes from the start of the file. A smaller
    /// file is read whole; the recorded size plays no part, so a file that
    /// grew since acquisition is still sampled.
    pub fn read_prefix(&self, limit: usize) -> Result<Vec<u8>, ReadError> {
        match &self.source {
            FileSource::Memory(bytes) => Ok(bytes[..limit.min(bytes.len())].to_vec()),
            FileSource::Path(path) => {
                let file = fs::File::open(path).map_err(|source| ReadError::Io {
                    path: path.clone(),
                    source,
                })?;
                let mut buf = Vec::with_capacity(limit);
                file.take(limit as u64)
                    .read_to_end(&mut buf)
                    .map_err(|source| ReadError::Io {
                        path: path.clone(),
                        source,
                    })?;
                Ok(buf)
            }
        }
    }

    /// Read the whole file as UTF-8 text. Invalid sequences are replaced
    /// rather than rejected.
    pub fn read_text(&self) -> Result<String, ReadError> {
        let bytes = match &self.source {
            FileSource::Memory(bytes) => bytes.to_vec(),
            FileSource::Path(path) => fs::read(path).map_err(|source| ReadError::Io {
                path: path.clone(),
                source,
            })?,
        };
        Ok(decode_text(&bytes))
    }
}

/// Lossy UTF-8 decoding, dropping a leading byte-order mark.
pub(crate) fn decode_text(bytes: &[u8]) -> String {
    let bytes = bytes.strip_prefix(b"\xEF\xBB\xBF").unwrap_or(bytes);
    String::from_utf8_lossy(bytes).into_owned()
}

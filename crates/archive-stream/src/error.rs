//! Error types for archive streaming operations.

use std::fmt;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Where in the traversal a read failure happened.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReadStage {
    /// Reading the next member header.
    Header,
    /// Reading decoded member data.
    Data,
}

impl fmt::Display for ReadStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ReadStage::Header => f.write_str("header"),
            ReadStage::Data => f.write_str("data"),
        }
    }
}

/// Main error type for reading archives.
#[derive(Debug, Error)]
pub enum ArchiveError {
    /// The archive could not be opened (missing file, unrecognized format,
    /// permission failure). No decoder handle is left allocated.
    #[error("Unable to open archive {}: {reason}", .path.display())]
    Open {
        /// Archive path as given to the reader
        path: PathBuf,
        /// Decoder diagnostic, or a description of the failed check
        reason: String,
    },

    /// A header or data read failed after the archive was opened.
    #[error("Unable to read archive {} ({stage}): {reason}", .path.display())]
    Read {
        /// Archive path as given to the reader
        path: PathBuf,
        /// Whether a header or member data was being read
        stage: ReadStage,
        /// Decoder diagnostic, or a description of the failed check
        reason: String,
    },
}

impl ArchiveError {
    pub(crate) fn open(path: &Path, reason: impl Into<String>) -> Self {
        ArchiveError::Open {
            path: path.to_path_buf(),
            reason: reason.into(),
        }
    }

    pub(crate) fn read(path: &Path, stage: ReadStage, reason: impl Into<String>) -> Self {
        ArchiveError::Read {
            path: path.to_path_buf(),
            stage,
            reason: reason.into(),
        }
    }

    /// True for setup failures raised by `open`.
    pub fn is_open_error(&self) -> bool {
        matches!(self, ArchiveError::Open { .. })
    }

    /// True for mid-stream failures raised by `advance` or `read_chunk`.
    pub fn is_read_error(&self) -> bool {
        matches!(self, ArchiveError::Read { .. })
    }

    /// Path of the archive the error refers to.
    pub fn path(&self) -> &Path {
        match self {
            ArchiveError::Open { path, .. } | ArchiveError::Read { path, .. } => path,
        }
    }
}

/// Result alias used throughout the crate.
pub type Result<T, E = ArchiveError> = std::result::Result<T, E>;

/// Failure while draining a member into a writer.
#[derive(Debug, Error)]
pub enum CopyError {
    /// The decoder failed while producing member data.
    #[error(transparent)]
    Archive(#[from] ArchiveError),

    /// The destination writer failed.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Security-related errors during unpacking.
#[derive(Debug, Error)]
pub enum SecurityError {
    /// Path traversal attempt detected (e.g., "../../../etc/passwd").
    #[error("Path traversal attempt: {0}")]
    PathTraversal(String),

    /// Absolute path not allowed in archive entries.
    #[error("Absolute path not allowed: {0}")]
    AbsolutePath(String),

    /// Unsafe entry type detected (e.g., symlink or device node).
    #[error("Unsafe entry type: {0}")]
    UnsafeEntryType(String),
}

/// Main error type for unpacking an archive to disk.
#[derive(Debug, Error)]
pub enum UnpackError {
    /// Opening or reading the archive failed.
    #[error(transparent)]
    Archive(#[from] ArchiveError),

    /// A security violation was detected while unpacking.
    #[error("Security violation: {0}")]
    Security(#[from] SecurityError),

    /// The unpack size limit was exceeded.
    #[error("Size limit exceeded: {current} bytes > {limit} bytes")]
    SizeLimitExceeded {
        /// Bytes that would have been written including the current chunk
        current: u64,
        /// Configured size limit in bytes
        limit: u64,
    },

    /// An I/O error occurred while writing output.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Unpacking was cancelled by the user.
    #[error("Cancelled by user")]
    Cancelled,
}

impl From<CopyError> for UnpackError {
    fn from(err: CopyError) -> Self {
        match err {
            CopyError::Archive(e) => UnpackError::Archive(e),
            CopyError::Io(e) => UnpackError::Io(e),
        }
    }
}

//! Type definitions shared by the reader, listing and unpacking.

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Read-ahead block size handed to the decoder when opening a file.
pub const DEFAULT_BLOCK_SIZE: usize = 10240;

/// Capacity of the reusable chunk buffer.
pub const DEFAULT_CHUNK_SIZE: usize = 10240;

/// Options for opening an archive.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReaderOptions {
    /// Bytes the decoder reads from the file per request
    pub block_size: usize,

    /// Upper bound on the length of one chunk returned by `read_chunk`
    pub chunk_size: usize,
}

impl Default for ReaderOptions {
    fn default() -> Self {
        Self {
            block_size: DEFAULT_BLOCK_SIZE,
            chunk_size: DEFAULT_CHUNK_SIZE,
        }
    }
}

impl ReaderOptions {
    /// Replaces zero sizes with the defaults.
    pub(crate) fn normalized(self) -> Self {
        let defaults = Self::default();
        Self {
            block_size: if self.block_size == 0 {
                defaults.block_size
            } else {
                self.block_size
            },
            chunk_size: if self.chunk_size == 0 {
                defaults.chunk_size
            } else {
                self.chunk_size
            },
        }
    }
}

/// Kind of archive member, taken from the type bits of its mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EntryKind {
    /// Regular file
    File,
    /// Directory
    Directory,
    /// Symbolic link
    Symlink,
    /// Device node, FIFO, socket or unknown type
    Other,
}

impl EntryKind {
    pub(crate) fn from_mode(mode: u32) -> Self {
        const S_IFMT: u32 = 0o170000;
        const S_IFREG: u32 = 0o100000;
        const S_IFDIR: u32 = 0o040000;
        const S_IFLNK: u32 = 0o120000;

        match mode & S_IFMT {
            S_IFREG => EntryKind::File,
            S_IFDIR => EntryKind::Directory,
            S_IFLNK => EntryKind::Symlink,
            _ => EntryKind::Other,
        }
    }
}

/// Owned snapshot of one member's metadata.
///
/// Unlike [`crate::ArchiveEntry`] this survives the next `advance` call.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EntryInfo {
    /// Path of the member within the archive
    pub path: String,

    /// Size in bytes as reported by the archive (0 when unknown)
    pub size: i64,

    /// Member kind
    pub kind: EntryKind,
}

impl EntryInfo {
    /// Whether this member is a directory.
    pub fn is_directory(&self) -> bool {
        self.kind == EntryKind::Directory
    }
}

/// Result of walking every header of an archive without reading data.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ArchiveSummary {
    /// Container format reported by the decoder (e.g., "GNU tar format")
    pub format: Option<String>,

    /// Compression filters applied under the container, outermost first
    pub filters: Vec<String>,

    /// Every member in archive order
    pub entries: Vec<EntryInfo>,

    /// Sum of the sizes of all members
    pub total_size: i64,
}

/// Options for unpacking an archive to disk.
#[derive(Debug, Clone)]
pub struct UnpackOptions {
    /// Maximum total bytes written (default: 20 GB)
    pub size_limit_bytes: Option<u64>,

    /// Reader configuration used for the session
    pub reader: ReaderOptions,
}

impl Default for UnpackOptions {
    fn default() -> Self {
        Self {
            size_limit_bytes: Some(20 * 1024 * 1024 * 1024), // 20 GB
            reader: ReaderOptions::default(),
        }
    }
}

/// Statistics about a completed unpack operation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UnpackStats {
    /// Number of regular files written
    pub files_written: u64,

    /// Number of directories created for directory members
    pub directories_created: u64,

    /// Members skipped because of unsafe paths or types
    pub entries_skipped: u64,

    /// Total bytes written to disk
    pub bytes_written: u64,

    /// Duration of the unpack operation (in seconds)
    #[serde(with = "duration_serde")]
    pub duration: Duration,
}

impl Default for UnpackStats {
    fn default() -> Self {
        Self {
            files_written: 0,
            directories_created: 0,
            entries_skipped: 0,
            bytes_written: 0,
            duration: Duration::from_secs(0),
        }
    }
}

// Helper module for Duration serialization
mod duration_serde {
    use serde::{Deserialize, Deserializer, Serialize, Serializer};
    use std::time::Duration;

    pub fn serialize<S>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        duration.as_secs().serialize(serializer)
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Duration, D::Error>
    where
        D: Deserializer<'de>,
    {
        let secs = u64::deserialize(deserializer)?;
        Ok(Duration::from_secs(secs))
    }
}

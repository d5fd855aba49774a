//! # Archive Stream
//!
//! Forward-only, chunked reading of compressed archives through libarchive.
//!
//! An [`ArchiveReader`] opens a container whose compression filter and format
//! are detected from its content, walks the members one header at a time and
//! streams each member's decoded bytes through a fixed-size buffer. Memory use
//! stays bounded whatever the member sizes.
//!
//! ## Supported Formats
//!
//! Whatever the linked libarchive can read: tar (with gzip, bzip2, xz, zstd,
//! ...), ZIP, 7-Zip, cpio, ISO 9660, RPM and more.
//!
//! ## Example
//!
//! ```rust,no_run
//! use archive_stream::ArchiveReader;
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let mut reader = ArchiveReader::new("sample.tar.gz");
//! let mut session = reader.open()?;
//!
//! loop {
//!     let info = match session.advance()? {
//!         Some(entry) => entry.to_info(),
//!         None => break,
//!     };
//!     if info.is_directory() {
//!         continue;
//!     }
//!
//!     let mut total = 0;
//!     loop {
//!         let chunk = session.read_chunk()?;
//!         if chunk.is_empty() {
//!             break;
//!         }
//!         total += chunk.len();
//!     }
//!     println!("{}: {} bytes", info.path, total);
//! }
//!
//! session.close();
//! # Ok(())
//! # }
//! ```

mod entry;
pub mod error;
mod ffi;
pub mod probe;
pub mod reader;
pub mod safety;
pub mod types;
pub mod unpack;

// Re-export main types
pub use entry::ArchiveEntry;
pub use error::{ArchiveError, CopyError, ReadStage, Result, SecurityError, UnpackError};
pub use reader::{ArchiveReader, Session};
pub use types::{
    ArchiveSummary, EntryInfo, EntryKind, ReaderOptions, UnpackOptions, UnpackStats,
    DEFAULT_BLOCK_SIZE, DEFAULT_CHUNK_SIZE,
};

use std::path::Path;
use std::sync::atomic::AtomicBool;

/// Type alias for unpack progress callbacks.
///
/// The callback receives:
/// - `file`: The member that was just written
/// - `bytes_written`: Number of bytes written so far
///
/// Returns `true` to continue, `false` to cancel.
pub type ProgressCallback<'a> = dyn Fn(&str, u64) -> bool + Send + Sync + 'a;

/// List the members of an archive without decoding their data.
///
/// # Errors
///
/// Returns [`ArchiveError::Open`] if the archive cannot be opened and
/// [`ArchiveError::Read`] if a header cannot be read.
pub fn list(path: &Path) -> Result<ArchiveSummary> {
    probe::list_archive(path, ReaderOptions::default())
}

/// Unpack an archive into the specified output directory.
///
/// # Errors
///
/// Returns an error if:
/// - The archive cannot be opened or is corrupted mid-stream
/// - The size limit is exceeded
/// - Unpacking is cancelled
/// - I/O errors occur while writing
pub fn unpack(
    archive_path: &Path,
    output_dir: &Path,
    options: &UnpackOptions,
    progress_cb: &ProgressCallback,
    cancel_flag: &AtomicBool,
) -> std::result::Result<UnpackStats, UnpackError> {
    unpack::unpack_archive(archive_path, output_dir, options, progress_cb, cancel_flag)
}

//! Streaming reader over a single archive file.
//!
//! An [`ArchiveReader`] is created from a path without touching the filesystem.
//! [`ArchiveReader::open`] allocates the decoder and returns a [`Session`]: the
//! only place where members can be iterated and their data pulled. The session
//! releases the decoder when closed or dropped, and the reader itself frees any
//! handle still held when it goes out of scope.

use crate::entry::ArchiveEntry;
use crate::error::{ArchiveError, CopyError, ReadStage, Result};
use crate::ffi::{self, Status};
use crate::types::{EntryKind, ReaderOptions};
use std::ffi::{CStr, CString};
use std::io::Write;
use std::mem::ManuallyDrop;
use std::path::{Path, PathBuf};
use std::ptr::{self, NonNull};
use tracing::{debug, trace, warn};

/// Position of the session within the member sequence.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Cursor {
    /// Opened, no header read yet.
    Start,
    /// Positioned on a member produced by the last `advance`.
    OnEntry,
    /// End of archive reported; stays here for good.
    Exhausted,
    /// The decoder reported an error; nothing further is read.
    Failed,
}

/// Exclusively owned libarchive read handle.
///
/// Freed exactly once: either through [`Handle::free`], which reports the
/// decoder's status, or by `Drop`.
struct Handle {
    raw: NonNull<ffi::archive>,
    current: Option<NonNull<ffi::archive_entry>>,
}

// SAFETY: libarchive handles carry no thread affinity. `Handle` is not `Sync`,
// so it is only ever used from one thread at a time.
unsafe impl Send for Handle {}

impl Handle {
    /// Allocates a decoder with every filter and format enabled and opens `c_path`.
    ///
    /// The handle is freed before returning on any failure.
    fn open(path: &Path, c_path: &CStr, block_size: usize) -> Result<Self> {
        let raw = NonNull::new(unsafe { ffi::archive_read_new() })
            .ok_or_else(|| ArchiveError::open(path, "Unable to allocate decoder"))?;
        let handle = Handle { raw, current: None };

        unsafe {
            let code = ffi::archive_read_support_filter_all(handle.as_ptr());
            if code < ffi::ARCHIVE_WARN {
                return Err(ArchiveError::open(path, handle.error_message(code)));
            }
            let code = ffi::archive_read_support_format_all(handle.as_ptr());
            if code < ffi::ARCHIVE_WARN {
                return Err(ArchiveError::open(path, handle.error_message(code)));
            }
        }

        let code =
            unsafe { ffi::archive_read_open_filename(handle.as_ptr(), c_path.as_ptr(), block_size) };
        if Status::from_code(code) != Status::Ok {
            return Err(ArchiveError::open(path, handle.error_message(code)));
        }

        Ok(handle)
    }

    fn as_ptr(&self) -> *mut ffi::archive {
        self.raw.as_ptr()
    }

    /// Diagnostic for the last failed call, falling back to the raw code.
    fn error_message(&self, code: libc::c_int) -> String {
        unsafe {
            let msg = ffi::archive_error_string(self.as_ptr());
            if !msg.is_null() {
                return CStr::from_ptr(msg).to_string_lossy().into_owned();
            }
            let errno = ffi::archive_errno(self.as_ptr());
            if errno != 0 {
                return std::io::Error::from_raw_os_error(errno).to_string();
            }
        }
        format!("Decoder returned status {}", code)
    }

    fn format_name(&self) -> Option<String> {
        unsafe {
            let name = ffi::archive_format_name(self.as_ptr());
            if name.is_null() {
                None
            } else {
                Some(CStr::from_ptr(name).to_string_lossy().into_owned())
            }
        }
    }

    fn filters(&self) -> Vec<String> {
        let count = unsafe { ffi::archive_filter_count(self.as_ptr()) };
        (0..count)
            .filter_map(|n| unsafe {
                let name = ffi::archive_filter_name(self.as_ptr(), n);
                if name.is_null() {
                    None
                } else {
                    Some(CStr::from_ptr(name).to_string_lossy().into_owned())
                }
            })
            .filter(|name| name != "none")
            .collect()
    }

    /// Releases the handle and reports whether the decoder accepted the release.
    fn free(self) -> bool {
        let handle = ManuallyDrop::new(self);
        let code = unsafe { ffi::archive_read_free(handle.as_ptr()) };
        code == ffi::ARCHIVE_OK
    }
}

impl Drop for Handle {
    fn drop(&mut self) {
        unsafe {
            ffi::archive_read_free(self.as_ptr());
        }
    }
}

/// Forward-only reader for one archive file.
///
/// Holds the decoder handle and the reusable chunk buffer. The handle is
/// present exactly while a [`Session`] obtained from [`ArchiveReader::open`]
/// is active.
pub struct ArchiveReader {
    path: PathBuf,
    options: ReaderOptions,
    handle: Option<Handle>,
    cursor: Cursor,
    buffer: Vec<u8>,
    entries_seen: u64,
}

impl ArchiveReader {
    /// Creates a reader for `path` with default options. No I/O happens yet.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self::with_options(path, ReaderOptions::default())
    }

    /// Creates a reader for `path` with the given block and chunk sizes.
    pub fn with_options(path: impl Into<PathBuf>, options: ReaderOptions) -> Self {
        let options = options.normalized();
        Self {
            path: path.into(),
            options,
            handle: None,
            cursor: Cursor::Start,
            buffer: vec![0; options.chunk_size],
            entries_seen: 0,
        }
    }

    /// Path of the archive this reader was created for.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Options in effect for this reader.
    pub fn options(&self) -> &ReaderOptions {
        &self.options
    }

    /// Whether a decoder handle is currently held.
    pub fn is_open(&self) -> bool {
        self.handle.is_some()
    }

    /// Opens the archive and begins a session.
    ///
    /// Compression filter and container format are detected from the content.
    ///
    /// # Errors
    ///
    /// Returns [`ArchiveError::Open`] if the file is missing or empty, or the
    /// decoder cannot open it or recognize its format. In that case no handle
    /// remains allocated.
    pub fn open(&mut self) -> Result<Session<'_>> {
        if self.handle.is_some() {
            // Only reachable when a previous session was leaked.
            warn!(path = %self.path.display(), "Closing stale session before reopening");
            self.close();
        }

        let metadata = std::fs::metadata(&self.path)
            .map_err(|e| ArchiveError::open(&self.path, e.to_string()))?;
        if metadata.is_file() && metadata.len() == 0 {
            return Err(ArchiveError::open(
                &self.path,
                "Empty file, unable to detect archive format",
            ));
        }

        let c_path = path_to_cstring(&self.path)?;
        let handle = Handle::open(&self.path, &c_path, self.options.block_size)?;

        debug!(
            path = %self.path.display(),
            block_size = self.options.block_size,
            filters = ?handle.filters(),
            "Opened archive"
        );

        self.handle = Some(handle);
        self.cursor = Cursor::Start;
        self.entries_seen = 0;

        Ok(Session { reader: self })
    }

    /// Frees the decoder handle if one is held.
    ///
    /// Safe to call at any time and any number of times. Returns `false` only
    /// when the decoder reported a failure while releasing; a reader without a
    /// handle returns `true`.
    pub fn close(&mut self) -> bool {
        let Some(handle) = self.handle.take() else {
            return true;
        };

        let ok = handle.free();
        if ok {
            debug!(path = %self.path.display(), entries = self.entries_seen, "Closed archive");
        } else {
            warn!(path = %self.path.display(), "Decoder reported a failure while closing");
        }
        ok
    }
}

impl Drop for ArchiveReader {
    fn drop(&mut self) {
        self.close();
    }
}

impl std::fmt::Debug for ArchiveReader {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ArchiveReader")
            .field("path", &self.path)
            .field("options", &self.options)
            .field("open", &self.is_open())
            .finish()
    }
}

/// An open archive, from a successful `open` until `close` or drop.
pub struct Session<'r> {
    reader: &'r mut ArchiveReader,
}

impl<'r> Session<'r> {
    /// Path of the archive being read.
    pub fn path(&self) -> &Path {
        &self.reader.path
    }

    /// Number of member headers produced so far.
    pub fn entries_seen(&self) -> u64 {
        self.reader.entries_seen
    }

    /// Moves to the next member.
    ///
    /// Returns `Ok(None)` at the end of the archive, and keeps returning it on
    /// every later call. Unread data of the previous member is skipped.
    ///
    /// # Errors
    ///
    /// Returns [`ArchiveError::Read`] when the decoder fails to read a header.
    /// The traversal is over after that: later calls fail the same way without
    /// consulting the decoder.
    pub fn advance(&mut self) -> Result<Option<ArchiveEntry<'_>>> {
        let reader = &mut *self.reader;
        match reader.cursor {
            Cursor::Exhausted => return Ok(None),
            Cursor::Failed => return Err(aborted(&reader.path, ReadStage::Header)),
            Cursor::Start | Cursor::OnEntry => {}
        }

        let handle = reader
            .handle
            .as_mut()
            .ok_or_else(|| ArchiveError::read(&reader.path, ReadStage::Header, "Session is closed"))?;
        handle.current = None;

        let mut raw_entry = ptr::null_mut();
        let code = unsafe { ffi::archive_read_next_header(handle.as_ptr(), &mut raw_entry) };

        match (Status::from_code(code), NonNull::new(raw_entry)) {
            (Status::Ok, Some(entry)) => {
                handle.current = Some(entry);
                reader.cursor = Cursor::OnEntry;
                reader.entries_seen += 1;

                let view = ArchiveEntry::new(entry);
                trace!(
                    index = reader.entries_seen,
                    entry = %view.filename(),
                    size = view.size(),
                    "Read header"
                );
                Ok(Some(view))
            }
            (Status::Eof, _) => {
                reader.cursor = Cursor::Exhausted;
                debug!(
                    path = %reader.path.display(),
                    entries = reader.entries_seen,
                    "End of archive"
                );
                Ok(None)
            }
            (status, _) => {
                reader.cursor = Cursor::Failed;
                let reason = handle.error_message(code);
                debug!(path = %reader.path.display(), ?status, %reason, "Header read failed");
                Err(ArchiveError::read(&reader.path, ReadStage::Header, reason))
            }
        }
    }

    /// The member selected by the last successful `advance`, if any.
    pub fn entry(&self) -> Option<ArchiveEntry<'_>> {
        match self.reader.cursor {
            Cursor::OnEntry => self
                .reader
                .handle
                .as_ref()
                .and_then(|handle| handle.current)
                .map(ArchiveEntry::new),
            _ => None,
        }
    }

    /// Reads the next chunk of the current member's decoded data.
    ///
    /// The returned slice borrows the session's reusable buffer and holds at
    /// most `chunk_size` bytes. An empty slice means the member has no more
    /// data. Directories yield an empty slice straight away, as does a session
    /// that has reached the end of the archive.
    ///
    /// # Errors
    ///
    /// Returns [`ArchiveError::Read`] if no member has been selected yet, or if
    /// the decoder fails. A decoder failure ends the traversal.
    pub fn read_chunk(&mut self) -> Result<&[u8]> {
        let reader = &mut *self.reader;
        match reader.cursor {
            Cursor::OnEntry => {}
            Cursor::Exhausted => return Ok(&[]),
            Cursor::Start => {
                return Err(ArchiveError::read(
                    &reader.path,
                    ReadStage::Data,
                    "No entry selected, advance before reading",
                ))
            }
            Cursor::Failed => return Err(aborted(&reader.path, ReadStage::Data)),
        }

        let handle = reader
            .handle
            .as_ref()
            .ok_or_else(|| ArchiveError::read(&reader.path, ReadStage::Data, "Session is closed"))?;

        if let Some(entry) = handle.current {
            if ArchiveEntry::new(entry).kind() == EntryKind::Directory {
                return Ok(&[]);
            }
        }

        let n = unsafe {
            ffi::archive_read_data(
                handle.as_ptr(),
                reader.buffer.as_mut_ptr().cast(),
                reader.buffer.len(),
            )
        };

        if n < 0 {
            let code = libc::c_int::try_from(n).unwrap_or(ffi::ARCHIVE_FATAL);
            let reason = handle.error_message(code);
            reader.cursor = Cursor::Failed;
            debug!(path = %reader.path.display(), %reason, "Data read failed");
            return Err(ArchiveError::read(&reader.path, ReadStage::Data, reason));
        }

        let len = (n as usize).min(reader.buffer.len());
        trace!(bytes = len, "Read chunk");
        Ok(&reader.buffer[..len])
    }

    /// Drains the rest of the current member into `writer`, returning the
    /// number of bytes written.
    pub fn copy_entry_to<W: Write>(&mut self, mut writer: W) -> Result<u64, CopyError> {
        let mut total = 0u64;
        loop {
            let chunk = self.read_chunk()?;
            if chunk.is_empty() {
                break;
            }
            writer.write_all(chunk)?;
            total += chunk.len() as u64;
        }
        Ok(total)
    }

    /// Abandons the remaining data of the current member.
    pub fn skip_entry(&mut self) -> Result<()> {
        let reader = &mut *self.reader;
        match reader.cursor {
            Cursor::OnEntry => {}
            Cursor::Start | Cursor::Exhausted => return Ok(()),
            Cursor::Failed => return Err(aborted(&reader.path, ReadStage::Data)),
        }

        let handle = reader
            .handle
            .as_ref()
            .ok_or_else(|| ArchiveError::read(&reader.path, ReadStage::Data, "Session is closed"))?;

        let code = unsafe { ffi::archive_read_data_skip(handle.as_ptr()) };
        if Status::from_code(code) != Status::Ok {
            let reason = handle.error_message(code);
            reader.cursor = Cursor::Failed;
            return Err(ArchiveError::read(&reader.path, ReadStage::Data, reason));
        }
        Ok(())
    }

    /// Container format chosen by auto-detection.
    ///
    /// Formats name themselves while reading their first header, so this is
    /// usually `None` before the first `advance`.
    pub fn format_name(&self) -> Option<String> {
        self.reader.handle.as_ref().and_then(Handle::format_name)
    }

    /// Compression filters detected under the container, outermost first.
    pub fn filters(&self) -> Vec<String> {
        self.reader
            .handle
            .as_ref()
            .map(Handle::filters)
            .unwrap_or_default()
    }

    /// Ends the session, returning whether the decoder released cleanly.
    pub fn close(self) -> bool {
        self.reader.close()
    }
}

impl Drop for Session<'_> {
    fn drop(&mut self) {
        self.reader.close();
    }
}

impl std::fmt::Debug for Session<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Session")
            .field("path", &self.reader.path)
            .field("cursor", &self.reader.cursor)
            .field("entries_seen", &self.reader.entries_seen)
            .finish()
    }
}

fn aborted(path: &Path, stage: ReadStage) -> ArchiveError {
    ArchiveError::read(path, stage, "Traversal aborted by an earlier failure")
}

#[cfg(unix)]
fn path_to_cstring(path: &Path) -> Result<CString> {
    use std::os::unix::ffi::OsStrExt;

    CString::new(path.as_os_str().as_bytes())
        .map_err(|_| ArchiveError::open(path, "Path contains an interior NUL byte"))
}

#[cfg(not(unix))]
fn path_to_cstring(path: &Path) -> Result<CString> {
    let path_str = path
        .to_str()
        .ok_or_else(|| ArchiveError::open(path, "Path contains invalid UTF-8 characters"))?;
    CString::new(path_str).map_err(|_| ArchiveError::open(path, "Path contains an interior NUL byte"))
}

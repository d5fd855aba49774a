//! Borrowed view over the header of the current archive member.

use crate::ffi;
use crate::types::{EntryInfo, EntryKind};
use std::borrow::Cow;
use std::ffi::CStr;
use std::marker::PhantomData;
use std::ptr::NonNull;

/// Metadata of the member the session is currently positioned on.
///
/// The header lives inside the decoder and is overwritten by the next call to
/// [`Session::advance`](crate::Session::advance). The `'a` lifetime ties this
/// view to a borrow of the session, so the compiler rejects any attempt to keep
/// it across that call. Use [`ArchiveEntry::to_info`] to retain the metadata.
pub struct ArchiveEntry<'a> {
    raw: NonNull<ffi::archive_entry>,
    _session: PhantomData<&'a ()>,
}

impl<'a> ArchiveEntry<'a> {
    pub(crate) fn new(raw: NonNull<ffi::archive_entry>) -> Self {
        Self {
            raw,
            _session: PhantomData,
        }
    }

    /// Path of the member, decoded as UTF-8.
    ///
    /// Falls back to the raw pathname with lossy decoding when the decoder
    /// cannot convert the stored name.
    pub fn filename(&self) -> Cow<'a, str> {
        // SAFETY: `raw` points at the decoder's current header, which stays valid
        // for as long as the session borrow behind `'a`.
        unsafe {
            let utf8 = ffi::archive_entry_pathname_utf8(self.raw.as_ptr());
            if !utf8.is_null() {
                return CStr::from_ptr(utf8).to_string_lossy();
            }

            let raw = ffi::archive_entry_pathname(self.raw.as_ptr());
            if raw.is_null() {
                Cow::Borrowed("")
            } else {
                CStr::from_ptr(raw).to_string_lossy()
            }
        }
    }

    /// Size in bytes as reported by the archive; 0 when the format does not
    /// record it up front.
    pub fn size(&self) -> i64 {
        unsafe { ffi::archive_entry_size(self.raw.as_ptr()) }
    }

    /// Whether the archive recorded a size for this member.
    pub fn size_is_known(&self) -> bool {
        unsafe { ffi::archive_entry_size_is_set(self.raw.as_ptr()) != 0 }
    }

    /// Member kind from the mode's type bits.
    pub fn kind(&self) -> EntryKind {
        let mode = unsafe { ffi::archive_entry_mode(self.raw.as_ptr()) };
        EntryKind::from_mode(mode as u32)
    }

    /// Whether the mode marks this member as a directory. A trailing `/` in
    /// the name has no bearing on the answer.
    pub fn is_directory(&self) -> bool {
        self.kind() == EntryKind::Directory
    }

    /// Copies the metadata out into an owned snapshot.
    pub fn to_info(&self) -> EntryInfo {
        EntryInfo {
            path: self.filename().into_owned(),
            size: self.size(),
            kind: self.kind(),
        }
    }
}

impl std::fmt::Debug for ArchiveEntry<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ArchiveEntry")
            .field("filename", &self.filename())
            .field("size", &self.size())
            .field("kind", &self.kind())
            .finish()
    }
}

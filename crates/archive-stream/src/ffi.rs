//! Raw bindings to the subset of libarchive used by the reader.
//!
//! Only the read-side primitives are declared here. Everything in this module is
//! `unsafe` to call; the safe wrapper lives in [`crate::reader`].

#![allow(non_camel_case_types)]

use libc::{c_char, c_int, c_void, mode_t, size_t, ssize_t};

/// Opaque decoder handle (`struct archive`).
#[repr(C)]
pub struct archive {
    _private: [u8; 0],
}

/// Opaque entry header owned by the decoder (`struct archive_entry`).
#[repr(C)]
pub struct archive_entry {
    _private: [u8; 0],
}

pub const ARCHIVE_EOF: c_int = 1;
pub const ARCHIVE_OK: c_int = 0;
pub const ARCHIVE_RETRY: c_int = -10;
pub const ARCHIVE_WARN: c_int = -20;
pub const ARCHIVE_FAILED: c_int = -25;
pub const ARCHIVE_FATAL: c_int = -30;

#[link(name = "archive")]
extern "C" {
    pub fn archive_read_new() -> *mut archive;
    pub fn archive_read_support_filter_all(a: *mut archive) -> c_int;
    pub fn archive_read_support_format_all(a: *mut archive) -> c_int;
    pub fn archive_read_open_filename(
        a: *mut archive,
        filename: *const c_char,
        block_size: size_t,
    ) -> c_int;
    pub fn archive_read_next_header(a: *mut archive, entry: *mut *mut archive_entry) -> c_int;
    pub fn archive_read_data(a: *mut archive, buf: *mut c_void, size: size_t) -> ssize_t;
    pub fn archive_read_data_skip(a: *mut archive) -> c_int;
    pub fn archive_read_free(a: *mut archive) -> c_int;

    pub fn archive_error_string(a: *mut archive) -> *const c_char;
    pub fn archive_errno(a: *mut archive) -> c_int;
    pub fn archive_format_name(a: *mut archive) -> *const c_char;
    pub fn archive_filter_count(a: *mut archive) -> c_int;
    pub fn archive_filter_name(a: *mut archive, n: c_int) -> *const c_char;

    pub fn archive_entry_pathname(entry: *mut archive_entry) -> *const c_char;
    pub fn archive_entry_pathname_utf8(entry: *mut archive_entry) -> *const c_char;
    pub fn archive_entry_size(entry: *mut archive_entry) -> i64;
    pub fn archive_entry_size_is_set(entry: *mut archive_entry) -> c_int;
    pub fn archive_entry_mode(entry: *mut archive_entry) -> mode_t;
}

/// Classified libarchive return code.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Status {
    Ok,
    Eof,
    Retry,
    Warn,
    Failed,
    Fatal,
}

impl Status {
    /// Maps a raw return code onto its class.
    ///
    /// Codes outside the documented set are never treated as success: unknown
    /// negative values are fatal, unknown positive values are plain failures.
    pub fn from_code(code: c_int) -> Self {
        match code {
            ARCHIVE_OK => Status::Ok,
            ARCHIVE_EOF => Status::Eof,
            ARCHIVE_RETRY => Status::Retry,
            ARCHIVE_WARN => Status::Warn,
            ARCHIVE_FAILED => Status::Failed,
            ARCHIVE_FATAL => Status::Fatal,
            c if c < 0 => Status::Fatal,
            _ => Status::Failed,
        }
    }
}

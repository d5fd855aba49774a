//! Integration tests for the streaming reader.

use archive_stream::{ArchiveReader, EntryInfo, EntryKind, ReadStage, ReaderOptions};
use archive_stream::ArchiveError;
use flate2::write::GzEncoder;
use flate2::Compression;
use std::fs::{self, File};
use std::io::Write;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

/// Helper function to create a test archive directory
fn setup_test_dir() -> TempDir {
    TempDir::new().expect("Failed to create temp directory")
}

/// Appends a regular file member to a tar builder
fn append_file<W: Write>(tar: &mut tar::Builder<W>, name: &str, content: &[u8]) {
    let mut header = tar::Header::new_gnu();
    header.set_size(content.len() as u64);
    header.set_mode(0o644);
    header.set_entry_type(tar::EntryType::Regular);
    tar.append_data(&mut header, name, content)
        .expect("Failed to append file");
}

/// Appends a directory member to a tar builder
fn append_dir<W: Write>(tar: &mut tar::Builder<W>, name: &str) {
    let mut header = tar::Header::new_gnu();
    header.set_size(0);
    header.set_mode(0o755);
    header.set_entry_type(tar::EntryType::Directory);
    tar.append_data(&mut header, name, std::io::empty())
        .expect("Failed to append directory");
}

/// Creates `sample.tar.gz` holding `a.txt` ("hello world") and `dir/`
fn create_sample_tar_gz(dir: &TempDir) -> PathBuf {
    let archive_path = dir.path().join("sample.tar.gz");
    let file = File::create(&archive_path).expect("Failed to create archive");
    let encoder = GzEncoder::new(file, Compression::default());
    let mut tar = tar::Builder::new(encoder);

    append_file(&mut tar, "a.txt", b"hello world");
    append_dir(&mut tar, "dir/");

    tar.into_inner()
        .expect("Failed to finish tar")
        .finish()
        .expect("Failed to finish gzip");
    archive_path
}

/// Creates a gzipped tar with the given regular members
fn create_tar_gz(path: &Path, files: &[(&str, &[u8])]) {
    let file = File::create(path).expect("Failed to create archive");
    let encoder = GzEncoder::new(file, Compression::default());
    let mut tar = tar::Builder::new(encoder);

    for (name, content) in files {
        append_file(&mut tar, name, content);
    }

    tar.into_inner()
        .expect("Failed to finish tar")
        .finish()
        .expect("Failed to finish gzip");
}

/// Deterministic, poorly compressible bytes
fn noise(len: usize) -> Vec<u8> {
    let mut state: u64 = 0x2545_f491_4f6c_dd1d;
    (0..len)
        .map(|_| {
            state ^= state << 13;
            state ^= state >> 7;
            state ^= state << 17;
            (state >> 24) as u8
        })
        .collect()
}

/// Reads chunks until the end of the current member
fn drain(session: &mut archive_stream::Session<'_>) -> Vec<u8> {
    let mut data = Vec::new();
    loop {
        let chunk = session.read_chunk().expect("Failed to read chunk");
        if chunk.is_empty() {
            break;
        }
        data.extend_from_slice(chunk);
    }
    data
}

/// Advances and copies the header out
fn next_info(session: &mut archive_stream::Session<'_>) -> Option<EntryInfo> {
    session
        .advance()
        .expect("Failed to advance")
        .map(|entry| entry.to_info())
}

#[test]
fn test_sample_tar_gz_walkthrough() {
    let temp_dir = setup_test_dir();
    let archive_path = create_sample_tar_gz(&temp_dir);

    let mut reader = ArchiveReader::new(&archive_path);
    let mut session = reader.open().expect("Failed to open archive");

    let first = next_info(&mut session).expect("Expected a.txt");
    assert_eq!(first.path, "a.txt");
    assert_eq!(first.size, 11);
    assert!(!first.is_directory());
    assert_eq!(session.read_chunk().unwrap(), b"hello world");
    assert!(session.read_chunk().unwrap().is_empty());

    let second = next_info(&mut session).expect("Expected dir/");
    assert_eq!(second.path.trim_end_matches('/'), "dir");
    assert!(second.is_directory());
    assert_eq!(second.kind, EntryKind::Directory);
    assert!(session.read_chunk().unwrap().is_empty());

    assert!(next_info(&mut session).is_none());
    assert_eq!(session.entries_seen(), 2);
    assert!(session.close());
    assert!(!reader.is_open());
}

#[test]
fn test_exhaustion_is_idempotent() {
    let temp_dir = setup_test_dir();
    let archive_path = create_sample_tar_gz(&temp_dir);

    let mut reader = ArchiveReader::new(&archive_path);
    let mut session = reader.open().unwrap();

    let mut count = 0;
    while next_info(&mut session).is_some() {
        count += 1;
    }
    assert_eq!(count, 2);

    for _ in 0..3 {
        assert!(session.advance().unwrap().is_none());
        assert!(session.read_chunk().unwrap().is_empty());
    }
    assert_eq!(session.entries_seen(), 2);
}

#[test]
fn test_chunk_lengths_sum_to_member_size() {
    let temp_dir = setup_test_dir();
    let archive_path = temp_dir.path().join("big.tar.gz");
    let big = noise(100_000);
    create_tar_gz(&archive_path, &[("big.bin", &big), ("small.txt", b"tiny")]);

    let mut reader = ArchiveReader::new(&archive_path);
    let mut session = reader.open().unwrap();

    let info = next_info(&mut session).unwrap();
    assert_eq!(info.size, 100_000);

    let mut total = 0usize;
    let mut chunks = 0;
    let mut data = Vec::new();
    loop {
        let chunk = session.read_chunk().unwrap();
        if chunk.is_empty() {
            break;
        }
        assert!(chunk.len() <= archive_stream::DEFAULT_CHUNK_SIZE);
        total += chunk.len();
        chunks += 1;
        data.extend_from_slice(chunk);
    }
    assert_eq!(total as i64, info.size);
    assert!(chunks > 1);
    assert_eq!(data, big);

    let info = next_info(&mut session).unwrap();
    assert_eq!(info.path, "small.txt");
    assert_eq!(drain(&mut session), b"tiny");
}

#[test]
fn test_custom_chunk_size_bounds_every_chunk() {
    let temp_dir = setup_test_dir();
    let archive_path = temp_dir.path().join("chunks.tar.gz");
    let content = noise(1000);
    create_tar_gz(&archive_path, &[("data.bin", &content)]);

    let options = ReaderOptions {
        chunk_size: 7,
        ..ReaderOptions::default()
    };
    let mut reader = ArchiveReader::with_options(&archive_path, options);
    let mut session = reader.open().unwrap();
    next_info(&mut session).unwrap();

    let mut data = Vec::new();
    loop {
        let chunk = session.read_chunk().unwrap();
        if chunk.is_empty() {
            break;
        }
        assert!(chunk.len() <= 7);
        data.extend_from_slice(chunk);
    }
    assert_eq!(data, content);
}

#[test]
fn test_advance_skips_unread_data() {
    let temp_dir = setup_test_dir();
    let archive_path = temp_dir.path().join("skip.tar.gz");
    let big = noise(50_000);
    create_tar_gz(&archive_path, &[("first.bin", &big), ("second.txt", b"second")]);

    let mut reader = ArchiveReader::new(&archive_path);
    let mut session = reader.open().unwrap();

    next_info(&mut session).unwrap();
    // Read part of the first member, then abandon it
    assert!(!session.read_chunk().unwrap().is_empty());

    let second = next_info(&mut session).unwrap();
    assert_eq!(second.path, "second.txt");
    assert_eq!(drain(&mut session), b"second");
}

#[test]
fn test_skip_entry_and_copy_entry_to() {
    let temp_dir = setup_test_dir();
    let archive_path = temp_dir.path().join("copy.tar.gz");
    create_tar_gz(
        &archive_path,
        &[("skipped.txt", b"not read"), ("copied.txt", b"copied content")],
    );

    let mut reader = ArchiveReader::new(&archive_path);
    let mut session = reader.open().unwrap();

    next_info(&mut session).unwrap();
    session.skip_entry().unwrap();

    next_info(&mut session).unwrap();
    let mut out = Vec::new();
    let written = session.copy_entry_to(&mut out).unwrap();
    assert_eq!(written, 14);
    assert_eq!(out, b"copied content");

    // Member is drained; a second copy writes nothing
    assert_eq!(session.copy_entry_to(&mut out).unwrap(), 0);
}

#[test]
fn test_current_entry_view_survives_reads() {
    let temp_dir = setup_test_dir();
    let archive_path = create_sample_tar_gz(&temp_dir);

    let mut reader = ArchiveReader::new(&archive_path);
    let mut session = reader.open().unwrap();
    assert!(session.entry().is_none());

    next_info(&mut session).unwrap();
    drain(&mut session);

    let entry = session.entry().expect("Current entry should be available");
    assert_eq!(entry.filename(), "a.txt");
    assert_eq!(entry.size(), 11);
    assert!(entry.size_is_known());

    while next_info(&mut session).is_some() {}
    assert!(session.entry().is_none());
}

#[test]
fn test_read_before_advance_is_an_error() {
    let temp_dir = setup_test_dir();
    let archive_path = create_sample_tar_gz(&temp_dir);

    let mut reader = ArchiveReader::new(&archive_path);
    let mut session = reader.open().unwrap();

    let err = session.read_chunk().unwrap_err();
    assert!(matches!(
        err,
        ArchiveError::Read {
            stage: ReadStage::Data,
            ..
        }
    ));

    // The session is still usable afterwards
    assert_eq!(next_info(&mut session).unwrap().path, "a.txt");
}

#[test]
fn test_open_nonexistent_path() {
    let temp_dir = setup_test_dir();
    let mut reader = ArchiveReader::new(temp_dir.path().join("missing.tar.gz"));

    let err = reader.open().unwrap_err();
    assert!(err.is_open_error());
    assert_eq!(err.path(), temp_dir.path().join("missing.tar.gz"));

    assert!(!reader.is_open());
    assert!(reader.close());
}

#[test]
fn test_open_zero_byte_file() {
    let temp_dir = setup_test_dir();
    let path = temp_dir.path().join("empty.tar");
    File::create(&path).unwrap();

    let mut reader = ArchiveReader::new(&path);
    let err = reader.open().unwrap_err();
    assert!(err.is_open_error());
    assert!(!reader.is_open());
}

#[test]
fn test_open_unrecognized_format() {
    let temp_dir = setup_test_dir();
    let path = temp_dir.path().join("notes.tar.gz");
    let text = "This is plain text, not an archive.\n".repeat(100);
    fs::write(&path, text).unwrap();

    let mut reader = ArchiveReader::new(&path);
    let err = reader.open().unwrap_err();
    assert!(err.is_open_error());
    assert!(!reader.is_open());
    assert!(reader.close());
}

#[test]
fn test_truncated_archive_fails_mid_stream() {
    let temp_dir = setup_test_dir();
    let full_path = temp_dir.path().join("full.tar.gz");
    create_tar_gz(&full_path, &[("payload.bin", &noise(300_000))]);

    let bytes = fs::read(&full_path).unwrap();
    let truncated_path = temp_dir.path().join("truncated.tar.gz");
    fs::write(&truncated_path, &bytes[..bytes.len() / 2]).unwrap();

    let mut reader = ArchiveReader::new(&truncated_path);
    let mut session = reader.open().expect("Truncated archive should still open");

    let failure = loop {
        match session.advance() {
            Ok(Some(_)) => {}
            Ok(None) => panic!("Truncated archive reported a clean end"),
            Err(e) => break e,
        }
        let err = loop {
            match session.read_chunk() {
                Ok(chunk) if chunk.is_empty() => break None,
                Ok(_) => {}
                Err(e) => break Some(e),
            }
        };
        if let Some(e) = err {
            break e;
        }
    };
    assert!(failure.is_read_error());

    // The traversal stays failed and the session still closes
    assert!(session.advance().unwrap_err().is_read_error());
    assert!(session.read_chunk().unwrap_err().is_read_error());
    session.close();
    assert!(!reader.is_open());
}

#[test]
fn test_close_is_idempotent() {
    let temp_dir = setup_test_dir();
    let archive_path = create_sample_tar_gz(&temp_dir);

    let mut reader = ArchiveReader::new(&archive_path);
    let session = reader.open().unwrap();
    assert!(session.close());

    assert!(reader.close());
    assert!(reader.close());
    assert!(!reader.is_open());
}

#[test]
fn test_dropping_session_releases_handle() {
    let temp_dir = setup_test_dir();
    let archive_path = create_sample_tar_gz(&temp_dir);

    let mut reader = ArchiveReader::new(&archive_path);
    {
        let mut session = reader.open().unwrap();
        next_info(&mut session).unwrap();
        // Abandoned mid-iteration
    }
    assert!(!reader.is_open());
}

#[test]
fn test_new_session_starts_from_first_member() {
    let temp_dir = setup_test_dir();
    let archive_path = create_sample_tar_gz(&temp_dir);

    let mut reader = ArchiveReader::new(&archive_path);
    {
        let mut session = reader.open().unwrap();
        while next_info(&mut session).is_some() {}
    }

    let mut session = reader.open().unwrap();
    assert_eq!(session.entries_seen(), 0);
    assert_eq!(next_info(&mut session).unwrap().path, "a.txt");
}

#[test]
fn test_zip_archive_streaming() {
    use zip::write::{SimpleFileOptions, ZipWriter};

    let temp_dir = setup_test_dir();
    let archive_path = temp_dir.path().join("test.zip");
    let file = File::create(&archive_path).unwrap();
    let mut zip = ZipWriter::new(file);
    let options =
        SimpleFileOptions::default().compression_method(zip::CompressionMethod::Deflated);

    zip.add_directory("docs/", options).unwrap();
    zip.start_file("docs/readme.txt", options).unwrap();
    zip.write_all(b"Hello, World!").unwrap();
    zip.finish().unwrap();

    let mut reader = ArchiveReader::new(&archive_path);
    let mut session = reader.open().unwrap();

    let dir = next_info(&mut session).unwrap();
    assert!(dir.is_directory());
    assert!(session.read_chunk().unwrap().is_empty());

    let file = next_info(&mut session).unwrap();
    assert_eq!(file.path, "docs/readme.txt");
    assert!(!file.is_directory());
    assert_eq!(drain(&mut session), b"Hello, World!");

    assert!(next_info(&mut session).is_none());
    assert!(session.format_name().unwrap().to_lowercase().contains("zip"));
}

#[test]
fn test_detected_filters_and_format() {
    use bzip2::write::BzEncoder;

    let temp_dir = setup_test_dir();
    let archive_path = temp_dir.path().join("data.tbz");
    let file = File::create(&archive_path).unwrap();
    let encoder = BzEncoder::new(file, bzip2::Compression::default());
    let mut tar = tar::Builder::new(encoder);
    append_file(&mut tar, "note.txt", b"compressed with bzip2");
    tar.into_inner().unwrap().finish().unwrap();

    let mut reader = ArchiveReader::new(&archive_path);
    let mut session = reader.open().unwrap();
    assert_eq!(session.filters(), vec!["bzip2".to_string()]);

    let info = next_info(&mut session).unwrap();
    assert_eq!(info.path, "note.txt");
    assert_eq!(drain(&mut session), b"compressed with bzip2");
    assert!(session.format_name().unwrap().to_lowercase().contains("tar"));
}

//! Streaming an archive's members onto disk.

use crate::error::UnpackError;
use crate::reader::ArchiveReader;
use crate::safety::{check_entry_kind, check_size_limits, validate_entry_path};
use crate::types::{UnpackOptions, UnpackStats};
use crate::ProgressCallback;
use std::fs::{self, File};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Instant;
use tracing::{debug, warn};

/// Unpack every member of an archive below `output_dir`.
///
/// Members are streamed chunk by chunk, so memory use does not depend on
/// member size. Members with unsafe paths and anything that is not a regular
/// file or directory are skipped with a warning. A file standing where a
/// directory is needed is replaced by the directory.
///
/// # Arguments
///
/// * `archive_path` - Path to the archive file
/// * `output_dir` - Directory where members will be written
/// * `options` - Size limit and reader configuration
/// * `progress_cb` - Called after each file with its path and the running byte total
/// * `cancel_flag` - Polled between chunks; setting it aborts the unpack
///
/// # Returns
///
/// Returns `UnpackStats` on success.
pub fn unpack_archive(
    archive_path: &Path,
    output_dir: &Path,
    options: &UnpackOptions,
    progress_cb: &ProgressCallback,
    cancel_flag: &AtomicBool,
) -> Result<UnpackStats, UnpackError> {
    let start_time = Instant::now();

    let mut reader = ArchiveReader::with_options(archive_path, options.reader);
    let mut session = reader.open()?;

    fs::create_dir_all(output_dir)?;

    let mut stats = UnpackStats::default();

    loop {
        if cancel_flag.load(Ordering::Relaxed) {
            return Err(UnpackError::Cancelled);
        }

        let info = match session.advance()? {
            Some(entry) => entry.to_info(),
            None => break,
        };

        let relative = match validate_entry_path(Path::new(&info.path))
            .and_then(|p| check_entry_kind(&info.path, info.kind).map(|_| p))
        {
            Ok(p) => p,
            Err(e) => {
                warn!(entry = %info.path, error = %e, "Skipping member");
                stats.entries_skipped += 1;
                continue;
            }
        };

        let destination = output_dir.join(&relative);
        clear_file_ancestors(output_dir, &relative)?;

        if info.is_directory() {
            if destination.is_file() {
                fs::remove_file(&destination)?;
            }
            fs::create_dir_all(&destination)?;
            stats.directories_created += 1;
            continue;
        }

        if let Some(parent) = destination.parent() {
            fs::create_dir_all(parent)?;
        }

        if destination.is_dir() {
            warn!(entry = %info.path, "Skipping member, a directory exists at its path");
            stats.entries_skipped += 1;
            continue;
        }

        let mut file = File::create(&destination)?;
        loop {
            if cancel_flag.load(Ordering::Relaxed) {
                return Err(UnpackError::Cancelled);
            }

            let chunk = session.read_chunk()?;
            if chunk.is_empty() {
                break;
            }

            let new_total = stats.bytes_written + chunk.len() as u64;
            check_size_limits(new_total, options.size_limit_bytes)?;
            file.write_all(chunk)?;
            stats.bytes_written = new_total;
        }

        stats.files_written += 1;
        debug!(entry = %info.path, "Wrote member");

        if !progress_cb(&info.path, stats.bytes_written) {
            return Err(UnpackError::Cancelled);
        }
    }

    session.close();
    stats.duration = start_time.elapsed();
    Ok(stats)
}

/// Removes regular files occupying any directory position of `relative`.
fn clear_file_ancestors(output_dir: &Path, relative: &Path) -> Result<(), UnpackError> {
    let Some(parent) = relative.parent() else {
        return Ok(());
    };

    let mut current = PathBuf::from(output_dir);
    for component in parent.components() {
        current.push(component);
        if current.is_file() {
            debug!(path = %current.display(), "Replacing file with directory");
            fs::remove_file(&current)?;
        }
    }
    Ok(())
}

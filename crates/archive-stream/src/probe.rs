//! Listing archive members without reading their data.

use crate::error::Result;
use crate::reader::ArchiveReader;
use crate::types::{ArchiveSummary, ReaderOptions};
use std::path::Path;

/// Walk every header of the archive at `path` and collect their metadata.
///
/// Member data is never decoded: each `advance` lets the decoder skip over
/// the previous member.
///
/// # Errors
///
/// Returns an error if the archive cannot be opened or a header cannot be
/// read. The session is closed on every path out of this function.
pub fn list_archive(path: &Path, options: ReaderOptions) -> Result<ArchiveSummary> {
    let mut reader = ArchiveReader::with_options(path, options);
    let mut session = reader.open()?;

    let mut entries = Vec::new();
    while let Some(entry) = session.advance()? {
        entries.push(entry.to_info());
    }

    let total_size = entries.iter().map(|e| e.size.max(0)).sum();
    let summary = ArchiveSummary {
        format: session.format_name(),
        filters: session.filters(),
        entries,
        total_size,
    };

    session.close();
    Ok(summary)
}

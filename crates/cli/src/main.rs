//! Command-line interface for streaming archive contents.
//!
//! This CLI tool lists archive members, prints a single member to stdout
//! and unpacks archives to a directory, all without buffering whole members.

use archive_stream::{ArchiveError, ArchiveReader, UnpackError, UnpackOptions};
use clap::{Parser, Subcommand};
use indicatif::{ProgressBar, ProgressStyle};
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::process;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info};

#[derive(Parser)]
#[command(name = "arcstream")]
#[command(version, about = "Stream archive contents from the command line", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// List the members of an archive
    List {
        /// Archive file to list
        archive: PathBuf,

        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Write one member's content to stdout
    Cat {
        /// Archive file to read
        archive: PathBuf,

        /// Path of the member inside the archive
        member: String,
    },

    /// Unpack an archive into a directory
    Unpack {
        /// Archive file to unpack
        archive: PathBuf,

        /// Output directory
        #[arg(short, long)]
        out: PathBuf,

        /// Size limit in bytes
        #[arg(long)]
        size_limit: Option<u64>,
    },
}

fn main() {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_writer(io::stderr)
        .init();

    let cli = Cli::parse();

    let result = match cli.command {
        Commands::List { archive, json } => handle_list(&archive, json),
        Commands::Cat { archive, member } => handle_cat(&archive, &member),
        Commands::Unpack {
            archive,
            out,
            size_limit,
        } => handle_unpack(&archive, &out, size_limit),
    };

    if let Err(e) = result {
        eprintln!("Error: {}", describe(e.as_ref()));
        process::exit(1);
    }
}

/// Prefixes archive failures so setup problems read differently from corruption.
fn describe(err: &(dyn std::error::Error + 'static)) -> String {
    let archive_err = err.downcast_ref::<ArchiveError>().or_else(|| {
        match err.downcast_ref::<UnpackError>() {
            Some(UnpackError::Archive(e)) => Some(e),
            _ => None,
        }
    });

    match archive_err {
        Some(e) if e.is_open_error() => format!("cannot open archive: {}", e),
        Some(e) => format!("archive is damaged or unsupported: {}", e),
        None => err.to_string(),
    }
}

fn handle_list(archive: &Path, json: bool) -> Result<(), Box<dyn std::error::Error>> {
    let summary = archive_stream::list(archive)?;

    if json {
        println!("{}", serde_json::to_string_pretty(&summary)?);
        return Ok(());
    }

    let stdout = io::stdout();
    let mut out = stdout.lock();
    for entry in &summary.entries {
        let marker = if entry.is_directory() { "d" } else { "-" };
        writeln!(out, "{} {:>12} {}", marker, entry.size, entry.path)?;
    }
    writeln!(
        out,
        "{} entries, {} bytes ({}{})",
        summary.entries.len(),
        summary.total_size,
        summary.format.as_deref().unwrap_or("unknown format"),
        summary
            .filters
            .iter()
            .map(|f| format!(", {}", f))
            .collect::<String>()
    )?;
    Ok(())
}

fn handle_cat(archive: &Path, member: &str) -> Result<(), Box<dyn std::error::Error>> {
    let mut reader = ArchiveReader::new(archive);
    let mut session = reader.open()?;

    loop {
        let found = match session.advance()? {
            Some(entry) => entry.filename() == member,
            None => break,
        };
        if !found {
            continue;
        }

        let stdout = io::stdout();
        let written = session.copy_entry_to(stdout.lock())?;
        debug!(member, bytes = written, "Copied member to stdout");
        session.close();
        return Ok(());
    }

    session.close();
    Err(format!("member not found in archive: {}", member).into())
}

fn handle_unpack(
    archive: &Path,
    out: &Path,
    size_limit: Option<u64>,
) -> Result<(), Box<dyn std::error::Error>> {
    let cancel_flag = Arc::new(AtomicBool::new(false));
    {
        let cancel_flag = Arc::clone(&cancel_flag);
        ctrlc::set_handler(move || cancel_flag.store(true, Ordering::Relaxed))?;
    }

    let mut options = UnpackOptions::default();
    if size_limit.is_some() {
        options.size_limit_bytes = size_limit;
    }

    let spinner = ProgressBar::new_spinner();
    spinner.set_style(ProgressStyle::with_template("{spinner} {msg}")?);
    spinner.enable_steady_tick(Duration::from_millis(100));

    let progress = |file: &str, bytes: u64| {
        spinner.set_message(format!("{} ({} bytes total)", file, bytes));
        true
    };

    let result = archive_stream::unpack(archive, out, &options, &progress, &cancel_flag);
    spinner.finish_and_clear();

    let stats = result?;
    info!(
        files = stats.files_written,
        directories = stats.directories_created,
        skipped = stats.entries_skipped,
        bytes = stats.bytes_written,
        seconds = stats.duration.as_secs(),
        "Unpacked {}",
        archive.display()
    );
    Ok(())
}

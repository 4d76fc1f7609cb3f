use std::fs;
use std::path::Path;

use tracing::{debug, error, info, warn};

use crate::config::{Config, OutputFormat};
use crate::error::ArchiverError;
use crate::manifest::{self, ArtifactEntry};
use crate::{parquet_writer, writer};

#[derive(Debug, Default, Clone, Copy)]
pub struct RunOptions {
    /// Re-archive files even when their artifacts already exist
    pub force: bool,
    /// List what would be archived without writing anything
    pub dry_run: bool,
    /// Delete a source file once all enabled artifacts are written
    pub delete_source: bool,
}

/// Aggregate counts for one archive run.
#[derive(Debug, Default)]
pub struct RunStats {
    pub archived: usize,
    pub skipped: usize,
    pub failed: usize,
    pub bytes_written: u64,
}

enum FileOutcome {
    Archived(Vec<ArtifactEntry>),
    WouldArchive(Vec<OutputFormat>),
    Skipped,
}

/// Archive every trade file under the configured source root.
///
/// Only a missing source root aborts the run; per-exchange and per-file
/// failures are logged, counted, and the run continues.
pub fn run(config: &Config, opts: &RunOptions) -> Result<RunStats, ArchiverError> {
    let source = config.archive.source.as_path();
    if !source.is_dir() {
        return Err(ArchiverError::SourceNotFound(source.to_path_buf()));
    }

    let mut stats = RunStats::default();

    for entry in fs::read_dir(source)? {
        let entry = match entry {
            Ok(e) => e,
            Err(e) => {
                error!(error = %e, "Failed to read source root entry");
                stats.failed += 1;
                continue;
            }
        };
        let path = entry.path();
        if !path.is_dir() {
            warn!(entry = %path.display(), "Skipping non-directory entry under source root");
            continue;
        }
        let exchange = entry.file_name().to_string_lossy().into_owned();
        if let Err(e) = archive_exchange(config, opts, &exchange, &path, &mut stats) {
            error!(exchange = %exchange, error = %e, "Failed to process exchange directory");
            stats.failed += 1;
        }
    }

    Ok(stats)
}

fn archive_exchange(
    config: &Config,
    opts: &RunOptions,
    exchange: &str,
    exchange_dir: &Path,
    stats: &mut RunStats,
) -> Result<(), ArchiverError> {
    let dest_dir = config.archive.destination.join(exchange);
    let mut produced: Vec<ArtifactEntry> = Vec::new();

    let entries = fs::read_dir(exchange_dir)
        .map_err(|_| ArchiverError::SourceNotFound(exchange_dir.to_path_buf()))?;

    for entry in entries {
        let entry = match entry {
            Ok(e) => e,
            Err(e) => {
                error!(exchange = %exchange, error = %e, "Failed to read exchange entry");
                stats.failed += 1;
                continue;
            }
        };
        let path = entry.path();
        if !path.is_file() || path.extension().and_then(|e| e.to_str()) != Some("csv") {
            debug!(entry = %path.display(), "Ignoring non-CSV entry");
            continue;
        }

        match archive_file(config, opts, exchange, &path, &dest_dir) {
            Ok(FileOutcome::Archived(entries)) => {
                stats.archived += 1;
                stats.bytes_written += entries.iter().map(|e| e.bytes).sum::<u64>();
                produced.extend(entries);
                if opts.delete_source {
                    match fs::remove_file(&path) {
                        Ok(()) => {
                            info!(exchange = %exchange, file = %path.display(), "Deleted source after archival")
                        }
                        Err(e) => {
                            warn!(exchange = %exchange, file = %path.display(), error = %e, "Failed to delete source")
                        }
                    }
                }
            }
            Ok(FileOutcome::WouldArchive(formats)) => {
                info!(
                    exchange = %exchange,
                    file = %path.display(),
                    formats = ?formats,
                    "Dry run: would archive"
                );
                stats.archived += 1;
            }
            Ok(FileOutcome::Skipped) => {
                debug!(exchange = %exchange, file = %path.display(), "Already archived, skipping");
                stats.skipped += 1;
            }
            Err(e) => {
                error!(
                    exchange = %exchange,
                    file = %path.display(),
                    error = %e,
                    "Failed to archive trade file"
                );
                stats.failed += 1;
            }
        }
    }

    if !produced.is_empty() {
        manifest::update_manifest(&dest_dir, exchange, &produced)?;
        info!(exchange = %exchange, artifacts = produced.len(), "Updated manifest");
    }

    Ok(())
}

fn archive_file(
    config: &Config,
    opts: &RunOptions,
    exchange: &str,
    csv_path: &Path,
    dest_dir: &Path,
) -> Result<FileOutcome, ArchiverError> {
    let file_name = csv_path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();

    // Idempotence: only produce artifacts that are missing, unless forced
    let mut pending = Vec::new();
    for format in &config.archive.formats {
        let artifact = dest_dir.join(format.artifact_name(&file_name));
        if opts.force || !artifact.exists() {
            pending.push((*format, artifact));
        }
    }

    if pending.is_empty() {
        return Ok(FileOutcome::Skipped);
    }

    if opts.dry_run {
        return Ok(FileOutcome::WouldArchive(
            pending.iter().map(|(f, _)| *f).collect(),
        ));
    }

    let mut produced = Vec::with_capacity(pending.len());
    for (idx, (format, artifact)) in pending.iter().enumerate() {
        let result = match format {
            OutputFormat::Gzip => writer::compress_file(csv_path, artifact),
            OutputFormat::Parquet => {
                parquet_writer::convert_file(csv_path, artifact, config.archive.schema.as_deref())
            }
        };
        let entry = match result {
            Ok(entry) => entry,
            Err(e) => {
                // A failed file leaves no unrecorded artifacts behind:
                // remove the formats already written in this pass so a
                // retry produces the full set
                for (_, prior) in &pending[..idx] {
                    match fs::remove_file(prior) {
                        Ok(()) => {
                            warn!(artifact = %prior.display(), "Removed artifact of failed file")
                        }
                        Err(re) => {
                            warn!(artifact = %prior.display(), error = %re, "Failed to remove artifact of failed file")
                        }
                    }
                }
                return Err(e);
            }
        };
        info!(
            exchange = %exchange,
            artifact = %entry.name,
            format = %format,
            raw_bytes = entry.raw_bytes,
            bytes = entry.bytes,
            "Wrote artifact"
        );
        produced.push(entry);
    }

    Ok(FileOutcome::Archived(produced))
}

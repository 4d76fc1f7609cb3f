use std::fs::{self, File};
use std::io;
use std::path::Path;

use flate2::write::GzEncoder;
use flate2::Compression;

use crate::error::ArchiverError;
use crate::manifest::ArtifactEntry;

/// Compress a trade file byte-for-byte into a gzip artifact.
///
/// The artifact is written to a `.tmp` sibling first and renamed into
/// place on success, so a crashed run never leaves a truncated artifact
/// that would satisfy the skip-if-exists check.
pub fn compress_file(src: &Path, dst: &Path) -> Result<ArtifactEntry, ArchiverError> {
    let mut input = File::open(src)?;

    if let Some(parent) = dst.parent() {
        fs::create_dir_all(parent)?;
    }
    let tmp = dst.with_extension("gz.tmp");

    let out = File::create(&tmp)?;
    let mut encoder = GzEncoder::new(out, Compression::default());
    let raw_bytes = io::copy(&mut input, &mut encoder).map_err(|e| discard_tmp(&tmp, e))?;
    encoder.finish().map_err(|e| discard_tmp(&tmp, e))?;
    fs::rename(&tmp, dst)?;

    let bytes = fs::metadata(dst)?.len();
    Ok(ArtifactEntry::new(dst, src, "gzip", raw_bytes, bytes))
}

fn discard_tmp(tmp: &Path, e: io::Error) -> ArchiverError {
    let _ = fs::remove_file(tmp);
    e.into()
}

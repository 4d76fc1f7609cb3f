use std::fs;
use std::path::Path;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::error::ArchiverError;

pub const MANIFEST_FILE: &str = "manifest.json";

/// Per-exchange record of the artifacts written under the destination tree.
#[derive(Debug, Serialize, Deserialize)]
pub struct Manifest {
    pub exchange: String,
    pub generated_at: DateTime<Utc>,
    pub artifacts: Vec<ArtifactEntry>,
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct ArtifactEntry {
    pub name: String,
    pub format: String,
    pub source: String,
    pub raw_bytes: u64,
    pub bytes: u64,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub compression_ratio: Option<f64>,
    pub archived_at: DateTime<Utc>,
}

impl ArtifactEntry {
    pub fn new(artifact: &Path, source: &Path, format: &str, raw_bytes: u64, bytes: u64) -> Self {
        let compression_ratio = if raw_bytes > 0 {
            Some(bytes as f64 / raw_bytes as f64)
        } else {
            None
        };
        Self {
            name: file_name(artifact),
            format: format.to_string(),
            source: file_name(source),
            raw_bytes,
            bytes,
            compression_ratio,
            archived_at: Utc::now(),
        }
    }
}

/// Merge new entries into the exchange manifest and write it atomically.
///
/// Entries for an artifact name that was re-archived replace the old ones
/// rather than appending duplicates.
pub fn update_manifest(
    exchange_dir: &Path,
    exchange: &str,
    new_entries: &[ArtifactEntry],
) -> Result<(), ArchiverError> {
    let manifest_path = exchange_dir.join(MANIFEST_FILE);

    let mut artifacts = match fs::read_to_string(&manifest_path) {
        Ok(content) => match serde_json::from_str::<Manifest>(&content) {
            Ok(existing) => existing.artifacts,
            Err(e) => {
                warn!(path = ?manifest_path, error = %e, "Existing manifest unreadable, rewriting");
                Vec::new()
            }
        },
        Err(_) => Vec::new(),
    };

    artifacts.retain(|a| !new_entries.iter().any(|n| n.name == a.name));
    artifacts.extend_from_slice(new_entries);
    artifacts.sort_by(|a, b| a.name.cmp(&b.name));

    let manifest = Manifest {
        exchange: exchange.to_string(),
        generated_at: Utc::now(),
        artifacts,
    };

    fs::create_dir_all(exchange_dir)?;
    let manifest_json = serde_json::to_vec(&manifest)?;
    let tmp_manifest_path = manifest_path.with_extension("json.tmp");
    fs::write(&tmp_manifest_path, manifest_json)?;
    fs::rename(&tmp_manifest_path, &manifest_path)?;

    Ok(())
}

fn file_name(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn entry(name: &str, format: &str, bytes: u64) -> ArtifactEntry {
        ArtifactEntry {
            name: name.to_string(),
            format: format.to_string(),
            source: "2024-01-01.csv".to_string(),
            raw_bytes: 100,
            bytes,
            compression_ratio: Some(bytes as f64 / 100.0),
            archived_at: Utc::now(),
        }
    }

    #[test]
    fn test_update_manifest_writes_atomic_json() {
        let tmp = TempDir::new().unwrap();
        let entries = vec![
            entry("2024-01-01.csv.gz", "gzip", 40),
            entry("2024-01-01.parquet", "parquet", 60),
        ];

        update_manifest(tmp.path(), "NASDAQ", &entries).unwrap();

        let manifest_path = tmp.path().join(MANIFEST_FILE);
        let content = fs::read_to_string(&manifest_path).unwrap();
        let manifest: Manifest = serde_json::from_str(&content).unwrap();

        assert_eq!(manifest.exchange, "NASDAQ");
        assert_eq!(manifest.artifacts.len(), 2);
        // Sorted by artifact name
        assert_eq!(manifest.artifacts[0].name, "2024-01-01.csv.gz");
        assert_eq!(manifest.artifacts[1].name, "2024-01-01.parquet");
        assert!(!manifest_path.with_extension("json.tmp").exists());
    }

    #[test]
    fn test_update_manifest_replaces_rearchived_entries() {
        let tmp = TempDir::new().unwrap();
        update_manifest(
            tmp.path(),
            "NASDAQ",
            &[
                entry("2024-01-01.csv.gz", "gzip", 40),
                entry("2024-01-02.csv.gz", "gzip", 45),
            ],
        )
        .unwrap();

        // Re-archive one of the two files
        update_manifest(tmp.path(), "NASDAQ", &[entry("2024-01-01.csv.gz", "gzip", 42)]).unwrap();

        let content = fs::read_to_string(tmp.path().join(MANIFEST_FILE)).unwrap();
        let manifest: Manifest = serde_json::from_str(&content).unwrap();

        assert_eq!(manifest.artifacts.len(), 2);
        assert_eq!(manifest.artifacts[0].name, "2024-01-01.csv.gz");
        assert_eq!(manifest.artifacts[0].bytes, 42);
        assert_eq!(manifest.artifacts[1].name, "2024-01-02.csv.gz");
    }

    #[test]
    fn test_artifact_entry_compression_ratio() {
        let e = ArtifactEntry::new(
            Path::new("/dest/NASDAQ/2024-01-01.csv.gz"),
            Path::new("/data/ed/NASDAQ/2024-01-01.csv"),
            "gzip",
            200,
            50,
        );
        assert_eq!(e.name, "2024-01-01.csv.gz");
        assert_eq!(e.source, "2024-01-01.csv");
        assert_eq!(e.compression_ratio, Some(0.25));

        let empty = ArtifactEntry::new(
            Path::new("empty.csv.gz"),
            Path::new("empty.csv"),
            "gzip",
            0,
            20,
        );
        assert_eq!(empty.compression_ratio, None);
    }
}

use std::fmt;
use std::path::{Path, PathBuf};

use serde::Deserialize;

#[derive(Debug, Deserialize)]
pub struct Config {
    pub archive: ArchiveConfig,
}

#[derive(Debug, Deserialize, Clone)]
pub struct ArchiveConfig {
    /// Root directory containing one subdirectory per exchange
    pub source: PathBuf,
    /// Root directory for artifacts, mirroring the exchange layout
    pub destination: PathBuf,
    /// Artifact formats to produce for each trade file
    #[serde(default = "default_formats")]
    pub formats: Vec<OutputFormat>,
    /// Parquet column types; inferred from the CSV header when absent
    #[serde(default)]
    pub schema: Option<Vec<ColumnSpec>>,
}

#[derive(Debug, Deserialize, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    Gzip,
    Parquet,
}

#[derive(Debug, Deserialize, Clone)]
pub struct ColumnSpec {
    pub name: String,
    #[serde(rename = "type")]
    pub column_type: ColumnType,
}

#[derive(Debug, Deserialize, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum ColumnType {
    Utf8,
    Int64,
    Float64,
    Boolean,
}

fn default_formats() -> Vec<OutputFormat> {
    vec![OutputFormat::Gzip]
}

impl Config {
    pub fn load(path: &Path) -> Result<Self, crate::ArchiverError> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| crate::ArchiverError::Config(format!("{}: {}", path.display(), e)))?;
        let config: Config =
            serde_yaml::from_str(&content).map_err(|e| crate::ArchiverError::Config(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<(), crate::ArchiverError> {
        if self.archive.formats.is_empty() {
            return Err(crate::ArchiverError::Config(
                "At least one output format must be enabled".to_string(),
            ));
        }
        Ok(())
    }
}

impl OutputFormat {
    /// Artifact file name for a given source file name.
    pub fn artifact_name(&self, source_name: &str) -> String {
        match self {
            OutputFormat::Gzip => format!("{}.gz", source_name),
            OutputFormat::Parquet => {
                let stem = source_name.strip_suffix(".csv").unwrap_or(source_name);
                format!("{}.parquet", stem)
            }
        }
    }
}

impl fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OutputFormat::Gzip => write!(f, "gzip"),
            OutputFormat::Parquet => write!(f, "parquet"),
        }
    }
}

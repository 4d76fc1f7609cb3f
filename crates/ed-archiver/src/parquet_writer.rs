use std::fs::{self, File};
use std::io::Seek;
use std::path::Path;
use std::sync::Arc;

use arrow::csv::reader::Format;
use arrow::csv::ReaderBuilder;
use arrow::datatypes::{DataType, Field, Schema};
use parquet::arrow::ArrowWriter;
use parquet::basic::Compression;
use parquet::file::properties::{EnabledStatistics, WriterProperties};

use crate::config::{ColumnSpec, ColumnType};
use crate::error::ArchiverError;
use crate::manifest::ArtifactEntry;

/// Rows sampled when inferring the schema from the CSV header.
const INFER_MAX_RECORDS: usize = 1000;

/// Convert a CSV trade file into a parquet artifact.
///
/// The column schema comes from the configuration when given, otherwise it
/// is inferred from the header row and a sample of records. Written via a
/// `.tmp` sibling and renamed into place on success.
pub fn convert_file(
    src: &Path,
    dst: &Path,
    columns: Option<&[ColumnSpec]>,
) -> Result<ArtifactEntry, ArchiverError> {
    let mut input = File::open(src)?;
    let format = Format::default().with_header(true);

    let schema = match columns {
        Some(cols) => {
            let fields: Vec<Field> = cols
                .iter()
                .map(|c| Field::new(&c.name, arrow_type(c.column_type), true))
                .collect();
            Arc::new(Schema::new(fields))
        }
        None => {
            let (inferred, _) = format.infer_schema(&mut input, Some(INFER_MAX_RECORDS))?;
            input.rewind()?;
            Arc::new(inferred)
        }
    };

    let reader = ReaderBuilder::new(Arc::clone(&schema))
        .with_format(format)
        .build(input)?;

    if let Some(parent) = dst.parent() {
        fs::create_dir_all(parent)?;
    }
    let tmp = dst.with_extension("parquet.tmp");

    let out = File::create(&tmp)?;
    let props = WriterProperties::builder()
        .set_compression(Compression::SNAPPY)
        .set_statistics_enabled(EnabledStatistics::Chunk)
        .set_created_by("ed-archiver".to_string())
        .build();
    let mut arrow_writer = ArrowWriter::try_new(out, schema, Some(props))
        .map_err(|e| discard_tmp(&tmp, e.into()))?;

    for batch in reader {
        let batch = batch.map_err(|e| discard_tmp(&tmp, e.into()))?;
        arrow_writer
            .write(&batch)
            .map_err(|e| discard_tmp(&tmp, e.into()))?;
    }
    arrow_writer
        .close()
        .map_err(|e| discard_tmp(&tmp, e.into()))?;
    fs::rename(&tmp, dst)?;

    let raw_bytes = fs::metadata(src)?.len();
    let bytes = fs::metadata(dst)?.len();
    Ok(ArtifactEntry::new(dst, src, "parquet", raw_bytes, bytes))
}

fn arrow_type(column_type: ColumnType) -> DataType {
    match column_type {
        ColumnType::Utf8 => DataType::Utf8,
        ColumnType::Int64 => DataType::Int64,
        ColumnType::Float64 => DataType::Float64,
        ColumnType::Boolean => DataType::Boolean,
    }
}

fn discard_tmp(tmp: &Path, e: ArchiverError) -> ArchiverError {
    let _ = fs::remove_file(tmp);
    e
}

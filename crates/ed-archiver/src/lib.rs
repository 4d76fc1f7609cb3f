//! ed-archiver: daily trade-file archiver
//!
//! Compresses per-exchange CSV trade files into gzip and/or parquet
//! artifacts under a mirrored destination tree. Single-shot batch job;
//! periodic invocation is left to cron.

pub mod archiver;
pub mod config;
pub mod error;
pub mod manifest;
pub mod parquet_writer;
pub mod writer;

pub use config::Config;
pub use error::ArchiverError;

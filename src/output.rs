//! Output formatting and persistence for readings and derived rows.
//!
//! Supports pretty-printing, JSON serialization, CSV append and CSV
//! (optionally gzipped) batch writes.

use anyhow::{Context, Result};
use flate2::Compression;
use flate2::write::GzEncoder;
use serde::Serialize;
use std::fmt::Debug;
use std::fs::{File, OpenOptions};
use std::io::Write;
use std::path::Path;
use tracing::{debug, info};

use csv::WriterBuilder;

/// Logs a value using Rust's debug pretty-print format.
pub fn print_pretty<T: Debug>(value: &T) {
    debug!("{:#?}", value);
}

/// Logs a value as pretty-printed JSON.
pub fn print_json<T: Serialize>(value: &T) -> Result<()> {
    info!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

/// Appends a record as a row to a CSV file.
///
/// Creates the file with headers if it does not already exist.
pub fn append_record<T: Serialize>(path: &str, record: &T) -> Result<()> {
    let file_exists = Path::new(path).exists();
    debug!(path, file_exists, "Appending CSV record");

    let file = OpenOptions::new()
        .append(true)
        .create(true)
        .open(path)
        .with_context(|| format!("Failed to open {path}"))?;

    let mut writer = WriterBuilder::new()
        .has_headers(!file_exists) // IMPORTANT when appending
        .from_writer(file);

    writer.serialize(record)?;
    writer.flush()?;

    Ok(())
}

fn write_csv<W: Write, T: Serialize>(out: W, records: &[T]) -> Result<W> {
    let mut writer = WriterBuilder::new().from_writer(out);
    for record in records {
        writer.serialize(record)?;
    }
    writer.flush()?;
    writer
        .into_inner()
        .map_err(|e| anyhow::anyhow!("Failed to finish CSV output: {}", e))
}

/// Writes all records to `path`, replacing any existing file.
///
/// With `gzip` the CSV is gzip-compressed; the path is used as given.
#[tracing::instrument(skip(records), fields(rows = records.len()))]
pub fn write_records<T: Serialize>(path: &str, records: &[T], gzip: bool) -> Result<()> {
    let file = File::create(path).with_context(|| format!("Failed to create {path}"))?;

    if gzip {
        let encoder = write_csv(GzEncoder::new(file, Compression::default()), records)?;
        encoder.finish()?;
    } else {
        write_csv(file, records)?;
    }

    info!(path, "Wrote CSV output");
    Ok(())
}

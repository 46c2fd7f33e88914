//! CSV parser for raw pollutant readings.
//!
//! Headers are trimmed and lowercased. The timestamp is taken from the
//! first of `timestamp_str`, `timestamp` or `dt`; pollutant columns are
//! matched by name and everything else is ignored. Empty, `nan`, `null`
//! and `none` cells are read as null.

use anyhow::{Context, Result};
use chrono::{DateTime, NaiveDateTime, Utc};
use csv::ReaderBuilder;
use std::fs::File;
use std::io::Read;
use std::path::Path;
use tracing::{debug, warn};

use crate::error::EngineError;
use crate::observation::ObservationRow;
use crate::pollutant::Pollutant;

const TIMESTAMP_COLUMNS: [&str; 3] = ["timestamp_str", "timestamp", "dt"];
const PROVIDER_INDEX_COLUMN: &str = "aqi_index";
const NULL_TOKENS: [&str; 5] = ["", "nan", "null", "none", "na"];

/// Parses a timestamp in RFC 3339, `YYYY-MM-DD HH:MM:SS[.f][+zz:zz]`, or
/// Unix seconds. Naive timestamps are taken as UTC.
pub fn parse_timestamp(raw: &str) -> Result<DateTime<Utc>, EngineError> {
    let s = raw.trim();

    if let Ok(ts) = DateTime::parse_from_rfc3339(s) {
        return Ok(ts.with_timezone(&Utc));
    }
    if let Ok(ts) = DateTime::parse_from_str(s, "%Y-%m-%d %H:%M:%S%.f%:z") {
        return Ok(ts.with_timezone(&Utc));
    }
    for fmt in ["%Y-%m-%d %H:%M:%S%.f", "%Y-%m-%dT%H:%M:%S%.f"] {
        if let Ok(ts) = NaiveDateTime::parse_from_str(s, fmt) {
            return Ok(ts.and_utc());
        }
    }
    if let Ok(secs) = s.parse::<i64>() {
        if let Some(ts) = DateTime::from_timestamp(secs, 0) {
            return Ok(ts);
        }
    }

    Err(EngineError::TimestampParse(s.to_string()))
}

fn parse_value(column: &str, raw: &str) -> Result<Option<f64>, EngineError> {
    let s = raw.trim();
    if NULL_TOKENS.contains(&s.to_lowercase().as_str()) {
        return Ok(None);
    }
    match s.parse::<f64>() {
        Ok(v) if v.is_finite() => Ok(Some(v)),
        _ => Err(EngineError::InvalidValue {
            column: column.to_string(),
            value: s.to_string(),
        }),
    }
}

fn parse_provider_index(raw: &str) -> Result<Option<u8>, EngineError> {
    let value = parse_value(PROVIDER_INDEX_COLUMN, raw)?;
    Ok(value
        .filter(|v| v.fract() == 0.0 && (0.0..=255.0).contains(v))
        .map(|v| v as u8))
}

/// Reads every row of a raw readings CSV.
///
/// # Errors
///
/// Returns an error if there is no timestamp column, or a timestamp or
/// concentration cell cannot be parsed. The message names the line.
pub fn parse_readings<R: Read>(reader: R) -> Result<Vec<ObservationRow>> {
    let mut rdr = ReaderBuilder::new()
        .trim(csv::Trim::All)
        .flexible(true)
        .from_reader(reader);

    let headers: Vec<String> = rdr
        .headers()?
        .iter()
        .map(|h| h.trim().to_lowercase())
        .collect();

    let timestamp_col = TIMESTAMP_COLUMNS
        .iter()
        .find_map(|name| headers.iter().position(|h| h == name))
        .ok_or(EngineError::MissingTimestamp)?;
    let provider_col = headers.iter().position(|h| h == PROVIDER_INDEX_COLUMN);
    let pollutant_cols: Vec<(usize, Pollutant)> = headers
        .iter()
        .enumerate()
        .filter_map(|(i, h)| h.parse::<Pollutant>().ok().map(|p| (i, p)))
        .collect();

    if pollutant_cols.is_empty() {
        warn!(?headers, "No pollutant columns found in readings");
    }

    let mut rows = Vec::new();
    for (i, record) in rdr.records().enumerate() {
        let record = record?;
        // header is line 1
        let line = i + 2;

        let raw_ts = record.get(timestamp_col).unwrap_or_default();
        let timestamp =
            parse_timestamp(raw_ts).with_context(|| format!("line {line}: bad timestamp"))?;

        let mut row = ObservationRow::new(timestamp);
        if let Some(col) = provider_col {
            row.provider_index = parse_provider_index(record.get(col).unwrap_or_default())
                .with_context(|| format!("line {line}: bad {PROVIDER_INDEX_COLUMN}"))?;
        }
        for &(col, pollutant) in &pollutant_cols {
            let value = parse_value(pollutant.as_str(), record.get(col).unwrap_or_default())
                .with_context(|| format!("line {line}: bad {pollutant}"))?;
            row.set(pollutant, value);
        }

        rows.push(row);
    }

    debug!(rows = rows.len(), columns = pollutant_cols.len(), "Parsed readings");
    Ok(rows)
}

/// Reads a raw readings CSV from disk.
#[tracing::instrument(skip_all, fields(path = %path.as_ref().display()))]
pub fn read_readings_file(path: impl AsRef<Path>) -> Result<Vec<ObservationRow>> {
    let path = path.as_ref();
    let file = File::open(path).with_context(|| format!("Failed to open {}", path.display()))?;
    parse_readings(file).with_context(|| format!("Failed to parse {}", path.display()))
}

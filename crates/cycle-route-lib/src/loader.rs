//! Coordinate file loading
//!
//! Reads a CSV file in a configurable text encoding, maps its header names to
//! the four logical columns and coerces every field to a number. Coercion
//! failures only blank the affected field; rows left without a latitude or a
//! longitude are dropped.
//!
//! Route ids must be whole numbers. A fractional id such as `1.5` is treated
//! as missing rather than truncated, so its rows join no route.

use crate::{CoordinateRow, DataError, Result};
use encoding_rs::Encoding;
#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};
use std::io::Read;
use std::path::Path;

/// Header names of the four logical columns
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct ColumnNames {
    pub sequence: String,
    pub route_id: String,
    pub latitude: String,
    pub longitude: String,
}

impl Default for ColumnNames {
    fn default() -> Self {
        Self {
            sequence: "순서".to_string(),
            route_id: "국토종주 자전거길".to_string(),
            latitude: "위도(LINE_XP)".to_string(),
            longitude: "경도(LINE_YP)".to_string(),
        }
    }
}

/// Loader configuration
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct LoaderConfig {
    /// Text encoding label of the source (WHATWG label, or `cp949`)
    pub encoding: String,
    /// Header names to look for
    pub columns: ColumnNames,
}

impl Default for LoaderConfig {
    fn default() -> Self {
        Self {
            encoding: "cp949".to_string(),
            columns: ColumnNames::default(),
        }
    }
}

impl LoaderConfig {
    /// Config for UTF-8 sources with the default column names
    pub fn utf8() -> Self {
        Self {
            encoding: "utf-8".to_string(),
            ..Default::default()
        }
    }
}

/// Row counts of a single load
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct LoadReport {
    /// Data records found after the header
    pub records_read: usize,
    /// Rows that survived validation
    pub rows_kept: usize,
}

impl LoadReport {
    pub fn rows_dropped(&self) -> usize {
        self.records_read - self.rows_kept
    }
}

/// Resolve an encoding label
///
/// Accepts every WHATWG label known to `encoding_rs` plus the Windows code
/// page aliases commonly used for Korean data.
pub fn resolve_encoding(label: &str) -> Result<&'static Encoding> {
    let label = label.trim();
    if let Some(encoding) = Encoding::for_label(label.as_bytes()) {
        return Ok(encoding);
    }
    match label.to_ascii_lowercase().as_str() {
        "cp949" | "ms949" | "uhc" => Ok(encoding_rs::EUC_KR),
        _ => Err(DataError::UnknownEncoding(label.to_string())),
    }
}

/// Load valid rows from a CSV file
pub fn load_csv<P: AsRef<Path>>(path: P, config: &LoaderConfig) -> Result<Vec<CoordinateRow>> {
    load_csv_with_report(path, config).map(|(rows, _)| rows)
}

/// Load valid rows from a CSV file, also returning the row counts
pub fn load_csv_with_report<P: AsRef<Path>>(
    path: P,
    config: &LoaderConfig,
) -> Result<(Vec<CoordinateRow>, LoadReport)> {
    #[cfg(feature = "profiling")]
    profiling::scope!("loader::load_csv");

    let path = path.as_ref();
    let source_name = path.display().to_string();
    let file = std::fs::File::open(path)
        .map_err(|e| DataError::unavailable(&source_name, format!("cannot open file: {e}")))?;
    parse_source(std::io::BufReader::new(file), &source_name, config)
}

/// Load valid rows from any reader
pub fn load_from_reader<R: Read>(reader: R, config: &LoaderConfig) -> Result<Vec<CoordinateRow>> {
    load_from_reader_with_report(reader, config).map(|(rows, _)| rows)
}

/// Load valid rows from any reader, also returning the row counts
pub fn load_from_reader_with_report<R: Read>(
    reader: R,
    config: &LoaderConfig,
) -> Result<(Vec<CoordinateRow>, LoadReport)> {
    parse_source(reader, "<reader>", config)
}

fn parse_source<R: Read>(
    mut reader: R,
    source_name: &str,
    config: &LoaderConfig,
) -> Result<(Vec<CoordinateRow>, LoadReport)> {
    let encoding = resolve_encoding(&config.encoding)?;

    let mut bytes = Vec::new();
    reader
        .read_to_end(&mut bytes)
        .map_err(|e| DataError::unavailable(source_name, format!("cannot read file: {e}")))?;

    // A byte order mark overrides the configured encoding
    let (text, used_encoding, had_errors) = encoding.decode(&bytes);
    if had_errors {
        tracing::warn!(
            "{} contains bytes that are not valid {}, they were replaced",
            source_name,
            used_encoding.name()
        );
    }

    let (rows, report) = parse_text(&text, source_name, &config.columns)?;

    tracing::info!(
        "Loaded {} of {} records from {} ({})",
        report.rows_kept,
        report.records_read,
        source_name,
        used_encoding.name()
    );
    if report.rows_dropped() > 0 {
        tracing::debug!(
            "Dropped {} records without usable coordinates",
            report.rows_dropped()
        );
    }

    Ok((rows, report))
}

/// Positions of the logical columns within a header record
struct ColumnIndices {
    sequence: usize,
    route_id: usize,
    latitude: usize,
    longitude: usize,
}

impl ColumnIndices {
    /// Find every column, or return the names that are missing
    fn resolve(
        headers: &csv::StringRecord,
        columns: &ColumnNames,
    ) -> std::result::Result<Self, Vec<String>> {
        let mut missing = Vec::new();
        let mut find = |name: &str| {
            let index = headers.iter().position(|header| header == name.trim());
            if index.is_none() {
                missing.push(name.to_string());
            }
            index.unwrap_or_default()
        };

        let indices = Self {
            sequence: find(&columns.sequence),
            route_id: find(&columns.route_id),
            latitude: find(&columns.latitude),
            longitude: find(&columns.longitude),
        };

        if missing.is_empty() {
            Ok(indices)
        } else {
            Err(missing)
        }
    }

    fn row_from(&self, record: &csv::StringRecord, index: usize) -> Option<CoordinateRow> {
        let number = |column: usize| record.get(column).and_then(parse_number);

        let latitude = number(self.latitude)?;
        let longitude = number(self.longitude)?;

        Some(
            CoordinateRow::new(
                number(self.sequence),
                number(self.route_id).and_then(integral_id),
                latitude,
                longitude,
            )
            .with_record(index),
        )
    }
}

fn parse_text(
    text: &str,
    source_name: &str,
    columns: &ColumnNames,
) -> Result<(Vec<CoordinateRow>, LoadReport)> {
    let mut csv_reader = csv::ReaderBuilder::new()
        .flexible(true)
        .trim(csv::Trim::Headers)
        .from_reader(text.as_bytes());

    let headers = csv_reader
        .headers()
        .map_err(|e| DataError::unavailable(source_name, format!("unreadable header row: {e}")))?
        .clone();
    if headers.is_empty() {
        return Err(DataError::unavailable(source_name, "no header row"));
    }

    let indices = ColumnIndices::resolve(&headers, columns).map_err(|missing| {
        DataError::unavailable(
            source_name,
            format!("missing columns: {}", missing.join(", ")),
        )
    })?;

    let mut rows = Vec::new();
    let mut report = LoadReport::default();

    for (index, record) in csv_reader.records().enumerate() {
        report.records_read += 1;
        let record = match record {
            Ok(record) => record,
            Err(e) => {
                tracing::trace!("Skipping malformed record {}: {}", index, e);
                continue;
            }
        };
        if let Some(row) = indices.row_from(&record, index) {
            rows.push(row);
        }
    }

    report.rows_kept = rows.len();
    Ok((rows, report))
}

/// Lenient numeric coercion: anything that is not a finite number is missing
fn parse_number(field: &str) -> Option<f64> {
    field
        .trim()
        .parse::<f64>()
        .ok()
        .filter(|value| value.is_finite())
}

/// Largest integer an f64 represents exactly
const MAX_EXACT_INTEGER: f64 = 9_007_199_254_740_992.0;

fn integral_id(value: f64) -> Option<i64> {
    (value.fract() == 0.0 && value.abs() <= MAX_EXACT_INTEGER).then_some(value as i64)
}

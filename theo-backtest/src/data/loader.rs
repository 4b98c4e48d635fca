//! CSV loader for market snapshots.
//!
//! Acquisition sources name their columns in many ways (`strike`,
//! `lastPrice`, `impliedVolatility`, snake_case exports, ...). Headers are
//! matched against an alias table after normalization (case-insensitive,
//! spaces, underscores and hyphens ignored) so the core only ever sees the
//! canonical fields:
//! - Date
//! - Stock Price
//! - Strike Price
//! - Time to Maturity
//! - Risk-free Rate
//! - Volatility
//! - Market Price

use std::fs::File;
use std::io::Read;
use std::path::Path;

use chrono::{NaiveDate, NaiveDateTime};
use tracing::{debug, info};

use super::types::MarketSnapshot;
use super::DataError;

/// Canonical column names, in export order.
pub const CANONICAL_COLUMNS: &[&str] = &[
    "Date",
    "Stock Price",
    "Strike Price",
    "Time to Maturity",
    "Risk-free Rate",
    "Volatility",
    "Market Price",
];

/// Normalized aliases per canonical column. Earlier entries win when a file
/// carries more than one alias for the same field.
const COLUMN_ALIASES: &[&[&str]] = &[
    &["date", "tradedate", "quotedate", "lasttradedate"],
    &["stockprice", "underlyingprice", "underlying", "spot", "close", "s"],
    &["strikeprice", "strike", "k"],
    &["timetomaturity", "maturity", "yearstoexpiry", "tte", "t"],
    &["riskfreerate", "interestrate", "rate", "r"],
    &["volatility", "impliedvolatility", "vol", "iv", "sigma"],
    &["marketprice", "lastprice", "optionprice", "price", "mid"],
];

fn normalize_header(name: &str) -> String {
    name.trim()
        .chars()
        .filter(|c| !matches!(c, ' ' | '_' | '-'))
        .flat_map(char::to_lowercase)
        .collect()
}

/// Map an acquisition-side column name to its canonical name.
pub fn canonical_column(name: &str) -> Option<&'static str> {
    column_match(name).map(|(field, _)| CANONICAL_COLUMNS[field])
}

/// (canonical field index, alias priority)
fn column_match(name: &str) -> Option<(usize, usize)> {
    let normalized = normalize_header(name);
    COLUMN_ALIASES.iter().enumerate().find_map(|(field, aliases)| {
        aliases
            .iter()
            .position(|alias| *alias == normalized)
            .map(|priority| (field, priority))
    })
}

/// Parse a date in ISO form, with or without a time component.
pub fn parse_date(value: &str) -> Option<NaiveDate> {
    let value = value.trim();
    NaiveDate::parse_from_str(value, "%Y-%m-%d")
        .ok()
        .or_else(|| {
            NaiveDateTime::parse_from_str(value, "%Y-%m-%d %H:%M:%S")
                .ok()
                .map(|dt| dt.date())
        })
        .or_else(|| {
            NaiveDateTime::parse_from_str(value, "%Y-%m-%dT%H:%M:%S")
                .ok()
                .map(|dt| dt.date())
        })
        .or_else(|| NaiveDate::parse_from_str(value, "%m/%d/%Y").ok())
}

/// CSV snapshot loader.
#[derive(Debug, Clone)]
pub struct SnapshotLoader {
    sort_by_date: bool,
}

impl Default for SnapshotLoader {
    fn default() -> Self {
        Self { sort_by_date: true }
    }
}

impl SnapshotLoader {
    pub fn new() -> Self {
        Self::default()
    }

    /// Keep file order instead of sorting rows by date.
    pub fn with_sort_by_date(mut self, sort: bool) -> Self {
        self.sort_by_date = sort;
        self
    }

    /// Load snapshots from a CSV file.
    pub fn load_csv<P: AsRef<Path>>(&self, path: P) -> Result<Vec<MarketSnapshot>, DataError> {
        let path = path.as_ref();
        if !path.exists() {
            return Err(DataError::FileNotFound(path.display().to_string()));
        }
        let snapshots = self.load_from_reader(File::open(path)?)?;
        info!("Loaded {} snapshots from {}", snapshots.len(), path.display());
        Ok(snapshots)
    }

    /// Load snapshots from any CSV source with a header row.
    pub fn load_from_reader<R: Read>(&self, reader: R) -> Result<Vec<MarketSnapshot>, DataError> {
        let mut reader = csv::ReaderBuilder::new().trim(csv::Trim::All).from_reader(reader);

        let headers = reader.headers()?.clone();
        let columns = Self::resolve_columns(&headers)?;

        let mut snapshots = Vec::new();
        for (idx, record) in reader.records().enumerate() {
            let record = record?;
            let row = idx + 1;

            let raw_date = Self::cell(&record, &columns, row, 0)?;
            let date = parse_date(raw_date).ok_or_else(|| DataError::InvalidData {
                row,
                column: CANONICAL_COLUMNS[0].to_string(),
                message: format!("unrecognized date '{}'", raw_date),
            })?;
            let number = |field: usize| Self::number(&record, &columns, row, field);

            snapshots.push(MarketSnapshot {
                date,
                stock_price: number(1)?,
                strike_price: number(2)?,
                time_to_maturity: number(3)?,
                risk_free_rate: number(4)?,
                volatility: number(5)?,
                market_price: number(6)?,
            });
        }

        if self.sort_by_date {
            snapshots.sort_by_key(|s| s.date);
        }

        Ok(snapshots)
    }

    fn cell<'r>(
        record: &'r csv::StringRecord,
        columns: &[usize],
        row: usize,
        field: usize,
    ) -> Result<&'r str, DataError> {
        record.get(columns[field]).ok_or_else(|| DataError::InvalidData {
            row,
            column: CANONICAL_COLUMNS[field].to_string(),
            message: "missing value".to_string(),
        })
    }

    fn number(
        record: &csv::StringRecord,
        columns: &[usize],
        row: usize,
        field: usize,
    ) -> Result<f64, DataError> {
        let raw = Self::cell(record, columns, row, field)?;
        let value = raw.parse::<f64>().map_err(|e| DataError::InvalidData {
            row,
            column: CANONICAL_COLUMNS[field].to_string(),
            message: format!("'{}': {}", raw, e),
        })?;
        if !value.is_finite() {
            return Err(DataError::InvalidData {
                row,
                column: CANONICAL_COLUMNS[field].to_string(),
                message: format!("non-finite value '{}'", raw),
            });
        }
        Ok(value)
    }

    /// Column index in the file for each canonical field.
    fn resolve_columns(headers: &csv::StringRecord) -> Result<Vec<usize>, DataError> {
        let mut best: Vec<Option<(usize, usize)>> = vec![None; CANONICAL_COLUMNS.len()];

        for (col_idx, header) in headers.iter().enumerate() {
            match column_match(header) {
                Some((field, priority)) => {
                    let replace = match best[field] {
                        Some((_, current)) => priority < current,
                        None => true,
                    };
                    if replace {
                        best[field] = Some((col_idx, priority));
                    }
                }
                None => debug!("Ignoring column '{}'", header),
            }
        }

        best.iter()
            .enumerate()
            .map(|(field, found)| {
                found
                    .map(|(col_idx, _)| col_idx)
                    .ok_or_else(|| DataError::MissingColumn(CANONICAL_COLUMNS[field].to_string()))
            })
            .collect()
    }
}

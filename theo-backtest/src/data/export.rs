//! Flat CSV / JSON export of snapshots, backtest rows and metrics.

use std::fs::{self, File};
use std::io::Write;
use std::path::Path;

use chrono::NaiveDate;
use serde::Serialize;
use tracing::info;

use crate::backtest::{BacktestResult, BacktestRow, Signal};
use crate::metrics::PerformanceMetrics;

use super::loader::CANONICAL_COLUMNS;
use super::types::MarketSnapshot;
use super::DataError;

/// Columns appended after the snapshot fields in a results export.
const RESULT_COLUMNS: [&str; 3] = ["Model Price", "Signal", "Return"];

fn create_file(path: &Path) -> Result<File, DataError> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent)?;
        }
    }
    Ok(File::create(path)?)
}

/// One snapshot in canonical column layout.
#[derive(Serialize)]
struct SnapshotRecord {
    #[serde(rename = "Date")]
    date: NaiveDate,
    #[serde(rename = "Stock Price")]
    stock_price: f64,
    #[serde(rename = "Strike Price")]
    strike_price: f64,
    #[serde(rename = "Time to Maturity")]
    time_to_maturity: f64,
    #[serde(rename = "Risk-free Rate")]
    risk_free_rate: f64,
    #[serde(rename = "Volatility")]
    volatility: f64,
    #[serde(rename = "Market Price")]
    market_price: f64,
}

impl From<&MarketSnapshot> for SnapshotRecord {
    fn from(s: &MarketSnapshot) -> Self {
        Self {
            date: s.date,
            stock_price: s.stock_price,
            strike_price: s.strike_price,
            time_to_maturity: s.time_to_maturity,
            risk_free_rate: s.risk_free_rate,
            volatility: s.volatility,
            market_price: s.market_price,
        }
    }
}

/// Snapshot columns followed by the backtest outputs.
#[derive(Serialize)]
struct ResultRecord {
    #[serde(rename = "Date")]
    date: NaiveDate,
    #[serde(rename = "Stock Price")]
    stock_price: f64,
    #[serde(rename = "Strike Price")]
    strike_price: f64,
    #[serde(rename = "Time to Maturity")]
    time_to_maturity: f64,
    #[serde(rename = "Risk-free Rate")]
    risk_free_rate: f64,
    #[serde(rename = "Volatility")]
    volatility: f64,
    #[serde(rename = "Market Price")]
    market_price: f64,
    #[serde(rename = "Model Price")]
    model_price: f64,
    #[serde(rename = "Signal")]
    signal: Signal,
    #[serde(rename = "Return")]
    ret: f64,
}

impl From<&BacktestRow> for ResultRecord {
    fn from(row: &BacktestRow) -> Self {
        let s = &row.snapshot;
        Self {
            date: s.date,
            stock_price: s.stock_price,
            strike_price: s.strike_price,
            time_to_maturity: s.time_to_maturity,
            risk_free_rate: s.risk_free_rate,
            volatility: s.volatility,
            market_price: s.market_price,
            model_price: row.model_price,
            signal: row.signal,
            ret: row.ret,
        }
    }
}

/// Header is written up front so an empty export still carries it.
fn headed_writer<W: Write>(writer: W, header: &[&str]) -> Result<csv::Writer<W>, DataError> {
    let mut writer = csv::WriterBuilder::new()
        .has_headers(false)
        .from_writer(writer);
    writer.write_record(header)?;
    Ok(writer)
}

/// Write snapshots with the canonical header.
pub fn write_snapshots<W: Write>(writer: W, snapshots: &[MarketSnapshot]) -> Result<(), DataError> {
    let mut writer = headed_writer(writer, CANONICAL_COLUMNS)?;
    for snapshot in snapshots {
        writer.serialize(SnapshotRecord::from(snapshot))?;
    }
    writer.flush()?;
    Ok(())
}

pub fn write_snapshots_csv<P: AsRef<Path>>(
    path: P,
    snapshots: &[MarketSnapshot],
) -> Result<(), DataError> {
    let path = path.as_ref();
    write_snapshots(create_file(path)?, snapshots)?;
    info!("Wrote {} snapshots to {}", snapshots.len(), path.display());
    Ok(())
}

/// Write backtest rows: canonical snapshot columns followed by
/// `Model Price`, `Signal` and `Return`.
pub fn write_results<W: Write>(writer: W, result: &BacktestResult) -> Result<(), DataError> {
    let mut header: Vec<&str> = CANONICAL_COLUMNS.to_vec();
    header.extend(RESULT_COLUMNS);

    let mut writer = headed_writer(writer, &header)?;
    for row in &result.rows {
        writer.serialize(ResultRecord::from(row))?;
    }
    writer.flush()?;
    Ok(())
}

pub fn write_results_csv<P: AsRef<Path>>(path: P, result: &BacktestResult) -> Result<(), DataError> {
    let path = path.as_ref();
    write_results(create_file(path)?, result)?;
    info!("Wrote {} result rows to {}", result.rows.len(), path.display());
    Ok(())
}

pub fn write_metrics_json<P: AsRef<Path>>(
    path: P,
    metrics: &PerformanceMetrics,
) -> Result<(), DataError> {
    let path = path.as_ref();
    let content = serde_json::to_string_pretty(metrics)?;
    let mut file = create_file(path)?;
    file.write_all(content.as_bytes())?;
    Ok(())
}

//! Market data: snapshot types, CSV loading and export, sample synthesis.

pub mod export;
pub mod loader;
pub mod sample;
pub mod types;

use thiserror::Error;

pub use export::{write_metrics_json, write_results_csv, write_snapshots_csv};
pub use loader::{canonical_column, SnapshotLoader, CANONICAL_COLUMNS};
pub use sample::{SampleConfig, SampleDataGenerator};
pub use types::{ContractParams, MarketSnapshot, OptionType};

#[derive(Error, Debug)]
pub enum DataError {
    #[error("File not found: {0}")]
    FileNotFound(String),

    #[error("Missing column: {0}")]
    MissingColumn(String),

    #[error("Invalid data at row {row}, column '{column}': {message}")]
    InvalidData {
        row: usize,
        column: String,
        message: String,
    },

    #[error("Invalid sample configuration: {0}")]
    InvalidSample(String),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

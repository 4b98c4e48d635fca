//! Backtesting engine for theoretical-value option signals.
//!
//! Prices every market snapshot with the selected model and turns the
//! model/market discrepancy into a Buy/Sell signal and a captured return.

pub mod engine;

pub use engine::{
    BacktestConfig, BacktestError, BacktestResult, BacktestRow, Backtester, DegeneratePolicy,
    Signal,
};

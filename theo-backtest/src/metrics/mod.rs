//! Performance metrics module.
//!
//! Aggregates a backtest's per-period returns:
//! - Total return
//! - Annualized return (252 trading days)
//! - Sortino ratio (downside deviation)

pub mod calculator;

pub use calculator::{MetricsCalculator, MetricsError, PerformanceMetrics, TRADING_DAYS_PER_YEAR};

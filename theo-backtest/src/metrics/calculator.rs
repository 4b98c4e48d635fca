//! Performance metrics calculator.
//!
//! Reduces the per-period return sequence of a backtest into:
//! - Total return: sum of returns
//! - Annual return: mean return x 252 trading days
//! - Sortino ratio: annual return / population std-dev of the negative returns
//!
//! Backtest returns are absolute price discrepancies, so the negative subset
//! is normally empty and the Sortino ratio is undefined. That is an expected
//! outcome, reported as `None`, not an error.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::backtest::BacktestResult;

/// Trading days used to annualize per-period returns.
pub const TRADING_DAYS_PER_YEAR: f64 = 252.0;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum MetricsError {
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    #[error("Undefined statistic: {0}")]
    UndefinedStatistic(String),
}

/// Summary statistics for a completed backtest.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PerformanceMetrics {
    /// Number of periods aggregated.
    pub periods: usize,

    pub total_return: f64,
    pub annual_return: f64,

    /// `None` when the downside deviation is undefined.
    pub sortino_ratio: Option<f64>,
}

impl PerformanceMetrics {
    /// Sortino ratio with the undefined case as NaN.
    pub fn sortino_or_nan(&self) -> f64 {
        self.sortino_ratio.unwrap_or(f64::NAN)
    }

    /// Key/value listing for display.
    pub fn entries(&self) -> [(&'static str, f64); 3] {
        [
            ("Total Return", self.total_return),
            ("Annual Return", self.annual_return),
            ("Sortino Ratio", self.sortino_or_nan()),
        ]
    }

    /// Generate a summary report.
    pub fn summary(&self) -> String {
        let mut out = String::from("Performance Metrics:");
        for (key, value) in self.entries() {
            out.push_str(&format!("\n{}: {}", key, value));
        }
        out
    }
}

/// Metrics calculator.
pub struct MetricsCalculator;

impl MetricsCalculator {
    /// Calculate all metrics from a backtest result.
    pub fn calculate(result: &BacktestResult) -> Result<PerformanceMetrics, MetricsError> {
        Self::from_returns(&result.returns())
    }

    /// Calculate all metrics from a raw return sequence.
    pub fn from_returns(returns: &[f64]) -> Result<PerformanceMetrics, MetricsError> {
        if returns.is_empty() {
            return Err(MetricsError::InvalidArgument(
                "cannot summarize an empty return sequence".to_string(),
            ));
        }
        if let Some(bad) = returns.iter().find(|r| !r.is_finite()) {
            return Err(MetricsError::InvalidArgument(format!(
                "non-finite return {}",
                bad
            )));
        }

        let total_return: f64 = returns.iter().sum();
        let annual_return = total_return / returns.len() as f64 * TRADING_DAYS_PER_YEAR;

        let sortino_ratio = match Self::downside_deviation(returns) {
            Ok(deviation) => Some(annual_return / deviation),
            Err(MetricsError::UndefinedStatistic(_)) => None,
            Err(e) => return Err(e),
        };

        Ok(PerformanceMetrics {
            periods: returns.len(),
            total_return,
            annual_return,
            sortino_ratio,
        })
    }

    /// Population standard deviation of the strictly negative returns.
    pub fn downside_deviation(returns: &[f64]) -> Result<f64, MetricsError> {
        let negative: Vec<f64> = returns.iter().copied().filter(|&r| r < 0.0).collect();
        if negative.is_empty() {
            return Err(MetricsError::UndefinedStatistic(
                "no negative returns for downside deviation".to_string(),
            ));
        }

        let n = negative.len() as f64;
        let mean = negative.iter().sum::<f64>() / n;
        let variance = negative.iter().map(|r| (r - mean).powi(2)).sum::<f64>() / n;
        let deviation = variance.sqrt();

        if deviation == 0.0 {
            return Err(MetricsError::UndefinedStatistic(
                "zero downside deviation".to_string(),
            ));
        }
        Ok(deviation)
    }
}

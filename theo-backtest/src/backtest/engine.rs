//! Core backtesting engine.
//!
//! For every snapshot, in order:
//! 1. Price the contract with the selected model
//! 2. Compare the model price with the observed market price
//! 3. Emit `Buy` when the model is strictly richer, `Sell` otherwise
//! 4. Record the captured discrepancy `|model - market|` as the return
//!
//! Rows are independent, so they may be priced in parallel; output order
//! and values do not depend on scheduling.

use std::fmt;
use std::str::FromStr;
use std::sync::atomic::{AtomicUsize, Ordering};

use chrono::NaiveDate;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{info, warn};

use crate::data::{MarketSnapshot, OptionType};
use crate::pricing::{
    BlackScholes, ModelKind, MonteCarloConfig, OptionPricer, PricingError, PricingModel,
};

#[derive(Error, Debug, Clone, PartialEq)]
pub enum BacktestError {
    #[error("Invalid backtest configuration: {0}")]
    InvalidConfig(#[from] PricingError),

    #[error("Pricing failed at row {row} ({date}): {source}")]
    RowPricing {
        row: usize,
        date: NaiveDate,
        #[source]
        source: PricingError,
    },
}

/// What to do when the closed-form pricer reports a degenerate input
/// (zero maturity or zero volatility).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DegeneratePolicy {
    /// Abort the run with the pricing error.
    #[default]
    Fail,
    /// Substitute the formula's limiting value and flag the row.
    Limit,
}

impl FromStr for DegeneratePolicy {
    type Err = PricingError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "fail" => Ok(Self::Fail),
            "limit" => Ok(Self::Limit),
            other => Err(PricingError::InvalidArgument(format!(
                "degenerate policy must be 'fail' or 'limit', got '{}'",
                other
            ))),
        }
    }
}

/// Trading signal for one period.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Signal {
    Buy,
    Sell,
}

impl Signal {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Buy => "Buy",
            Self::Sell => "Sell",
        }
    }
}

impl fmt::Display for Signal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Configuration for backtest execution.
#[derive(Debug, Clone, PartialEq)]
pub struct BacktestConfig {
    /// Pricing model applied to every row.
    pub model: PricingModel,

    /// Contract type priced for every row.
    pub option_type: OptionType,

    pub on_degenerate: DegeneratePolicy,

    /// Price rows on the rayon pool.
    pub parallel: bool,
}

impl Default for BacktestConfig {
    fn default() -> Self {
        Self {
            model: PricingModel::BlackScholes,
            option_type: OptionType::Call,
            on_degenerate: DegeneratePolicy::Fail,
            parallel: true,
        }
    }
}

impl BacktestConfig {
    pub fn with_model(mut self, model: PricingModel) -> Self {
        self.model = model;
        self
    }

    pub fn with_option_type(mut self, option_type: OptionType) -> Self {
        self.option_type = option_type;
        self
    }

    pub fn with_degenerate_policy(mut self, policy: DegeneratePolicy) -> Self {
        self.on_degenerate = policy;
        self
    }

    pub fn with_parallel(mut self, parallel: bool) -> Self {
        self.parallel = parallel;
        self
    }

    /// Reject settings no row could be priced with.
    pub fn validate(&self) -> Result<(), BacktestError> {
        if let PricingModel::MonteCarlo(mc) = &self.model {
            mc.validate()?;
        }
        Ok(())
    }
}

/// One priced snapshot.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BacktestRow {
    pub snapshot: MarketSnapshot,
    pub model_price: f64,
    pub signal: Signal,

    /// Captured discrepancy, always >= 0.
    pub ret: f64,

    /// Model price is the limiting value of a degenerate input.
    pub degenerate: bool,
}

impl BacktestRow {
    /// Buy when the model is strictly above the market; ties sell.
    pub fn new(snapshot: MarketSnapshot, model_price: f64, degenerate: bool) -> Self {
        let market_price = snapshot.market_price;
        let (signal, ret) = if model_price > market_price {
            (Signal::Buy, model_price - market_price)
        } else {
            (Signal::Sell, market_price - model_price)
        };
        Self {
            snapshot,
            model_price,
            signal,
            ret,
            degenerate,
        }
    }
}

/// Result of a completed backtest.
#[derive(Debug, Clone, PartialEq)]
pub struct BacktestResult {
    /// Model used.
    pub model: ModelKind,

    /// Contract type priced.
    pub option_type: OptionType,

    /// One row per input snapshot, in input order.
    pub rows: Vec<BacktestRow>,
}

impl BacktestResult {
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn returns(&self) -> Vec<f64> {
        self.rows.iter().map(|r| r.ret).collect()
    }

    pub fn buy_count(&self) -> usize {
        self.rows.iter().filter(|r| r.signal == Signal::Buy).count()
    }

    pub fn sell_count(&self) -> usize {
        self.rows.iter().filter(|r| r.signal == Signal::Sell).count()
    }

    pub fn degenerate_count(&self) -> usize {
        self.rows.iter().filter(|r| r.degenerate).count()
    }

    pub fn start_date(&self) -> Option<NaiveDate> {
        self.rows.iter().map(|r| r.snapshot.date).min()
    }

    pub fn end_date(&self) -> Option<NaiveDate> {
        self.rows.iter().map(|r| r.snapshot.date).max()
    }

    /// Generate summary string.
    pub fn summary(&self) -> String {
        let range = match (self.start_date(), self.end_date()) {
            (Some(start), Some(end)) => format!("{} to {}", start, end),
            _ => "no data".to_string(),
        };
        format!(
            "Backtest Results ({})\n\
             ----------------------------------------\n\
             Model: {} ({})\n\
             Periods: {}\n\
             Signals: {} Buy / {} Sell\n\
             Degenerate rows: {}",
            range,
            self.model,
            self.option_type,
            self.len(),
            self.buy_count(),
            self.sell_count(),
            self.degenerate_count(),
        )
    }
}

/// The backtesting engine.
#[derive(Debug, Clone, Default)]
pub struct Backtester {
    config: BacktestConfig,
}

impl Backtester {
    pub fn new(config: BacktestConfig) -> Self {
        Self { config }
    }

    /// Build from string identifiers, e.g. `("monte_carlo", "put")`.
    pub fn from_names(
        model: &str,
        option_type: &str,
        mc_config: MonteCarloConfig,
    ) -> Result<Self, BacktestError> {
        let model = PricingModel::from_name(model, mc_config)?;
        let option_type: OptionType = option_type.parse()?;
        Ok(Self::new(
            BacktestConfig::default()
                .with_model(model)
                .with_option_type(option_type),
        ))
    }

    /// Run the backtest over time-ordered snapshots.
    ///
    /// Configuration problems are reported before any row is priced. A row
    /// that cannot be priced aborts the run; no partial result is returned.
    pub fn run(&self, snapshots: &[MarketSnapshot]) -> Result<BacktestResult, BacktestError> {
        self.config.validate()?;

        let model = self.config.model.kind();
        let option_type = self.config.option_type;
        info!(
            "Running {} backtest ({}) over {} snapshots",
            model,
            option_type,
            snapshots.len()
        );

        let progress = AtomicUsize::new(0);
        let total = snapshots.len();
        let evaluate = |(idx, snapshot): (usize, &MarketSnapshot)| {
            let row = self.evaluate(idx, snapshot);

            let done = progress.fetch_add(1, Ordering::Relaxed) + 1;
            if done % (total / 10).max(1) == 0 || done == total {
                info!(
                    "  {:.0}% ({}/{} snapshots)",
                    done as f64 / total as f64 * 100.0,
                    done,
                    total
                );
            }
            row
        };

        let evaluated: Vec<Result<BacktestRow, BacktestError>> = if self.config.parallel {
            snapshots.par_iter().enumerate().map(evaluate).collect()
        } else {
            snapshots.iter().enumerate().map(evaluate).collect()
        };

        // First failure in input order, independent of scheduling
        let rows = evaluated.into_iter().collect::<Result<Vec<_>, _>>()?;

        let result = BacktestResult {
            model,
            option_type,
            rows,
        };
        info!(
            "Backtest complete: {} Buy / {} Sell, {} degenerate",
            result.buy_count(),
            result.sell_count(),
            result.degenerate_count()
        );
        Ok(result)
    }

    /// Price and signal a single snapshot.
    fn evaluate(&self, idx: usize, snapshot: &MarketSnapshot) -> Result<BacktestRow, BacktestError> {
        if !snapshot.market_price.is_finite() {
            return Err(BacktestError::RowPricing {
                row: idx,
                date: snapshot.date,
                source: PricingError::InvalidArgument(format!(
                    "non-finite market price {}",
                    snapshot.market_price
                )),
            });
        }

        let contract = snapshot.contract(self.config.option_type);

        let (model_price, degenerate) = match self.config.model.price(&contract) {
            Ok(price) => (price, false),
            Err(PricingError::NumericDegenerate(reason))
                if self.config.on_degenerate == DegeneratePolicy::Limit =>
            {
                let price = BlackScholes::limit_price(&contract);
                warn!(
                    "Row {} ({}): {}; using limiting value {:.6}",
                    idx, snapshot.date, reason, price
                );
                (price, true)
            }
            Err(source) => {
                return Err(BacktestError::RowPricing {
                    row: idx,
                    date: snapshot.date,
                    source,
                })
            }
        };

        Ok(BacktestRow::new(snapshot.clone(), model_price, degenerate))
    }
}

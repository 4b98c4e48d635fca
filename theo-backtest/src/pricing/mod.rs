//! Option pricing models.
//!
//! Two interchangeable European-option pricers share the [`OptionPricer`]
//! seam:
//! - [`BlackScholes`]: closed-form Black-Scholes-Merton
//! - [`MonteCarlo`]: simulated terminal payoffs under geometric Brownian motion
//!
//! [`PricingModel`] is the closed set of models a backtest can select.

pub mod black_scholes;
pub mod monte_carlo;

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::data::ContractParams;

pub use black_scholes::BlackScholes;
pub use monte_carlo::{MonteCarlo, MonteCarloConfig, MonteCarloEstimate};

#[derive(Error, Debug, Clone, PartialEq)]
pub enum PricingError {
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    #[error("Numerically degenerate input: {0}")]
    NumericDegenerate(String),
}

pub type PricingResult<T> = Result<T, PricingError>;

/// A model that values a single European option contract.
pub trait OptionPricer {
    /// Short identifier used in logs and exports.
    fn name(&self) -> &'static str;

    /// Theoretical value of the contract.
    fn price(&self, contract: &ContractParams) -> PricingResult<f64>;
}

/// Model identifier as it appears in configuration and on the command line.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ModelKind {
    Bsm,
    MonteCarlo,
}

impl ModelKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Bsm => "bsm",
            Self::MonteCarlo => "monte_carlo",
        }
    }
}

impl FromStr for ModelKind {
    type Err = PricingError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "bsm" | "black_scholes" | "black-scholes" => Ok(Self::Bsm),
            "monte_carlo" | "monte-carlo" | "mc" => Ok(Self::MonteCarlo),
            other => Err(PricingError::InvalidArgument(format!(
                "model must be 'bsm' or 'monte_carlo', got '{}'",
                other
            ))),
        }
    }
}

impl fmt::Display for ModelKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The pricing model selected for a backtest.
#[derive(Debug, Clone, PartialEq)]
pub enum PricingModel {
    BlackScholes,
    MonteCarlo(MonteCarloConfig),
}

impl Default for PricingModel {
    fn default() -> Self {
        Self::BlackScholes
    }
}

impl PricingModel {
    /// Build a model from its identifier. The Monte Carlo settings are
    /// ignored for the closed-form model.
    pub fn from_kind(kind: ModelKind, mc_config: MonteCarloConfig) -> Self {
        match kind {
            ModelKind::Bsm => Self::BlackScholes,
            ModelKind::MonteCarlo => Self::MonteCarlo(mc_config),
        }
    }

    /// Parse a model identifier such as `"bsm"` or `"monte_carlo"`.
    pub fn from_name(name: &str, mc_config: MonteCarloConfig) -> PricingResult<Self> {
        Ok(Self::from_kind(name.parse()?, mc_config))
    }

    pub fn kind(&self) -> ModelKind {
        match self {
            Self::BlackScholes => ModelKind::Bsm,
            Self::MonteCarlo(_) => ModelKind::MonteCarlo,
        }
    }
}

impl OptionPricer for PricingModel {
    fn name(&self) -> &'static str {
        self.kind().as_str()
    }

    fn price(&self, contract: &ContractParams) -> PricingResult<f64> {
        match self {
            Self::BlackScholes => BlackScholes.price(contract),
            Self::MonteCarlo(config) => MonteCarlo::new(config.clone()).price(contract),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::OptionType;

    #[test]
    fn test_model_kind_parsing() {
        assert_eq!("bsm".parse::<ModelKind>().unwrap(), ModelKind::Bsm);
        assert_eq!("BSM".parse::<ModelKind>().unwrap(), ModelKind::Bsm);
        assert_eq!(
            "monte_carlo".parse::<ModelKind>().unwrap(),
            ModelKind::MonteCarlo
        );
        assert_eq!("mc".parse::<ModelKind>().unwrap(), ModelKind::MonteCarlo);
    }

    #[test]
    fn test_unknown_model_is_invalid_argument() {
        let err = PricingModel::from_name("garch", MonteCarloConfig::default()).unwrap_err();
        assert!(matches!(err, PricingError::InvalidArgument(ref msg) if msg.contains("garch")));
    }

    #[test]
    fn test_dispatch_matches_direct_pricers() {
        let contract = ContractParams::new(100.0, 95.0, 0.5, 0.03, 0.25, OptionType::Call);
        let mc_config = MonteCarloConfig {
            num_simulations: 2_000,
            num_steps: 4,
            seed: 7,
        };

        assert_eq!(
            PricingModel::BlackScholes.price(&contract).unwrap(),
            BlackScholes.price(&contract).unwrap()
        );
        assert_eq!(
            PricingModel::MonteCarlo(mc_config.clone())
                .price(&contract)
                .unwrap(),
            MonteCarlo::new(mc_config).price(&contract).unwrap()
        );
    }

    #[test]
    fn test_model_names() {
        assert_eq!(PricingModel::BlackScholes.name(), "bsm");
        assert_eq!(
            PricingModel::MonteCarlo(MonteCarloConfig::default()).name(),
            "monte_carlo"
        );
    }
}

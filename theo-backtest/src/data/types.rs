//! Core data types for theoretical-value backtesting.
//!
//! A [`MarketSnapshot`] is one observation period: the inputs needed to
//! value a European option plus the price the market actually quoted.
//! [`ContractParams`] is the subset a pricer consumes.

use std::fmt;
use std::str::FromStr;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::pricing::PricingError;

/// Option type (call or put).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OptionType {
    #[default]
    Call,
    Put,
}

impl OptionType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Call => "call",
            Self::Put => "put",
        }
    }

    /// Exercise value at expiry.
    pub fn intrinsic(&self, spot: f64, strike: f64) -> f64 {
        match self {
            Self::Call => (spot - strike).max(0.0),
            Self::Put => (strike - spot).max(0.0),
        }
    }
}

impl FromStr for OptionType {
    type Err = PricingError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_uppercase().as_str() {
            "C" | "CALL" => Ok(Self::Call),
            "P" | "PUT" => Ok(Self::Put),
            other => Err(PricingError::InvalidArgument(format!(
                "option type must be 'call' or 'put', got '{}'",
                other.to_lowercase()
            ))),
        }
    }
}

impl fmt::Display for OptionType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Inputs to a single option valuation.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ContractParams {
    /// Underlying price (S)
    pub spot: f64,

    /// Strike price (K)
    pub strike: f64,

    /// Time to maturity in years (T)
    pub maturity: f64,

    /// Continuously compounded risk-free rate (r)
    pub rate: f64,

    /// Annualized volatility (sigma)
    pub volatility: f64,

    pub option_type: OptionType,
}

impl ContractParams {
    pub fn new(
        spot: f64,
        strike: f64,
        maturity: f64,
        rate: f64,
        volatility: f64,
        option_type: OptionType,
    ) -> Self {
        Self {
            spot,
            strike,
            maturity,
            rate,
            volatility,
            option_type,
        }
    }

    /// Check the domain every pricer shares.
    ///
    /// Zero maturity and zero volatility pass here; whether they are
    /// usable is up to the individual pricer.
    pub fn validate(&self) -> Result<(), PricingError> {
        if !(self.spot.is_finite() && self.spot > 0.0) {
            return Err(PricingError::InvalidArgument(format!(
                "spot must be positive and finite, got {}",
                self.spot
            )));
        }
        if !(self.strike.is_finite() && self.strike > 0.0) {
            return Err(PricingError::InvalidArgument(format!(
                "strike must be positive and finite, got {}",
                self.strike
            )));
        }
        if !(self.maturity.is_finite() && self.maturity >= 0.0) {
            return Err(PricingError::InvalidArgument(format!(
                "time to maturity must be non-negative and finite, got {}",
                self.maturity
            )));
        }
        if !self.rate.is_finite() {
            return Err(PricingError::InvalidArgument(format!(
                "risk-free rate must be finite, got {}",
                self.rate
            )));
        }
        if !(self.volatility.is_finite() && self.volatility >= 0.0) {
            return Err(PricingError::InvalidArgument(format!(
                "volatility must be non-negative and finite, got {}",
                self.volatility
            )));
        }
        Ok(())
    }

    /// Discount factor e^(-rT).
    pub fn discount(&self) -> f64 {
        (-self.rate * self.maturity).exp()
    }
}

/// One period of observed market data.
///
/// Snapshots are independent: nothing in the backtest assumes continuity
/// between consecutive rows.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MarketSnapshot {
    pub date: NaiveDate,
    pub stock_price: f64,
    pub strike_price: f64,
    pub time_to_maturity: f64,
    pub risk_free_rate: f64,
    pub volatility: f64,

    /// Observed option price for the period
    pub market_price: f64,
}

impl MarketSnapshot {
    /// Contract parameters for pricing this snapshot as `option_type`.
    pub fn contract(&self, option_type: OptionType) -> ContractParams {
        ContractParams {
            spot: self.stock_price,
            strike: self.strike_price,
            maturity: self.time_to_maturity,
            rate: self.risk_free_rate,
            volatility: self.volatility,
            option_type,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_option_type_parsing() {
        assert_eq!("C".parse::<OptionType>().unwrap(), OptionType::Call);
        assert_eq!("P".parse::<OptionType>().unwrap(), OptionType::Put);
        assert_eq!("call".parse::<OptionType>().unwrap(), OptionType::Call);
        assert_eq!(" PUT ".parse::<OptionType>().unwrap(), OptionType::Put);
        assert!(matches!(
            "straddle".parse::<OptionType>(),
            Err(PricingError::InvalidArgument(_))
        ));
    }

    #[test]
    fn test_intrinsic() {
        assert_eq!(OptionType::Call.intrinsic(110.0, 100.0), 10.0);
        assert_eq!(OptionType::Call.intrinsic(90.0, 100.0), 0.0);
        assert_eq!(OptionType::Put.intrinsic(90.0, 100.0), 10.0);
        assert_eq!(OptionType::Put.intrinsic(110.0, 100.0), 0.0);
    }

    #[test]
    fn test_validate_rejects_bad_inputs() {
        let good = ContractParams::new(100.0, 100.0, 1.0, 0.05, 0.2, OptionType::Call);
        assert!(good.validate().is_ok());

        let degenerate = ContractParams { maturity: 0.0, volatility: 0.0, ..good };
        assert!(degenerate.validate().is_ok());

        for bad in [
            ContractParams { spot: 0.0, ..good },
            ContractParams { strike: -1.0, ..good },
            ContractParams { maturity: -0.5, ..good },
            ContractParams { rate: f64::NAN, ..good },
            ContractParams { volatility: f64::INFINITY, ..good },
        ] {
            assert!(matches!(bad.validate(), Err(PricingError::InvalidArgument(_))));
        }
    }

    #[test]
    fn test_snapshot_contract() {
        let snap = MarketSnapshot {
            date: NaiveDate::from_ymd_opt(2022, 1, 3).unwrap(),
            stock_price: 101.0,
            strike_price: 100.0,
            time_to_maturity: 0.5,
            risk_free_rate: 0.05,
            volatility: 0.2,
            market_price: 9.5,
        };
        let contract = snap.contract(OptionType::Put);
        assert_eq!(contract.spot, 101.0);
        assert_eq!(contract.strike, 100.0);
        assert_eq!(contract.maturity, 0.5);
        assert_eq!(contract.option_type, OptionType::Put);
    }
}

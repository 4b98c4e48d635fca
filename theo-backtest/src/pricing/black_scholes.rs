//! Closed-form Black-Scholes-Merton pricing for European options.
//!
//! ```text
//! d1 = (ln(S/K) + (r + sigma^2 / 2) T) / (sigma sqrt(T))
//! d2 = d1 - sigma sqrt(T)
//! call = S N(d1) - K e^(-rT) N(d2)
//! put  = K e^(-rT) N(-d2) - S N(-d1)
//! ```
//!
//! The formula divides by `sigma sqrt(T)`, so zero maturity or zero
//! volatility is reported as [`PricingError::NumericDegenerate`] instead of
//! being allowed to leak NaN into signals and metrics.

use std::f64::consts::SQRT_2;

use statrs::function::erf::erfc;

use crate::data::{ContractParams, OptionType};

use super::{OptionPricer, PricingError, PricingResult};

/// Black-Scholes-Merton calculator.
#[derive(Debug, Clone, Copy, Default)]
pub struct BlackScholes;

impl BlackScholes {
    /// Calculate d1 parameter.
    fn d1(spot: f64, strike: f64, time: f64, rate: f64, vol: f64) -> f64 {
        let numerator = (spot / strike).ln() + (rate + 0.5 * vol * vol) * time;
        numerator / (vol * time.sqrt())
    }

    /// Calculate d2 parameter.
    fn d2(spot: f64, strike: f64, time: f64, rate: f64, vol: f64) -> f64 {
        Self::d1(spot, strike, time, rate, vol) - vol * time.sqrt()
    }

    /// Standard normal CDF.
    pub fn norm_cdf(x: f64) -> f64 {
        0.5 * erfc(-x / SQRT_2)
    }

    /// Calculate call option price.
    ///
    /// Expects `time > 0` and `vol > 0`; use [`OptionPricer::price`] for a
    /// checked valuation.
    pub fn call_price(spot: f64, strike: f64, time: f64, rate: f64, vol: f64) -> f64 {
        let d1 = Self::d1(spot, strike, time, rate, vol);
        let d2 = Self::d2(spot, strike, time, rate, vol);

        spot * Self::norm_cdf(d1) - strike * (-rate * time).exp() * Self::norm_cdf(d2)
    }

    /// Calculate put option price.
    ///
    /// Same preconditions as [`BlackScholes::call_price`].
    pub fn put_price(spot: f64, strike: f64, time: f64, rate: f64, vol: f64) -> f64 {
        let d1 = Self::d1(spot, strike, time, rate, vol);
        let d2 = Self::d2(spot, strike, time, rate, vol);

        strike * (-rate * time).exp() * Self::norm_cdf(-d2) - spot * Self::norm_cdf(-d1)
    }

    /// Value the formula tends to as maturity or volatility goes to zero:
    /// the discounted forward intrinsic, `max(S - K e^(-rT), 0)` for a call.
    /// At expiry this is the plain exercise value.
    pub fn limit_price(contract: &ContractParams) -> f64 {
        let discounted_strike = contract.strike * contract.discount();
        contract
            .option_type
            .intrinsic(contract.spot, discounted_strike)
    }
}

impl OptionPricer for BlackScholes {
    fn name(&self) -> &'static str {
        "bsm"
    }

    fn price(&self, contract: &ContractParams) -> PricingResult<f64> {
        contract.validate()?;

        if contract.maturity == 0.0 {
            return Err(PricingError::NumericDegenerate(
                "zero time to maturity in closed-form pricer".to_string(),
            ));
        }
        if contract.volatility == 0.0 {
            return Err(PricingError::NumericDegenerate(
                "zero volatility in closed-form pricer".to_string(),
            ));
        }

        let ContractParams {
            spot,
            strike,
            maturity,
            rate,
            volatility,
            option_type,
        } = *contract;

        let price = match option_type {
            OptionType::Call => Self::call_price(spot, strike, maturity, rate, volatility),
            OptionType::Put => Self::put_price(spot, strike, maturity, rate, volatility),
        };

        if !price.is_finite() {
            return Err(PricingError::NumericDegenerate(format!(
                "non-finite closed-form price for S={} K={} T={} r={} sigma={}",
                spot, strike, maturity, rate, volatility
            )));
        }

        Ok(price)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn atm(option_type: OptionType) -> ContractParams {
        ContractParams::new(100.0, 100.0, 1.0, 0.05, 0.20, option_type)
    }

    #[test]
    fn test_black_scholes_call_price() {
        let price = BlackScholes.price(&atm(OptionType::Call)).unwrap();
        assert_relative_eq!(price, 10.450_583_572_185_565, epsilon = 1e-9);
    }

    #[test]
    fn test_black_scholes_put_price() {
        let price = BlackScholes.price(&atm(OptionType::Put)).unwrap();
        assert_relative_eq!(price, 5.573_526_022_256_971, epsilon = 1e-9);
    }

    #[test]
    fn test_put_call_parity() {
        for (spot, strike, time, rate, vol) in [
            (100.0, 100.0, 1.0, 0.05, 0.20),
            (80.0, 100.0, 0.25, 0.01, 0.45),
            (130.0, 95.0, 2.0, -0.005, 0.10),
        ] {
            let call = BlackScholes::call_price(spot, strike, time, rate, vol);
            let put = BlackScholes::put_price(spot, strike, time, rate, vol);

            // Put-call parity: C - P = S - K*e^(-rT)
            let parity_rhs = spot - strike * (-rate * time).exp();
            assert_relative_eq!(call - put, parity_rhs, epsilon = 1e-9);
        }
    }

    #[test]
    fn test_call_no_arbitrage_bounds() {
        for spot in [50.0, 90.0, 100.0, 110.0, 200.0] {
            for vol in [0.05, 0.2, 0.8] {
                let contract = ContractParams::new(spot, 100.0, 0.75, 0.04, vol, OptionType::Call);
                let price = BlackScholes.price(&contract).unwrap();
                let lower = (spot - 100.0 * contract.discount()).max(0.0);
                assert!(price >= lower - 1e-12, "{} below {}", price, lower);
                assert!(price <= spot, "{} above {}", price, spot);
            }
        }
    }

    #[test]
    fn test_norm_cdf() {
        assert_relative_eq!(BlackScholes::norm_cdf(0.0), 0.5, epsilon = 1e-15);
        assert_relative_eq!(BlackScholes::norm_cdf(1.96), 0.975_002_104_851_780, epsilon = 1e-12);
        assert_relative_eq!(
            BlackScholes::norm_cdf(-1.0) + BlackScholes::norm_cdf(1.0),
            1.0,
            epsilon = 1e-15
        );
    }

    #[test]
    fn test_zero_maturity_is_degenerate() {
        let contract = ContractParams { maturity: 0.0, ..atm(OptionType::Call) };
        assert!(matches!(
            BlackScholes.price(&contract),
            Err(PricingError::NumericDegenerate(_))
        ));
    }

    #[test]
    fn test_zero_volatility_is_degenerate() {
        let contract = ContractParams { volatility: 0.0, ..atm(OptionType::Put) };
        assert!(matches!(
            BlackScholes.price(&contract),
            Err(PricingError::NumericDegenerate(_))
        ));
    }

    #[test]
    fn test_limit_price() {
        let expired = ContractParams { maturity: 0.0, spot: 104.0, ..atm(OptionType::Call) };
        assert_relative_eq!(BlackScholes::limit_price(&expired), 4.0);

        let flat_vol = ContractParams { volatility: 0.0, spot: 90.0, ..atm(OptionType::Put) };
        let expected = 100.0 * (-0.05_f64).exp() - 90.0;
        assert_relative_eq!(BlackScholes::limit_price(&flat_vol), expected, epsilon = 1e-12);

        // Approached from a tiny volatility
        let near = ContractParams { volatility: 1e-6, ..flat_vol };
        assert_relative_eq!(BlackScholes.price(&near).unwrap(), expected, epsilon = 1e-6);
    }

    #[test]
    fn test_invalid_inputs_rejected_before_degeneracy() {
        let contract = ContractParams {
            spot: -1.0,
            maturity: 0.0,
            ..atm(OptionType::Call)
        };
        assert!(matches!(
            BlackScholes.price(&contract),
            Err(PricingError::InvalidArgument(_))
        ));
    }
}

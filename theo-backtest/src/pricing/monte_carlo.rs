//! Monte Carlo pricing for European options under geometric Brownian motion.
//!
//! Each path starts at the spot price and takes `num_steps` exact GBM steps:
//!
//! ```text
//! S(t + dt) = S(t) * exp((r - sigma^2 / 2) dt + sigma sqrt(dt) Z),  Z ~ N(0, 1)
//! ```
//!
//! The price is the discounted mean terminal payoff. Paths run in parallel,
//! each with its own generator seeded from `(seed, path index)`, and payoffs
//! are summed in path order, so a given config always reproduces the same
//! bits regardless of thread count.

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use rand_distr::StandardNormal;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::data::ContractParams;

use super::{OptionPricer, PricingError, PricingResult};

/// Simulation settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct MonteCarloConfig {
    /// Number of simulated price paths.
    pub num_simulations: usize,

    /// Time steps per path.
    pub num_steps: usize,

    /// Base seed; every pricing call with the same seed replays the same draws.
    pub seed: u64,
}

impl Default for MonteCarloConfig {
    fn default() -> Self {
        Self {
            num_simulations: 10_000,
            num_steps: 252,
            seed: 0,
        }
    }
}

impl MonteCarloConfig {
    /// Step count tied to path count (`num_steps == num_simulations`).
    ///
    /// Reproduces the legacy pricer, which discretized `[0, T]` into as many
    /// steps as it simulated paths. Cost grows with the square of `paths`.
    pub fn coupled(paths: usize) -> Self {
        Self {
            num_simulations: paths,
            num_steps: paths,
            seed: 0,
        }
    }

    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }

    pub fn validate(&self) -> PricingResult<()> {
        if self.num_simulations == 0 {
            return Err(PricingError::InvalidArgument(
                "num_simulations must be at least 1".to_string(),
            ));
        }
        if self.num_steps == 0 {
            return Err(PricingError::InvalidArgument(
                "num_steps must be at least 1".to_string(),
            ));
        }
        Ok(())
    }
}

/// Result of a simulation run.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MonteCarloEstimate {
    /// Discounted mean payoff.
    pub price: f64,

    /// Standard error of the discounted mean.
    pub std_error: f64,

    pub num_simulations: usize,
}

/// Monte Carlo pricer.
#[derive(Debug, Clone, Default)]
pub struct MonteCarlo {
    config: MonteCarloConfig,
}

impl MonteCarlo {
    pub fn new(config: MonteCarloConfig) -> Self {
        Self { config }
    }

    /// Seed for one path. Mixing the index keeps neighbouring paths and
    /// neighbouring base seeds on unrelated streams.
    fn path_seed(seed: u64, index: usize) -> u64 {
        seed ^ (index as u64 + 1).wrapping_mul(0x9E37_79B9_7F4A_7C15)
    }

    /// Simulate terminal payoffs, one per path, in path order.
    fn simulate_payoffs(&self, contract: &ContractParams) -> Vec<f64> {
        let ContractParams {
            spot,
            strike,
            maturity,
            rate,
            volatility,
            option_type,
        } = *contract;

        let steps = self.config.num_steps;
        let dt = maturity / steps as f64;
        let drift = (rate - 0.5 * volatility * volatility) * dt;
        let diffusion = volatility * dt.sqrt();
        let seed = self.config.seed;

        (0..self.config.num_simulations)
            .into_par_iter()
            .map(|i| {
                let mut rng = StdRng::seed_from_u64(Self::path_seed(seed, i));
                let mut price = spot;
                for _ in 0..steps {
                    let z: f64 = rng.sample(StandardNormal);
                    price *= (drift + diffusion * z).exp();
                }
                option_type.intrinsic(price, strike)
            })
            .collect()
    }

    /// Price with a standard error for the estimate.
    pub fn estimate(&self, contract: &ContractParams) -> PricingResult<MonteCarloEstimate> {
        contract.validate()?;
        self.config.validate()?;

        let payoffs = self.simulate_payoffs(contract);
        let n = payoffs.len() as f64;
        let mean = payoffs.iter().sum::<f64>() / n;

        let std_error = if payoffs.len() > 1 {
            let variance =
                payoffs.iter().map(|p| (p - mean).powi(2)).sum::<f64>() / (n - 1.0);
            (variance / n).sqrt()
        } else {
            0.0
        };

        let discount = contract.discount();
        let estimate = MonteCarloEstimate {
            price: discount * mean,
            std_error: discount * std_error,
            num_simulations: payoffs.len(),
        };

        debug!(
            paths = self.config.num_simulations,
            steps = self.config.num_steps,
            seed = self.config.seed,
            price = estimate.price,
            std_error = estimate.std_error,
            "monte carlo valuation"
        );

        if !estimate.price.is_finite() || !estimate.std_error.is_finite() {
            return Err(PricingError::NumericDegenerate(format!(
                "non-finite simulated price for S={} K={} T={} r={} sigma={}",
                contract.spot, contract.strike, contract.maturity, contract.rate, contract.volatility
            )));
        }

        Ok(estimate)
    }
}

impl OptionPricer for MonteCarlo {
    fn name(&self) -> &'static str {
        "monte_carlo"
    }

    fn price(&self, contract: &ContractParams) -> PricingResult<f64> {
        self.estimate(contract).map(|e| e.price)
    }
}

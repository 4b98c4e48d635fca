//! Synthetic market data for demos and tests.
//!
//! One snapshot per business day: a noisy stock price around a fixed
//! strike, time to maturity decaying linearly toward expiry, flat rate and
//! volatility, and a noisy observed option price.

use chrono::{Datelike, Duration, NaiveDate, Weekday};
use rand::rngs::StdRng;
use rand::SeedableRng;
use rand_distr::{Distribution, Normal};
use serde::{Deserialize, Serialize};

use super::types::MarketSnapshot;
use super::DataError;

/// Parameters for sample generation.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SampleConfig {
    /// Number of business days to generate.
    pub days: usize,

    /// First calendar day; weekends are skipped.
    pub start_date: NaiveDate,

    pub spot_mean: f64,
    pub spot_std: f64,
    pub strike: f64,

    /// Maturity of the first row, in years.
    pub initial_maturity: f64,

    /// Maturity of the last row. Kept above zero so the closed-form pricer
    /// never sees an expired contract.
    pub final_maturity: f64,

    pub rate: f64,
    pub volatility: f64,
    pub market_price_mean: f64,
    pub market_price_std: f64,
    pub seed: u64,
}

impl Default for SampleConfig {
    fn default() -> Self {
        Self {
            days: 100,
            start_date: NaiveDate::from_ymd_opt(2022, 1, 1).unwrap_or_default(),
            spot_mean: 100.0,
            spot_std: 10.0,
            strike: 100.0,
            initial_maturity: 1.0,
            final_maturity: 1.0 / 252.0,
            rate: 0.05,
            volatility: 0.2,
            market_price_mean: 10.0,
            market_price_std: 2.0,
            seed: 0,
        }
    }
}

/// Business days (Mon-Fri) starting on or after `start`.
pub fn business_days(start: NaiveDate, count: usize) -> Vec<NaiveDate> {
    let mut days = Vec::with_capacity(count);
    let mut current = start;
    while days.len() < count {
        if !matches!(current.weekday(), Weekday::Sat | Weekday::Sun) {
            days.push(current);
        }
        current += Duration::days(1);
    }
    days
}

/// `count` evenly spaced values from `start` to `end` inclusive.
fn linspace(start: f64, end: f64, count: usize) -> Vec<f64> {
    match count {
        0 => Vec::new(),
        1 => vec![start],
        _ => {
            let step = (end - start) / (count - 1) as f64;
            (0..count).map(|i| start + step * i as f64).collect()
        }
    }
}

/// Seeded sample-data generator.
pub struct SampleDataGenerator {
    config: SampleConfig,
}

impl SampleDataGenerator {
    pub fn new(config: SampleConfig) -> Self {
        Self { config }
    }

    pub fn generate(&self) -> Result<Vec<MarketSnapshot>, DataError> {
        let cfg = &self.config;
        if cfg.days == 0 {
            return Err(DataError::InvalidSample("days must be at least 1".to_string()));
        }
        if cfg.final_maturity < 0.0 || cfg.initial_maturity < cfg.final_maturity {
            return Err(DataError::InvalidSample(format!(
                "maturities must satisfy initial >= final >= 0, got {} and {}",
                cfg.initial_maturity, cfg.final_maturity
            )));
        }

        let spot_dist = Normal::new(cfg.spot_mean, cfg.spot_std)
            .map_err(|e| DataError::InvalidSample(format!("stock price distribution: {}", e)))?;
        let market_dist = Normal::new(cfg.market_price_mean, cfg.market_price_std)
            .map_err(|e| DataError::InvalidSample(format!("market price distribution: {}", e)))?;

        let mut rng = StdRng::seed_from_u64(cfg.seed);
        let spots: Vec<f64> = (0..cfg.days).map(|_| spot_dist.sample(&mut rng)).collect();
        let market_prices: Vec<f64> = (0..cfg.days).map(|_| market_dist.sample(&mut rng)).collect();
        let maturities = linspace(cfg.initial_maturity, cfg.final_maturity, cfg.days);
        let dates = business_days(cfg.start_date, cfg.days);

        Ok(dates
            .into_iter()
            .zip(spots)
            .zip(maturities)
            .zip(market_prices)
            .map(|(((date, stock_price), time_to_maturity), market_price)| MarketSnapshot {
                date,
                stock_price,
                strike_price: cfg.strike,
                time_to_maturity,
                risk_free_rate: cfg.rate,
                volatility: cfg.volatility,
                market_price,
            })
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_business_days_skip_weekends() {
        // 2022-01-01 is a Saturday
        let start = NaiveDate::from_ymd_opt(2022, 1, 1).unwrap();
        let days = business_days(start, 6);
        assert_eq!(days[0], NaiveDate::from_ymd_opt(2022, 1, 3).unwrap());
        assert_eq!(days[4], NaiveDate::from_ymd_opt(2022, 1, 7).unwrap());
        assert_eq!(days[5], NaiveDate::from_ymd_opt(2022, 1, 10).unwrap());
    }

    #[test]
    fn test_linspace() {
        assert_eq!(linspace(1.0, 0.0, 5), vec![1.0, 0.75, 0.5, 0.25, 0.0]);
        assert_eq!(linspace(1.0, 0.0, 1), vec![1.0]);
        assert!(linspace(1.0, 0.0, 0).is_empty());
    }

    #[test]
    fn test_default_sample_shape() {
        let data = SampleDataGenerator::new(SampleConfig::default()).generate().unwrap();
        assert_eq!(data.len(), 100);

        let first = &data[0];
        let last = &data[99];
        assert_eq!(first.date, NaiveDate::from_ymd_opt(2022, 1, 3).unwrap());
        assert_relative_eq!(first.time_to_maturity, 1.0);
        assert_relative_eq!(last.time_to_maturity, 1.0 / 252.0, epsilon = 1e-12);
        assert!(data.iter().all(|s| s.strike_price == 100.0));
        assert!(data.iter().all(|s| s.risk_free_rate == 0.05 && s.volatility == 0.2));
        assert!(data.windows(2).all(|w| w[0].date < w[1].date));
        assert!(data.windows(2).all(|w| w[0].time_to_maturity > w[1].time_to_maturity));
    }

    #[test]
    fn test_sample_is_reproducible() {
        let a = SampleDataGenerator::new(SampleConfig::default()).generate().unwrap();
        let b = SampleDataGenerator::new(SampleConfig::default()).generate().unwrap();
        assert_eq!(a, b);

        let c = SampleDataGenerator::new(SampleConfig {
            seed: 1,
            ..Default::default()
        })
        .generate()
        .unwrap();
        assert_ne!(a, c);
    }

    #[test]
    fn test_invalid_sample_config() {
        let zero_days = SampleConfig {
            days: 0,
            ..Default::default()
        };
        assert!(SampleDataGenerator::new(zero_days).generate().is_err());

        let bad_std = SampleConfig {
            spot_std: -1.0,
            ..Default::default()
        };
        assert!(matches!(
            SampleDataGenerator::new(bad_std).generate(),
            Err(DataError::InvalidSample(_))
        ));
    }
}

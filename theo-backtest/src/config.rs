//! TOML run configuration.
//!
//! ```toml
//! [backtest]
//! model = "monte_carlo"
//! option_type = "call"
//! on_degenerate = "fail"
//! parallel = true
//!
//! [monte_carlo]
//! num_simulations = 10000
//! num_steps = 252
//! seed = 0
//! ```
//!
//! Every key is optional. Identifiers stay plain strings here and are
//! resolved by [`AppConfig::to_backtest_config`], so an unknown model name
//! surfaces as a pricing `InvalidArgument` rather than a parse error.

use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::backtest::{BacktestConfig, DegeneratePolicy};
use crate::data::OptionType;
use crate::pricing::{MonteCarloConfig, PricingError, PricingModel};

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read config {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),

    #[error(transparent)]
    Invalid(#[from] PricingError),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BacktestSection {
    pub model: String,
    pub option_type: String,
    pub on_degenerate: String,
    pub parallel: bool,
}

impl Default for BacktestSection {
    fn default() -> Self {
        Self {
            model: "bsm".to_string(),
            option_type: "call".to_string(),
            on_degenerate: "fail".to_string(),
            parallel: true,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub backtest: BacktestSection,
    pub monte_carlo: MonteCarloConfig,
}

impl AppConfig {
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let contents = fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.display().to_string(),
            source,
        })?;
        Self::from_toml(&contents)
    }

    pub fn from_toml(contents: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(contents)?)
    }

    /// Resolve identifiers into a validated [`BacktestConfig`].
    pub fn to_backtest_config(&self) -> Result<BacktestConfig, ConfigError> {
        self.monte_carlo.validate()?;

        let model = PricingModel::from_name(&self.backtest.model, self.monte_carlo.clone())?;
        let option_type: OptionType = self.backtest.option_type.parse()?;
        let policy: DegeneratePolicy = self.backtest.on_degenerate.parse()?;

        Ok(BacktestConfig::default()
            .with_model(model)
            .with_option_type(option_type)
            .with_degenerate_policy(policy)
            .with_parallel(self.backtest.parallel))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pricing::ModelKind;
    use std::io::Write;

    #[test]
    fn test_empty_config_uses_defaults() {
        let config = AppConfig::from_toml("").unwrap();
        assert_eq!(config, AppConfig::default());

        let backtest = config.to_backtest_config().unwrap();
        assert_eq!(backtest.model, PricingModel::BlackScholes);
        assert_eq!(backtest.option_type, OptionType::Call);
        assert_eq!(backtest.on_degenerate, DegeneratePolicy::Fail);
        assert!(backtest.parallel);
    }

    #[test]
    fn test_full_config() {
        let config = AppConfig::from_toml(
            r#"
            [backtest]
            model = "monte_carlo"
            option_type = "put"
            on_degenerate = "limit"
            parallel = false

            [monte_carlo]
            num_simulations = 5000
            num_steps = 50
            seed = 7
            "#,
        )
        .unwrap();

        let backtest = config.to_backtest_config().unwrap();
        assert_eq!(backtest.model.kind(), ModelKind::MonteCarlo);
        assert_eq!(
            backtest.model,
            PricingModel::MonteCarlo(MonteCarloConfig {
                num_simulations: 5000,
                num_steps: 50,
                seed: 7,
            })
        );
        assert_eq!(backtest.option_type, OptionType::Put);
        assert_eq!(backtest.on_degenerate, DegeneratePolicy::Limit);
        assert!(!backtest.parallel);
    }

    #[test]
    fn test_unknown_model_is_invalid_argument() {
        let config = AppConfig::from_toml("[backtest]\nmodel = \"garch\"\n").unwrap();
        assert!(matches!(
            config.to_backtest_config(),
            Err(ConfigError::Invalid(PricingError::InvalidArgument(_)))
        ));
    }

    #[test]
    fn test_zero_simulations_rejected() {
        let config = AppConfig::from_toml("[monte_carlo]\nnum_simulations = 0\n").unwrap();
        assert!(matches!(
            config.to_backtest_config(),
            Err(ConfigError::Invalid(PricingError::InvalidArgument(_)))
        ));
    }

    #[test]
    fn test_malformed_toml() {
        assert!(matches!(
            AppConfig::from_toml("[backtest\nmodel = "),
            Err(ConfigError::Parse(_))
        ));
    }

    #[test]
    fn test_load_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "[backtest]\noption_type = \"P\"").unwrap();

        let config = AppConfig::load(file.path()).unwrap();
        assert_eq!(
            config.to_backtest_config().unwrap().option_type,
            OptionType::Put
        );

        assert!(matches!(
            AppConfig::load("/nonexistent/theo.toml"),
            Err(ConfigError::Io { .. })
        ));
    }
}

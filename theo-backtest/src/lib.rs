pub mod backtest;
pub mod config;
pub mod data;
pub mod metrics;
pub mod pricing;

// Re-export commonly used types
pub use backtest::{BacktestConfig, BacktestResult, Backtester, DegeneratePolicy, Signal};
pub use config::AppConfig;
pub use data::{ContractParams, MarketSnapshot, OptionType, SampleDataGenerator, SnapshotLoader};
pub use metrics::{MetricsCalculator, PerformanceMetrics};
pub use pricing::{BlackScholes, ModelKind, MonteCarlo, MonteCarloConfig, OptionPricer, PricingModel};

pub mod backtesting;
pub mod benchmarking;
pub mod config;
pub mod experiments;

pub mod entities;
pub mod errors;
pub mod services;
pub mod value_objects;

pub use errors::BacktestError;
pub use services::benchmark::compare_benchmark;
pub use services::engine::backtest::run_backtest;
pub use services::signals::{
    generate_mean_reversion_signals, generate_moving_average_cross_signals,
    generate_seasonal_signals,
};

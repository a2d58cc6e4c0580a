mod mean_reversion;
mod moving_average;
mod seasonal;

pub use mean_reversion::MeanReversion;
pub use moving_average::MovingAverageCross;
pub use seasonal::Seasonal;

use crate::errors::BacktestError;
use crate::value_objects::price_bar::PriceBar;
use crate::value_objects::signal::Signal;

/// A stateless signal source. `generate` emits exactly one signal per input
/// bar, in date-ascending order, whatever the input order was.
pub trait SignalGenerator {
    fn name(&self) -> &str;

    fn generate(&self, prices: &[PriceBar]) -> Vec<Signal>;
}

#[derive(Debug, Clone, PartialEq)]
pub enum StrategyKind {
    MovingAverageCross(MovingAverageCross),
    MeanReversion(MeanReversion),
    Seasonal(Seasonal),
}

impl SignalGenerator for StrategyKind {
    fn name(&self) -> &str {
        match self {
            StrategyKind::MovingAverageCross(strategy) => strategy.name(),
            StrategyKind::MeanReversion(strategy) => strategy.name(),
            StrategyKind::Seasonal(strategy) => strategy.name(),
        }
    }

    fn generate(&self, prices: &[PriceBar]) -> Vec<Signal> {
        match self {
            StrategyKind::MovingAverageCross(strategy) => strategy.generate(prices),
            StrategyKind::MeanReversion(strategy) => strategy.generate(prices),
            StrategyKind::Seasonal(strategy) => strategy.generate(prices),
        }
    }
}

impl From<MovingAverageCross> for StrategyKind {
    fn from(strategy: MovingAverageCross) -> Self {
        StrategyKind::MovingAverageCross(strategy)
    }
}

impl From<MeanReversion> for StrategyKind {
    fn from(strategy: MeanReversion) -> Self {
        StrategyKind::MeanReversion(strategy)
    }
}

impl From<Seasonal> for StrategyKind {
    fn from(strategy: Seasonal) -> Self {
        StrategyKind::Seasonal(strategy)
    }
}

pub fn generate_moving_average_cross_signals(
    prices: &[PriceBar],
    short_window: usize,
    long_window: usize,
) -> Result<Vec<Signal>, BacktestError> {
    Ok(MovingAverageCross::new(short_window, long_window)?.generate(prices))
}

pub fn generate_mean_reversion_signals(
    prices: &[PriceBar],
    window: usize,
    z_threshold: f64,
) -> Result<Vec<Signal>, BacktestError> {
    Ok(MeanReversion::new(window, z_threshold)?.generate(prices))
}

pub fn generate_seasonal_signals(
    prices: &[PriceBar],
    buy_month: u32,
    sell_month: u32,
) -> Result<Vec<Signal>, BacktestError> {
    Ok(Seasonal::new(buy_month, sell_month)?.generate(prices))
}

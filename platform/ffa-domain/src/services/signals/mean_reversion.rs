use super::SignalGenerator;
use crate::errors::{ensure_window, BacktestError};
use crate::services::numeric::round_to;
use crate::services::rolling::RollingStats;
use crate::value_objects::price_bar::{sorted_by_date, PriceBar};
use crate::value_objects::signal::{Signal, SignalAction};

/// Z-score of the price against its trailing mean and population deviation.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MeanReversion {
    window: usize,
    z_threshold: f64,
}

impl MeanReversion {
    pub fn new(window: usize, z_threshold: f64) -> Result<Self, BacktestError> {
        let window = ensure_window("window", window)?;
        if !z_threshold.is_finite() || z_threshold <= 0.0 {
            return Err(BacktestError::InvalidThreshold(z_threshold));
        }
        Ok(Self {
            window,
            z_threshold,
        })
    }

    pub fn window(&self) -> usize {
        self.window
    }

    pub fn z_threshold(&self) -> f64 {
        self.z_threshold
    }
}

impl SignalGenerator for MeanReversion {
    fn name(&self) -> &str {
        "mean_reversion"
    }

    fn generate(&self, prices: &[PriceBar]) -> Vec<Signal> {
        let sorted = sorted_by_date(prices);
        let mut stats = RollingStats::new(self.window);
        let mut signals = Vec::with_capacity(sorted.len());

        for bar in &sorted {
            let window_stats = match stats.update(bar.price) {
                Some(ws) if ws.stddev != 0.0 => ws,
                _ => {
                    signals.push(Signal::with_reason(
                        bar.date,
                        SignalAction::Hold,
                        bar.price,
                        "Insufficient data or zero volatility",
                    ));
                    continue;
                }
            };

            let z = (bar.price - window_stats.mean) / window_stats.stddev;
            let signal = if z < -self.z_threshold {
                Signal::with_reason(
                    bar.date,
                    SignalAction::Buy,
                    bar.price,
                    format!(
                        "Mean reversion buy: z-score={} below -{}",
                        round_to(z, 2),
                        self.z_threshold
                    ),
                )
            } else if z > self.z_threshold {
                Signal::with_reason(
                    bar.date,
                    SignalAction::Sell,
                    bar.price,
                    format!(
                        "Mean reversion sell: z-score={} above +{}",
                        round_to(z, 2),
                        self.z_threshold
                    ),
                )
            } else {
                Signal::hold(bar.date, bar.price)
            };
            signals.push(signal);
        }

        signals
    }
}

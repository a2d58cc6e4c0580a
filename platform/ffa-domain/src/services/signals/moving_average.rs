use super::SignalGenerator;
use crate::errors::{ensure_window, BacktestError};
use crate::services::numeric::round_to;
use crate::services::rolling::RollingSma;
use crate::value_objects::price_bar::{sorted_by_date, PriceBar};
use crate::value_objects::signal::{Signal, SignalAction};

/// Golden/death cross of a fast and a slow simple moving average.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MovingAverageCross {
    short_window: usize,
    long_window: usize,
}

impl MovingAverageCross {
    pub fn new(short_window: usize, long_window: usize) -> Result<Self, BacktestError> {
        Ok(Self {
            short_window: ensure_window("short_window", short_window)?,
            long_window: ensure_window("long_window", long_window)?,
        })
    }

    pub fn short_window(&self) -> usize {
        self.short_window
    }

    pub fn long_window(&self) -> usize {
        self.long_window
    }
}

impl SignalGenerator for MovingAverageCross {
    fn name(&self) -> &str {
        "ma_cross"
    }

    fn generate(&self, prices: &[PriceBar]) -> Vec<Signal> {
        let sorted = sorted_by_date(prices);
        let mut short_sma = RollingSma::new(self.short_window);
        let mut long_sma = RollingSma::new(self.long_window);
        let mut prev: (Option<f64>, Option<f64>) = (None, None);
        let mut signals = Vec::with_capacity(sorted.len());

        for bar in &sorted {
            let short = short_sma.update(bar.price);
            let long = long_sma.update(bar.price);

            let (Some(short_ma), Some(long_ma)) = (short, long) else {
                signals.push(Signal::with_reason(
                    bar.date,
                    SignalAction::Hold,
                    bar.price,
                    "Insufficient data for moving averages",
                ));
                prev = (short, long);
                continue;
            };

            let signal = match prev {
                (Some(prev_short), Some(prev_long)) => {
                    if prev_short <= prev_long && short_ma > long_ma {
                        Signal::with_reason(
                            bar.date,
                            SignalAction::Buy,
                            bar.price,
                            format!(
                                "Golden cross: SMA({})={} crossed above SMA({})={}",
                                self.short_window,
                                round_to(short_ma, 2),
                                self.long_window,
                                round_to(long_ma, 2)
                            ),
                        )
                    } else if prev_short >= prev_long && short_ma < long_ma {
                        Signal::with_reason(
                            bar.date,
                            SignalAction::Sell,
                            bar.price,
                            format!(
                                "Death cross: SMA({})={} crossed below SMA({})={}",
                                self.short_window,
                                round_to(short_ma, 2),
                                self.long_window,
                                round_to(long_ma, 2)
                            ),
                        )
                    } else {
                        Signal::hold(bar.date, bar.price)
                    }
                }
                // First bar with both averages: nothing to cross from.
                _ => Signal::hold(bar.date, bar.price),
            };

            signals.push(signal);
            prev = (short, long);
        }

        signals
    }
}

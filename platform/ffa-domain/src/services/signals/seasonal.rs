use super::SignalGenerator;
use crate::errors::{ensure_month, BacktestError};
use crate::value_objects::price_bar::{sorted_by_date, PriceBar};
use crate::value_objects::signal::{Signal, SignalAction};
use chrono::Datelike;
use std::collections::HashSet;

/// Calendar entry/exit: buy on the first bar of `buy_month`, sell on the first
/// bar of `sell_month`, at most once per calendar year each.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Seasonal {
    buy_month: u32,
    sell_month: u32,
}

impl Seasonal {
    pub fn new(buy_month: u32, sell_month: u32) -> Result<Self, BacktestError> {
        Ok(Self {
            buy_month: ensure_month("buy_month", buy_month)?,
            sell_month: ensure_month("sell_month", sell_month)?,
        })
    }

    pub fn buy_month(&self) -> u32 {
        self.buy_month
    }

    pub fn sell_month(&self) -> u32 {
        self.sell_month
    }
}

impl SignalGenerator for Seasonal {
    fn name(&self) -> &str {
        "seasonal"
    }

    fn generate(&self, prices: &[PriceBar]) -> Vec<Signal> {
        let sorted = sorted_by_date(prices);
        let mut bought: HashSet<(i32, u32)> = HashSet::new();
        let mut sold: HashSet<(i32, u32)> = HashSet::new();
        let mut signals = Vec::with_capacity(sorted.len());

        for bar in &sorted {
            let key = (bar.date.year(), bar.date.month());
            let (year, month) = key;

            // `insert` is false once the (year, month) has already fired.
            let signal = if month == self.buy_month && bought.insert(key) {
                Signal::with_reason(
                    bar.date,
                    SignalAction::Buy,
                    bar.price,
                    format!("Seasonal buy: month {} of {year}", self.buy_month),
                )
            } else if month == self.sell_month && sold.insert(key) {
                Signal::with_reason(
                    bar.date,
                    SignalAction::Sell,
                    bar.price,
                    format!("Seasonal sell: month {} of {year}", self.sell_month),
                )
            } else {
                Signal::hold(bar.date, bar.price)
            };
            signals.push(signal);
        }

        signals
    }
}

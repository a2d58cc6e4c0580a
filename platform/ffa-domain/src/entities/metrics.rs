use crate::services::numeric::{mean, round_to, stddev, TRADING_DAYS_PER_YEAR};
use crate::value_objects::equity_point::EquityPoint;
use crate::value_objects::trade::BacktestTrade;
use serde::{Deserialize, Serialize};

/// Risk/return statistics over a completed run. All zero when no trade closed.
///
/// `profit_factor` is `f64::INFINITY` when there are winners and no losing
/// P&L; JSON renders that as `null`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BacktestMetrics {
    pub trades: usize,
    pub win_rate: f64,
    pub avg_return: f64,
    pub total_return: f64,
    pub max_drawdown: f64,
    pub sharpe_ratio: f64,
    pub sortino_ratio: f64,
    pub profit_factor: f64,
    pub avg_holding_days: f64,
    pub max_consecutive_wins: usize,
    pub max_consecutive_losses: usize,
}

/// Accumulates the executor's output and derives [`BacktestMetrics`].
#[derive(Debug, Default)]
pub struct MetricsState {
    equity_curve: Vec<EquityPoint>,
    trades: Vec<BacktestTrade>,
    peak_equity: Option<f64>,
    max_drawdown_pct: f64,
}

impl MetricsState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record_equity(&mut self, point: EquityPoint) {
        let peak = match self.peak_equity {
            Some(peak) if peak >= point.equity => peak,
            _ => point.equity,
        };
        self.peak_equity = Some(peak);

        if peak > 0.0 {
            let drawdown = (peak - point.equity) / peak * 100.0;
            if drawdown > self.max_drawdown_pct {
                self.max_drawdown_pct = drawdown;
            }
        }
        self.equity_curve.push(point);
    }

    pub fn record_trade(&mut self, trade: BacktestTrade) {
        self.trades.push(trade);
    }

    pub fn summary(&self) -> BacktestMetrics {
        if self.trades.is_empty() {
            return BacktestMetrics::default();
        }

        let returns: Vec<f64> = self.trades.iter().map(|t| t.return_pct).collect();
        let wins = self.trades.iter().filter(|t| t.is_win()).count();
        let (max_consecutive_wins, max_consecutive_losses) = self.streaks();
        let holding: Vec<f64> = self.trades.iter().map(|t| t.holding_days as f64).collect();

        BacktestMetrics {
            trades: self.trades.len(),
            win_rate: round_to(wins as f64 / self.trades.len() as f64 * 100.0, 2),
            avg_return: round_to(mean(&returns), 4),
            total_return: round_to(self.trades.iter().map(|t| t.pnl).sum::<f64>(), 2),
            max_drawdown: round_to(self.max_drawdown_pct, 2),
            sharpe_ratio: sharpe_ratio(&returns),
            sortino_ratio: sortino_ratio(&returns),
            profit_factor: self.profit_factor(),
            avg_holding_days: round_to(mean(&holding), 1),
            max_consecutive_wins,
            max_consecutive_losses,
        }
    }

    pub fn into_parts(self) -> (Vec<EquityPoint>, Vec<BacktestTrade>, BacktestMetrics) {
        let summary = self.summary();
        (self.equity_curve, self.trades, summary)
    }

    fn profit_factor(&self) -> f64 {
        let gross_wins: f64 = self
            .trades
            .iter()
            .filter(|t| t.is_win())
            .map(|t| t.pnl)
            .sum();
        let gross_losses: f64 = self
            .trades
            .iter()
            .filter(|t| !t.is_win())
            .map(|t| t.pnl)
            .sum::<f64>()
            .abs();

        if gross_losses > 0.0 {
            round_to(gross_wins / gross_losses, 4)
        } else if gross_wins > 0.0 {
            f64::INFINITY
        } else {
            0.0
        }
    }

    // A zero-P&L trade extends the losing streak.
    fn streaks(&self) -> (usize, usize) {
        let mut win_run = 0usize;
        let mut loss_run = 0usize;
        let mut max_wins = 0usize;
        let mut max_losses = 0usize;

        for trade in &self.trades {
            if trade.is_win() {
                win_run += 1;
                loss_run = 0;
                max_wins = max_wins.max(win_run);
            } else {
                loss_run += 1;
                win_run = 0;
                max_losses = max_losses.max(loss_run);
            }
        }

        (max_wins, max_losses)
    }
}

fn sharpe_ratio(returns: &[f64]) -> f64 {
    let std = stddev(returns);
    if std > 0.0 {
        round_to(mean(returns) / std * TRADING_DAYS_PER_YEAR.sqrt(), 4)
    } else {
        0.0
    }
}

fn sortino_ratio(returns: &[f64]) -> f64 {
    let downside: Vec<f64> = returns.iter().copied().filter(|r| *r < 0.0).collect();
    let downside_std = stddev(&downside);
    if downside_std > 0.0 {
        round_to(mean(returns) / downside_std * TRADING_DAYS_PER_YEAR.sqrt(), 4)
    } else {
        0.0
    }
}

use crate::entities::metrics::{BacktestMetrics, MetricsState};
use crate::entities::position::{OpenPosition, PositionState};
use crate::errors::BacktestError;
use crate::services::numeric::{days_between, round_to};
use crate::value_objects::equity_point::EquityPoint;
use crate::value_objects::signal::{Signal, SignalAction};
use crate::value_objects::trade::{BacktestTrade, Direction};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// One lot per trade; `lot_size` scales price points into money.
pub const LOTS_PER_TRADE: f64 = 1.0;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BacktestResult {
    pub trades: Vec<BacktestTrade>,
    pub metrics: BacktestMetrics,
    pub equity_curve: Vec<EquityPoint>,
}

#[derive(Debug)]
struct Ledger {
    lot_size: f64,
    position: PositionState,
    opened_at: usize,
    steps: usize,
    equity: f64,
    metrics: MetricsState,
}

impl Ledger {
    fn new(lot_size: f64, initial_capital: f64) -> Self {
        Self {
            lot_size,
            position: PositionState::Flat,
            opened_at: 0,
            steps: 0,
            equity: initial_capital,
            metrics: MetricsState::new(),
        }
    }

    fn step(mut self, signal: &Signal) -> Self {
        let target = match signal.action {
            SignalAction::Buy => Some(Direction::Long),
            SignalAction::Sell => Some(Direction::Short),
            SignalAction::Hold => None,
        };

        match target {
            Some(target) => {
                match self.position.open_position() {
                    Some(open) if open.direction == target => {}
                    Some(open) => {
                        self.close(open, signal.date, signal.price);
                        self.enter(target, signal);
                    }
                    None => self.enter(target, signal),
                }
                self.mark(signal.date);
            }
            // Holds carry the running equity unrounded.
            None => self.record(signal.date, self.equity),
        }
        self.steps += 1;
        self
    }

    fn enter(&mut self, direction: Direction, signal: &Signal) {
        self.position = PositionState::open(direction, signal.date, signal.price);
        self.opened_at = self.steps;
    }

    /// Closes whatever is still open at the last signal's price and date.
    ///
    /// A position entered on the last signal itself has no later observation
    /// and is dropped rather than booked as a zero-length round trip.
    fn finish(mut self, last: Option<&Signal>) -> Self {
        if let (Some(open), Some(last)) = (self.position.open_position(), last) {
            if self.opened_at + 1 < self.steps {
                self.close(open, last.date, last.price);
                self.mark(last.date);
            }
            self.position = PositionState::Flat;
        }
        self
    }

    fn close(&mut self, open: OpenPosition, exit_date: DateTime<Utc>, exit_price: f64) {
        let points = match open.direction {
            Direction::Long => exit_price - open.entry_price,
            Direction::Short => open.entry_price - exit_price,
        };
        let pnl = points * LOTS_PER_TRADE * self.lot_size;
        let return_pct = if open.entry_price != 0.0 {
            round_to(points / open.entry_price * 100.0, 4)
        } else {
            0.0
        };

        self.equity += pnl;
        self.metrics.record_trade(BacktestTrade {
            entry_date: open.entry_date,
            exit_date,
            direction: open.direction,
            entry_price: open.entry_price,
            exit_price,
            quantity: LOTS_PER_TRADE,
            pnl: round_to(pnl, 2),
            return_pct,
            holding_days: days_between(open.entry_date, exit_date),
        });
    }

    // Realized equity only; the open position is never marked to market.
    fn mark(&mut self, date: DateTime<Utc>) {
        self.record(date, round_to(self.equity, 2));
    }

    fn record(&mut self, date: DateTime<Utc>, equity: f64) {
        self.metrics.record_equity(EquityPoint { date, equity });
    }
}

/// Replays `signals` (assumed date-ascending) through a single-position ledger.
///
/// Buy opens long or reverses a short; sell opens short or reverses a long;
/// a signal in the direction already held is ignored. Every signal appends one
/// equity point, plus one more if a position is force-closed at the end.
/// Reversals and the forced close are the only places a trade is booked.
pub fn run_backtest(
    signals: &[Signal],
    lot_size: f64,
    initial_capital: f64,
) -> Result<BacktestResult, BacktestError> {
    if !lot_size.is_finite() || lot_size <= 0.0 {
        return Err(BacktestError::InvalidLotSize(lot_size));
    }

    let ledger = signals
        .iter()
        .fold(Ledger::new(lot_size, initial_capital), Ledger::step)
        .finish(signals.last());

    let (equity_curve, trades, metrics) = ledger.metrics.into_parts();
    Ok(BacktestResult {
        trades,
        metrics,
        equity_curve,
    })
}

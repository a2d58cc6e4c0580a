use chrono::{DateTime, Datelike, Duration, TimeZone, Utc};
use ffa_domain::value_objects::equity_point::EquityPoint;
use ffa_domain::value_objects::price_bar::PriceBar;
use ffa_domain::value_objects::signal::{Signal, SignalAction};
use ffa_domain::{
    compare_benchmark, generate_mean_reversion_signals, generate_moving_average_cross_signals,
    generate_seasonal_signals, run_backtest,
};
use proptest::prelude::*;
use std::collections::HashMap;

fn day(n: i64) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2020, 1, 1, 0, 0, 0).unwrap() + Duration::days(n)
}

fn bars(prices: &[f64], step_days: i64) -> Vec<PriceBar> {
    prices
        .iter()
        .enumerate()
        .map(|(i, p)| PriceBar::new(day(i as i64 * step_days), *p))
        .collect()
}

fn action_strategy() -> impl Strategy<Value = SignalAction> {
    prop_oneof![
        Just(SignalAction::Buy),
        Just(SignalAction::Sell),
        Just(SignalAction::Hold),
    ]
}

/// Reversals booked while stepping, plus the forced close of a position that
/// was entered before the final signal.
fn expected_trade_count(actions: &[SignalAction]) -> usize {
    let mut held: Option<SignalAction> = None;
    let mut opened_at = 0usize;
    let mut count = 0usize;
    for (i, action) in actions.iter().enumerate() {
        if *action == SignalAction::Hold {
            continue;
        }
        match held {
            Some(current) if current == *action => {}
            Some(_) => {
                count += 1;
                held = Some(*action);
                opened_at = i;
            }
            None => {
                held = Some(*action);
                opened_at = i;
            }
        }
    }
    if held.is_some() && opened_at + 1 < actions.len() {
        count += 1;
    }
    count
}

proptest! {
    #![proptest_config(ProptestConfig {
        cases: 64,
        .. ProptestConfig::default()
    })]

    #[test]
    fn generators_emit_one_signal_per_bar(
        prices in prop::collection::vec(0.01f64..50_000.0, 0..120),
        short in 1usize..10,
        long in 1usize..30,
        z in 0.1f64..3.0,
        buy_month in 1u32..=12,
        sell_month in 1u32..=12,
    ) {
        let input = bars(&prices, 3);
        prop_assert_eq!(generate_moving_average_cross_signals(&input, short, long).unwrap().len(), prices.len());
        prop_assert_eq!(generate_mean_reversion_signals(&input, long, z).unwrap().len(), prices.len());
        prop_assert_eq!(generate_seasonal_signals(&input, buy_month, sell_month).unwrap().len(), prices.len());
    }

    #[test]
    fn seasonal_fires_at_most_once_per_year(
        len in 0usize..900,
        buy_month in 1u32..=12,
        sell_month in 1u32..=12,
    ) {
        let prices = vec![100.0; len];
        let signals = generate_seasonal_signals(&bars(&prices, 2), buy_month, sell_month).unwrap();
        let mut buys: HashMap<i32, usize> = HashMap::new();
        let mut sells: HashMap<i32, usize> = HashMap::new();
        for s in &signals {
            match s.action {
                SignalAction::Buy => {
                    prop_assert_eq!(s.date.month(), buy_month);
                    *buys.entry(s.date.year()).or_default() += 1;
                }
                SignalAction::Sell => {
                    prop_assert_eq!(s.date.month(), sell_month);
                    *sells.entry(s.date.year()).or_default() += 1;
                }
                SignalAction::Hold => {}
            }
        }
        prop_assert!(buys.values().all(|c| *c <= 1));
        prop_assert!(sells.values().all(|c| *c <= 1));
    }

    #[test]
    fn mean_reversion_on_constant_prices_always_holds(
        price in 0.01f64..10_000.0,
        len in 0usize..60,
        window in 1usize..20,
        z in 0.1f64..3.0,
    ) {
        let signals = generate_mean_reversion_signals(&bars(&vec![price; len], 1), window, z).unwrap();
        prop_assert!(signals.iter().all(|s| s.action == SignalAction::Hold));
    }

    #[test]
    fn executor_ledger_invariants(
        steps in prop::collection::vec((action_strategy(), 1.0f64..500.0), 0..80),
        lot_size in 0.5f64..2_000.0,
    ) {
        let signals: Vec<Signal> = steps
            .iter()
            .enumerate()
            .map(|(i, (action, price))| Signal {
                date: day(i as i64),
                action: *action,
                price: *price,
                reason: None,
            })
            .collect();
        let actions: Vec<SignalAction> = steps.iter().map(|(a, _)| *a).collect();

        let result = run_backtest(&signals, lot_size, 0.0).unwrap();
        let expected = expected_trade_count(&actions);
        prop_assert_eq!(result.trades.len(), expected);
        prop_assert_eq!(result.metrics.trades, expected);

        let forced = result
            .trades
            .last()
            .map(|t| signals.last().map(|s| s.date) == Some(t.exit_date)
                && signals.last().map(|s| s.action) == Some(SignalAction::Hold))
            .unwrap_or(false);
        let curve_len = result.equity_curve.len();
        prop_assert!(curve_len == signals.len() || curve_len == signals.len() + 1);
        if forced {
            prop_assert_eq!(curve_len, signals.len() + 1);
        }

        for pair in result.trades.windows(2) {
            prop_assert!(pair[0].exit_date <= pair[1].entry_date);
            prop_assert_ne!(pair[0].direction, pair[1].direction);
        }

        let pf = result.metrics.profit_factor;
        let has_wins = result.trades.iter().any(|t| t.pnl > 0.0);
        let winning_pnl: f64 = result.trades.iter().filter(|t| t.pnl > 0.0).map(|t| t.pnl).sum();
        let losing_pnl: f64 = result.trades.iter().filter(|t| t.pnl <= 0.0).map(|t| t.pnl).sum();
        prop_assert_eq!(pf.is_infinite(), has_wins && losing_pnl == 0.0);
        if !has_wins {
            prop_assert_eq!(pf, 0.0);
        } else if losing_pnl != 0.0 && winning_pnl / losing_pnl.abs() >= 1e-4 {
            prop_assert!(pf > 0.0);
        }
    }

    #[test]
    fn scaled_strategy_returns_recover_beta(
        returns in prop::collection::vec(-0.05f64..0.05, 3..60),
        k in 0.25f64..3.0,
    ) {
        prop_assume!(returns.iter().any(|r| (r - returns[0]).abs() > 1e-4));
        let mut bench = vec![100.0];
        let mut equity = vec![10_000.0];
        for r in &returns {
            bench.push(bench.last().unwrap() * (1.0 + r));
            equity.push(equity.last().unwrap() * (1.0 + k * r));
        }
        let curve: Vec<EquityPoint> = equity
            .iter()
            .enumerate()
            .map(|(i, e)| EquityPoint { date: day(i as i64), equity: *e })
            .collect();

        let out = compare_benchmark(&curve, &bars(&bench, 1), 10_000.0);
        prop_assert!((out.beta - k).abs() < 1e-3);
        prop_assert!((out.correlation - 1.0).abs() < 1e-3);
    }
}

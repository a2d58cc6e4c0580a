use crate::config::Config;
use ffa_domain::compare_benchmark;
use ffa_domain::services::engine::backtest::{run_backtest as execute, BacktestResult};
use ffa_domain::services::signals::SignalGenerator;
use ffa_domain::value_objects::benchmark_comparison::BenchmarkComparison;
use ffa_domain::value_objects::price_bar::PriceBar;
use serde::Serialize;
use std::time::Instant;
use tracing::info_span;

#[derive(Debug, Clone, Serialize)]
pub struct BacktestReport {
    pub run_id: String,
    pub instrument: String,
    pub strategy: String,
    pub signals: usize,
    pub actionable_signals: usize,
    pub result: BacktestResult,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub benchmark: Option<BenchmarkComparison>,
}

/// Generates signals for `prices`, replays them, and optionally regresses the
/// resulting equity curve on `benchmark`.
pub fn run_backtest(
    config: &Config,
    prices: &[PriceBar],
    benchmark: Option<&[PriceBar]>,
) -> Result<BacktestReport, String> {
    let strategy = config.build_strategy()?;

    let _span = info_span!(
        "run_backtest",
        run_id = %config.run.run_id,
        instrument = %config.run.instrument,
        strategy = strategy.name()
    )
    .entered();

    let started = Instant::now();
    let signals = strategy.generate(prices);
    let signal_count = signals.len();
    let actionable_signals = signals.iter().filter(|s| s.is_actionable()).count();
    tracing::debug!(bars = prices.len(), actionable_signals, "signals generated");

    let result = execute(&signals, config.run.lot_size, config.run.initial_capital)
        .map_err(|err| format!("backtest failed: {err}"))?;

    let comparison = match benchmark {
        Some(series) if config.benchmark_enabled() => {
            let comparison =
                compare_benchmark(&result.equity_curve, series, config.run.initial_capital);
            tracing::debug!(
                benchmark_bars = series.len(),
                initial_capital = config.run.initial_capital,
                beta = comparison.beta,
                correlation = comparison.correlation,
                "benchmark compared"
            );
            Some(comparison)
        }
        _ => None,
    };

    let elapsed_ms = started.elapsed().as_secs_f64() * 1_000.0;
    let strategy_label = strategy.name().to_string();
    metrics::counter!("ffa.backtest.runs_total", "strategy" => strategy_label.clone())
        .increment(1);
    metrics::counter!("ffa.backtest.trades_total", "strategy" => strategy_label.clone())
        .increment(result.trades.len() as u64);
    metrics::histogram!("ffa.backtest.duration_ms", "strategy" => strategy_label.clone())
        .record(elapsed_ms);

    tracing::info!(
        trades = result.metrics.trades,
        total_return = result.metrics.total_return,
        max_drawdown = result.metrics.max_drawdown,
        sharpe = result.metrics.sharpe_ratio,
        elapsed_ms,
        "backtest complete"
    );

    Ok(BacktestReport {
        run_id: config.run.run_id.clone(),
        instrument: config.run.instrument.clone(),
        strategy: strategy_label,
        signals: signal_count,
        actionable_signals,
        result,
        benchmark: comparison,
    })
}

pub fn report_json(report: &BacktestReport) -> Result<String, String> {
    serde_json::to_string_pretty(report)
        .map_err(|err| format!("failed to serialize backtest report: {err}"))
}

#[cfg(test)]
mod tests {
    use super::{report_json, run_backtest};
    use crate::config::parse_config;
    use chrono::{Duration, TimeZone, Utc};
    use ffa_domain::value_objects::price_bar::PriceBar;

    fn config(kind_table: &str) -> crate::config::Config {
        parse_config(&format!(
            r#"
[run]
run_id = "unit"
instrument = "TD3C"
initial_capital = 1000.0
lot_size = 10.0

[strategy]
{kind_table}
"#
        ))
        .expect("config")
    }

    fn bars(prices: &[f64]) -> Vec<PriceBar> {
        let start = Utc.with_ymd_and_hms(2024, 2, 1, 0, 0, 0).unwrap();
        prices
            .iter()
            .enumerate()
            .map(|(i, p)| PriceBar::new(start + Duration::days(i as i64), *p))
            .collect()
    }

    #[test]
    fn skips_benchmark_when_not_supplied() {
        let cfg = config("kind = \"ma_cross\"\nshort_window = 2\nlong_window = 3");
        let prices = bars(&[10.0, 10.0, 10.0, 12.0, 14.0, 9.0, 7.0]);
        let report = run_backtest(&cfg, &prices, None).expect("report");
        assert_eq!(report.strategy, "ma_cross");
        assert_eq!(report.signals, prices.len());
        assert!(report.benchmark.is_none());
        assert_eq!(report.actionable_signals, 2);
    }

    #[test]
    fn report_serializes_camel_case_records() {
        let cfg = config("kind = \"mean_reversion\"\nwindow = 3\nz_threshold = 1.0");
        let prices = bars(&[10.0, 10.0, 10.0, 20.0, 10.0, 10.0, 0.0, 10.0]);
        let report = run_backtest(&cfg, &prices, Some(&prices)).expect("report");
        let json = report_json(&report).expect("json");
        assert!(json.contains("\"equityCurve\""));
        assert!(json.contains("\"trackingError\""));
        assert!(json.contains("\"maxConsecutiveLosses\""));
    }

    #[test]
    fn rejects_invalid_strategy_before_running() {
        let cfg = config("kind = \"seasonal\"\nbuy_month = 0\nsell_month = 6");
        let err = run_backtest(&cfg, &bars(&[1.0, 2.0]), None).expect_err("month 0");
        assert!(err.contains("buy_month"));
    }
}

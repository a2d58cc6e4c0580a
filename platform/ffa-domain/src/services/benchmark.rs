use crate::services::numeric::{mean, period_returns, round_to, stddev, TRADING_DAYS_PER_YEAR};
use crate::value_objects::benchmark_comparison::BenchmarkComparison;
use crate::value_objects::equity_point::EquityPoint;
use crate::value_objects::price_bar::{sorted_by_date, PriceBar};

/// Regresses the strategy's period returns on the benchmark's.
///
/// Both series are date-sorted and turned into returns, then truncated to the
/// shorter length. Fewer than two aligned returns gives an all-zero result.
/// `initial_capital` does not enter the statistics: returns are scale-free.
/// Callers log it alongside the comparison.
pub fn compare_benchmark(
    strategy_equity: &[EquityPoint],
    benchmark_prices: &[PriceBar],
    _initial_capital: f64,
) -> BenchmarkComparison {
    if strategy_equity.len() < 2 || benchmark_prices.len() < 2 {
        return BenchmarkComparison::default();
    }

    let mut equity = strategy_equity.to_vec();
    equity.sort_by_key(|p| p.date);
    let equity_values: Vec<f64> = equity.iter().map(|p| p.equity).collect();
    let benchmark_values: Vec<f64> = sorted_by_date(benchmark_prices)
        .iter()
        .map(|bar| bar.price)
        .collect();

    let strategy_returns = period_returns(&equity_values);
    let benchmark_returns = period_returns(&benchmark_values);
    let n = strategy_returns.len().min(benchmark_returns.len());
    if n < 2 {
        return BenchmarkComparison::default();
    }
    let s = &strategy_returns[..n];
    let b = &benchmark_returns[..n];

    let s_mean = mean(s);
    let b_mean = mean(b);
    let mut covariance = 0.0;
    let mut s_variance = 0.0;
    let mut b_variance = 0.0;
    for (sr, br) in s.iter().zip(b) {
        let s_diff = sr - s_mean;
        let b_diff = br - b_mean;
        covariance += s_diff * b_diff;
        s_variance += s_diff * s_diff;
        b_variance += b_diff * b_diff;
    }
    covariance /= n as f64;
    s_variance /= n as f64;
    b_variance /= n as f64;

    let beta = if b_variance > 0.0 {
        covariance / b_variance
    } else {
        0.0
    };
    let daily_alpha = s_mean - beta * b_mean;

    let s_std = s_variance.sqrt();
    let b_std = b_variance.sqrt();
    let correlation = if s_std > 0.0 && b_std > 0.0 {
        covariance / (s_std * b_std)
    } else {
        0.0
    };

    let diffs: Vec<f64> = s.iter().zip(b).map(|(sr, br)| sr - br).collect();
    let tracking_error = stddev(&diffs) * TRADING_DAYS_PER_YEAR.sqrt() * 100.0;

    BenchmarkComparison {
        alpha: round_to(daily_alpha * TRADING_DAYS_PER_YEAR * 100.0, 4),
        beta: round_to(beta, 4),
        correlation: round_to(correlation, 4),
        tracking_error: round_to(tracking_error, 4),
    }
}

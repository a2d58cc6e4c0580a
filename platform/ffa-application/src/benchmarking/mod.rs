use chrono::{Duration, TimeZone, Utc};
use ffa_domain::services::engine::backtest::{run_backtest, BacktestResult};
use ffa_domain::services::signals::{
    MeanReversion, MovingAverageCross, Seasonal, SignalGenerator, StrategyKind,
};
use ffa_domain::value_objects::price_bar::PriceBar;
use std::time::Instant;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BenchMode {
    MaCross,
    MeanReversion,
    Seasonal,
}

impl BenchMode {
    pub fn parse(raw: &str) -> Result<Self, String> {
        match raw.trim().to_lowercase().as_str() {
            "ma_cross" => Ok(Self::MaCross),
            "mean_reversion" => Ok(Self::MeanReversion),
            "seasonal" => Ok(Self::Seasonal),
            _ => Err("unsupported mode (use: ma_cross | mean_reversion | seasonal)".to_string()),
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Self::MaCross => "ma_cross",
            Self::MeanReversion => "mean_reversion",
            Self::Seasonal => "seasonal",
        }
    }

    fn strategy(self) -> Result<StrategyKind, String> {
        let kind: StrategyKind = match self {
            Self::MaCross => MovingAverageCross::new(20, 50).map(Into::into),
            Self::MeanReversion => MeanReversion::new(20, 2.0).map(Into::into),
            Self::Seasonal => Seasonal::new(9, 12).map(Into::into),
        }
        .map_err(|err| err.to_string())?;
        Ok(kind)
    }
}

pub struct BenchSummary {
    pub mode: BenchMode,
    pub bars_requested: usize,
    pub bars_processed: u64,
    pub signals: usize,
    pub elapsed_ms: u64,
    pub bars_per_sec: f64,
    pub result: BacktestResult,
}

/// Daily freight-rate-like series: an annual cycle plus a faster wobble
/// around 15k, starting 2015-01-01.
pub fn synthetic_series(bars: usize) -> Vec<PriceBar> {
    let start = Utc
        .with_ymd_and_hms(2015, 1, 1, 0, 0, 0)
        .single()
        .unwrap_or_else(Utc::now);
    let year = 365.0_f64;
    (0..bars)
        .map(|i| {
            let t = i as f64;
            let seasonal = (t / year * std::f64::consts::TAU).sin() * 0.25;
            let wobble = (t * 0.07).sin() * 0.05 + (t * 0.013).cos() * 0.03;
            let price = (15_000.0 * (1.0 + seasonal + wobble)).max(1.0);
            PriceBar {
                date: start + Duration::days(i as i64),
                price,
                volume: Some(1_000.0 + (t * 0.01).sin().abs() * 100.0),
            }
        })
        .collect()
}

pub fn run_bench(bars: usize, mode: &str) -> Result<BenchSummary, String> {
    if bars == 0 {
        return Err("bars must be > 0".to_string());
    }
    let bench_mode = BenchMode::parse(mode)?;
    let strategy = bench_mode.strategy()?;
    let prices = synthetic_series(bars);

    let start = Instant::now();
    let signals = strategy.generate(&prices);
    let result = run_backtest(&signals, 1.0, 100_000.0).map_err(|err| err.to_string())?;
    let elapsed = start.elapsed();

    let elapsed_ms = elapsed.as_millis() as u64;
    let bars_processed = prices.len() as u64;
    let bars_per_sec = if elapsed.as_secs_f64() > 0.0 {
        bars_processed as f64 / elapsed.as_secs_f64()
    } else {
        0.0
    };

    Ok(BenchSummary {
        mode: bench_mode,
        bars_requested: bars,
        bars_processed,
        signals: signals.len(),
        elapsed_ms,
        bars_per_sec,
        result,
    })
}

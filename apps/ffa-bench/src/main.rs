use clap::Parser;
use ffa_application::benchmarking::BenchSummary;
use std::net::SocketAddr;
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "ffa-bench")]
#[command(about = "Synthetic benchmark tool for the FFA backtesting engine (dev)")]
struct Args {
    /// Number of synthetic daily bars to generate (default: 100_000).
    #[arg(long, default_value_t = 100_000)]
    bars: usize,

    /// Strategy to run: ma_cross | mean_reversion | seasonal.
    #[arg(long, default_value = "ma_cross")]
    mode: String,

    /// Print a single JSON line instead of human output.
    #[arg(long, default_value_t = false)]
    json: bool,

    /// Prometheus metrics listen addr (e.g. 127.0.0.1:9898). Optional.
    #[arg(long)]
    metrics_addr: Option<String>,

    /// Write a CPU profile as an SVG flamegraph to this path (requires feature `pprof`).
    #[arg(long)]
    profile_svg: Option<PathBuf>,
}

fn main() {
    let args = Args::parse();

    if let Err(err) = init_tracing() {
        eprintln!("error: {err}");
        std::process::exit(1);
    }
    if let Err(err) = init_metrics(args.metrics_addr.as_deref()) {
        eprintln!("error: {err}");
        std::process::exit(1);
    }

    if let Err(err) = run_bench(args.bars, &args.mode, args.json, args.profile_svg) {
        eprintln!("error: {err}");
        std::process::exit(1);
    }
}

fn init_tracing() -> Result<(), String> {
    let filter = std::env::var("FFA_LOG").unwrap_or_else(|_| "info".to_string());
    let env_filter = tracing_subscriber::EnvFilter::try_new(filter)
        .map_err(|err| format!("invalid log filter: {err}"))?;
    tracing_subscriber::fmt().with_env_filter(env_filter).init();
    Ok(())
}

#[cfg(feature = "prometheus")]
fn init_metrics(metrics_addr: Option<&str>) -> Result<Option<SocketAddr>, String> {
    use metrics_exporter_prometheus::PrometheusBuilder;

    let Some(raw) = metrics_addr else {
        return Ok(None);
    };
    let addr: SocketAddr = raw
        .parse()
        .map_err(|err| format!("invalid --metrics-addr (expected host:port): {err}"))?;

    PrometheusBuilder::new()
        .with_http_listener(addr)
        .install()
        .map_err(|err| format!("failed to install prometheus exporter: {err}"))?;

    tracing::info!(metrics_addr = %addr, "prometheus metrics exporter enabled");
    Ok(Some(addr))
}

#[cfg(not(feature = "prometheus"))]
fn init_metrics(metrics_addr: Option<&str>) -> Result<Option<SocketAddr>, String> {
    if metrics_addr.is_some() {
        return Err("metrics exporter requires ffa-bench feature `prometheus`".to_string());
    }
    Ok(None)
}

fn run_bench(
    bars: usize,
    mode: &str,
    json: bool,
    profile_svg: Option<PathBuf>,
) -> Result<(), String> {
    #[cfg(feature = "pprof")]
    let guard = if let Some(path) = &profile_svg {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)
                .map_err(|err| format!("failed to create {}: {err}", parent.display()))?;
        }
        Some(
            pprof::ProfilerGuard::new(100)
                .map_err(|err| format!("failed to start profiler: {err}"))?,
        )
    } else {
        None
    };

    #[cfg(not(feature = "pprof"))]
    if profile_svg.is_some() {
        return Err("profiling requires ffa-bench feature `pprof`".to_string());
    }

    let bench = ffa_application::benchmarking::run_bench(bars, mode)?;
    let mode_label = bench.mode.label();

    metrics::histogram!("ffa.bench.elapsed_ms", "mode" => mode_label)
        .record(bench.elapsed_ms as f64);
    metrics::gauge!("ffa.bench.bars_per_sec", "mode" => mode_label).set(bench.bars_per_sec);
    metrics::gauge!("ffa.bench.bars_processed", "mode" => mode_label)
        .set(bench.bars_processed as f64);

    #[cfg(feature = "pprof")]
    if let (Some(guard), Some(path)) = (guard, &profile_svg) {
        let report = guard
            .report()
            .build()
            .map_err(|err| format!("failed to build profile report: {err}"))?;
        let file = std::fs::File::create(path)
            .map_err(|err| format!("failed to create {}: {err}", path.display()))?;
        report
            .flamegraph(file)
            .map_err(|err| format!("failed to write flamegraph: {err}"))?;
        tracing::info!(profile_svg = %path.display(), "wrote cpu profile flamegraph");
    }

    if json {
        println!("{}", summary_json(&bench));
    } else {
        let m = &bench.result.metrics;
        println!(
            "bench: mode={} bars={} signals={} elapsed_ms={} bars_per_sec={:.2}",
            mode_label, bench.bars_processed, bench.signals, bench.elapsed_ms, bench.bars_per_sec
        );
        println!(
            "bench: trades={} total_return={:.2} sharpe={:.4} max_drawdown={:.2}",
            m.trades, m.total_return, m.sharpe_ratio, m.max_drawdown
        );
    }

    Ok(())
}

fn summary_json(bench: &BenchSummary) -> serde_json::Value {
    serde_json::json!({
        "mode": bench.mode.label(),
        "bars_requested": bench.bars_requested,
        "bars_processed": bench.bars_processed,
        "signals": bench.signals,
        "elapsed_ms": bench.elapsed_ms,
        "bars_per_sec": bench.bars_per_sec,
        "trades": bench.result.metrics.trades,
        "total_return": bench.result.metrics.total_return,
    })
}

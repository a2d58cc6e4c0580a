use crate::config::Config;
use ffa_domain::entities::metrics::BacktestMetrics;
use ffa_domain::value_objects::benchmark_comparison::BenchmarkComparison;
use ffa_domain::value_objects::price_bar::PriceBar;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::collections::BTreeMap;
use std::path::Path;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::mpsc;
use tracing::info_span;

const SWEEPABLE_SECTIONS: [&str; 2] = ["run", "strategy"];

/// On-disk sweep definition. The base run is embedded as `[base.run]` and
/// `[base.strategy]` tables.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct SweepFile {
    pub sweep: SweepMeta,
    pub base: Config,
    #[serde(default)]
    pub params: Vec<SweepParam>,
    pub leaderboard: Option<LeaderboardConfig>,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct SweepMeta {
    pub id: String,
    pub parallelism: Option<usize>,
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct SweepParam {
    pub path: String,
    pub values: Vec<toml::Value>,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct LeaderboardConfig {
    pub sort_by: Option<String>,
    pub descending: Option<bool>,
}

#[derive(Debug, Clone)]
pub struct SweepDefinition {
    pub id: String,
    pub base: Config,
    pub params: Vec<SweepParam>,
    pub parallelism: Option<usize>,
    pub leaderboard: Option<LeaderboardConfig>,
}

impl From<SweepFile> for SweepDefinition {
    fn from(file: SweepFile) -> Self {
        Self {
            id: file.sweep.id,
            base: file.base,
            params: file.params,
            parallelism: file.sweep.parallelism,
            leaderboard: file.leaderboard,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct SweepRunEntry {
    pub run_id: String,
    pub params: BTreeMap<String, toml::Value>,
    pub status: String,
    pub error: Option<String>,
    pub metrics: Option<BacktestMetrics>,
    pub benchmark: Option<BenchmarkComparison>,
}

impl SweepRunEntry {
    pub fn is_ok(&self) -> bool {
        self.status == "ok"
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct SweepResult {
    pub sweep_id: String,
    pub runs: Vec<SweepRunEntry>,
}

#[derive(Debug, Clone)]
pub struct SweepProgress {
    pub total_runs: usize,
    pub completed_runs: usize,
    pub ok_runs: usize,
    pub error_runs: usize,
    pub last_run_id: Option<String>,
    pub last_error: Option<String>,
}

impl SweepProgress {
    fn new(total_runs: usize) -> Self {
        Self {
            total_runs,
            completed_runs: 0,
            ok_runs: 0,
            error_runs: 0,
            last_run_id: None,
            last_error: None,
        }
    }

    fn record(&mut self, entry: &SweepRunEntry) {
        self.completed_runs += 1;
        if entry.is_ok() {
            self.ok_runs += 1;
        } else {
            self.error_runs += 1;
        }
        self.last_run_id = Some(entry.run_id.clone());
        self.last_error = entry.error.clone();
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct LeaderboardRow {
    pub rank: usize,
    pub run_id: String,
    pub value: f64,
    pub params: BTreeMap<String, toml::Value>,
}

pub fn parse_sweep(contents: &str) -> Result<SweepDefinition, String> {
    let file: SweepFile =
        toml::from_str(contents).map_err(|err| format!("failed to parse sweep TOML: {err}"))?;
    validate_param_paths(&file.params)?;
    Ok(file.into())
}

pub fn load_sweep(path: &Path) -> Result<SweepDefinition, String> {
    let raw = std::fs::read_to_string(path)
        .map_err(|err| format!("failed to read sweep config {}: {err}", path.display()))?;
    parse_sweep(&raw).map_err(|err| format!("{}: {err}", path.display()))
}

pub fn run_sweep(
    sweep: &SweepDefinition,
    prices: &[PriceBar],
    benchmark: Option<&[PriceBar]>,
) -> Result<SweepResult, String> {
    run_sweep_with_hooks(sweep, prices, benchmark, None, None)
}

pub fn run_sweep_with_hooks(
    sweep: &SweepDefinition,
    prices: &[PriceBar],
    benchmark: Option<&[PriceBar]>,
    mut on_progress: Option<&mut dyn FnMut(SweepProgress)>,
    should_cancel: Option<&(dyn Fn() -> bool + Sync)>,
) -> Result<SweepResult, String> {
    if sweep.id.trim().is_empty() {
        return Err("sweep id cannot be empty".to_string());
    }
    validate_param_paths(&sweep.params)?;

    let _span = info_span!("run_sweep", sweep_id = %sweep.id).entered();

    let base_toml_str = crate::config::to_toml_pretty(&sweep.base)?;
    let base_toml_value: toml::Value = toml::from_str(&base_toml_str)
        .map_err(|err| format!("failed to parse base config TOML as value: {err}"))?;

    let grid = expand_grid(&sweep.params);
    let parallelism = normalize_parallelism(sweep.parallelism);
    tracing::info!(
        runs = grid.len(),
        parallelism,
        bars = prices.len(),
        "sweep planned"
    );

    let mut plans: Vec<SweepRunPlan> = Vec::with_capacity(grid.len());
    for (order_idx, assignment) in grid.into_iter().enumerate() {
        let mut toml_value = base_toml_value.clone();
        apply_assignment(&mut toml_value, &assignment)?;

        let run_id = format!("{}__{}", sweep.id, assignment_hash(&assignment));
        set_path_value(
            &mut toml_value,
            "run.run_id",
            toml::Value::String(run_id.clone()),
        )?;

        let config = toml::to_string_pretty(&toml_value)
            .map_err(|err| format!("failed to serialize sweep config TOML: {err}"))
            .and_then(|raw| crate::config::parse_config(&raw));
        plans.push(SweepRunPlan {
            order_idx,
            run_id,
            params: assignment,
            config,
        });
    }

    let mut progress = SweepProgress::new(plans.len());
    let mut notify = |progress: &SweepProgress| {
        if let Some(callback) = on_progress.as_mut() {
            callback(progress.clone());
        }
    };
    notify(&progress);

    let mut on_entry = |entry: &SweepRunEntry| {
        progress.record(entry);
        notify(&progress);
    };

    let inputs = RunInputs { prices, benchmark };
    let mut executed = if parallelism <= 1 || plans.len() <= 1 {
        execute_plans_serial(&plans, &inputs, should_cancel, &mut on_entry)?
    } else {
        execute_plans_parallel(&plans, parallelism, &inputs, should_cancel, &mut on_entry)?
    };

    executed.sort_by_key(|(order_idx, _)| *order_idx);
    let runs: Vec<SweepRunEntry> = executed.into_iter().map(|(_, entry)| entry).collect();
    if runs.len() != plans.len() {
        return Err(format!(
            "internal sweep error: expected {} results, got {} (sweep '{}')",
            plans.len(),
            runs.len(),
            sweep.id
        ));
    }

    let ok = runs.iter().filter(|r| r.is_ok()).count();
    tracing::info!(ok, errors = runs.len() - ok, "sweep complete");

    Ok(SweepResult {
        sweep_id: sweep.id.clone(),
        runs,
    })
}

/// Ranks successful runs by `sort_by`. Ties keep grid order.
pub fn leaderboard(
    result: &SweepResult,
    sort_by: &str,
    descending: bool,
) -> Result<Vec<LeaderboardRow>, String> {
    let key = sort_by.trim().to_lowercase();
    let extract = metric_extractor(&key)?;

    let mut rows: Vec<(&SweepRunEntry, f64)> = result
        .runs
        .iter()
        .filter_map(|r| match (&r.status[..], r.metrics) {
            ("ok", Some(m)) => Some((r, extract(&m))),
            _ => None,
        })
        .collect();
    rows.sort_by(|(_, a), (_, b)| {
        let ord = b.partial_cmp(a).unwrap_or(std::cmp::Ordering::Equal);
        if descending {
            ord
        } else {
            ord.reverse()
        }
    });

    Ok(rows
        .into_iter()
        .enumerate()
        .map(|(idx, (entry, value))| LeaderboardRow {
            rank: idx + 1,
            run_id: entry.run_id.clone(),
            value,
            params: entry.params.clone(),
        })
        .collect())
}

/// Leaderboard using the sweep's own `[leaderboard]` settings, defaulting to
/// descending Sharpe ratio.
pub fn default_leaderboard(
    sweep: &SweepDefinition,
    result: &SweepResult,
) -> Result<Vec<LeaderboardRow>, String> {
    let cfg = sweep.leaderboard.as_ref();
    let sort_by = cfg
        .and_then(|c| c.sort_by.as_deref())
        .unwrap_or("sharpe_ratio");
    let descending = cfg.and_then(|c| c.descending).unwrap_or(true);
    leaderboard(result, sort_by, descending)
}

fn metric_extractor(key: &str) -> Result<fn(&BacktestMetrics) -> f64, String> {
    let f: fn(&BacktestMetrics) -> f64 = match key {
        "total_return" => |m: &BacktestMetrics| m.total_return,
        "sharpe_ratio" | "sharpe" => |m: &BacktestMetrics| m.sharpe_ratio,
        "sortino_ratio" | "sortino" => |m: &BacktestMetrics| m.sortino_ratio,
        "win_rate" => |m: &BacktestMetrics| m.win_rate,
        "max_drawdown" => |m: &BacktestMetrics| m.max_drawdown,
        "profit_factor" => |m: &BacktestMetrics| m.profit_factor,
        "trades" => |m: &BacktestMetrics| m.trades as f64,
        other => return Err(format!("unknown leaderboard metric: {other}")),
    };
    Ok(f)
}

#[derive(Debug, Clone)]
struct SweepRunPlan {
    order_idx: usize,
    run_id: String,
    params: BTreeMap<String, toml::Value>,
    config: Result<Config, String>,
}

#[derive(Clone, Copy)]
struct RunInputs<'a> {
    prices: &'a [PriceBar],
    benchmark: Option<&'a [PriceBar]>,
}

fn normalize_parallelism(value: Option<usize>) -> usize {
    value.unwrap_or(1).max(1)
}

fn execute_plans_serial(
    plans: &[SweepRunPlan],
    inputs: &RunInputs<'_>,
    should_cancel: Option<&(dyn Fn() -> bool + Sync)>,
    on_entry: &mut dyn FnMut(&SweepRunEntry),
) -> Result<Vec<(usize, SweepRunEntry)>, String> {
    let mut out = Vec::with_capacity(plans.len());
    for plan in plans {
        if should_cancelled(should_cancel) {
            return Err("cancelled".to_string());
        }
        let entry = execute_run_plan(plan, inputs);
        on_entry(&entry);
        out.push((plan.order_idx, entry));
    }
    Ok(out)
}

/// Workers claim plans through a shared cursor and stream entries back; the
/// caller restores grid order.
fn execute_plans_parallel(
    plans: &[SweepRunPlan],
    parallelism: usize,
    inputs: &RunInputs<'_>,
    should_cancel: Option<&(dyn Fn() -> bool + Sync)>,
    on_entry: &mut dyn FnMut(&SweepRunEntry),
) -> Result<Vec<(usize, SweepRunEntry)>, String> {
    let worker_count = parallelism.min(plans.len());
    let cursor = AtomicUsize::new(0);
    let cancelled = AtomicBool::new(false);
    let (tx, rx) = mpsc::channel::<(usize, SweepRunEntry)>();

    let entries = std::thread::scope(|scope| {
        for _ in 0..worker_count {
            let tx = tx.clone();
            let (cursor, cancelled) = (&cursor, &cancelled);
            scope.spawn(move || {
                while !cancelled.load(Ordering::Relaxed) {
                    if should_cancelled(should_cancel) {
                        cancelled.store(true, Ordering::Relaxed);
                        break;
                    }
                    let Some(plan) = plans.get(cursor.fetch_add(1, Ordering::Relaxed)) else {
                        break;
                    };
                    let entry = execute_run_plan(plan, inputs);
                    if tx.send((plan.order_idx, entry)).is_err() {
                        break;
                    }
                }
            });
        }
        drop(tx);

        rx.iter()
            .map(|(order_idx, entry)| {
                on_entry(&entry);
                (order_idx, entry)
            })
            .collect::<Vec<_>>()
    });

    if cancelled.load(Ordering::Relaxed) {
        return Err("cancelled".to_string());
    }
    Ok(entries)
}

fn execute_run_plan(plan: &SweepRunPlan, inputs: &RunInputs<'_>) -> SweepRunEntry {
    let outcome = plan.config.clone().and_then(|config| {
        crate::backtesting::run_backtest(&config, inputs.prices, inputs.benchmark)
    });

    let entry = match outcome {
        Ok(report) => SweepRunEntry {
            run_id: plan.run_id.clone(),
            params: plan.params.clone(),
            status: "ok".to_string(),
            error: None,
            metrics: Some(report.result.metrics),
            benchmark: report.benchmark,
        },
        Err(err) => {
            tracing::warn!(run_id = %plan.run_id, error = %err, "sweep run rejected");
            SweepRunEntry {
                run_id: plan.run_id.clone(),
                params: plan.params.clone(),
                status: "error".to_string(),
                error: Some(err),
                metrics: None,
                benchmark: None,
            }
        }
    };
    metrics::counter!("ffa.sweep.runs_total", "status" => entry.status.clone()).increment(1);
    entry
}

fn should_cancelled(should_cancel: Option<&(dyn Fn() -> bool + Sync)>) -> bool {
    should_cancel.map(|f| f()).unwrap_or(false)
}

fn validate_param_paths(params: &[SweepParam]) -> Result<(), String> {
    for p in params {
        let path = p.path.trim();
        if path.is_empty() {
            return Err("sweep param path cannot be empty".to_string());
        }
        let section = path.split('.').next().unwrap_or_default();
        if !SWEEPABLE_SECTIONS.contains(&section) || !path.contains('.') {
            return Err(format!("sweep param path not allowed: {}", p.path));
        }
        if path == "run.run_id" {
            return Err("run.run_id is assigned per run and cannot be swept".to_string());
        }
        if p.values.is_empty() {
            return Err(format!("sweep param has no values: {}", p.path));
        }
    }
    Ok(())
}

/// Cartesian product of the param values, first param varying slowest.
fn expand_grid(params: &[SweepParam]) -> Vec<BTreeMap<String, toml::Value>> {
    params.iter().fold(vec![BTreeMap::new()], |grid, param| {
        let path = param.path.trim();
        grid.iter()
            .flat_map(|assignment| {
                param.values.iter().map(move |value| {
                    let mut next = assignment.clone();
                    next.insert(path.to_string(), value.clone());
                    next
                })
            })
            .collect()
    })
}

fn assignment_hash(assignment: &BTreeMap<String, toml::Value>) -> String {
    let canonical = serde_json::to_string(assignment)
        .unwrap_or_else(|_| "{\"error\":\"assignment\"}".to_string());
    let mut hasher = Sha256::new();
    hasher.update(canonical.as_bytes());
    let bytes = hasher.finalize();
    to_hex_short(&bytes[..], 12)
}

fn to_hex_short(bytes: &[u8], chars: usize) -> String {
    const HEX: &[u8; 16] = b"0123456789abcdef";
    let mut out = String::with_capacity(chars);
    for &b in bytes {
        for nibble in [b >> 4, b & 0x0f] {
            if out.len() >= chars {
                return out;
            }
            out.push(HEX[nibble as usize] as char);
        }
    }
    out
}

fn apply_assignment(
    root: &mut toml::Value,
    assignment: &BTreeMap<String, toml::Value>,
) -> Result<(), String> {
    for (path, value) in assignment {
        set_path_value(root, path, value.clone())?;
    }
    Ok(())
}

// Paths are `section.field`; only existing fields may be replaced.
fn set_path_value(root: &mut toml::Value, path: &str, value: toml::Value) -> Result<(), String> {
    let (section, field) = path
        .trim()
        .split_once('.')
        .ok_or_else(|| format!("path must be section.field: {path}"))?;
    let slot = root
        .get_mut(section)
        .and_then(|table| table.as_table_mut())
        .and_then(|table| table.get_mut(field))
        .ok_or_else(|| format!("path not found: {path}"))?;
    *slot = value;
    Ok(())
}

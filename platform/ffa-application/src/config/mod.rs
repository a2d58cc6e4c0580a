use ffa_domain::errors::BacktestError;
use ffa_domain::services::signals::{MeanReversion, MovingAverageCross, Seasonal, StrategyKind};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct Config {
    pub run: RunConfig,
    pub strategy: StrategyConfig,
    pub benchmark: Option<BenchmarkConfig>,
}

#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct RunConfig {
    pub run_id: String,
    pub instrument: String,
    pub initial_capital: f64,
    pub lot_size: f64,
}

/// Flat `kind`-tagged table so sweeps can address `strategy.<field>` directly.
#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
#[serde(tag = "kind", rename_all = "snake_case", deny_unknown_fields)]
pub enum StrategyConfig {
    MaCross { short_window: u64, long_window: u64 },
    MeanReversion { window: u64, z_threshold: f64 },
    Seasonal { buy_month: u32, sell_month: u32 },
}

#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct BenchmarkConfig {
    pub enabled: Option<bool>,
}

impl StrategyConfig {
    pub fn build(&self) -> Result<StrategyKind, BacktestError> {
        let kind: StrategyKind = match *self {
            StrategyConfig::MaCross {
                short_window,
                long_window,
            } => MovingAverageCross::new(short_window as usize, long_window as usize)?.into(),
            StrategyConfig::MeanReversion {
                window,
                z_threshold,
            } => MeanReversion::new(window as usize, z_threshold)?.into(),
            StrategyConfig::Seasonal {
                buy_month,
                sell_month,
            } => Seasonal::new(buy_month, sell_month)?.into(),
        };
        Ok(kind)
    }
}

impl Config {
    pub fn benchmark_enabled(&self) -> bool {
        self.benchmark
            .as_ref()
            .map(|b| b.enabled.unwrap_or(true))
            .unwrap_or(true)
    }

    pub fn validate(&self) -> Result<(), String> {
        self.build_strategy().map(|_| ())
    }

    /// Checks the run section, then builds the configured generator.
    pub fn build_strategy(&self) -> Result<StrategyKind, String> {
        if self.run.run_id.trim().is_empty() {
            return Err("run.run_id must not be empty".to_string());
        }
        if !self.run.initial_capital.is_finite() {
            return Err("run.initial_capital must be finite".to_string());
        }
        if !self.run.lot_size.is_finite() || self.run.lot_size <= 0.0 {
            return Err("run.lot_size must be finite and > 0".to_string());
        }
        self.strategy
            .build()
            .map_err(|err| format!("invalid strategy: {err}"))
    }
}

pub fn parse_config(contents: &str) -> Result<Config, String> {
    toml::from_str(contents).map_err(|err| format!("failed to parse TOML: {err}"))
}

pub fn load_config(path: &Path) -> Result<Config, String> {
    let (config, _source) = load_config_with_source(path)?;
    Ok(config)
}

pub fn load_config_with_source(path: &Path) -> Result<(Config, String), String> {
    let contents = fs::read_to_string(path)
        .map_err(|err| format!("failed to read config {}: {}", path.display(), err))?;
    let config = toml::from_str(&contents)
        .map_err(|err| format!("failed to parse TOML {}: {}", path.display(), err))?;
    Ok((config, contents))
}

pub fn to_toml_pretty(config: &Config) -> Result<String, String> {
    toml::to_string_pretty(config)
        .map_err(|err| format!("failed to serialize config as TOML: {err}"))
}

#[cfg(test)]
mod tests {
    use super::{parse_config, to_toml_pretty, Config, StrategyConfig};
    use ffa_domain::services::signals::{SignalGenerator, StrategyKind};

    const MA_CONFIG: &str = r#"
[run]
run_id = "c5tc_ma_2024"
instrument = "C5TC"
initial_capital = 100000.0
lot_size = 1000.0

[strategy]
kind = "ma_cross"
short_window = 5
long_window = 20
"#;

    #[test]
    fn parse_minimal_config() {
        let config = parse_config(MA_CONFIG).expect("config should parse");
        assert_eq!(config.run.instrument, "C5TC");
        assert_eq!(
            config.strategy,
            StrategyConfig::MaCross {
                short_window: 5,
                long_window: 20
            }
        );
        assert!(config.benchmark_enabled());
        assert!(config.validate().is_ok());
    }

    #[test]
    fn parse_config_rejects_malformed_toml() {
        let err = toml::from_str::<Config>("[run\nrun_id = 1").expect_err("malformed");
        assert!(!err.to_string().is_empty());
    }

    #[test]
    fn parse_config_rejects_unknown_fields() {
        let toml_str = format!("{MA_CONFIG}\n[benchmark]\nenabled = true\nunknown_field = 1\n");
        let err = parse_config(&toml_str).expect_err("unknown field should fail");
        assert!(err.to_lowercase().contains("unknown field"));
    }

    #[test]
    fn parse_config_rejects_unknown_strategy_kind() {
        let toml_str = MA_CONFIG.replace("ma_cross", "momentum");
        assert!(parse_config(&toml_str).is_err());
    }

    #[test]
    fn parses_seasonal_and_disabled_benchmark() {
        let toml_str = r#"
[run]
run_id = "pmx_seasonal"
instrument = "P5TC"
initial_capital = 0.0
lot_size = 1.0

[strategy]
kind = "seasonal"
buy_month = 9
sell_month = 12

[benchmark]
enabled = false
"#;
        let config = parse_config(toml_str).expect("config should parse");
        assert!(!config.benchmark_enabled());
        assert_eq!(config.strategy.build().unwrap().name(), "seasonal");
    }

    #[test]
    fn build_strategy_checks_run_section_first() {
        let mut config = parse_config(MA_CONFIG).unwrap();
        let kind = config.build_strategy().expect("valid config");
        assert_eq!(kind.name(), "ma_cross");

        config.run.initial_capital = f64::NAN;
        let err = config.build_strategy().expect_err("nan capital");
        assert!(err.contains("initial_capital"));
        assert_eq!(config.validate().unwrap_err(), err);
    }

    #[test]
    fn build_carries_parameters_into_generators() {
        let ma = StrategyConfig::MaCross {
            short_window: 5,
            long_window: 20,
        };
        let StrategyKind::MovingAverageCross(ma) = ma.build().unwrap() else {
            panic!("expected ma_cross");
        };
        assert_eq!((ma.short_window(), ma.long_window()), (5, 20));

        let mr = StrategyConfig::MeanReversion {
            window: 30,
            z_threshold: 1.75,
        };
        let StrategyKind::MeanReversion(mr) = mr.build().unwrap() else {
            panic!("expected mean_reversion");
        };
        assert_eq!((mr.window(), mr.z_threshold()), (30, 1.75));

        let seasonal = StrategyConfig::Seasonal {
            buy_month: 3,
            sell_month: 3,
        };
        let StrategyKind::Seasonal(seasonal) = seasonal.build().unwrap() else {
            panic!("expected seasonal");
        };
        assert_eq!((seasonal.buy_month(), seasonal.sell_month()), (3, 3));
    }

    #[test]
    fn validate_surfaces_contract_errors() {
        let mut config = parse_config(MA_CONFIG).unwrap();
        config.strategy = StrategyConfig::MaCross {
            short_window: 0,
            long_window: 20,
        };
        let err = config.validate().expect_err("zero window");
        assert!(err.contains("short_window"));

        let mut config = parse_config(MA_CONFIG).unwrap();
        config.run.lot_size = 0.0;
        assert!(config.validate().unwrap_err().contains("lot_size"));
    }

    #[test]
    fn toml_round_trip_keeps_strategy_table_flat() {
        let config = parse_config(MA_CONFIG).unwrap();
        let rendered = to_toml_pretty(&config).unwrap();
        assert!(rendered.contains("kind = \"ma_cross\""));
        assert_eq!(parse_config(&rendered).unwrap(), config);
    }
}

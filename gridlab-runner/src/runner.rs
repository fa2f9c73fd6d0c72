//! Run orchestration: load bars, prepare indicator columns, dispatch to the
//! grid engine or the order replay, and summarize.
//!
//! Two entry points:
//! - `run_simulation()`: loads the configured data file, then runs. Used by the CLI.
//! - `run_on_data()`: takes pre-loaded data. Used by batch runs and tests.

use std::path::Path;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use gridlab_core::broker::{replay_orders, BrokerError, SimulatedBroker};
use gridlab_core::engine::{
    compute_warmup, precompute_indicators, GridEngine, OrderStore, PositionLedger, RunResult,
    SimError,
};
use gridlab_core::strategy::{DoubleTrend, Strategy};

use crate::config::{ConfigError, Mode, SimulationConfig};
use crate::data_loader::{load_bars_csv, LoadError, LoadedData};
use crate::export;
use crate::fingerprint::RunFingerprint;

/// Errors from the runner.
#[derive(Debug, Error)]
pub enum RunError {
    #[error("config error: {0}")]
    Config(#[from] ConfigError),
    #[error("data error: {0}")]
    Data(#[from] LoadError),
    #[error("simulation error: {0}")]
    Simulation(#[from] SimError),
    #[error("broker error: {0}")]
    Broker(#[from] BrokerError),
    #[error("fingerprint error: {0}")]
    Fingerprint(#[from] serde_json::Error),
}

/// Current schema version for persisted summaries.
pub const SCHEMA_VERSION: u32 = 1;

/// Headline numbers of one run, persisted as JSON.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunSummary {
    /// Schema version for forward-compatible deserialization.
    #[serde(default = "default_schema_version")]
    pub schema_version: u32,
    pub symbol: String,
    pub mode: Mode,
    pub bar_count: usize,
    pub fill_count: usize,
    pub trade_count: usize,
    pub winning_trades: usize,
    pub total_commission: f64,
    pub final_balance: f64,
    pub final_position: i64,
    pub events_scheduled: usize,
    pub events_handled: usize,
    pub insane_bars: usize,
    pub dataset_hash: String,
    pub fingerprint: RunFingerprint,
}

/// Default schema version for serde deserialization of older JSON without the field.
fn default_schema_version() -> u32 {
    SCHEMA_VERSION
}

/// Everything a run produced.
#[derive(Debug, Clone)]
pub struct RunOutcome {
    pub summary: RunSummary,
    pub result: RunResult,
    pub data: LoadedData,
}

impl RunOutcome {
    /// Indicator columns for export: input columns in file order, then
    /// computed ones by name.
    pub fn export_columns(&self) -> Vec<String> {
        let mut columns = self.data.extra_columns.clone();
        for name in self.data.indicators.names() {
            if !columns.iter().any(|c| c == name) {
                columns.push(name.to_string());
            }
        }
        columns
    }

    pub fn write_csv(&self, path: &Path) -> anyhow::Result<()> {
        export::write_augmented_csv(
            path,
            &self.data.bars,
            &self.data.indicators,
            &self.export_columns(),
            &self.result.log,
        )
    }

    pub fn write_summary(&self, path: &Path) -> anyhow::Result<()> {
        export::write_summary_json(path, &self.summary)
    }
}

/// Run the simulation described by `config` on its data file.
pub fn run_simulation(config: &SimulationConfig) -> Result<RunOutcome, RunError> {
    let data = load_bars_csv(config.data_path()?)?;
    run_on_data(config, data)
}

/// Run a simulation with pre-loaded data, no I/O.
pub fn run_on_data(config: &SimulationConfig, mut data: LoadedData) -> Result<RunOutcome, RunError> {
    config.validate()?;

    let result = match config.mode {
        Mode::Grid => {
            if config.indicators.compute {
                let indicators = config.grid_indicators();
                let computed = precompute_indicators(&data.bars, &indicators, &mut data.indicators);
                tracing::debug!(
                    computed,
                    warmup = compute_warmup(&indicators),
                    "grid indicators prepared"
                );
            }
            let mut ledger = PositionLedger::new();
            let mut orders = OrderStore::new();
            GridEngine::new(config.grid_config()).run(
                &data.bars,
                &data.indicators,
                &mut ledger,
                &mut orders,
            )?
        }
        Mode::DoubleTrend => {
            let mut strategy = DoubleTrend::new(config.double_trend.clone());
            if config.indicators.compute {
                let indicators = strategy.indicators();
                let computed = precompute_indicators(&data.bars, &indicators, &mut data.indicators);
                tracing::debug!(
                    computed,
                    warmup = compute_warmup(&indicators),
                    "strategy indicators prepared"
                );
            }
            let broker = SimulatedBroker::new(config.broker_config());
            replay_orders(
                &data.bars,
                &data.indicators,
                &mut strategy,
                broker,
                config.broker.close_at_end,
            )?
        }
    };

    let fingerprint = RunFingerprint::compute(config, &data.dataset_hash)?;
    let summary = RunSummary {
        schema_version: SCHEMA_VERSION,
        symbol: config.data.symbol.clone(),
        mode: config.mode,
        bar_count: result.bar_count,
        fill_count: result.fill_count(),
        trade_count: result.trade_count(),
        winning_trades: result.winning_trades,
        total_commission: result.commission_paid,
        final_balance: result.final_balance,
        final_position: result.final_position.size,
        events_scheduled: result.events_scheduled,
        events_handled: result.events_handled,
        insane_bars: data.insane_bars,
        dataset_hash: data.dataset_hash.clone(),
        fingerprint,
    };

    tracing::info!(
        symbol = %summary.symbol,
        mode = %summary.mode,
        run = summary.fingerprint.short_id(),
        fills = summary.fill_count,
        trades = summary.trade_count,
        balance = summary.final_balance,
        "run complete"
    );

    Ok(RunOutcome {
        summary,
        result,
        data,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data_loader::read_bars;

    const BARS: &str = "\
DATE,OPEN,HIGH,LOW,CLOSE,VOLUME,UP,DOWN,TREND
2024-03-04 10:00:00,101.0,101.5,100.5,101.0,1,,100.0,90.0
2024-03-04 10:15:00,100.2,100.5,99.0,100.3,1,,99.5,90.0
2024-03-04 10:30:00,104.5,105.5,104.0,105.0,1,,99.5,90.0
";

    fn grid_config() -> SimulationConfig {
        SimulationConfig::from_toml_str(
            r#"
[data]
symbol = "TEST"

[indicators]
compute = false

[columns]
channel_upper = "UP"
channel_lower = "DOWN"
trend_lower = "TREND"
"#,
        )
        .unwrap()
    }

    #[test]
    fn grid_run_from_input_columns() {
        let data = read_bars(BARS.as_bytes()).unwrap();
        let outcome = run_on_data(&grid_config(), data).unwrap();
        let s = &outcome.summary;
        assert_eq!(s.symbol, "TEST");
        assert_eq!(s.mode, Mode::Grid);
        assert_eq!(s.bar_count, 3);
        assert_eq!(s.fill_count, 2);
        assert_eq!(s.trade_count, 1);
        assert_eq!(s.winning_trades, 1);
        assert_eq!(s.final_position, 0);
        assert!((s.final_balance - (105.0 - 100.005 - 0.00525)).abs() < 1e-9);
        assert_eq!(s.schema_version, SCHEMA_VERSION);
        assert_eq!(outcome.export_columns(), ["UP", "DOWN", "TREND"]);
    }

    #[test]
    fn missing_configured_column_fails() {
        let data = read_bars(BARS.as_bytes()).unwrap();
        let mut config = grid_config();
        config.columns.as_mut().unwrap().trend_lower = "ABSENT".into();
        let err = run_on_data(&config, data).unwrap_err();
        assert!(matches!(
            err,
            RunError::Simulation(SimError::MissingColumn(ref c)) if c == "ABSENT"
        ));
    }

    #[test]
    fn computed_columns_are_exported_after_input_ones() {
        let data = read_bars(BARS.as_bytes()).unwrap();
        let mut config = SimulationConfig::default();
        config.indicators.channel_period = 2;
        config.indicators.trend_period = 1;
        let outcome = run_on_data(&config, data).unwrap();
        assert_eq!(
            outcome.export_columns(),
            ["UP", "DOWN", "TREND", "PC_2_HIGH", "PC_2_LOW", "ST_LOWER_1_7"]
        );
        assert!(outcome.summary.final_position == 0);
    }

    #[test]
    fn missing_data_path_reported() {
        let err = run_simulation(&SimulationConfig::default()).unwrap_err();
        assert!(matches!(err, RunError::Config(ConfigError::MissingDataPath)));
    }
}

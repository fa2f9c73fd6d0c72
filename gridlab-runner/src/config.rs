//! TOML simulation configuration.
//!
//! Every field has a default, so an empty file describes a grid run with the
//! standard session, costs and indicator columns. Only the data path has to
//! be supplied, either in the file or by the caller.

use std::path::{Path, PathBuf};

use chrono::NaiveTime;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use gridlab_core::broker::SimulatedBrokerConfig;
use gridlab_core::components::Indicator;
use gridlab_core::engine::{
    ColumnNames, GridConfig, OrderSlotPolicy, SessionConfig, DEFAULT_COMMISSION_RATE,
    DEFAULT_IMPROVE_MARGIN,
};
use gridlab_core::indicators::{BandSide, ChannelLine, PriceChannel, TrendBand};
use gridlab_core::strategy::DoubleTrendParams;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config '{path}': {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid TOML: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("commission rate must be finite and in [0, 1), got {0}")]
    CommissionRate(f64),

    #[error("improve margin must be finite and non-negative, got {0}")]
    ImproveMargin(f64),

    #[error("{field} must be at least 1")]
    ZeroPeriod { field: &'static str },

    #[error("{field} must be finite and positive, got {value}")]
    NotPositive { field: &'static str, value: f64 },

    #[error("session times out of order: open {open} must precede entry close {entry_close} and cutoff {cutoff}")]
    SessionOrder {
        open: NaiveTime,
        entry_close: NaiveTime,
        cutoff: NaiveTime,
    },

    #[error("no data path configured")]
    MissingDataPath,
}

/// Which replay drives the run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Mode {
    /// Scheduled events executed by the grid engine.
    #[default]
    Grid,
    /// Bar-by-bar order replay with the double trend strategy.
    DoubleTrend,
}

impl std::fmt::Display for Mode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Mode::Grid => write!(f, "grid"),
            Mode::DoubleTrend => write!(f, "double_trend"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DataSection {
    pub path: Option<PathBuf>,
    pub symbol: String,
    /// Augmented CSV written after the run.
    pub output: Option<PathBuf>,
    /// JSON run summary written after the run.
    pub summary: Option<PathBuf>,
}

impl Default for DataSection {
    fn default() -> Self {
        Self {
            path: None,
            symbol: "UNKNOWN".into(),
            output: None,
            summary: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CostsSection {
    pub commission_rate: f64,
    pub improve_margin: f64,
}

impl Default for CostsSection {
    fn default() -> Self {
        Self {
            commission_rate: DEFAULT_COMMISSION_RATE,
            improve_margin: DEFAULT_IMPROVE_MARGIN,
        }
    }
}

/// Indicator parameters for grid runs. The column names follow from them
/// unless `[columns]` overrides them.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct IndicatorSection {
    pub channel_period: usize,
    pub trend_period: usize,
    pub trend_multiplier: f64,
    /// Compute missing columns from the bars. Off means every column must
    /// come with the input.
    pub compute: bool,
}

impl Default for IndicatorSection {
    fn default() -> Self {
        Self {
            channel_period: 20,
            trend_period: 30,
            trend_multiplier: 7.0,
            compute: true,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BrokerSection {
    pub slot_policy: OrderSlotPolicy,
    pub forced_close: bool,
    pub forced_close_at: NaiveTime,
    pub allow_short: bool,
    /// Flatten any position left after the last bar.
    pub close_at_end: bool,
}

impl Default for BrokerSection {
    fn default() -> Self {
        Self {
            slot_policy: OrderSlotPolicy::Accumulate,
            forced_close: true,
            forced_close_at: gridlab_core::engine::fill_rules::default_forced_close(),
            allow_short: false,
            close_at_end: true,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct SimulationConfig {
    pub mode: Mode,
    pub data: DataSection,
    pub session: SessionConfig,
    pub costs: CostsSection,
    pub indicators: IndicatorSection,
    pub columns: Option<ColumnNames>,
    pub broker: BrokerSection,
    pub double_trend: DoubleTrendParams,
}

impl SimulationConfig {
    /// Parse and validate a config from TOML text.
    pub fn from_toml_str(text: &str) -> Result<Self, ConfigError> {
        let config: SimulationConfig = toml::from_str(text)?;
        config.validate()?;
        Ok(config)
    }

    /// Read, parse and validate a config file. A relative data path is
    /// resolved against the file's directory.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let mut config = Self::from_toml_str(&text)?;
        if let (Some(data), Some(dir)) = (config.data.path.as_ref(), path.parent()) {
            if data.is_relative() {
                config.data.path = Some(dir.join(data));
            }
        }
        tracing::debug!(path = %path.display(), mode = %config.mode, "config loaded");
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        let rate = self.costs.commission_rate;
        if !rate.is_finite() || !(0.0..1.0).contains(&rate) {
            return Err(ConfigError::CommissionRate(rate));
        }
        let margin = self.costs.improve_margin;
        if !margin.is_finite() || margin < 0.0 {
            return Err(ConfigError::ImproveMargin(margin));
        }

        let s = &self.session;
        if !(s.open < s.entry_close && s.open < s.cutoff) {
            return Err(ConfigError::SessionOrder {
                open: s.open,
                entry_close: s.entry_close,
                cutoff: s.cutoff,
            });
        }

        let periods = [
            ("indicators.channel_period", self.indicators.channel_period),
            ("indicators.trend_period", self.indicators.trend_period),
            ("double_trend.fast_period", self.double_trend.fast_period),
            ("double_trend.slow_period", self.double_trend.slow_period),
        ];
        for (field, value) in periods {
            if value == 0 {
                return Err(ConfigError::ZeroPeriod { field });
            }
        }
        if self.double_trend.size == 0 {
            return Err(ConfigError::ZeroPeriod {
                field: "double_trend.size",
            });
        }

        let positives = [
            ("indicators.trend_multiplier", self.indicators.trend_multiplier),
            ("double_trend.fast_multiplier", self.double_trend.fast_multiplier),
            ("double_trend.slow_multiplier", self.double_trend.slow_multiplier),
            ("double_trend.take_profit_offset", self.double_trend.take_profit_offset),
        ];
        for (field, value) in positives {
            if !value.is_finite() || value <= 0.0 {
                return Err(ConfigError::NotPositive { field, value });
            }
        }
        Ok(())
    }

    /// Column names the grid scheduler reads.
    pub fn column_names(&self) -> ColumnNames {
        if let Some(columns) = &self.columns {
            return columns.clone();
        }
        let ind = &self.indicators;
        ColumnNames {
            channel_upper: PriceChannel::column(ind.channel_period, ChannelLine::High),
            channel_lower: PriceChannel::column(ind.channel_period, ChannelLine::Low),
            trend_lower: TrendBand::column(ind.trend_period, ind.trend_multiplier, BandSide::Lower),
        }
    }

    /// Indicators computed for a grid run when the input lacks them.
    pub fn grid_indicators(&self) -> Vec<Box<dyn Indicator>> {
        let ind = &self.indicators;
        vec![
            Box::new(PriceChannel::high(ind.channel_period)),
            Box::new(PriceChannel::low(ind.channel_period)),
            Box::new(TrendBand::lower(ind.trend_period, ind.trend_multiplier)),
        ]
    }

    pub fn grid_config(&self) -> GridConfig {
        GridConfig {
            commission_rate: self.costs.commission_rate,
            improve_margin: self.costs.improve_margin,
            session: self.session.clone(),
            columns: self.column_names(),
        }
    }

    pub fn broker_config(&self) -> SimulatedBrokerConfig {
        SimulatedBrokerConfig {
            commission_rate: self.costs.commission_rate,
            slot_policy: self.broker.slot_policy,
            forced_close_at: self.broker.forced_close.then_some(self.broker.forced_close_at),
            allow_short: self.broker.allow_short,
        }
    }

    /// The configured data path, or `MissingDataPath`.
    pub fn data_path(&self) -> Result<&Path, ConfigError> {
        self.data.path.as_deref().ok_or(ConfigError::MissingDataPath)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_file_gives_defaults() {
        let config = SimulationConfig::from_toml_str("").unwrap();
        assert_eq!(config, SimulationConfig::default());
        assert_eq!(config.mode, Mode::Grid);
        assert_eq!(config.column_names(), ColumnNames::default());
        assert_eq!(config.grid_config(), GridConfig::default());
        assert_eq!(
            config.broker_config().forced_close_at,
            NaiveTime::from_hms_opt(23, 45, 0)
        );
    }

    #[test]
    fn parses_all_sections() {
        let text = r#"
mode = "double_trend"

[data]
path = "bars.csv"
symbol = "NQ"

[session]
open = "08:00:00"
entry_close = "22:00:00"
cutoff = "22:30:00"

[costs]
commission_rate = 0.0001

[indicators]
channel_period = 10
trend_period = 14
trend_multiplier = 3.0

[broker]
slot_policy = "single_slot"
forced_close = false
allow_short = true

[double_trend]
fast_period = 5
take_profit_offset = 25.0
"#;
        let config = SimulationConfig::from_toml_str(text).unwrap();
        assert_eq!(config.mode, Mode::DoubleTrend);
        assert_eq!(config.data.symbol, "NQ");
        assert_eq!(config.session.cutoff, NaiveTime::from_hms_opt(22, 30, 0).unwrap());
        assert_eq!(config.costs.improve_margin, DEFAULT_IMPROVE_MARGIN);
        assert_eq!(config.column_names().channel_lower, "PC_10_LOW");
        assert_eq!(config.column_names().trend_lower, "ST_LOWER_14_3");

        let broker = config.broker_config();
        assert_eq!(broker.slot_policy, OrderSlotPolicy::SingleSlot);
        assert_eq!(broker.forced_close_at, None);
        assert!(broker.allow_short);
        assert_eq!(broker.commission_rate, 0.0001);

        assert_eq!(config.double_trend.fast_period, 5);
        assert_eq!(config.double_trend.slow_period, 30);
    }

    #[test]
    fn explicit_columns_override_indicator_names() {
        let text = r#"
[columns]
channel_upper = "UP"
channel_lower = "DOWN"
trend_lower = "TREND"
"#;
        let config = SimulationConfig::from_toml_str(text).unwrap();
        assert_eq!(config.column_names().all(), ["UP", "DOWN", "TREND"]);
    }

    #[test]
    fn rejects_bad_values() {
        let err = SimulationConfig::from_toml_str("[costs]\ncommission_rate = -0.1").unwrap_err();
        assert!(matches!(err, ConfigError::CommissionRate(_)));

        let err = SimulationConfig::from_toml_str("[indicators]\nchannel_period = 0").unwrap_err();
        assert!(matches!(
            err,
            ConfigError::ZeroPeriod {
                field: "indicators.channel_period"
            }
        ));

        let err =
            SimulationConfig::from_toml_str("[session]\nopen = \"23:50:00\"").unwrap_err();
        assert!(matches!(err, ConfigError::SessionOrder { .. }));

        let err = SimulationConfig::from_toml_str("mode = \"scalper\"").unwrap_err();
        assert!(matches!(err, ConfigError::Parse(_)));
    }

    #[test]
    fn relative_data_path_resolves_against_config_dir() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("sim.toml");
        std::fs::write(&path, "[data]\npath = \"bars.csv\"\n").unwrap();

        let config = SimulationConfig::load(&path).unwrap();
        assert_eq!(config.data_path().unwrap(), dir.path().join("bars.csv"));
    }

    #[test]
    fn missing_data_path_is_an_error() {
        let config = SimulationConfig::default();
        assert!(matches!(
            config.data_path(),
            Err(ConfigError::MissingDataPath)
        ));
    }
}

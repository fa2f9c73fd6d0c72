//! Run configuration, input validation and the run result.

use crate::components::indicator::IndicatorValues;
use crate::domain::{Bar, Position};
use crate::engine::accounting::Account;
use crate::engine::error::SimError;
use crate::engine::trade_log::TradeLog;
use chrono::NaiveTime;
use serde::{Deserialize, Serialize};

/// Default commission rate per unit of notional.
pub const DEFAULT_COMMISSION_RATE: f64 = 0.00005;

/// Default fractional margin over a lot's basis for unwinding it.
pub const DEFAULT_IMPROVE_MARGIN: f64 = 0.0001;

fn hms(h: u32, m: u32) -> NaiveTime {
    NaiveTime::from_hms_opt(h, m, 0).unwrap_or(NaiveTime::MIN)
}

/// Trading session boundaries (time of day, exclusive on both ends).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionConfig {
    /// Entries and exits are only scheduled strictly after this time.
    pub open: NaiveTime,
    /// New entries are only scheduled strictly before this time.
    pub entry_close: NaiveTime,
    /// Exits are scheduled strictly before this time; a bar stamped exactly
    /// at it triggers the scheduled close.
    pub cutoff: NaiveTime,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            open: hms(7, 0),
            entry_close: hms(23, 0),
            cutoff: hms(23, 40),
        }
    }
}

impl SessionConfig {
    pub fn allows_entry(&self, t: NaiveTime) -> bool {
        self.open < t && t < self.entry_close
    }

    pub fn allows_exit(&self, t: NaiveTime) -> bool {
        self.open < t && t < self.cutoff
    }
}

/// Indicator columns the scheduler reads.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ColumnNames {
    pub channel_upper: String,
    pub channel_lower: String,
    pub trend_lower: String,
}

impl Default for ColumnNames {
    fn default() -> Self {
        Self {
            channel_upper: "PC_20_HIGH".into(),
            channel_lower: "PC_20_LOW".into(),
            trend_lower: "ST_LOWER_30_7".into(),
        }
    }
}

impl ColumnNames {
    pub fn all(&self) -> [&str; 3] {
        [
            self.channel_upper.as_str(),
            self.channel_lower.as_str(),
            self.trend_lower.as_str(),
        ]
    }
}

/// Configuration of a grid run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GridConfig {
    pub commission_rate: f64,
    pub improve_margin: f64,
    pub session: SessionConfig,
    pub columns: ColumnNames,
}

impl Default for GridConfig {
    fn default() -> Self {
        Self {
            commission_rate: DEFAULT_COMMISSION_RATE,
            improve_margin: DEFAULT_IMPROVE_MARGIN,
            session: SessionConfig::default(),
            columns: ColumnNames::default(),
        }
    }
}

/// Reject empty or out-of-order bar sequences.
pub fn validate_bars(bars: &[Bar]) -> Result<(), SimError> {
    if bars.is_empty() {
        return Err(SimError::EmptyInput);
    }
    if let Some(i) = bars
        .windows(2)
        .position(|w| w[1].timestamp <= w[0].timestamp)
    {
        return Err(SimError::UnorderedBars { index: i + 1 });
    }
    Ok(())
}

/// Require each named column to exist with one value per bar.
pub fn require_columns<'a>(
    indicators: &IndicatorValues,
    names: impl IntoIterator<Item = &'a str>,
    bar_count: usize,
) -> Result<(), SimError> {
    for name in names {
        let series = indicators
            .get_series(name)
            .ok_or_else(|| SimError::MissingColumn(name.to_string()))?;
        if series.len() != bar_count {
            return Err(SimError::ColumnLength {
                column: name.to_string(),
                expected: bar_count,
                actual: series.len(),
            });
        }
    }
    Ok(())
}

/// Result of a complete run.
#[derive(Debug, Clone)]
pub struct RunResult {
    pub log: TradeLog,
    pub final_position: Position,
    pub final_balance: f64,
    pub commission_paid: f64,
    /// Realized profit of each completed round trip, in order.
    pub trade_profits: Vec<f64>,
    pub winning_trades: usize,
    pub bar_count: usize,
    /// Events produced by the scheduler (zero for order replay).
    pub events_scheduled: usize,
    /// Events that led to at least one fill.
    pub events_handled: usize,
}

impl RunResult {
    pub(crate) fn from_parts(
        log: TradeLog,
        account: &Account,
        final_position: Position,
        bar_count: usize,
    ) -> Self {
        Self {
            log,
            final_position,
            final_balance: account.balance(),
            commission_paid: account.commission_paid(),
            trade_profits: account.trade_profits().to_vec(),
            winning_trades: account.winning_trades(),
            bar_count,
            events_scheduled: 0,
            events_handled: 0,
        }
    }

    pub fn fill_count(&self) -> usize {
        self.log.fills().len()
    }

    pub fn trade_count(&self) -> usize {
        self.trade_profits.len()
    }
}

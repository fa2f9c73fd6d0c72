//! Bar: one OHLCV sample for a fixed interval.

use chrono::{NaiveDateTime, NaiveTime};
use serde::{Deserialize, Serialize};

/// OHLCV bar for a single instrument over one fixed interval.
///
/// Indicator columns are not stored on the bar; they live in an
/// `IndicatorValues` container indexed by bar position.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Bar {
    pub timestamp: NaiveDateTime,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
    pub volume: f64,
}

impl Bar {
    /// Returns true if any OHLC field is NaN (void bar).
    pub fn is_void(&self) -> bool {
        self.open.is_nan() || self.high.is_nan() || self.low.is_nan() || self.close.is_nan()
    }

    /// Basic OHLC sanity check: high >= low, high >= open, high >= close, etc.
    pub fn is_sane(&self) -> bool {
        if self.is_void() {
            return false;
        }
        self.high >= self.low
            && self.high >= self.open
            && self.high >= self.close
            && self.low <= self.open
            && self.low <= self.close
    }

    /// Time of day of the bar timestamp, used for session rules.
    pub fn time_of_day(&self) -> NaiveTime {
        self.timestamp.time()
    }

    /// True when `price` lies within `[low, high]`.
    pub fn spans(&self, price: f64) -> bool {
        self.low <= price && price <= self.high
    }
}

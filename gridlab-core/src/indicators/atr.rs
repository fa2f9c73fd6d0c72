//! Average True Range (ATR).
//!
//! True Range: max(high-low, |high-prev_close|, |low-prev_close|)
//! Seeded at bar `period` with the mean of TR[1..=period], then Wilder
//! smoothing: atr[t] = (atr[t-1] * (period-1) + tr[t]) / period.

use crate::components::indicator::Indicator;
use crate::domain::Bar;

#[derive(Debug, Clone)]
pub struct Atr {
    period: usize,
    name: String,
}

impl Atr {
    pub fn new(period: usize) -> Self {
        assert!(period >= 1, "ATR period must be >= 1");
        Self {
            period,
            name: format!("ATR_{period}"),
        }
    }
}

/// Compute the True Range series from bars.
/// TR[0] = high[0] - low[0] (no previous close).
/// TR[t] = max(high[t]-low[t], |high[t]-close[t-1]|, |low[t]-close[t-1]|).
pub fn true_range(bars: &[Bar]) -> Vec<f64> {
    let n = bars.len();
    let mut tr = vec![f64::NAN; n];

    if n == 0 {
        return tr;
    }

    tr[0] = bars[0].high - bars[0].low;

    for i in 1..n {
        let h = bars[i].high;
        let l = bars[i].low;
        let pc = bars[i - 1].close;
        if h.is_nan() || l.is_nan() || pc.is_nan() {
            tr[i] = f64::NAN;
        } else {
            tr[i] = (h - l).max((h - pc).abs()).max((l - pc).abs());
        }
    }

    tr
}

/// ATR series for `bars`. The first `period` values are NaN.
pub fn atr_series(bars: &[Bar], period: usize) -> Vec<f64> {
    let n = bars.len();
    let mut atr = vec![f64::NAN; n];
    if period == 0 || n <= period {
        return atr;
    }

    let tr = true_range(bars);
    let p = period as f64;
    atr[period] = tr[1..=period].iter().sum::<f64>() / p;
    for i in (period + 1)..n {
        atr[i] = (atr[i - 1] * (p - 1.0) + tr[i]) / p;
    }
    atr
}

impl Indicator for Atr {
    fn name(&self) -> &str {
        &self.name
    }

    fn lookback(&self) -> usize {
        self.period
    }

    fn compute(&self, bars: &[Bar]) -> Vec<f64> {
        atr_series(bars, self.period)
    }
}

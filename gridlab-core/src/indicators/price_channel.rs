//! Price channel: highest high / lowest low over a rolling window, plus the
//! midpoint rounded to 2 decimals.
//!
//! Published as `PC_{period}_HIGH`, `PC_{period}_LOW` and `PC_{period}_MID`.
//! Lookback: period - 1.

use crate::components::indicator::Indicator;
use crate::domain::Bar;
use crate::indicators::round_to;

/// Which line of the channel to compute.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChannelLine {
    High,
    Low,
    Mid,
}

impl ChannelLine {
    fn suffix(&self) -> &'static str {
        match self {
            ChannelLine::High => "HIGH",
            ChannelLine::Low => "LOW",
            ChannelLine::Mid => "MID",
        }
    }
}

#[derive(Debug, Clone)]
pub struct PriceChannel {
    period: usize,
    line: ChannelLine,
    name: String,
}

impl PriceChannel {
    pub fn new(period: usize, line: ChannelLine) -> Self {
        assert!(period >= 1, "price channel period must be >= 1");
        Self {
            period,
            line,
            name: Self::column(period, line),
        }
    }

    pub fn high(period: usize) -> Self {
        Self::new(period, ChannelLine::High)
    }

    pub fn low(period: usize) -> Self {
        Self::new(period, ChannelLine::Low)
    }

    pub fn mid(period: usize) -> Self {
        Self::new(period, ChannelLine::Mid)
    }

    /// Column name for a channel line.
    pub fn column(period: usize, line: ChannelLine) -> String {
        format!("PC_{period}_{}", line.suffix())
    }
}

fn rolling(bars: &[Bar], period: usize, pick: impl Fn(&[Bar]) -> f64) -> Vec<f64> {
    let n = bars.len();
    let mut result = vec![f64::NAN; n];
    if n < period {
        return result;
    }
    for i in (period - 1)..n {
        result[i] = pick(&bars[i + 1 - period..=i]);
    }
    result
}

fn window_high(window: &[Bar]) -> f64 {
    window
        .iter()
        .map(|b| b.high)
        .try_fold(f64::NEG_INFINITY, |acc, h| (!h.is_nan()).then(|| acc.max(h)))
        .unwrap_or(f64::NAN)
}

fn window_low(window: &[Bar]) -> f64 {
    window
        .iter()
        .map(|b| b.low)
        .try_fold(f64::INFINITY, |acc, l| (!l.is_nan()).then(|| acc.min(l)))
        .unwrap_or(f64::NAN)
}

impl Indicator for PriceChannel {
    fn name(&self) -> &str {
        &self.name
    }

    fn lookback(&self) -> usize {
        self.period.saturating_sub(1)
    }

    fn compute(&self, bars: &[Bar]) -> Vec<f64> {
        match self.line {
            ChannelLine::High => rolling(bars, self.period, window_high),
            ChannelLine::Low => rolling(bars, self.period, window_low),
            ChannelLine::Mid => rolling(bars, self.period, |w| {
                round_to((window_high(w) + window_low(w)) / 2.0, 2)
            }),
        }
    }
}

//! Trend band: ATR trailing bands with a regime flag (supertrend style).
//!
//! Inherently sequential: each band ratchets against its previous value while
//! the regime holds, and the regime flips on a close through the active band.
//!
//! The computation starts in the down regime at bar `period` (the first bar
//! with a defined ATR). Two columns are published:
//! - `ST_UPPER_{period}_{multiplier}`: upper band, defined only in the down regime
//! - `ST_LOWER_{period}_{multiplier}`: lower band, defined only in the up regime
//!
//! Values are rounded to 3 decimals.

use crate::components::indicator::Indicator;
use crate::domain::Bar;
use crate::indicators::atr::atr_series;
use crate::indicators::round_to;

/// Which band of the pair to publish.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BandSide {
    Upper,
    Lower,
}

#[derive(Debug, Clone)]
pub struct TrendBand {
    period: usize,
    multiplier: f64,
    side: BandSide,
    name: String,
}

impl TrendBand {
    pub fn new(period: usize, multiplier: f64, side: BandSide) -> Self {
        assert!(period >= 1, "trend band period must be >= 1");
        Self {
            period,
            multiplier,
            side,
            name: Self::column(period, multiplier, side),
        }
    }

    pub fn upper(period: usize, multiplier: f64) -> Self {
        Self::new(period, multiplier, BandSide::Upper)
    }

    pub fn lower(period: usize, multiplier: f64) -> Self {
        Self::new(period, multiplier, BandSide::Lower)
    }

    /// Column name for one side of the band pair.
    pub fn column(period: usize, multiplier: f64, side: BandSide) -> String {
        let prefix = match side {
            BandSide::Upper => "ST_UPPER",
            BandSide::Lower => "ST_LOWER",
        };
        format!("{prefix}_{period}_{multiplier}")
    }
}

/// Regime per bar. `Unset` before the first defined ATR and on bars with
/// undefined input.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Regime {
    Unset,
    Down,
    Up,
}

/// Compute both published band columns at once.
pub fn trend_bands(bars: &[Bar], period: usize, multiplier: f64) -> (Vec<f64>, Vec<f64>) {
    let n = bars.len();
    let mut upper_out = vec![f64::NAN; n];
    let mut lower_out = vec![f64::NAN; n];
    if period >= n {
        return (upper_out, lower_out);
    }

    let atr = atr_series(bars, period);
    let basic = |i: usize| {
        let hl2 = (bars[i].high + bars[i].low) / 2.0;
        (hl2 + multiplier * atr[i], hl2 - multiplier * atr[i])
    };

    let mut upper = vec![f64::NAN; n];
    let mut lower = vec![f64::NAN; n];
    let mut regime = vec![Regime::Unset; n];

    let (bu, bl) = basic(period);
    upper[period] = bu;
    lower[period] = bl;
    regime[period] = Regime::Down;

    for i in (period + 1)..n {
        let (bu, bl) = basic(i);
        if bu.is_nan() || bl.is_nan() {
            continue;
        }

        if regime[i - 1] == Regime::Down {
            upper[i] = bu.min(upper[i - 1]);
            lower[i] = bl;
        } else {
            upper[i] = bu;
            lower[i] = bl.max(lower[i - 1]);
        }

        let close = bars[i].close;
        regime[i] = match regime[i - 1] {
            Regime::Down if close > upper[i] => Regime::Up,
            Regime::Up if close < lower[i] => Regime::Down,
            prev => prev,
        };
    }

    for i in 0..n {
        match regime[i] {
            Regime::Down => upper_out[i] = round_to(upper[i], 3),
            Regime::Up => lower_out[i] = round_to(lower[i], 3),
            Regime::Unset => {}
        }
    }

    (upper_out, lower_out)
}

impl Indicator for TrendBand {
    fn name(&self) -> &str {
        &self.name
    }

    fn lookback(&self) -> usize {
        self.period
    }

    fn compute(&self, bars: &[Bar]) -> Vec<f64> {
        let (upper, lower) = trend_bands(bars, self.period, self.multiplier);
        match self.side {
            BandSide::Upper => upper,
            BandSide::Lower => lower,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::indicators::make_bars;

    #[test]
    fn column_names_format_multiplier() {
        assert_eq!(TrendBand::upper(10, 3.0).name(), "ST_UPPER_10_3");
        assert_eq!(TrendBand::lower(7, 2.5).name(), "ST_LOWER_7_2.5");
    }

    #[test]
    fn warmup_is_undefined_and_starts_in_down_regime() {
        let bars = make_bars(&[10.0, 10.5, 11.0, 10.8, 10.9]);
        let (upper, lower) = trend_bands(&bars, 2, 3.0);
        assert!(upper[0].is_nan() && upper[1].is_nan());
        assert!(lower[0].is_nan() && lower[1].is_nan());
        assert!(!upper[2].is_nan());
        assert!(lower[2].is_nan());
    }

    #[test]
    fn exactly_one_band_defined_after_warmup() {
        let closes: Vec<f64> = (0..60)
            .map(|i| 100.0 + 10.0 * ((i as f64) / 6.0).sin())
            .collect();
        let bars = make_bars(&closes);
        let (upper, lower) = trend_bands(&bars, 5, 1.0);
        for i in 5..bars.len() {
            assert!(
                upper[i].is_nan() != lower[i].is_nan(),
                "bar {i}: upper={} lower={}",
                upper[i],
                lower[i]
            );
        }
    }

    #[test]
    fn strong_rally_flips_to_up_regime() {
        let mut closes = vec![100.0; 6];
        closes.extend((1..=10).map(|i| 100.0 + 5.0 * i as f64));
        let bars = make_bars(&closes);
        let (upper, lower) = trend_bands(&bars, 3, 1.0);
        let last = bars.len() - 1;
        assert!(upper[last].is_nan());
        assert!(!lower[last].is_nan());
        assert!(lower[last] < bars[last].close);
    }

    #[test]
    fn lower_band_ratchets_up_in_up_regime() {
        let mut closes = vec![100.0; 6];
        closes.extend((1..=10).map(|i| 100.0 + 5.0 * i as f64));
        let bars = make_bars(&closes);
        let (_, lower) = trend_bands(&bars, 3, 1.0);
        let defined: Vec<f64> = lower.iter().copied().filter(|v| !v.is_nan()).collect();
        assert!(defined.len() > 2);
        for pair in defined.windows(2) {
            assert!(pair[1] >= pair[0]);
        }
    }

    #[test]
    fn values_rounded_to_three_decimals() {
        let closes: Vec<f64> = (0..30).map(|i| 100.0 + (i as f64) * 0.37).collect();
        let bars = make_bars(&closes);
        let (upper, lower) = trend_bands(&bars, 4, 1.7);
        for v in upper.iter().chain(lower.iter()).filter(|v| !v.is_nan()) {
            assert!((v * 1000.0 - (v * 1000.0).round()).abs() < 1e-6);
        }
    }

    #[test]
    fn too_few_bars_yields_nothing() {
        let bars = make_bars(&[1.0, 2.0, 3.0]);
        let (upper, lower) = trend_bands(&bars, 3, 3.0);
        assert!(upper.iter().chain(lower.iter()).all(|v| v.is_nan()));
    }
}

//! Indicator precomputation.
//!
//! All indicators are computed once before a run and stored alongside any
//! columns that came with the input data.

use crate::components::indicator::{Indicator, IndicatorValues};
use crate::domain::Bar;

/// Compute each indicator into `values`, skipping names already present.
///
/// Columns supplied by the input take precedence over computed ones. Returns
/// the number of columns computed.
pub fn precompute_indicators(
    bars: &[Bar],
    indicators: &[Box<dyn Indicator>],
    values: &mut IndicatorValues,
) -> usize {
    let mut computed = 0;
    for indicator in indicators {
        if values.contains(indicator.name()) {
            tracing::debug!(column = indicator.name(), "column supplied by input, not recomputed");
            continue;
        }
        let series = indicator.compute(bars);
        debug_assert_eq!(
            series.len(),
            bars.len(),
            "indicator '{}' produced {} values for {} bars",
            indicator.name(),
            series.len(),
            bars.len()
        );
        values.insert(indicator.name(), series);
        computed += 1;
    }
    computed
}

/// The maximum lookback across a set of indicators.
pub fn compute_warmup(indicators: &[Box<dyn Indicator>]) -> usize {
    indicators.iter().map(|i| i.lookback()).max().unwrap_or(0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::indicators::{make_bars, PriceChannel, TrendBand};

    #[test]
    fn computes_missing_columns() {
        let bars = make_bars(&[10.0, 11.0, 12.0, 13.0, 14.0]);
        let indicators: Vec<Box<dyn Indicator>> = vec![
            Box::new(PriceChannel::low(3)),
            Box::new(PriceChannel::high(3)),
        ];
        let mut iv = IndicatorValues::new();
        assert_eq!(precompute_indicators(&bars, &indicators, &mut iv), 2);
        assert_eq!(iv.len(), 2);
        // low[2] = min(lows of bars 0..=2) = 9.0
        assert_eq!(iv.get("PC_3_LOW", 2), Some(9.0));
    }

    #[test]
    fn input_columns_take_precedence() {
        let bars = make_bars(&[10.0, 11.0, 12.0]);
        let indicators: Vec<Box<dyn Indicator>> = vec![Box::new(PriceChannel::low(2))];
        let mut iv = IndicatorValues::new();
        iv.insert("PC_2_LOW", vec![1.0, 2.0, 3.0]);
        assert_eq!(precompute_indicators(&bars, &indicators, &mut iv), 0);
        assert_eq!(iv.get("PC_2_LOW", 2), Some(3.0));
    }

    #[test]
    fn warmup_is_max_lookback() {
        let indicators: Vec<Box<dyn Indicator>> = vec![
            Box::new(PriceChannel::low(20)),
            Box::new(TrendBand::lower(30, 7.0)),
        ];
        assert_eq!(compute_warmup(&indicators), 30);
        assert_eq!(compute_warmup(&[]), 0);
    }
}

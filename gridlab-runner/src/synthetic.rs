//! Seeded synthetic intraday bars for demos, benchmarks and tests.

use chrono::{Duration, NaiveDate, NaiveDateTime};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};

use gridlab_core::domain::Bar;
use gridlab_core::indicators::round_to;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SyntheticConfig {
    pub bars: usize,
    pub seed: u64,
    pub start: NaiveDateTime,
    pub interval_minutes: i64,
    pub start_price: f64,
    /// Largest per-bar move as a fraction of price.
    pub volatility: f64,
}

impl Default for SyntheticConfig {
    fn default() -> Self {
        Self {
            bars: 500,
            seed: 42,
            start: NaiveDate::from_ymd_opt(2024, 1, 2)
                .and_then(|d| d.and_hms_opt(7, 0, 0))
                .unwrap_or_default(),
            interval_minutes: 15,
            start_price: 100.0,
            volatility: 0.003,
        }
    }
}

/// Random-walk bars. Prices are rounded to cents and every bar is sane:
/// `low <= min(open, close)` and `high >= max(open, close)`.
///
/// The same config always yields the same bars.
pub fn generate_bars(config: &SyntheticConfig) -> Vec<Bar> {
    let mut rng = StdRng::seed_from_u64(config.seed);
    let vol = config.volatility.abs();
    let interval = Duration::minutes(config.interval_minutes.max(1));

    let mut bars = Vec::with_capacity(config.bars);
    let mut price = config.start_price;
    let mut timestamp = config.start;

    for _ in 0..config.bars {
        let open = round_to(price, 2);
        let step: f64 = if vol > 0.0 { rng.gen_range(-vol..vol) } else { 0.0 };
        let close = round_to((open * (1.0 + step)).max(0.01), 2);
        let wick_up: f64 = if vol > 0.0 { rng.gen_range(0.0..vol) } else { 0.0 };
        let wick_down: f64 = if vol > 0.0 { rng.gen_range(0.0..vol) } else { 0.0 };
        let high = round_to(open.max(close) * (1.0 + wick_up), 2).max(open.max(close));
        let low = round_to(open.min(close) * (1.0 - wick_down), 2)
            .min(open.min(close))
            .max(0.01);
        let volume = rng.gen_range(100..10_000u32) as f64;

        bars.push(Bar {
            timestamp,
            open,
            high,
            low,
            close,
            volume,
        });

        price = close;
        timestamp += interval;
    }

    tracing::debug!(bars = bars.len(), seed = config.seed, "synthetic bars generated");
    bars
}

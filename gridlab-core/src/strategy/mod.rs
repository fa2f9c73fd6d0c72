//! Order-issuing strategies for the order replay.

pub mod double_trend;

use crate::broker::{Broker, BrokerError};
use crate::components::indicator::{Indicator, IndicatorValues};
use crate::domain::Bar;

pub use double_trend::{DoubleTrend, DoubleTrendParams};

/// Read-only view of the data up to and including the current bar.
#[derive(Debug, Clone, Copy)]
pub struct BarContext<'a> {
    pub bar_index: usize,
    pub bars: &'a [Bar],
    pub indicators: &'a IndicatorValues,
}

impl<'a> BarContext<'a> {
    pub fn new(bar_index: usize, bars: &'a [Bar], indicators: &'a IndicatorValues) -> Self {
        Self {
            bar_index,
            bars,
            indicators,
        }
    }

    pub fn bar(&self) -> &'a Bar {
        &self.bars[self.bar_index]
    }

    /// The previous bar, or `None` on the first bar.
    pub fn prev_bar(&self) -> Option<&'a Bar> {
        self.bar_index.checked_sub(1).map(|i| &self.bars[i])
    }

    /// Defined value of `column` on the current bar.
    pub fn value(&self, column: &str) -> Option<f64> {
        self.indicators.defined(column, self.bar_index)
    }

    /// Defined value of `column` on the previous bar.
    pub fn prev_value(&self, column: &str) -> Option<f64> {
        let prev = self.bar_index.checked_sub(1)?;
        self.indicators.defined(column, prev)
    }
}

/// A strategy sees each bar once, after resting orders were matched, and
/// talks to the market only through the broker.
pub trait Strategy {
    fn name(&self) -> &str;

    /// Indicators the strategy reads. Missing columns are computed before
    /// the replay starts.
    fn indicators(&self) -> Vec<Box<dyn Indicator>> {
        Vec::new()
    }

    fn on_bar(&mut self, ctx: &BarContext<'_>, broker: &mut dyn Broker) -> Result<(), BrokerError>;
}

//! Two trend bands: a fast one that times entries and exits, and a slow one
//! that filters entries.

use serde::{Deserialize, Serialize};

use crate::broker::{Broker, BrokerError, NewOrder};
use crate::components::indicator::Indicator;
use crate::domain::OrderKind;
use crate::indicators::{BandSide, TrendBand};
use crate::strategy::{BarContext, Strategy};

pub const LONG_BUY: &str = "LONG_BUY";
pub const LONG_SELL: &str = "LONG_SELL";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DoubleTrendParams {
    pub fast_period: usize,
    pub fast_multiplier: f64,
    pub slow_period: usize,
    pub slow_multiplier: f64,
    /// Distance above the entry price for the take-profit child order.
    pub take_profit_offset: f64,
    pub size: u32,
}

impl Default for DoubleTrendParams {
    fn default() -> Self {
        Self {
            fast_period: 10,
            fast_multiplier: 3.0,
            slow_period: 30,
            slow_multiplier: 7.0,
            take_profit_offset: 50.0,
            size: 1,
        }
    }
}

#[derive(Debug, Clone)]
pub struct DoubleTrend {
    params: DoubleTrendParams,
    fast_upper: String,
    fast_lower: String,
    slow_lower: String,
}

impl DoubleTrend {
    pub fn new(params: DoubleTrendParams) -> Self {
        Self {
            fast_upper: TrendBand::column(params.fast_period, params.fast_multiplier, BandSide::Upper),
            fast_lower: TrendBand::column(params.fast_period, params.fast_multiplier, BandSide::Lower),
            slow_lower: TrendBand::column(params.slow_period, params.slow_multiplier, BandSide::Lower),
            params,
        }
    }

    pub fn params(&self) -> &DoubleTrendParams {
        &self.params
    }

    fn wants_entry(&self, ctx: &BarContext<'_>) -> Option<f64> {
        let prev_close = ctx.prev_bar()?.close;
        let prev_fast_upper = ctx.prev_value(&self.fast_upper)?;
        let prev_slow_lower = ctx.prev_value(&self.slow_lower)?;
        let fast_lower = ctx.value(&self.fast_lower)?;
        let slow_lower = ctx.value(&self.slow_lower)?;
        let open = ctx.bar().open;

        let setup = prev_close <= prev_fast_upper && prev_close > prev_slow_lower;
        let confirmed = open > fast_lower && open > slow_lower;
        (setup && confirmed).then_some(prev_fast_upper)
    }
}

impl Default for DoubleTrend {
    fn default() -> Self {
        Self::new(DoubleTrendParams::default())
    }
}

impl Strategy for DoubleTrend {
    fn name(&self) -> &str {
        "double_trend"
    }

    fn indicators(&self) -> Vec<Box<dyn Indicator>> {
        let p = &self.params;
        vec![
            Box::new(TrendBand::upper(p.fast_period, p.fast_multiplier)),
            Box::new(TrendBand::lower(p.fast_period, p.fast_multiplier)),
            Box::new(TrendBand::lower(p.slow_period, p.slow_multiplier)),
        ]
    }

    fn on_bar(&mut self, ctx: &BarContext<'_>, broker: &mut dyn Broker) -> Result<(), BrokerError> {
        let position = broker.get_positions();

        if position.is_flat() {
            let Some(price) = self.wants_entry(ctx) else {
                return Ok(());
            };
            broker.cancel_all_orders()?;
            let kind = OrderKind::LimitBuy {
                price,
                take_profit: Some(price + self.params.take_profit_offset),
            };
            let id = broker.create_order(NewOrder::new(
                self.name(),
                LONG_BUY,
                kind,
                self.params.size,
            ))?;
            tracing::debug!(bar = ctx.bar_index, %id, price, "entry placed");
        } else if position.is_long() && ctx.value(&self.fast_lower).is_none() {
            broker.cancel_all_orders()?;
            let size = u32::try_from(position.size).unwrap_or(u32::MAX);
            let id = broker.create_order(NewOrder::new(
                self.name(),
                LONG_SELL,
                OrderKind::MarketSell,
                size,
            ))?;
            tracing::debug!(bar = ctx.bar_index, %id, size, "exit placed");
        }
        Ok(())
    }
}

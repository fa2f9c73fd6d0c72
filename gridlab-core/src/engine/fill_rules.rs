//! Fill rules: whether, and at what price, a resting order executes against a
//! bar, plus the forced end-of-session close.
//!
//! Orders are evaluated in a fixed kind order (limit buy, limit sell and
//! take-profit, market buy, market sell, stop-loss) and by insertion order
//! within a kind. The forced close runs last. Orders created while a bar is
//! processed, such as take-profit children, are first eligible on the next bar.

use crate::domain::{Bar, Fill, FillTag, Order, OrderIdGen, OrderKind, OrderSide};
use crate::engine::books::Books;
use crate::engine::error::SimError;
use chrono::NaiveTime;

/// Signal label for take-profit children spawned by a filled limit buy.
pub const TAKE_PROFIT_SIGNAL: &str = "TAKE_PROFIT";

/// Signal label for the forced end-of-session close.
pub const MARKET_STOP_SIGNAL: &str = "MARKET_STOP";

/// Default forced-close time of day.
pub fn default_forced_close() -> NaiveTime {
    NaiveTime::from_hms_opt(23, 45, 0).unwrap_or(NaiveTime::MIN)
}

/// Price at which `kind` would execute against `bar`, if it executes at all.
pub fn fill_price(kind: &OrderKind, bar: &Bar) -> Option<f64> {
    match kind {
        OrderKind::LimitBuy { price, .. }
        | OrderKind::LimitSell { price }
        | OrderKind::LongTakeProfit { price } => bar.spans(*price).then_some(*price),
        OrderKind::MarketBuy => Some(bar.open),
        OrderKind::MarketSell => Some(bar.close),
        OrderKind::LongStopLoss { price } => {
            if bar.low > *price {
                None
            } else if *price <= bar.high {
                Some(*price)
            } else {
                // gapped down through the stop
                Some(bar.open)
            }
        }
    }
}

fn tag_for(kind: &OrderKind) -> FillTag {
    match kind {
        OrderKind::LimitBuy { .. } | OrderKind::MarketBuy => FillTag::Buy,
        OrderKind::LongStopLoss { .. } => FillTag::StopLoss,
        OrderKind::LimitSell { .. } | OrderKind::MarketSell | OrderKind::LongTakeProfit { .. } => {
            FillTag::Sell
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct FillRules {
    /// Time of day at which an open long is liquidated at the bar open.
    /// `None` disables the forced close.
    pub forced_close_at: Option<NaiveTime>,
}

impl Default for FillRules {
    fn default() -> Self {
        Self {
            forced_close_at: Some(default_forced_close()),
        }
    }
}

impl FillRules {
    /// Process every resting order against one bar, then the forced close.
    /// Returns the number of fills booked.
    pub fn apply_bar(
        &self,
        bar_index: usize,
        bar: &Bar,
        books: &mut Books<'_>,
        ids: &mut OrderIdGen,
    ) -> Result<usize, SimError> {
        let mut eligible: Vec<Order> = books.orders.list().to_vec();
        eligible.sort_by_key(|o| o.kind.priority());

        let mut fills = 0;
        for order in eligible {
            if books.orders.get(order.id).is_none() {
                continue;
            }
            let Some(price) = fill_price(&order.kind, bar) else {
                continue;
            };

            let quantity = match order.kind {
                OrderKind::LongTakeProfit { .. } | OrderKind::LongStopLoss { .. } => {
                    let held = books.ledger.size();
                    if held <= 0 {
                        tracing::debug!(id = %order.id, "long exit with no long position dropped");
                        books.orders.delete(order.id)?;
                        continue;
                    }
                    order.size.min(u32::try_from(held).unwrap_or(u32::MAX))
                }
                _ => order.size,
            };

            let order = books.orders.delete(order.id)?;
            let fill = Fill {
                bar_index,
                timestamp: bar.timestamp,
                order_id: Some(order.id),
                signal: order.signal.clone(),
                side: order.side(),
                tag: tag_for(&order.kind),
                price,
                quantity,
                commission: books.account.commission(price, quantity),
            };
            books.book_fill(fill)?;
            fills += 1;

            if let OrderKind::LimitBuy {
                take_profit: Some(target),
                ..
            } = order.kind
            {
                let child = Order::new(
                    ids.next_at(bar.timestamp),
                    order.strategy.clone(),
                    TAKE_PROFIT_SIGNAL,
                    OrderKind::LimitSell { price: target },
                    order.size,
                )?;
                books.orders.create(child)?;
            }
        }

        if self.forced_close(bar_index, bar, books)? {
            fills += 1;
        }
        Ok(fills)
    }

    fn forced_close(
        &self,
        bar_index: usize,
        bar: &Bar,
        books: &mut Books<'_>,
    ) -> Result<bool, SimError> {
        let Some(cutoff) = self.forced_close_at else {
            return Ok(false);
        };
        let size = books.ledger.size();
        if bar.time_of_day() != cutoff || size <= 0 {
            return Ok(false);
        }

        let quantity = u32::try_from(size).map_err(|_| SimError::PositionTooLarge(size))?;
        let fill = Fill {
            bar_index,
            timestamp: bar.timestamp,
            order_id: None,
            signal: MARKET_STOP_SIGNAL.to_string(),
            side: OrderSide::Sell,
            tag: FillTag::ScheduledClose,
            price: bar.open,
            quantity,
            commission: books.account.commission(bar.open, quantity),
        };
        books.book_fill(fill)?;
        books.clear_orders("session close");
        Ok(true)
    }
}

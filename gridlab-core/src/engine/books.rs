//! Fill booking: applies a fill to the ledger, account and trade log in one
//! step so the three never disagree.

use crate::domain::{Fill, OrderSide};
use crate::engine::accounting::Account;
use crate::engine::error::SimError;
use crate::engine::ledger::PositionLedger;
use crate::engine::order_store::OrderStore;
use crate::engine::trade_log::TradeLog;

/// Mutable run state borrowed for the duration of a replay.
///
/// The ledger and store are owned by the caller; a fresh pair per run keeps
/// runs reproducible.
pub struct Books<'a> {
    pub ledger: &'a mut PositionLedger,
    pub orders: &'a mut OrderStore,
    pub account: &'a mut Account,
    pub log: &'a mut TradeLog,
    pub allow_short: bool,
}

impl<'a> Books<'a> {
    pub fn new(
        ledger: &'a mut PositionLedger,
        orders: &'a mut OrderStore,
        account: &'a mut Account,
        log: &'a mut TradeLog,
    ) -> Self {
        Self {
            ledger,
            orders,
            account,
            log,
            allow_short: false,
        }
    }

    pub fn allow_short(mut self, allow: bool) -> Self {
        self.allow_short = allow;
        self
    }

    /// Book one fill. Returns the realized trade profit if the fill
    /// returned the position to flat.
    pub fn book_fill(&mut self, fill: Fill) -> Result<Option<f64>, SimError> {
        let before = self.ledger.size();

        if fill.side == OrderSide::Sell && !self.allow_short {
            let after = before - i64::from(fill.quantity);
            if after < 0 {
                return Err(SimError::NegativePosition {
                    bar_index: fill.bar_index,
                    size: after,
                    quantity: fill.quantity,
                });
            }
        }

        let position = match fill.side {
            OrderSide::Buy => self.ledger.increase(fill.quantity, fill.price)?,
            OrderSide::Sell => self.ledger.decrease(fill.quantity, fill.price)?,
        };

        if before == 0 {
            self.account.open_trade();
        }
        let balance = self.account.apply_fill(&fill);
        let trade_profit = if position.is_flat() {
            self.account.close_trade()
        } else {
            None
        };

        tracing::debug!(
            bar = fill.bar_index,
            signal = %fill.signal,
            side = ?fill.side,
            price = fill.price,
            quantity = fill.quantity,
            position = position.size,
            balance,
            "fill"
        );

        self.log.record(fill, balance, position.size, trade_profit);
        Ok(trade_profit)
    }

    /// Drop every resting order, logging how many went.
    pub fn clear_orders(&mut self, reason: &str) {
        let dropped = self.orders.clear();
        if dropped > 0 {
            tracing::debug!(dropped, reason, "orders cleared");
        }
    }
}

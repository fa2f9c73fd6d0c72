//! Grid execution engine: replays scheduled events against the ledger and
//! order store in a single forward pass.
//!
//! A trade opens with one lot on a `Buy` event. While it is open, `Improve`
//! events may unwind an older lot at a small margin over its basis and may add
//! a lot at the best-price watermark. Entries and unwinds go through the order
//! store as one-shot orders. Exit events close every lot at their reference
//! price whatever that level is, so a run always ends flat.

use crate::components::indicator::IndicatorValues;
use crate::domain::{Bar, Fill, FillTag, Order, OrderIdGen, OrderKind, OrderSide};
use crate::engine::accounting::Account;
use crate::engine::books::Books;
use crate::engine::error::SimError;
use crate::engine::ledger::PositionLedger;
use crate::engine::order_store::OrderStore;
use crate::engine::scheduler::{schedule_events, Event, EventKind};
use crate::engine::state::{GridConfig, RunResult};
use crate::engine::trade_log::TradeLog;

pub const GRID_STRATEGY: &str = "price_channel_grid";

/// Signal labels written to the trade log.
pub mod signals {
    pub const LONG_BUY: &str = "LONG_BUY";
    pub const LONG_ADD: &str = "LONG_ADD";
    pub const LONG_REDUCE: &str = "LONG_REDUCE";
    pub const LONG_SELL: &str = "LONG_SELL";
    pub const STOP_LOSS: &str = "STOP_LOSS";
    pub const CLOSE_TIME: &str = "CLOSE_TIME";
    pub const CLOSE_END: &str = "CLOSE_END";
}

/// One open unit of the position. `basis` is entry price plus commission.
#[derive(Debug, Clone, Copy, PartialEq)]
struct Lot {
    basis: f64,
}

/// Per-run state carried across events.
#[derive(Debug, Default)]
struct GridState {
    lots: Vec<Lot>,
    watermark: Option<f64>,
    last_handled_bar: Option<usize>,
}

#[derive(Debug, Clone, Default)]
pub struct GridEngine {
    config: GridConfig,
}

impl GridEngine {
    pub fn new(config: GridConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &GridConfig {
        &self.config
    }

    /// Run the grid over `bars`. The caller supplies a fresh ledger and store
    /// and can inspect both afterwards.
    pub fn run(
        &self,
        bars: &[Bar],
        indicators: &IndicatorValues,
        ledger: &mut PositionLedger,
        orders: &mut OrderStore,
    ) -> Result<RunResult, SimError> {
        let events = schedule_events(bars, indicators, &self.config.columns, &self.config.session)?;

        let mut account = Account::new(self.config.commission_rate);
        let mut log = TradeLog::new();
        let mut ids = OrderIdGen::new();
        let mut state = GridState::default();
        let mut handled = 0;

        {
            let mut books = Books::new(ledger, orders, &mut account, &mut log);
            for event in &events {
                let bar = &bars[event.bar_index];
                if event.kind == EventKind::Improve
                    && state.last_handled_bar == Some(event.bar_index)
                {
                    continue;
                }
                let acted = self.handle(event, bar, &mut state, &mut books, &mut ids)?;
                if acted {
                    state.last_handled_bar = Some(event.bar_index);
                    handled += 1;
                }
            }
        }

        let final_position = ledger.get();
        if !final_position.is_flat() {
            return Err(SimError::NotFlatAtEnd(final_position.size));
        }

        let mut result = RunResult::from_parts(log, &account, final_position, bars.len());
        result.events_scheduled = events.len();
        result.events_handled = handled;

        tracing::info!(
            bars = result.bar_count,
            events = result.events_scheduled,
            fills = result.fill_count(),
            trades = result.trade_count(),
            balance = result.final_balance,
            "grid run complete"
        );
        Ok(result)
    }

    fn handle(
        &self,
        event: &Event,
        bar: &Bar,
        state: &mut GridState,
        books: &mut Books<'_>,
        ids: &mut OrderIdGen,
    ) -> Result<bool, SimError> {
        let long = books.ledger.size() > 0;
        match (event.kind, event.reference_price) {
            (EventKind::Buy, Some(price)) if books.ledger.size() == 0 => {
                if !is_entry_price(price) {
                    tracing::warn!(bar = event.bar_index, price, "entry level not positive, skipped");
                    return Ok(false);
                }
                self.buy_lot(event.bar_index, bar, price, signals::LONG_BUY, state, books, ids)?;
                state.watermark = Some(bar.low);
                Ok(true)
            }
            (EventKind::Improve, _) if long => self.improve(event.bar_index, bar, state, books, ids),
            (kind, Some(price)) if long && kind != EventKind::Buy && kind != EventKind::Improve => {
                let (signal, tag) = match kind {
                    EventKind::StopLoss => (signals::STOP_LOSS, FillTag::StopLoss),
                    EventKind::CloseTime => (signals::CLOSE_TIME, FillTag::ScheduledClose),
                    EventKind::CloseEnd => (signals::CLOSE_END, FillTag::EndClose),
                    _ => (signals::LONG_SELL, FillTag::Sell),
                };
                self.close_all(event.bar_index, bar, price, signal, tag, state, books)?;
                Ok(true)
            }
            _ => Ok(false),
        }
    }

    /// Unwind one older lot at a margin, then add a lot at the watermark.
    fn improve(
        &self,
        bar_index: usize,
        bar: &Bar,
        state: &mut GridState,
        books: &mut Books<'_>,
        ids: &mut OrderIdGen,
    ) -> Result<bool, SimError> {
        let mut acted = false;

        if state.lots.len() > 1 {
            let older = &state.lots[..state.lots.len() - 1];
            let margin = self.config.improve_margin;
            let hit = older
                .iter()
                .map(|lot| lot.basis * (1.0 + margin))
                .position(|target| bar.spans(target));
            if let Some(pos) = hit {
                let target = state.lots[pos].basis * (1.0 + margin);
                let order = self.place(
                    ids,
                    bar,
                    signals::LONG_REDUCE,
                    OrderKind::LimitSell { price: target },
                    1,
                    books,
                )?;
                self.execute(bar_index, bar, order, target, FillTag::Sell, books)?;
                state.lots.remove(pos);
                acted = true;
            }
        }

        if let Some(watermark) = state
            .watermark
            .filter(|w| is_entry_price(*w) && bar.spans(*w))
        {
            self.buy_lot(bar_index, bar, watermark, signals::LONG_ADD, state, books, ids)?;
            state.watermark = Some(bar.low);
            acted = true;
        }

        Ok(acted)
    }

    #[allow(clippy::too_many_arguments)]
    fn buy_lot(
        &self,
        bar_index: usize,
        bar: &Bar,
        price: f64,
        signal: &str,
        state: &mut GridState,
        books: &mut Books<'_>,
        ids: &mut OrderIdGen,
    ) -> Result<(), SimError> {
        let order = self.place(
            ids,
            bar,
            signal,
            OrderKind::LimitBuy {
                price,
                take_profit: None,
            },
            1,
            books,
        )?;
        let commission = books.account.commission(price, 1);
        self.execute(bar_index, bar, order, price, FillTag::Buy, books)?;
        state.lots.push(Lot {
            basis: price + commission,
        });
        Ok(())
    }

    /// Sell the whole position at `price`. Booked directly, without an
    /// order record, so any finite level is accepted.
    #[allow(clippy::too_many_arguments)]
    fn close_all(
        &self,
        bar_index: usize,
        bar: &Bar,
        price: f64,
        signal: &str,
        tag: FillTag,
        state: &mut GridState,
        books: &mut Books<'_>,
    ) -> Result<(), SimError> {
        let size = books.ledger.size();
        let quantity = u32::try_from(size).map_err(|_| SimError::PositionTooLarge(size))?;
        let fill = Fill {
            bar_index,
            timestamp: bar.timestamp,
            order_id: None,
            signal: signal.to_string(),
            side: OrderSide::Sell,
            tag,
            price,
            quantity,
            commission: books.account.commission(price, quantity),
        };
        books.book_fill(fill)?;
        books.clear_orders("position closed");
        state.lots.clear();
        Ok(())
    }

    /// Create a one-shot order in the store.
    fn place(
        &self,
        ids: &mut OrderIdGen,
        bar: &Bar,
        signal: &str,
        kind: OrderKind,
        size: u32,
        books: &mut Books<'_>,
    ) -> Result<Order, SimError> {
        let order = Order::new(ids.next_at(bar.timestamp), GRID_STRATEGY, signal, kind, size)?;
        books.orders.create(order.clone())?;
        Ok(order)
    }

    /// Take the order out of the store and book its fill at `price`.
    fn execute(
        &self,
        bar_index: usize,
        bar: &Bar,
        order: Order,
        price: f64,
        tag: FillTag,
        books: &mut Books<'_>,
    ) -> Result<(), SimError> {
        books.orders.delete(order.id)?;
        let side: OrderSide = order.side();
        let fill = Fill {
            bar_index,
            timestamp: bar.timestamp,
            order_id: Some(order.id),
            signal: order.signal,
            side,
            tag,
            price,
            quantity: order.size,
            commission: books.account.commission(price, order.size),
        };
        books.book_fill(fill)?;
        Ok(())
    }
}

/// Entries and adds must be valid limit prices.
fn is_entry_price(price: f64) -> bool {
    price.is_finite() && price > 0.0
}

use crate::broker::{Broker, BrokerError, NewOrder};
use crate::domain::{Bar, Fill, FillTag, Order, OrderId, OrderIdGen, OrderSide, Position};
use crate::engine::{
    Account, Books, FillRules, OrderSlotPolicy, OrderStore, PositionLedger, RunResult, SimError,
    TradeLog, DEFAULT_COMMISSION_RATE,
};
use chrono::{NaiveDateTime, NaiveTime};
use serde::{Deserialize, Serialize};

/// Signal label for the end-of-data close.
pub const CLOSE_END_SIGNAL: &str = "CLOSE_END";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SimulatedBrokerConfig {
    pub commission_rate: f64,
    pub slot_policy: OrderSlotPolicy,
    /// Time of day at which an open long is sold at the bar open.
    pub forced_close_at: Option<NaiveTime>,
    /// Permit sells that take the position below zero.
    pub allow_short: bool,
}

impl Default for SimulatedBrokerConfig {
    fn default() -> Self {
        Self {
            commission_rate: DEFAULT_COMMISSION_RATE,
            slot_policy: OrderSlotPolicy::Accumulate,
            forced_close_at: FillRules::default().forced_close_at,
            allow_short: false,
        }
    }
}

/// In-memory broker that fills orders against historical bars.
///
/// Orders are matched only when [`SimulatedBroker::process_bar`] is called;
/// anything placed in between waits for the next bar.
pub struct SimulatedBroker {
    ledger: PositionLedger,
    orders: OrderStore,
    account: Account,
    log: TradeLog,
    ids: OrderIdGen,
    rules: FillRules,
    slot_policy: OrderSlotPolicy,
    allow_short: bool,
    clock: NaiveDateTime,
    bars_seen: usize,
}

impl SimulatedBroker {
    pub fn new(config: SimulatedBrokerConfig) -> Self {
        Self {
            ledger: PositionLedger::new(),
            orders: OrderStore::new(),
            account: Account::new(config.commission_rate),
            log: TradeLog::new(),
            ids: OrderIdGen::new(),
            rules: FillRules {
                forced_close_at: config.forced_close_at,
            },
            slot_policy: config.slot_policy,
            allow_short: config.allow_short,
            clock: NaiveDateTime::MIN,
            bars_seen: 0,
        }
    }

    fn books(&mut self) -> Books<'_> {
        Books::new(
            &mut self.ledger,
            &mut self.orders,
            &mut self.account,
            &mut self.log,
        )
        .allow_short(self.allow_short)
    }

    /// Match resting orders against `bar`. Returns the number of fills.
    pub fn process_bar(&mut self, bar_index: usize, bar: &Bar) -> Result<usize, SimError> {
        self.clock = bar.timestamp;
        self.bars_seen = self.bars_seen.max(bar_index + 1);
        let mut books = Books::new(
            &mut self.ledger,
            &mut self.orders,
            &mut self.account,
            &mut self.log,
        )
        .allow_short(self.allow_short);
        self.rules.apply_bar(bar_index, bar, &mut books, &mut self.ids)
    }

    /// Flatten any open position at the bar close and drop resting orders.
    /// Returns the realized trade profit if a position was closed.
    pub fn close_out(&mut self, bar_index: usize, bar: &Bar) -> Result<Option<f64>, SimError> {
        let size = self.ledger.size();
        let mut books = self.books();
        books.clear_orders("end of data");
        if size == 0 {
            return Ok(None);
        }

        let quantity = u32::try_from(size.unsigned_abs())
            .map_err(|_| SimError::PositionTooLarge(size))?;
        let side = if size > 0 {
            OrderSide::Sell
        } else {
            OrderSide::Buy
        };
        let fill = Fill {
            bar_index,
            timestamp: bar.timestamp,
            order_id: None,
            signal: CLOSE_END_SIGNAL.to_string(),
            side,
            tag: FillTag::EndClose,
            price: bar.close,
            quantity,
            commission: books.account.commission(bar.close, quantity),
        };
        books.book_fill(fill)
    }

    pub fn trade_log(&self) -> &TradeLog {
        &self.log
    }

    /// Finish the run, returning its result.
    pub fn into_result(self) -> RunResult {
        let position = self.ledger.get();
        RunResult::from_parts(self.log, &self.account, position, self.bars_seen)
    }
}

impl Broker for SimulatedBroker {
    fn get_positions(&self) -> Position {
        self.ledger.get()
    }

    fn get_orders(&self) -> Vec<Order> {
        self.orders.list().to_vec()
    }

    fn create_order(&mut self, request: NewOrder) -> Result<OrderId, BrokerError> {
        let order = Order::new(
            self.ids.next_at(self.clock),
            request.strategy,
            request.signal,
            request.kind,
            request.size,
        )?;
        if self.slot_policy == OrderSlotPolicy::SingleSlot {
            self.orders.clear();
        }
        let id = order.id;
        self.orders.create(order)?;
        Ok(id)
    }

    fn cancel_order(&mut self, id: OrderId) -> Result<(), BrokerError> {
        self.orders.delete(id)?;
        tracing::debug!(%id, "order cancelled");
        Ok(())
    }

    fn cancel_all_orders(&mut self) -> Result<usize, BrokerError> {
        Ok(self.orders.clear())
    }
}

//! Simulation engine: position ledger, order store, fill rules, event
//! scheduler, grid execution and the trade log.
//!
//! Two replay paths share the same books:
//!
//! 1. Grid replay: `schedule_events` derives events from bars and indicator
//!    columns, and `GridEngine` executes them.
//! 2. Order replay: resting orders from a strategy are matched bar by bar by
//!    `FillRules` (see `broker::replay_orders`).

pub mod accounting;
pub mod books;
pub mod error;
pub mod fill_rules;
pub mod grid;
pub mod ledger;
pub mod order_store;
pub mod precompute;
pub mod scheduler;
pub mod state;
pub mod trade_log;

pub use accounting::Account;
pub use books::Books;
pub use error::SimError;
pub use fill_rules::{fill_price, FillRules, MARKET_STOP_SIGNAL, TAKE_PROFIT_SIGNAL};
pub use grid::{signals, GridEngine};
pub use ledger::{LedgerError, PositionLedger};
pub use order_store::{OrderSlotPolicy, OrderStore, OrderStoreError};
pub use precompute::{compute_warmup, precompute_indicators};
pub use scheduler::{schedule_events, Event, EventKind};
pub use state::{
    validate_bars, ColumnNames, GridConfig, RunResult, SessionConfig, DEFAULT_COMMISSION_RATE,
    DEFAULT_IMPROVE_MARGIN,
};
pub use trade_log::{TradeLog, TradeLogEntry};

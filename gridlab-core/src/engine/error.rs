use crate::domain::OrderError;
use crate::engine::ledger::LedgerError;
use crate::engine::order_store::OrderStoreError;
use thiserror::Error;

/// Fatal simulation errors. A run that hits one of these stops immediately.
#[derive(Debug, Error, PartialEq)]
pub enum SimError {
    #[error(transparent)]
    Order(#[from] OrderError),

    #[error(transparent)]
    OrderStore(#[from] OrderStoreError),

    #[error(transparent)]
    Ledger(#[from] LedgerError),

    #[error("bar {bar_index}: sell of {quantity} would take position {size} negative")]
    NegativePosition {
        bar_index: usize,
        size: i64,
        quantity: u32,
    },

    #[error("position size {0} does not fit an order quantity")]
    PositionTooLarge(i64),

    #[error("position not flat after the final bar: size {0}")]
    NotFlatAtEnd(i64),

    #[error("column '{0}' not present in input")]
    MissingColumn(String),

    #[error("column '{column}' has {actual} values for {expected} bars")]
    ColumnLength {
        column: String,
        expected: usize,
        actual: usize,
    },

    #[error("no bars to simulate")]
    EmptyInput,

    #[error("bar {index} is not strictly after the previous bar")]
    UnorderedBars { index: usize },
}

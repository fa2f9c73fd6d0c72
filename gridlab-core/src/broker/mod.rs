//! Broker capability interface and its simulated implementation.
//!
//! Strategies talk to a [`Broker`] only, so the same strategy code can run
//! against the simulator or a live adapter chosen at construction time.

pub mod replay;
pub mod simulated;

use crate::domain::{Order, OrderError, OrderId, OrderKind, Position};
use crate::engine::{OrderStoreError, SimError};
use thiserror::Error;

pub use replay::replay_orders;
pub use simulated::{SimulatedBroker, SimulatedBrokerConfig};

#[derive(Debug, Error, PartialEq)]
pub enum BrokerError {
    #[error(transparent)]
    Order(#[from] OrderError),

    #[error(transparent)]
    OrderStore(#[from] OrderStoreError),

    #[error(transparent)]
    Simulation(#[from] SimError),
}

/// What a strategy asks the broker to place. The broker assigns the id.
#[derive(Debug, Clone, PartialEq)]
pub struct NewOrder {
    pub strategy: String,
    pub signal: String,
    pub kind: OrderKind,
    pub size: u32,
}

impl NewOrder {
    pub fn new(
        strategy: impl Into<String>,
        signal: impl Into<String>,
        kind: OrderKind,
        size: u32,
    ) -> Self {
        Self {
            strategy: strategy.into(),
            signal: signal.into(),
            kind,
            size,
        }
    }
}

/// Order routing for one instrument.
pub trait Broker {
    /// Current net position.
    fn get_positions(&self) -> Position;

    /// Resting orders in placement order.
    fn get_orders(&self) -> Vec<Order>;

    /// Validate and place an order, returning its id.
    fn create_order(&mut self, order: NewOrder) -> Result<OrderId, BrokerError>;

    /// Cancel one resting order. Unknown ids are an error.
    fn cancel_order(&mut self, id: OrderId) -> Result<(), BrokerError>;

    /// Cancel every resting order, returning how many were cancelled.
    fn cancel_all_orders(&mut self) -> Result<usize, BrokerError>;
}

//! Order store: pending orders for one run.
//!
//! The store owns its collection. `create`, `delete` and `clear` are the only
//! mutators. Orders accumulate in insertion order; a single-slot policy is
//! layered on top by the broker (see [`OrderSlotPolicy`]).

use crate::domain::{Order, OrderId};
use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Error, PartialEq)]
pub enum OrderStoreError {
    #[error("order {0} not found")]
    OrderNotFound(OrderId),

    #[error("order {0} already exists")]
    DuplicateOrderId(OrderId),
}

/// How a broker places a new order relative to the ones already resting.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OrderSlotPolicy {
    /// Orders accumulate.
    #[default]
    Accumulate,
    /// Placing an order replaces every resting order.
    SingleSlot,
}

#[derive(Debug, Clone, Default)]
pub struct OrderStore {
    orders: Vec<Order>,
}

impl OrderStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append an order. Ids must be unique within the store.
    pub fn create(&mut self, order: Order) -> Result<(), OrderStoreError> {
        if self.get(order.id).is_some() {
            return Err(OrderStoreError::DuplicateOrderId(order.id));
        }
        tracing::debug!(id = %order.id, kind = %order.kind.tag(), size = order.size, "order created");
        self.orders.push(order);
        Ok(())
    }

    pub fn list(&self) -> &[Order] {
        &self.orders
    }

    pub fn get(&self, id: OrderId) -> Option<&Order> {
        self.orders.iter().find(|o| o.id == id)
    }

    /// Remove an order and return it. Deleting an unknown id is an error.
    pub fn delete(&mut self, id: OrderId) -> Result<Order, OrderStoreError> {
        let pos = self
            .orders
            .iter()
            .position(|o| o.id == id)
            .ok_or(OrderStoreError::OrderNotFound(id))?;
        Ok(self.orders.remove(pos))
    }

    /// Remove every order, returning how many were dropped.
    pub fn clear(&mut self) -> usize {
        let dropped = self.orders.len();
        self.orders.clear();
        dropped
    }

    pub fn len(&self) -> usize {
        self.orders.len()
    }

    pub fn is_empty(&self) -> bool {
        self.orders.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::OrderKind;

    fn order(id: u64) -> Order {
        Order::new(
            OrderId(id),
            "test",
            "LONG_BUY",
            OrderKind::LimitBuy {
                price: 100.0,
                take_profit: None,
            },
            1,
        )
        .unwrap()
    }

    #[test]
    fn create_appends_in_order() {
        let mut store = OrderStore::new();
        store.create(order(2)).unwrap();
        store.create(order(1)).unwrap();
        let ids: Vec<u64> = store.list().iter().map(|o| o.id.0).collect();
        assert_eq!(ids, vec![2, 1]);
    }

    #[test]
    fn duplicate_id_is_rejected() {
        let mut store = OrderStore::new();
        store.create(order(1)).unwrap();
        assert_eq!(
            store.create(order(1)),
            Err(OrderStoreError::DuplicateOrderId(OrderId(1)))
        );
        assert_eq!(store.len(), 1);
    }

    #[test]
    fn delete_is_not_idempotent() {
        let mut store = OrderStore::new();
        store.create(order(1)).unwrap();
        store.create(order(2)).unwrap();
        let removed = store.delete(OrderId(1)).unwrap();
        assert_eq!(removed.id, OrderId(1));
        assert_eq!(
            store.delete(OrderId(1)),
            Err(OrderStoreError::OrderNotFound(OrderId(1)))
        );
        assert!(store.get(OrderId(1)).is_none());
        assert_eq!(store.len(), 1);
    }

    #[test]
    fn clear_empties_store() {
        let mut store = OrderStore::new();
        store.create(order(1)).unwrap();
        store.create(order(2)).unwrap();
        assert_eq!(store.clear(), 2);
        assert!(store.is_empty());
        assert_eq!(store.clear(), 0);
    }
}

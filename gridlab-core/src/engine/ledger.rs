//! Position ledger: net size and volume-weighted average entry price.
//!
//! `increase` and `decrease` are mirror images. Reducing a position without
//! flattening it leaves the average price untouched; only adding to the same
//! side re-weights it. Reducing a short through `increase` likewise keeps the
//! short's average.

use crate::domain::Position;
use thiserror::Error;

#[derive(Debug, Error, PartialEq)]
pub enum LedgerError {
    #[error("quantity must be at least 1")]
    ZeroQuantity,

    #[error("fill price must be finite, got {0}")]
    InvalidPrice(f64),
}

/// Net position for one instrument over one run.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PositionLedger {
    position: Position,
}

impl PositionLedger {
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of the current position.
    pub fn get(&self) -> Position {
        self.position
    }

    pub fn size(&self) -> i64 {
        self.position.size
    }

    /// Apply a buy of `quantity` at `price`.
    pub fn increase(&mut self, quantity: u32, price: f64) -> Result<Position, LedgerError> {
        check(quantity, price)?;
        let q = i64::from(quantity);
        let p = &mut self.position;

        if p.size == 0 {
            p.size = q;
            p.average_price = price;
        } else if p.size + q == 0 {
            *p = Position::flat();
        } else if p.size > 0 {
            p.average_price = weighted(p.size, p.average_price, q, price);
            p.size += q;
        } else {
            p.size += q;
        }

        Ok(*p)
    }

    /// Apply a sell of `quantity` at `price`.
    pub fn decrease(&mut self, quantity: u32, price: f64) -> Result<Position, LedgerError> {
        check(quantity, price)?;
        let q = i64::from(quantity);
        let p = &mut self.position;

        if p.size == 0 {
            p.size = -q;
            p.average_price = price;
        } else if p.size - q == 0 {
            *p = Position::flat();
        } else if p.size < 0 {
            p.average_price = weighted(p.size.abs(), p.average_price, q, price);
            p.size -= q;
        } else {
            p.size -= q;
        }

        Ok(*p)
    }
}

fn weighted(held: i64, held_price: f64, added: i64, added_price: f64) -> f64 {
    (held as f64 * held_price + added as f64 * added_price) / (held + added) as f64
}

fn check(quantity: u32, price: f64) -> Result<(), LedgerError> {
    if quantity == 0 {
        return Err(LedgerError::ZeroQuantity);
    }
    if !price.is_finite() {
        return Err(LedgerError::InvalidPrice(price));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn first_buy_sets_size_and_price() {
        let mut ledger = PositionLedger::new();
        let p = ledger.increase(3, 100.0).unwrap();
        assert_eq!(p.size, 3);
        assert_eq!(p.average_price, 100.0);
    }

    #[test]
    fn adding_to_long_reweights() {
        let mut ledger = PositionLedger::new();
        ledger.increase(1, 100.0).unwrap();
        ledger.increase(1, 102.0).unwrap();
        let p = ledger.increase(2, 97.0).unwrap();
        assert_eq!(p.size, 4);
        assert!((p.average_price - 99.0).abs() < 1e-12);
    }

    #[test]
    fn flatten_resets_average() {
        let mut ledger = PositionLedger::new();
        ledger.increase(2, 100.0).unwrap();
        let p = ledger.decrease(2, 110.0).unwrap();
        assert_eq!(p, Position::flat());
    }

    #[test]
    fn reducing_long_keeps_average() {
        let mut ledger = PositionLedger::new();
        ledger.increase(3, 100.0).unwrap();
        let p = ledger.decrease(1, 120.0).unwrap();
        assert_eq!(p.size, 2);
        assert_eq!(p.average_price, 100.0);
    }

    #[test]
    fn short_side_mirrors_long_side() {
        let mut ledger = PositionLedger::new();
        ledger.decrease(1, 100.0).unwrap();
        let p = ledger.decrease(1, 104.0).unwrap();
        assert_eq!(p.size, -2);
        assert!((p.average_price - 102.0).abs() < 1e-12);

        // buying back part of a short keeps the short's average
        let p = ledger.increase(1, 90.0).unwrap();
        assert_eq!(p.size, -1);
        assert!((p.average_price - 102.0).abs() < 1e-12);

        let p = ledger.increase(1, 90.0).unwrap();
        assert_eq!(p, Position::flat());
    }

    #[test]
    fn rejects_zero_quantity_and_bad_price() {
        let mut ledger = PositionLedger::new();
        assert_eq!(ledger.increase(0, 100.0), Err(LedgerError::ZeroQuantity));
        assert!(matches!(
            ledger.decrease(1, f64::NAN),
            Err(LedgerError::InvalidPrice(_))
        ));
        assert!(matches!(
            ledger.increase(1, f64::INFINITY),
            Err(LedgerError::InvalidPrice(_))
        ));
        assert_eq!(ledger.get(), Position::flat());
    }

    #[test]
    fn non_positive_exit_price_still_flattens() {
        let mut ledger = PositionLedger::new();
        ledger.increase(1, 2.0).unwrap();
        let p = ledger.decrease(1, -0.4).unwrap();
        assert_eq!(p, Position::flat());
    }
}

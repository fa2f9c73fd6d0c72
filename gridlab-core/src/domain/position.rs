use serde::{Deserialize, Serialize};

/// Snapshot of the net position for one instrument.
///
/// `size` is signed: positive long, negative short. `average_price` is zero
/// whenever `size` is zero.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Position {
    pub size: i64,
    pub average_price: f64,
}

impl Position {
    pub fn flat() -> Self {
        Self::default()
    }

    pub fn is_flat(&self) -> bool {
        self.size == 0
    }

    pub fn is_long(&self) -> bool {
        self.size > 0
    }

    pub fn is_short(&self) -> bool {
        self.size < 0
    }

    pub fn unrealized_pnl(&self, price: f64) -> f64 {
        (price - self.average_price) * self.size as f64
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn flat_position_has_zero_average() {
        let p = Position::flat();
        assert!(p.is_flat());
        assert_eq!(p.average_price, 0.0);
    }

    #[test]
    fn unrealized_pnl_long_and_short() {
        let long = Position {
            size: 10,
            average_price: 100.0,
        };
        assert!((long.unrealized_pnl(110.0) - 100.0).abs() < 1e-10);
        let short = Position {
            size: -10,
            average_price: 100.0,
        };
        assert!((short.unrealized_pnl(90.0) - 100.0).abs() < 1e-10);
        assert!(short.is_short());
    }
}

use crate::domain::ids::OrderId;
use crate::domain::order::OrderSide;
use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

/// Trade-log column a fill price is written to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum FillTag {
    /// `BUY_PRICE`
    Buy,
    /// `SELL_PRICE`
    Sell,
    /// `SL_PRICE`
    StopLoss,
    /// `CT_PRICE`, the end-of-session close.
    ScheduledClose,
    /// `CE_PRICE`, the end-of-data close.
    EndClose,
}

impl FillTag {
    pub fn column(&self) -> &'static str {
        match self {
            FillTag::Buy => "BUY_PRICE",
            FillTag::Sell => "SELL_PRICE",
            FillTag::StopLoss => "SL_PRICE",
            FillTag::ScheduledClose => "CT_PRICE",
            FillTag::EndClose => "CE_PRICE",
        }
    }
}

/// Fill record
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Fill {
    pub bar_index: usize,
    pub timestamp: NaiveDateTime,
    /// `None` for forced closes that are not backed by a stored order.
    pub order_id: Option<OrderId>,
    pub signal: String,
    pub side: OrderSide,
    pub tag: FillTag,
    pub price: f64,
    pub quantity: u32,
    pub commission: f64,
}

impl Fill {
    pub fn notional(&self) -> f64 {
        self.price * self.quantity as f64
    }

    /// Change in account balance caused by this fill, commission included.
    pub fn balance_delta(&self) -> f64 {
        match self.side {
            OrderSide::Buy => -self.notional() - self.commission,
            OrderSide::Sell => self.notional() - self.commission,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn fill(side: OrderSide, price: f64, quantity: u32, commission: f64) -> Fill {
        Fill {
            bar_index: 0,
            timestamp: NaiveDate::from_ymd_opt(2024, 1, 2)
                .unwrap()
                .and_hms_opt(9, 0, 0)
                .unwrap(),
            order_id: None,
            signal: "LONG_BUY".into(),
            side,
            tag: FillTag::Buy,
            price,
            quantity,
            commission,
        }
    }

    #[test]
    fn buy_delta_is_negative_notional_minus_commission() {
        let f = fill(OrderSide::Buy, 100.0, 2, 0.01);
        assert!((f.balance_delta() + 200.01).abs() < 1e-12);
    }

    #[test]
    fn sell_delta_is_notional_minus_commission() {
        let f = fill(OrderSide::Sell, 105.0, 1, 0.00525);
        assert!((f.balance_delta() - 104.99475).abs() < 1e-12);
    }
}

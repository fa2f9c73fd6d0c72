//! Order records: the tagged order-kind sum type and its validation.

use super::ids::OrderId;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Order direction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum OrderSide {
    Buy,
    Sell,
}

#[derive(Debug, Error, PartialEq)]
pub enum OrderError {
    #[error("unknown order kind: {0}")]
    UnknownOrderKind(String),

    #[error("{kind} requires a price")]
    MissingPrice { kind: OrderKindTag },

    #[error("invalid {field}: {value} (must be finite and positive)")]
    InvalidPrice { field: &'static str, value: f64 },

    #[error("order size must be at least 1")]
    ZeroSize,
}

/// What kind of order and its price parameters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "order", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum OrderKind {
    /// Fill when the bar range contains `price`; optionally spawns a take-profit sell.
    LimitBuy {
        price: f64,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        take_profit: Option<f64>,
    },
    /// Fill when the bar range contains `price`.
    LimitSell { price: f64 },
    /// Fill at the bar open.
    MarketBuy,
    /// Fill at the bar close.
    MarketSell,
    /// Sell limit closing a long at a profit target.
    LongTakeProfit { price: f64 },
    /// Sell stop closing a long when price trades down through `price`.
    LongStopLoss { price: f64 },
}

/// Payload-free discriminant of [`OrderKind`], with the textual labels used
/// by order records.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum OrderKindTag {
    LimitBuy,
    LimitSell,
    MarketBuy,
    MarketSell,
    LongTakeProfit,
    LongStopLoss,
}

impl OrderKindTag {
    pub const ALL: [OrderKindTag; 6] = [
        OrderKindTag::LimitBuy,
        OrderKindTag::LimitSell,
        OrderKindTag::MarketBuy,
        OrderKindTag::MarketSell,
        OrderKindTag::LongTakeProfit,
        OrderKindTag::LongStopLoss,
    ];

    pub fn label(&self) -> &'static str {
        match self {
            OrderKindTag::LimitBuy => "LIMIT_BUY",
            OrderKindTag::LimitSell => "LIMIT_SELL",
            OrderKindTag::MarketBuy => "MARKET_BUY",
            OrderKindTag::MarketSell => "MARKET_SELL",
            OrderKindTag::LongTakeProfit => "LONG_TAKE_PROFIT",
            OrderKindTag::LongStopLoss => "LONG_STOP_LOSS",
        }
    }

    pub fn needs_price(&self) -> bool {
        !matches!(self, OrderKindTag::MarketBuy | OrderKindTag::MarketSell)
    }
}

impl fmt::Display for OrderKindTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl FromStr for OrderKindTag {
    type Err = OrderError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim();
        OrderKindTag::ALL
            .into_iter()
            .find(|tag| tag.label().eq_ignore_ascii_case(wanted))
            .ok_or_else(|| OrderError::UnknownOrderKind(s.to_string()))
    }
}

impl OrderKind {
    /// Build a kind from its textual label plus optional price fields.
    pub fn from_label(
        label: &str,
        price: Option<f64>,
        take_profit: Option<f64>,
    ) -> Result<Self, OrderError> {
        let tag: OrderKindTag = label.parse()?;
        let priced = || price.ok_or(OrderError::MissingPrice { kind: tag });
        let kind = match tag {
            OrderKindTag::LimitBuy => OrderKind::LimitBuy {
                price: priced()?,
                take_profit,
            },
            OrderKindTag::LimitSell => OrderKind::LimitSell { price: priced()? },
            OrderKindTag::MarketBuy => OrderKind::MarketBuy,
            OrderKindTag::MarketSell => OrderKind::MarketSell,
            OrderKindTag::LongTakeProfit => OrderKind::LongTakeProfit { price: priced()? },
            OrderKindTag::LongStopLoss => OrderKind::LongStopLoss { price: priced()? },
        };
        Ok(kind)
    }

    pub fn tag(&self) -> OrderKindTag {
        match self {
            OrderKind::LimitBuy { .. } => OrderKindTag::LimitBuy,
            OrderKind::LimitSell { .. } => OrderKindTag::LimitSell,
            OrderKind::MarketBuy => OrderKindTag::MarketBuy,
            OrderKind::MarketSell => OrderKindTag::MarketSell,
            OrderKind::LongTakeProfit { .. } => OrderKindTag::LongTakeProfit,
            OrderKind::LongStopLoss { .. } => OrderKindTag::LongStopLoss,
        }
    }

    pub fn side(&self) -> OrderSide {
        match self {
            OrderKind::LimitBuy { .. } | OrderKind::MarketBuy => OrderSide::Buy,
            _ => OrderSide::Sell,
        }
    }

    /// Resting price, if the kind carries one.
    pub fn price(&self) -> Option<f64> {
        match self {
            OrderKind::LimitBuy { price, .. }
            | OrderKind::LimitSell { price }
            | OrderKind::LongTakeProfit { price }
            | OrderKind::LongStopLoss { price } => Some(*price),
            OrderKind::MarketBuy | OrderKind::MarketSell => None,
        }
    }

    /// Rank used to order fills within one bar. Lower fills first.
    pub fn priority(&self) -> u8 {
        match self {
            OrderKind::LimitBuy { .. } => 0,
            OrderKind::LimitSell { .. } | OrderKind::LongTakeProfit { .. } => 1,
            OrderKind::MarketBuy => 2,
            OrderKind::MarketSell => 3,
            OrderKind::LongStopLoss { .. } => 4,
        }
    }

    fn validate(&self) -> Result<(), OrderError> {
        if let Some(price) = self.price() {
            check_price("price", price)?;
        }
        if let OrderKind::LimitBuy {
            take_profit: Some(tp),
            ..
        } = self
        {
            check_price("take_profit", *tp)?;
        }
        Ok(())
    }
}

fn check_price(field: &'static str, value: f64) -> Result<(), OrderError> {
    if value.is_finite() && value > 0.0 {
        Ok(())
    } else {
        Err(OrderError::InvalidPrice { field, value })
    }
}

/// A pending order record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Order {
    pub id: OrderId,
    /// Name of the strategy that issued the order.
    pub strategy: String,
    /// Signal label carried into the trade log when the order fills.
    pub signal: String,
    #[serde(flatten)]
    pub kind: OrderKind,
    pub size: u32,
}

impl Order {
    /// Validate and build an order. Prices must be finite and positive and
    /// size at least 1.
    pub fn new(
        id: OrderId,
        strategy: impl Into<String>,
        signal: impl Into<String>,
        kind: OrderKind,
        size: u32,
    ) -> Result<Self, OrderError> {
        if size == 0 {
            return Err(OrderError::ZeroSize);
        }
        kind.validate()?;
        Ok(Self {
            id,
            strategy: strategy.into(),
            signal: signal.into(),
            kind,
            size,
        })
    }

    pub fn side(&self) -> OrderSide {
        self.kind.side()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn labels_parse_case_insensitively() {
        assert_eq!("LIMIT_BUY".parse::<OrderKindTag>(), Ok(OrderKindTag::LimitBuy));
        assert_eq!(
            "long_stop_loss".parse::<OrderKindTag>(),
            Ok(OrderKindTag::LongStopLoss)
        );
        for tag in OrderKindTag::ALL {
            assert_eq!(tag.label().parse::<OrderKindTag>(), Ok(tag));
        }
    }

    #[test]
    fn unknown_label_is_rejected() {
        let err = "TRAILING_STOP".parse::<OrderKindTag>().unwrap_err();
        assert_eq!(err, OrderError::UnknownOrderKind("TRAILING_STOP".into()));
        assert!(OrderKind::from_label("ICEBERG", Some(1.0), None).is_err());
    }

    #[test]
    fn from_label_requires_price_for_priced_kinds() {
        let err = OrderKind::from_label("LIMIT_SELL", None, None).unwrap_err();
        assert_eq!(
            err,
            OrderError::MissingPrice {
                kind: OrderKindTag::LimitSell
            }
        );
        assert_eq!(
            OrderKind::from_label("MARKET_BUY", None, None),
            Ok(OrderKind::MarketBuy)
        );
    }

    #[test]
    fn new_rejects_zero_size_and_bad_prices() {
        let id = OrderId(1);
        assert_eq!(
            Order::new(id, "s", "LONG_BUY", OrderKind::MarketBuy, 0).unwrap_err(),
            OrderError::ZeroSize
        );
        for bad in [0.0, -1.0, f64::NAN, f64::INFINITY] {
            let kind = OrderKind::LimitSell { price: bad };
            assert!(Order::new(id, "s", "LONG_SELL", kind, 1).is_err());
        }
        let kind = OrderKind::LimitBuy {
            price: 100.0,
            take_profit: Some(-5.0),
        };
        assert!(matches!(
            Order::new(id, "s", "LONG_BUY", kind, 1),
            Err(OrderError::InvalidPrice {
                field: "take_profit",
                ..
            })
        ));
    }

    #[test]
    fn sides_and_priorities() {
        let buy = OrderKind::LimitBuy {
            price: 1.0,
            take_profit: None,
        };
        assert_eq!(buy.side(), OrderSide::Buy);
        assert_eq!(OrderKind::MarketSell.side(), OrderSide::Sell);
        assert_eq!(OrderKind::LongTakeProfit { price: 2.0 }.side(), OrderSide::Sell);
        assert!(buy.priority() < OrderKind::LimitSell { price: 1.0 }.priority());
        assert_eq!(
            OrderKind::LimitSell { price: 1.0 }.priority(),
            OrderKind::LongTakeProfit { price: 1.0 }.priority()
        );
        assert!(OrderKind::MarketBuy.priority() < OrderKind::MarketSell.priority());
        assert!(OrderKind::MarketSell.priority() < OrderKind::LongStopLoss { price: 1.0 }.priority());
    }

    #[test]
    fn order_serializes_with_kind_label() {
        let order = Order::new(
            OrderId(7),
            "double_trend",
            "LONG_BUY",
            OrderKind::LimitBuy {
                price: 100.0,
                take_profit: Some(101.0),
            },
            2,
        )
        .unwrap();
        let json = serde_json::to_string(&order).unwrap();
        assert!(json.contains("\"order\":\"LIMIT_BUY\""));
        let back: Order = serde_json::from_str(&json).unwrap();
        assert_eq!(back, order);
    }
}

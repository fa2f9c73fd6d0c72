use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Order ID, derived from the issue time in milliseconds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct OrderId(pub u64);

impl fmt::Display for OrderId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<u64> for OrderId {
    fn from(id: u64) -> Self {
        Self(id)
    }
}

/// Issues strictly increasing order IDs from issue timestamps.
///
/// Two orders issued at the same millisecond (or a clock that runs backwards)
/// get `last + 1`, so IDs never repeat within one generator.
#[derive(Debug, Clone, Default)]
pub struct OrderIdGen {
    last: u64,
}

impl OrderIdGen {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn next_at(&mut self, issued_at: NaiveDateTime) -> OrderId {
        let millis = u64::try_from(issued_at.and_utc().timestamp_millis()).unwrap_or(0);
        let id = if millis > self.last {
            millis
        } else {
            self.last + 1
        };
        self.last = id;
        OrderId(id)
    }
}

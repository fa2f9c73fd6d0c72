use crate::domain::Fill;

/// Running balance, commission and per-trade profit for one run.
///
/// The balance starts at zero and moves by each fill's signed delta. A trade
/// spans from the fill that leaves a flat position to the fill that returns
/// it to flat; its profit is the balance change across that span.
#[derive(Debug, Clone)]
pub struct Account {
    commission_rate: f64,
    balance: f64,
    commission_paid: f64,
    trade_baseline: Option<f64>,
    trade_profits: Vec<f64>,
}

impl Account {
    pub fn new(commission_rate: f64) -> Self {
        Self {
            commission_rate,
            balance: 0.0,
            commission_paid: 0.0,
            trade_baseline: None,
            trade_profits: Vec::new(),
        }
    }

    /// Commission for trading `quantity` at `price`.
    pub fn commission(&self, price: f64, quantity: u32) -> f64 {
        price * quantity as f64 * self.commission_rate
    }

    pub fn commission_rate(&self) -> f64 {
        self.commission_rate
    }

    /// Mark the start of a trade at the current balance. No-op if one is open.
    pub fn open_trade(&mut self) {
        if self.trade_baseline.is_none() {
            self.trade_baseline = Some(self.balance);
        }
    }

    /// Apply a fill to the balance, returning the new balance.
    pub fn apply_fill(&mut self, fill: &Fill) -> f64 {
        self.balance += fill.balance_delta();
        self.commission_paid += fill.commission;
        self.balance
    }

    /// Close the open trade, if any, and return its realized profit.
    pub fn close_trade(&mut self) -> Option<f64> {
        let baseline = self.trade_baseline.take()?;
        let profit = self.balance - baseline;
        self.trade_profits.push(profit);
        Some(profit)
    }

    pub fn in_trade(&self) -> bool {
        self.trade_baseline.is_some()
    }

    pub fn balance(&self) -> f64 {
        self.balance
    }

    pub fn commission_paid(&self) -> f64 {
        self.commission_paid
    }

    pub fn trade_profits(&self) -> &[f64] {
        &self.trade_profits
    }

    pub fn winning_trades(&self) -> usize {
        self.trade_profits.iter().filter(|p| **p > 0.0).count()
    }
}

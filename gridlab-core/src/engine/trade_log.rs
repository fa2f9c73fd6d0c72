//! Trade log: one row per bar that saw at least one fill.
//!
//! Writes for the same bar overwrite the price column of the fill's tag and
//! the signal, and accumulate commission. Balance and position always hold the
//! state after the latest fill on that bar. Values are kept at full
//! precision; rounding happens on export.

use crate::domain::{Fill, FillTag};
use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TradeLogEntry {
    pub bar_index: usize,
    pub timestamp: NaiveDateTime,
    pub signal: String,
    pub buy_price: Option<f64>,
    pub sell_price: Option<f64>,
    pub stop_loss_price: Option<f64>,
    pub scheduled_close_price: Option<f64>,
    pub end_close_price: Option<f64>,
    pub commission: f64,
    pub balance: f64,
    pub position: i64,
    pub trade_profit: Option<f64>,
}

impl TradeLogEntry {
    fn empty(bar_index: usize, timestamp: NaiveDateTime) -> Self {
        Self {
            bar_index,
            timestamp,
            signal: String::new(),
            buy_price: None,
            sell_price: None,
            stop_loss_price: None,
            scheduled_close_price: None,
            end_close_price: None,
            commission: 0.0,
            balance: 0.0,
            position: 0,
            trade_profit: None,
        }
    }

    /// Price recorded under a fill tag's column.
    pub fn price(&self, tag: FillTag) -> Option<f64> {
        match tag {
            FillTag::Buy => self.buy_price,
            FillTag::Sell => self.sell_price,
            FillTag::StopLoss => self.stop_loss_price,
            FillTag::ScheduledClose => self.scheduled_close_price,
            FillTag::EndClose => self.end_close_price,
        }
    }

    fn price_slot(&mut self, tag: FillTag) -> &mut Option<f64> {
        match tag {
            FillTag::Buy => &mut self.buy_price,
            FillTag::Sell => &mut self.sell_price,
            FillTag::StopLoss => &mut self.stop_loss_price,
            FillTag::ScheduledClose => &mut self.scheduled_close_price,
            FillTag::EndClose => &mut self.end_close_price,
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct TradeLog {
    entries: BTreeMap<usize, TradeLogEntry>,
    fills: Vec<Fill>,
}

impl TradeLog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a booked fill together with the account state it produced.
    pub fn record(&mut self, fill: Fill, balance: f64, position: i64, trade_profit: Option<f64>) {
        let entry = self
            .entries
            .entry(fill.bar_index)
            .or_insert_with(|| TradeLogEntry::empty(fill.bar_index, fill.timestamp));
        entry.signal.clone_from(&fill.signal);
        *entry.price_slot(fill.tag) = Some(fill.price);
        entry.commission += fill.commission;
        entry.balance = balance;
        entry.position = position;
        if let Some(profit) = trade_profit {
            entry.trade_profit = Some(entry.trade_profit.unwrap_or(0.0) + profit);
        }
        self.fills.push(fill);
    }

    pub fn entry(&self, bar_index: usize) -> Option<&TradeLogEntry> {
        self.entries.get(&bar_index)
    }

    /// Entries in bar order.
    pub fn entries(&self) -> impl Iterator<Item = &TradeLogEntry> {
        self.entries.values()
    }

    /// Every fill in booking order.
    pub fn fills(&self) -> &[Fill] {
        &self.fills
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Balance after the last recorded fill, zero for an empty log.
    pub fn final_balance(&self) -> f64 {
        self.entries
            .values()
            .next_back()
            .map(|e| e.balance)
            .unwrap_or(0.0)
    }
}

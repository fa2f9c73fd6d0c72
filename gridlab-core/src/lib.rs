//! GridLab Core: a bar-driven order-execution simulator.
//!
//! This crate contains:
//! - Domain types (bars, orders, fills, positions)
//! - Position ledger and order store
//! - Fill rules per order kind, with the forced end-of-session close
//! - Event scheduler and grid execution engine
//! - The `Broker` trait, a simulated broker and the bar-by-bar order replay
//! - Price channel and trend band indicators
//! - A reference order-issuing strategy

pub mod broker;
pub mod components;
pub mod domain;
pub mod engine;
pub mod indicators;
pub mod strategy;

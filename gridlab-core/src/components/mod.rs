//! Pluggable component interfaces shared by the engine and strategies.

pub mod indicator;

pub use indicator::{Indicator, IndicatorValues};

//! Bar-by-bar order replay.
//!
//! For every bar, resting orders are matched first and the strategy runs
//! after, so an order placed on bar `i` can fill no earlier than bar `i + 1`.

use crate::broker::{BrokerError, SimulatedBroker};
use crate::components::indicator::IndicatorValues;
use crate::domain::Bar;
use crate::engine::state::require_columns;
use crate::engine::{validate_bars, RunResult, SimError};
use crate::strategy::{BarContext, Strategy};

/// Drive `strategy` over `bars` against `broker`.
///
/// With `close_at_end`, any position left after the last bar is flattened at
/// its close under the end-close column.
pub fn replay_orders(
    bars: &[Bar],
    indicators: &IndicatorValues,
    strategy: &mut dyn Strategy,
    mut broker: SimulatedBroker,
    close_at_end: bool,
) -> Result<RunResult, BrokerError> {
    validate_bars(bars)?;
    let required: Vec<String> = strategy
        .indicators()
        .iter()
        .map(|i| i.name().to_string())
        .collect();
    require_columns(indicators, required.iter().map(String::as_str), bars.len())?;

    let mut fills = 0;
    for (bar_index, bar) in bars.iter().enumerate() {
        fills += broker.process_bar(bar_index, bar)?;
        let ctx = BarContext::new(bar_index, bars, indicators);
        strategy.on_bar(&ctx, &mut broker)?;
    }

    let last = bars.len() - 1;
    if close_at_end && broker.close_out(last, &bars[last])?.is_some() {
        fills += 1;
    }

    let result = broker.into_result();
    if close_at_end && !result.final_position.is_flat() {
        return Err(SimError::NotFlatAtEnd(result.final_position.size).into());
    }

    tracing::info!(
        strategy = strategy.name(),
        bars = bars.len(),
        fills,
        trades = result.trade_count(),
        balance = result.final_balance,
        "order replay finished"
    );
    Ok(result)
}

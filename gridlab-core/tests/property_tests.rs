//! Property tests for engine invariants.
//!
//! Uses proptest to verify:
//! 1. Average price: a long built from several entries carries their
//!    size-weighted mean price
//! 2. Flatten: equal buy and sell leave size 0 and average 0
//! 3. Removed orders never come back and cannot be deleted twice
//! 4. Grid runs end flat on any bar sequence
//! 5. Balance conservation: final balance is the sum of fill deltas

use chrono::NaiveDate;
use proptest::prelude::*;
use gridlab_core::components::{Indicator, IndicatorValues};
use gridlab_core::domain::{Bar, Order, OrderId, OrderKind};
use gridlab_core::engine::{
    precompute_indicators, ColumnNames, GridConfig, GridEngine, OrderStore, OrderStoreError,
    PositionLedger,
};
use gridlab_core::indicators::{BandSide, ChannelLine, PriceChannel, TrendBand};

// ── Strategies (proptest) ────────────────────────────────────────────

fn arb_price() -> impl Strategy<Value = f64> {
    (10.0..500.0_f64).prop_map(|p| (p * 100.0).round() / 100.0)
}

fn arb_entries() -> impl Strategy<Value = Vec<(u32, f64)>> {
    prop::collection::vec((1u32..50, arb_price()), 3..10)
}

/// Random-walk closes turned into OHLC-consistent bars 15 minutes apart.
fn arb_bars() -> impl Strategy<Value = Vec<Bar>> {
    prop::collection::vec((-2.0..2.0_f64, 0.0..1.5_f64, 0.0..1.5_f64), 1..60).prop_map(|steps| {
        let start = NaiveDate::from_ymd_opt(2024, 5, 6)
            .unwrap()
            .and_hms_opt(7, 15, 0)
            .unwrap();
        let mut close = 100.0_f64;
        steps
            .iter()
            .enumerate()
            .map(|(i, &(step, up, down))| {
                let open = close;
                close = (close + step).max(1.0);
                Bar {
                    timestamp: start + chrono::Duration::minutes(15 * i as i64),
                    open,
                    high: open.max(close) + up,
                    low: (open.min(close) - down).max(0.5),
                    close,
                    volume: 1.0,
                }
            })
            .collect()
    })
}

fn grid_inputs(bars: &[Bar]) -> (GridConfig, IndicatorValues) {
    let indicators: Vec<Box<dyn Indicator>> = vec![
        Box::new(PriceChannel::high(3)),
        Box::new(PriceChannel::low(3)),
        Box::new(TrendBand::lower(3, 1.0)),
    ];
    let mut iv = IndicatorValues::new();
    precompute_indicators(bars, &indicators, &mut iv);

    let config = GridConfig {
        columns: ColumnNames {
            channel_upper: PriceChannel::column(3, ChannelLine::High),
            channel_lower: PriceChannel::column(3, ChannelLine::Low),
            trend_lower: TrendBand::column(3, 1.0, BandSide::Lower),
        },
        ..GridConfig::default()
    };
    (config, iv)
}

// ── 1. Average price ─────────────────────────────────────────────────

proptest! {
    #[test]
    fn average_price_is_size_weighted(entries in arb_entries()) {
        let mut ledger = PositionLedger::new();
        for &(q, p) in &entries {
            ledger.increase(q, p).unwrap();
        }
        let size: i64 = entries.iter().map(|&(q, _)| i64::from(q)).sum();
        let cost: f64 = entries.iter().map(|&(q, p)| f64::from(q) * p).sum();
        let pos = ledger.get();
        prop_assert_eq!(pos.size, size);
        prop_assert!((pos.average_price - cost / size as f64).abs() < 1e-6);
    }

    /// Partial exits leave the average untouched.
    #[test]
    fn partial_exit_keeps_average(entries in arb_entries(), exit_price in arb_price()) {
        let mut ledger = PositionLedger::new();
        for &(q, p) in &entries {
            ledger.increase(q, p).unwrap();
        }
        let before = ledger.get();
        if before.size > 1 {
            ledger.decrease(1, exit_price).unwrap();
            prop_assert_eq!(ledger.get().average_price, before.average_price);
        }
    }
}

// ── 2. Flatten ───────────────────────────────────────────────────────

proptest! {
    #[test]
    fn flatten_resets_average(q in 1u32..1000, buy in arb_price(), sell in arb_price()) {
        let mut ledger = PositionLedger::new();
        ledger.increase(q, buy).unwrap();
        let pos = ledger.decrease(q, sell).unwrap();
        prop_assert_eq!(pos.size, 0);
        prop_assert_eq!(pos.average_price, 0.0);

        let pos = ledger.decrease(q, sell).unwrap();
        prop_assert_eq!(pos.size, -i64::from(q));
        let pos = ledger.increase(q, buy).unwrap();
        prop_assert!(pos.is_flat());
        prop_assert_eq!(pos.average_price, 0.0);
    }
}

// ── 3. Removed orders ────────────────────────────────────────────────

proptest! {
    #[test]
    fn removed_orders_stay_removed(count in 1usize..20, pick in 0usize..20) {
        let mut store = OrderStore::new();
        for i in 0..count {
            let order = Order::new(
                OrderId(i as u64 + 1),
                "prop",
                "LONG_BUY",
                OrderKind::MarketBuy,
                1,
            )
            .unwrap();
            store.create(order).unwrap();
        }
        let id = OrderId((pick % count) as u64 + 1);
        store.delete(id).unwrap();

        prop_assert_eq!(store.len(), count - 1);
        prop_assert!(store.get(id).is_none());
        prop_assert!(store.list().iter().all(|o| o.id != id));
        prop_assert_eq!(store.delete(id), Err(OrderStoreError::OrderNotFound(id)));
    }
}

// ── 4 & 5. Grid runs ─────────────────────────────────────────────────

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    #[test]
    fn grid_run_ends_flat(bars in arb_bars()) {
        let (config, iv) = grid_inputs(&bars);
        let mut ledger = PositionLedger::new();
        let mut orders = OrderStore::new();
        let result = GridEngine::new(config).run(&bars, &iv, &mut ledger, &mut orders).unwrap();

        prop_assert!(result.final_position.is_flat());
        prop_assert!(ledger.get().is_flat());
        prop_assert!(orders.is_empty());
        if let Some(last) = result.log.entries().last() {
            prop_assert_eq!(last.position, 0);
        }
    }

    #[test]
    fn balance_is_sum_of_fill_deltas(bars in arb_bars()) {
        let (config, iv) = grid_inputs(&bars);
        let mut ledger = PositionLedger::new();
        let mut orders = OrderStore::new();
        let result = GridEngine::new(config).run(&bars, &iv, &mut ledger, &mut orders).unwrap();

        let total: f64 = result.log.fills().iter().map(|f| f.balance_delta()).sum();
        prop_assert!((result.final_balance - total).abs() < 1e-6);
        let profits: f64 = result.trade_profits.iter().sum();
        prop_assert!((result.final_balance - profits).abs() < 1e-6);
    }
}

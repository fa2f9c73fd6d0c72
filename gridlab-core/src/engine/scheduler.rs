//! Event scheduler: derives candidate events from bars and indicator columns.
//!
//! Every condition compares a bar against the previous bar's indicator
//! values, never a later one. Undefined (NaN) values make every comparison
//! false, so warm-up bars simply produce no events.

use crate::components::indicator::IndicatorValues;
use crate::domain::Bar;
use crate::engine::error::SimError;
use crate::engine::state::{require_columns, validate_bars, ColumnNames, SessionConfig};
use serde::{Deserialize, Serialize};

/// Event categories in within-bar generation order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum EventKind {
    Buy,
    Improve,
    Sell,
    StopLoss,
    CloseTime,
    CloseEnd,
}

/// A candidate action on one bar. Derived per run, never persisted.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Event {
    pub bar_index: usize,
    pub kind: EventKind,
    /// Price the action executes at. `None` for improve events, which price
    /// themselves from the lots and the bar.
    pub reference_price: Option<f64>,
}

impl Event {
    fn new(bar_index: usize, kind: EventKind, reference_price: Option<f64>) -> Self {
        Self {
            bar_index,
            kind,
            reference_price,
        }
    }
}

fn defined(v: f64) -> Option<f64> {
    (!v.is_nan()).then_some(v)
}

/// Build the ordered event list for a run.
///
/// Events are sorted by bar index; within a bar they follow [`EventKind`]
/// order. Exactly one `CloseEnd` event is emitted, on the last bar.
pub fn schedule_events(
    bars: &[Bar],
    indicators: &IndicatorValues,
    columns: &ColumnNames,
    session: &SessionConfig,
) -> Result<Vec<Event>, SimError> {
    validate_bars(bars)?;
    require_columns(indicators, columns.all(), bars.len())?;

    let series = |name: &str| indicators.get_series(name).unwrap_or(&[]);
    let ch_upper = series(&columns.channel_upper);
    let ch_lower = series(&columns.channel_lower);
    let tr_lower = series(&columns.trend_lower);

    let mut events = Vec::new();
    for (i, bar) in bars.iter().enumerate() {
        let t = bar.time_of_day();
        let prev = i.checked_sub(1);
        let prev_of = |col: &[f64]| prev.and_then(|p| defined(col[p]));

        // entry: channel floor above the trend floor, low pierces prior floor
        if session.allows_entry(t) && ch_lower[i] > tr_lower[i] {
            if let Some(level) = prev_of(ch_lower).filter(|level| bar.low < *level) {
                events.push(Event::new(i, EventKind::Buy, Some(level)));
            }
        }

        if defined(ch_lower[i]).is_some() && defined(tr_lower[i]).is_some() {
            events.push(Event::new(i, EventKind::Improve, None));
        }

        if session.allows_exit(t)
            && defined(ch_upper[i]).is_some()
            && defined(tr_lower[i]).is_some()
        {
            if let Some(level) = prev_of(ch_upper).filter(|level| bar.high > *level) {
                events.push(Event::new(i, EventKind::Sell, Some(level)));
            }
        }

        if defined(tr_lower[i]).is_none() {
            if let Some(level) = prev_of(tr_lower) {
                events.push(Event::new(i, EventKind::StopLoss, Some(level)));
            }
        }

        if t == session.cutoff {
            events.push(Event::new(i, EventKind::CloseTime, Some(bar.close)));
        }
    }

    let last = bars.len() - 1;
    events.push(Event::new(last, EventKind::CloseEnd, Some(bars[last].close)));

    // already grouped by bar; the stable sort keeps generation order within one
    events.sort_by_key(|e| e.bar_index);

    tracing::debug!(bars = bars.len(), events = events.len(), "events scheduled");
    Ok(events)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    const NAN: f64 = f64::NAN;

    fn bars_at(times: &[(u32, u32)], ohlc: &[(f64, f64, f64, f64)]) -> Vec<Bar> {
        let day = NaiveDate::from_ymd_opt(2024, 1, 2).unwrap();
        times
            .iter()
            .zip(ohlc)
            .map(|(&(h, m), &(open, high, low, close))| Bar {
                timestamp: day.and_hms_opt(h, m, 0).unwrap(),
                open,
                high,
                low,
                close,
                volume: 1.0,
            })
            .collect()
    }

    fn columns(upper: Vec<f64>, lower: Vec<f64>, trend: Vec<f64>) -> IndicatorValues {
        let names = ColumnNames::default();
        let mut iv = IndicatorValues::new();
        iv.insert(names.channel_upper, upper);
        iv.insert(names.channel_lower, lower);
        iv.insert(names.trend_lower, trend);
        iv
    }

    fn kinds(events: &[Event]) -> Vec<(usize, EventKind)> {
        events.iter().map(|e| (e.bar_index, e.kind)).collect()
    }

    #[test]
    fn buy_when_low_pierces_prior_channel_floor() {
        let bars = bars_at(
            &[(10, 0), (10, 15), (10, 30)],
            &[
                (101.0, 102.0, 100.5, 101.0),
                (100.5, 101.0, 99.5, 100.2),
                (100.2, 105.5, 100.0, 105.0),
            ],
        );
        let iv = columns(
            vec![NAN, NAN, NAN],
            vec![100.0, 99.8, 99.8],
            vec![95.0, 95.0, 95.0],
        );
        let events = schedule_events(
            &bars,
            &iv,
            &ColumnNames::default(),
            &SessionConfig::default(),
        )
        .unwrap();
        assert_eq!(
            kinds(&events),
            vec![
                (0, EventKind::Improve),
                (1, EventKind::Buy),
                (1, EventKind::Improve),
                (2, EventKind::Improve),
                (2, EventKind::CloseEnd),
            ]
        );
        assert_eq!(events[1].reference_price, Some(100.0));
        assert_eq!(events[4].reference_price, Some(105.0));
    }

    #[test]
    fn no_buy_when_channel_floor_below_trend_floor() {
        let bars = bars_at(
            &[(10, 0), (10, 15)],
            &[(101.0, 102.0, 100.5, 101.0), (100.5, 101.0, 99.5, 100.2)],
        );
        let iv = columns(vec![NAN, NAN], vec![100.0, 99.8], vec![99.9, 99.9]);
        let events = schedule_events(
            &bars,
            &iv,
            &ColumnNames::default(),
            &SessionConfig::default(),
        )
        .unwrap();
        assert!(events.iter().all(|e| e.kind != EventKind::Buy));
    }

    #[test]
    fn sell_requires_session_and_trend() {
        let bars = bars_at(
            &[(10, 0), (10, 15), (23, 40)],
            &[
                (100.0, 101.0, 99.0, 100.0),
                (100.0, 103.0, 99.0, 102.0),
                (102.0, 104.0, 101.0, 103.0),
            ],
        );
        let iv = columns(
            vec![101.5, 103.0, 104.0],
            vec![NAN, NAN, NAN],
            vec![95.0, 95.0, 95.0],
        );
        let events = schedule_events(
            &bars,
            &iv,
            &ColumnNames::default(),
            &SessionConfig::default(),
        )
        .unwrap();
        // bar 2 pierces 103 but sits on the cutoff, which schedules a close instead
        assert_eq!(
            kinds(&events),
            vec![
                (1, EventKind::Sell),
                (2, EventKind::CloseTime),
                (2, EventKind::CloseEnd),
            ]
        );
        assert_eq!(events[0].reference_price, Some(101.5));
        assert_eq!(events[1].reference_price, Some(103.0));
    }

    #[test]
    fn stop_loss_when_trend_floor_disappears() {
        let bars = bars_at(
            &[(10, 0), (10, 15), (10, 30)],
            &[
                (100.0, 101.0, 99.0, 100.0),
                (100.0, 100.5, 97.0, 97.5),
                (97.5, 98.0, 96.0, 97.0),
            ],
        );
        let iv = columns(vec![NAN; 3], vec![NAN; 3], vec![98.25, NAN, NAN]);
        let events = schedule_events(
            &bars,
            &iv,
            &ColumnNames::default(),
            &SessionConfig::default(),
        )
        .unwrap();
        assert_eq!(
            kinds(&events),
            vec![(1, EventKind::StopLoss), (2, EventKind::CloseEnd)]
        );
        assert_eq!(events[0].reference_price, Some(98.25));
    }

    #[test]
    fn single_bar_gets_only_close_end() {
        let bars = bars_at(&[(6, 0)], &[(1.0, 2.0, 0.5, 1.5)]);
        let iv = columns(vec![NAN], vec![NAN], vec![NAN]);
        let events = schedule_events(
            &bars,
            &iv,
            &ColumnNames::default(),
            &SessionConfig::default(),
        )
        .unwrap();
        assert_eq!(kinds(&events), vec![(0, EventKind::CloseEnd)]);
    }

    #[test]
    fn missing_column_is_an_error() {
        let bars = bars_at(&[(10, 0)], &[(1.0, 2.0, 0.5, 1.5)]);
        let err = schedule_events(
            &bars,
            &IndicatorValues::new(),
            &ColumnNames::default(),
            &SessionConfig::default(),
        )
        .unwrap_err();
        assert_eq!(err, SimError::MissingColumn("PC_20_HIGH".into()));
    }
}

//! Export: the augmented bar CSV, the JSON run summary and synthetic bar
//! files.
//!
//! Money columns (commission, balance, trade profit) are rounded to 2 dp and
//! fill prices to 6 dp here and nowhere else. Rows without fills leave the
//! trade columns empty.

use std::path::Path;

use anyhow::{bail, Context, Result};
use gridlab_core::components::IndicatorValues;
use gridlab_core::domain::{Bar, FillTag};
use gridlab_core::engine::{TradeLog, TradeLogEntry};

use crate::runner::{RunSummary, SCHEMA_VERSION};

/// Trade columns appended to each input row, in output order.
pub const TRADE_COLUMNS: [&str; 10] = [
    "SIGNAL",
    "BUY_PRICE",
    "SELL_PRICE",
    "SL_PRICE",
    "CT_PRICE",
    "CE_PRICE",
    "COMMISSION",
    "BALANCE",
    "POSITION",
    "TRADE_PROFIT",
];

const PRICE_TAGS: [FillTag; 5] = [
    FillTag::Buy,
    FillTag::Sell,
    FillTag::StopLoss,
    FillTag::ScheduledClose,
    FillTag::EndClose,
];

fn number(v: f64) -> String {
    if v.is_nan() {
        String::new()
    } else {
        v.to_string()
    }
}

fn trade_cells(entry: Option<&TradeLogEntry>) -> Vec<String> {
    let Some(e) = entry else {
        return vec![String::new(); TRADE_COLUMNS.len()];
    };
    let mut cells = Vec::with_capacity(TRADE_COLUMNS.len());
    cells.push(e.signal.clone());
    for tag in PRICE_TAGS {
        cells.push(e.price(tag).map(|p| format!("{p:.6}")).unwrap_or_default());
    }
    cells.push(format!("{:.2}", e.commission));
    cells.push(format!("{:.2}", e.balance));
    cells.push(e.position.to_string());
    cells.push(
        e.trade_profit
            .map(|p| format!("{p:.2}"))
            .unwrap_or_default(),
    );
    cells
}

/// Render bars, their columns and the trade log as CSV.
///
/// `columns` lists the indicator columns to include, in order.
pub fn augmented_csv(
    bars: &[Bar],
    indicators: &IndicatorValues,
    columns: &[String],
    log: &TradeLog,
) -> Result<String> {
    let mut wtr = csv::Writer::from_writer(vec![]);

    let mut header: Vec<&str> = vec!["DATE", "OPEN", "HIGH", "LOW", "CLOSE", "VOLUME"];
    header.extend(columns.iter().map(String::as_str));
    header.extend(TRADE_COLUMNS);
    wtr.write_record(&header)?;

    for (i, bar) in bars.iter().enumerate() {
        let mut row = vec![
            bar.timestamp.format("%Y-%m-%d %H:%M:%S").to_string(),
            number(bar.open),
            number(bar.high),
            number(bar.low),
            number(bar.close),
            number(bar.volume),
        ];
        for name in columns {
            row.push(indicators.get(name, i).map(number).unwrap_or_default());
        }
        row.extend(trade_cells(log.entry(i)));
        wtr.write_record(&row)?;
    }

    let data = wtr.into_inner().context("failed to flush CSV writer")?;
    String::from_utf8(data).context("CSV output is not valid UTF-8")
}

pub fn write_augmented_csv(
    path: &Path,
    bars: &[Bar],
    indicators: &IndicatorValues,
    columns: &[String],
    log: &TradeLog,
) -> Result<()> {
    let csv = augmented_csv(bars, indicators, columns, log)?;
    write_file(path, &csv)
}

/// Plain OHLCV CSV, readable by the loader.
pub fn bars_csv(bars: &[Bar]) -> Result<String> {
    let mut wtr = csv::Writer::from_writer(vec![]);
    wtr.write_record(["DATE", "OPEN", "HIGH", "LOW", "CLOSE", "VOLUME"])?;
    for bar in bars {
        wtr.write_record([
            bar.timestamp.format("%Y-%m-%d %H:%M:%S").to_string(),
            format!("{:.2}", bar.open),
            format!("{:.2}", bar.high),
            format!("{:.2}", bar.low),
            format!("{:.2}", bar.close),
            format!("{:.0}", bar.volume),
        ])?;
    }
    let data = wtr.into_inner().context("failed to flush CSV writer")?;
    String::from_utf8(data).context("CSV output is not valid UTF-8")
}

pub fn write_bars_csv(path: &Path, bars: &[Bar]) -> Result<()> {
    write_file(path, &bars_csv(bars)?)
}

/// Serialize a `RunSummary` to pretty JSON.
pub fn export_summary_json(summary: &RunSummary) -> Result<String> {
    serde_json::to_string_pretty(summary).context("failed to serialize RunSummary to JSON")
}

/// Deserialize a `RunSummary`, rejecting unknown schema versions.
pub fn import_summary_json(json: &str) -> Result<RunSummary> {
    let summary: RunSummary =
        serde_json::from_str(json).context("failed to deserialize RunSummary from JSON")?;
    if summary.schema_version > SCHEMA_VERSION {
        bail!(
            "unsupported schema version {} (max supported: {})",
            summary.schema_version,
            SCHEMA_VERSION
        );
    }
    Ok(summary)
}

pub fn write_summary_json(path: &Path, summary: &RunSummary) -> Result<()> {
    write_file(path, &export_summary_json(summary)?)
}

fn write_file(path: &Path, contents: &str) -> Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("failed to create directory {}", parent.display()))?;
    }
    std::fs::write(path, contents).with_context(|| format!("failed to write {}", path.display()))
}

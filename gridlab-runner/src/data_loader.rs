//! CSV bar loading.
//!
//! The input has `DATE, OPEN, HIGH, LOW, CLOSE, VOLUME` (header match is
//! case-insensitive) plus any number of numeric indicator columns. Empty
//! cells and `NaN` in indicator columns mean "undefined". Timestamps must be
//! strictly increasing.

use std::io::Read;
use std::path::{Path, PathBuf};

use chrono::{DateTime, NaiveDateTime};
use thiserror::Error;

use gridlab_core::components::IndicatorValues;
use gridlab_core::domain::Bar;

const TIMESTAMP_FORMATS: [&str; 3] = ["%Y-%m-%d %H:%M:%S", "%Y-%m-%dT%H:%M:%S", "%Y-%m-%d %H:%M"];

const BAR_COLUMNS: [&str; 6] = ["DATE", "OPEN", "HIGH", "LOW", "CLOSE", "VOLUME"];

/// Errors from the data loading layer.
#[derive(Debug, Error)]
pub enum LoadError {
    #[error("failed to open '{path}': {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("missing required column '{0}'")]
    MissingColumn(&'static str),

    #[error("row {row}: unparseable timestamp '{value}'")]
    InvalidTimestamp { row: usize, value: String },

    #[error("row {row}: column '{column}' has non-numeric value '{value}'")]
    InvalidNumber {
        row: usize,
        column: String,
        value: String,
    },

    #[error("row {row}: timestamp {timestamp} is not after the previous row")]
    Unordered { row: usize, timestamp: NaiveDateTime },

    #[error("no bars in input")]
    Empty,
}

/// Bars and input columns from one file.
#[derive(Debug, Clone)]
pub struct LoadedData {
    pub bars: Vec<Bar>,
    /// Indicator columns supplied by the input, plus any computed later.
    pub indicators: IndicatorValues,
    /// Extra column names in file order.
    pub extra_columns: Vec<String>,
    /// BLAKE3 over timestamps, OHLCV and the input columns.
    pub dataset_hash: String,
    /// Bars failing the OHLC sanity check. Kept, but reported.
    pub insane_bars: usize,
}

/// Load bars from a CSV file.
pub fn load_bars_csv(path: &Path) -> Result<LoadedData, LoadError> {
    let file = std::fs::File::open(path).map_err(|source| LoadError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    let data = read_bars(file)?;
    tracing::info!(
        path = %path.display(),
        bars = data.bars.len(),
        columns = data.extra_columns.len(),
        "bars loaded"
    );
    Ok(data)
}

/// Read bars from any CSV source.
pub fn read_bars<R: Read>(reader: R) -> Result<LoadedData, LoadError> {
    let mut rdr = csv::ReaderBuilder::new().trim(csv::Trim::All).from_reader(reader);
    let headers = rdr.headers()?.clone();

    let position = |name: &'static str| {
        headers
            .iter()
            .position(|h| h.eq_ignore_ascii_case(name))
            .ok_or(LoadError::MissingColumn(name))
    };
    let date_col = position("DATE")?;
    let open_col = position("OPEN")?;
    let high_col = position("HIGH")?;
    let low_col = position("LOW")?;
    let close_col = position("CLOSE")?;
    let volume_col = headers
        .iter()
        .position(|h| h.eq_ignore_ascii_case("VOLUME"));

    let extras: Vec<(usize, String)> = headers
        .iter()
        .enumerate()
        .filter(|(_, h)| !BAR_COLUMNS.iter().any(|b| h.eq_ignore_ascii_case(b)))
        .map(|(i, h)| (i, h.to_string()))
        .collect();

    let mut bars: Vec<Bar> = Vec::new();
    let mut columns: Vec<Vec<f64>> = vec![Vec::new(); extras.len()];

    for (i, record) in rdr.records().enumerate() {
        let record = record?;
        // header is row 1
        let row = i + 2;
        let cell = |col: usize| record.get(col).unwrap_or("");

        let raw_ts = cell(date_col);
        let timestamp = parse_timestamp(raw_ts).ok_or_else(|| LoadError::InvalidTimestamp {
            row,
            value: raw_ts.to_string(),
        })?;
        if let Some(prev) = bars.last() {
            if timestamp <= prev.timestamp {
                return Err(LoadError::Unordered { row, timestamp });
            }
        }

        let price = |col: usize| -> Result<f64, LoadError> {
            let value = cell(col);
            value
                .parse::<f64>()
                .ok()
                .filter(|v| v.is_finite())
                .ok_or_else(|| LoadError::InvalidNumber {
                    row,
                    column: headers.get(col).unwrap_or("").to_string(),
                    value: value.to_string(),
                })
        };
        let volume = match volume_col {
            Some(col) => parse_optional(cell(col)).ok_or_else(|| LoadError::InvalidNumber {
                row,
                column: "VOLUME".into(),
                value: cell(col).to_string(),
            })?,
            None => f64::NAN,
        };

        bars.push(Bar {
            timestamp,
            open: price(open_col)?,
            high: price(high_col)?,
            low: price(low_col)?,
            close: price(close_col)?,
            volume: if volume.is_nan() { 0.0 } else { volume },
        });

        for ((col, name), series) in extras.iter().zip(columns.iter_mut()) {
            let value = parse_optional(cell(*col)).ok_or_else(|| LoadError::InvalidNumber {
                row,
                column: name.clone(),
                value: cell(*col).to_string(),
            })?;
            series.push(value);
        }
    }

    if bars.is_empty() {
        return Err(LoadError::Empty);
    }

    let insane_bars = bars.iter().filter(|b| !b.is_sane()).count();
    if insane_bars > 0 {
        tracing::warn!(insane_bars, "bars with inconsistent OHLC values");
    }

    let mut indicators = IndicatorValues::new();
    let extra_columns: Vec<String> = extras.into_iter().map(|(_, name)| name).collect();
    for (name, series) in extra_columns.iter().zip(columns) {
        indicators.insert(name.clone(), series);
    }
    let dataset_hash = compute_dataset_hash(&bars, &indicators);

    Ok(LoadedData {
        bars,
        indicators,
        extra_columns,
        dataset_hash,
        insane_bars,
    })
}

/// Empty and `NaN` cells are undefined; anything else must be a number.
fn parse_optional(value: &str) -> Option<f64> {
    if value.is_empty() || value.eq_ignore_ascii_case("nan") {
        return Some(f64::NAN);
    }
    value.parse::<f64>().ok()
}

/// Parse a wall-clock timestamp. RFC 3339 values keep their local time and
/// drop the offset.
pub fn parse_timestamp(value: &str) -> Option<NaiveDateTime> {
    TIMESTAMP_FORMATS
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(value, fmt).ok())
        .or_else(|| {
            DateTime::parse_from_rfc3339(value)
                .ok()
                .map(|dt| dt.naive_local())
        })
}

/// Compute a deterministic BLAKE3 hash over all bar data and input columns.
///
/// Columns are visited in name order, so the hash does not depend on the
/// column order in the file.
pub fn compute_dataset_hash(bars: &[Bar], indicators: &IndicatorValues) -> String {
    let mut hasher = blake3::Hasher::new();
    for bar in bars {
        hasher.update(bar.timestamp.to_string().as_bytes());
        hasher.update(&bar.open.to_le_bytes());
        hasher.update(&bar.high.to_le_bytes());
        hasher.update(&bar.low.to_le_bytes());
        hasher.update(&bar.close.to_le_bytes());
        hasher.update(&bar.volume.to_le_bytes());
    }
    for name in indicators.names() {
        hasher.update(name.as_bytes());
        if let Some(series) = indicators.get_series(name) {
            for v in series {
                hasher.update(&v.to_le_bytes());
            }
        }
    }
    hasher.finalize().to_hex().to_string()
}

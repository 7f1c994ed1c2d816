//! Price loading for the runner.
//!
//! Two sources:
//! 1. `load_csv()` reads a daily OHLCV file (Yahoo-style headers, matched
//!    case-insensitively). Rows with `null` fields are dropped with a warning.
//! 2. `synthetic_series()` generates a deterministic random walk for demos.
//!
//! Loading does not validate the series; the engine rejects bad data with a
//! `DataQualityError` so the failure carries bar index and date.

use std::path::{Path, PathBuf};

use chrono::{Datelike, NaiveDate};
use quantlab_core::domain::{PriceBar, PriceSeries};
use thiserror::Error;
use tracing::{debug, warn};

/// Errors from the data loading layer.
#[derive(Debug, Error)]
pub enum LoadError {
    #[error("failed to open {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("csv error: {0}")]
    Csv(#[from] csv::Error),

    #[error("missing required column '{0}'")]
    MissingColumn(&'static str),

    #[error("line {line}: cannot parse {field} from '{value}'")]
    Parse {
        line: u64,
        field: &'static str,
        value: String,
    },

    #[error("no rows in {}", path.display())]
    Empty { path: PathBuf },
}

/// Options controlling how a CSV file is read.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct LoadOptions {
    /// Scale OHLC by `Adj Close / Close` when the column is present.
    pub adjust: bool,
}

struct Columns {
    date: usize,
    open: usize,
    high: usize,
    low: usize,
    close: usize,
    volume: Option<usize>,
    adj_close: Option<usize>,
}

fn column(headers: &csv::StringRecord, names: &[&str]) -> Option<usize> {
    headers.iter().position(|h| {
        let h = h.trim().to_ascii_lowercase().replace(['_', ' '], "");
        names.iter().any(|n| h == *n)
    })
}

impl Columns {
    fn resolve(headers: &csv::StringRecord) -> Result<Self, LoadError> {
        let require = |names: &[&str], label: &'static str| {
            column(headers, names).ok_or(LoadError::MissingColumn(label))
        };
        Ok(Self {
            date: require(&["date", "timestamp", "time"][..], "date")?,
            open: require(&["open"][..], "open")?,
            high: require(&["high"][..], "high")?,
            low: require(&["low"][..], "low")?,
            close: require(&["close"][..], "close")?,
            volume: column(headers, &["volume"]),
            adj_close: column(headers, &["adjclose"]),
        })
    }
}

/// Load a daily OHLCV CSV file.
pub fn load_csv(path: impl AsRef<Path>, symbol: &str) -> Result<PriceSeries, LoadError> {
    load_csv_with(path, symbol, &LoadOptions::default())
}

pub fn load_csv_with(
    path: impl AsRef<Path>,
    symbol: &str,
    opts: &LoadOptions,
) -> Result<PriceSeries, LoadError> {
    let path = path.as_ref();
    let file = std::fs::File::open(path).map_err(|source| LoadError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    let mut reader = csv::ReaderBuilder::new()
        .trim(csv::Trim::All)
        .flexible(true)
        .from_reader(file);
    let columns = Columns::resolve(reader.headers()?)?;

    let mut bars = Vec::new();
    let mut dropped = 0usize;
    for record in reader.records() {
        let record = record?;
        let line = record.position().map_or(0, |p| p.line());
        if record.iter().any(|f| f.eq_ignore_ascii_case("null")) {
            dropped += 1;
            continue;
        }
        let mut bar = parse_row(&record, &columns, line)?;
        if opts.adjust {
            if let Some(idx) = columns.adj_close {
                let adj = parse_f64(&record, idx, "adj close", line)?;
                if bar.close > 0.0 {
                    let factor = adj / bar.close;
                    bar.open *= factor;
                    bar.high *= factor;
                    bar.low *= factor;
                    bar.close = adj;
                }
            }
        }
        bars.push(bar);
    }

    if dropped > 0 {
        warn!(symbol, dropped, "rows with null fields dropped");
    }
    if bars.is_empty() {
        return Err(LoadError::Empty {
            path: path.to_path_buf(),
        });
    }
    debug!(symbol, bars = bars.len(), path = %path.display(), "loaded csv");
    Ok(PriceSeries::new(symbol, bars))
}

fn parse_row(record: &csv::StringRecord, c: &Columns, line: u64) -> Result<PriceBar, LoadError> {
    let raw_date = record.get(c.date).unwrap_or_default();
    let date = parse_date(raw_date).ok_or_else(|| LoadError::Parse {
        line,
        field: "date",
        value: raw_date.to_string(),
    })?;
    let volume = match c.volume {
        Some(idx) => parse_f64(record, idx, "volume", line)?.max(0.0) as u64,
        None => 0,
    };
    Ok(PriceBar {
        date,
        open: parse_f64(record, c.open, "open", line)?,
        high: parse_f64(record, c.high, "high", line)?,
        low: parse_f64(record, c.low, "low", line)?,
        close: parse_f64(record, c.close, "close", line)?,
        volume,
    })
}

/// `YYYY-MM-DD`, optionally followed by a time component.
fn parse_date(s: &str) -> Option<NaiveDate> {
    NaiveDate::parse_from_str(s, "%Y-%m-%d")
        .ok()
        .or_else(|| s.get(..10).and_then(|d| NaiveDate::parse_from_str(d, "%Y-%m-%d").ok()))
}

fn parse_f64(
    record: &csv::StringRecord,
    idx: usize,
    field: &'static str,
    line: u64,
) -> Result<f64, LoadError> {
    let raw = record.get(idx).unwrap_or_default();
    raw.parse::<f64>().map_err(|_| LoadError::Parse {
        line,
        field,
        value: raw.to_string(),
    })
}

/// Generate a synthetic weekday series for demos and tests.
///
/// A random walk from 100.0 with daily moves in ±3%, seeded from the
/// BLAKE3 hash of `symbol` so the same symbol always yields the same bars.
pub fn synthetic_series(symbol: &str, start: NaiveDate, n_bars: usize) -> PriceSeries {
    use rand::rngs::StdRng;
    use rand::{Rng, SeedableRng};

    let seed: [u8; 32] = *blake3::hash(symbol.as_bytes()).as_bytes();
    let mut rng = StdRng::from_seed(seed);

    let mut bars = Vec::with_capacity(n_bars);
    let mut price = 100.0_f64;
    let mut current = start;

    while bars.len() < n_bars {
        let weekday = current.weekday();
        if weekday == chrono::Weekday::Sat || weekday == chrono::Weekday::Sun {
            current += chrono::Duration::days(1);
            continue;
        }

        let daily_return: f64 = rng.gen_range(-0.03..0.03);
        let open = price;
        let close = price * (1.0 + daily_return);
        let high = open.max(close) * (1.0 + rng.gen_range(0.0..0.01));
        let low = open.min(close) * (1.0 - rng.gen_range(0.0..0.01));
        let volume = rng.gen_range(500_000..5_000_000u64);

        bars.push(PriceBar {
            date: current,
            open,
            high,
            low,
            close,
            volume,
        });

        price = close;
        current += chrono::Duration::days(1);
    }

    PriceSeries::new(symbol, bars)
}

use std::collections::{BTreeMap, BTreeSet};

use chrono::{DateTime, Duration, TimeZone, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::TradesError;
use crate::series::PairSeries;

/// A single OHLCV candle. `timestamp` is the start of the bucket.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Candle {
    pub timestamp: DateTime<Utc>,
    pub open: Decimal,
    pub high: Decimal,
    pub low: Decimal,
    pub close: Decimal,
    pub volume: Decimal,
}

impl Candle {
    /// A flat candle at `price` with no volume, used to fill reindexed gaps.
    fn flat(timestamp: DateTime<Utc>, price: Decimal) -> Self {
        Self {
            timestamp,
            open: price,
            high: price,
            low: price,
            close: price,
            volume: Decimal::ZERO,
        }
    }
}

/// Candles for one coin pair, priced the same way as the [`PairSeries`] they came from.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CandleSeries {
    pub quote: String,
    pub base: String,
    /// Bucket width in seconds.
    pub duration_secs: i64,
    /// Sorted by timestamp.
    pub candles: Vec<Candle>,
}

impl CandleSeries {
    pub fn first_timestamp(&self) -> Option<DateTime<Utc>> {
        self.candles.first().map(|c| c.timestamp)
    }
}

/// Parse a candle width such as `30s`, `5min`, `1m`, `4H`, `1D` or `1W`.
///
/// `m`, `min` and `T` are minutes; there is no month unit.
pub fn parse_duration(text: &str) -> Result<Duration, TradesError> {
    let invalid = || TradesError::InvalidDuration(text.to_string());

    let trimmed = text.trim();
    let split = trimmed
        .find(|c: char| !c.is_ascii_digit())
        .unwrap_or(trimmed.len());
    let (count, unit) = trimmed.split_at(split);

    let count: i64 = if count.is_empty() {
        1
    } else {
        count.parse().map_err(|_| invalid())?
    };
    if count <= 0 {
        return Err(invalid());
    }

    let unit_secs = match unit.trim() {
        "s" | "S" | "sec" | "secs" => 1,
        "m" | "min" | "mins" | "T" => 60,
        "h" | "H" | "hr" | "hour" | "hours" => 3_600,
        "d" | "D" | "day" | "days" => 86_400,
        "w" | "W" | "week" | "weeks" => 604_800,
        _ => return Err(invalid()),
    };

    count
        .checked_mul(unit_secs)
        .map(Duration::seconds)
        .ok_or_else(invalid)
}

/// Short label for a bucket width, e.g. `1m`, `4h`, `1d`. Used in file names.
pub fn duration_label(duration: Duration) -> String {
    let secs = duration.num_seconds();
    match secs {
        s if s > 0 && s % 604_800 == 0 => format!("{}w", s / 604_800),
        s if s > 0 && s % 86_400 == 0 => format!("{}d", s / 86_400),
        s if s > 0 && s % 3_600 == 0 => format!("{}h", s / 3_600),
        s if s > 0 && s % 60 == 0 => format!("{}m", s / 60),
        s => format!("{s}s"),
    }
}

/// Build candles for every series.
///
/// With `reindex`, all series are laid on the union of their bucket times and
/// gaps are filled flat from the previous close with zero volume. With
/// `truncate` as well, every series starts at the first bucket where all pairs
/// have traded.
pub fn to_candles(
    series: &[PairSeries],
    duration: Duration,
    reindex: bool,
    truncate: bool,
) -> Result<Vec<CandleSeries>, TradesError> {
    let width = duration.num_seconds();
    if width <= 0 {
        return Err(TradesError::InvalidDuration(format!("{width}s")));
    }

    let mut candles = series
        .iter()
        .map(|s| resample(s, width))
        .collect::<Result<Vec<_>, _>>()?;

    if reindex {
        let start = if truncate { common_start(&candles) } else { None };
        let grid: BTreeSet<DateTime<Utc>> = candles
            .iter()
            .flat_map(|c| c.candles.iter().map(|c| c.timestamp))
            .filter(|t| start.is_none_or(|start| *t >= start))
            .collect();

        for pair in &mut candles {
            pair.candles = reindex_onto(&pair.candles, &grid);
        }
    }

    Ok(candles)
}

struct Bucket {
    open: Decimal,
    high: Decimal,
    low: Decimal,
    close: Decimal,
    volume: Decimal,
}

fn resample(series: &PairSeries, width: i64) -> Result<CandleSeries, TradesError> {
    let mut buckets: BTreeMap<i64, Bucket> = BTreeMap::new();

    for point in &series.points {
        let start = point.timestamp.timestamp().div_euclid(width) * width;
        buckets
            .entry(start)
            .and_modify(|b| {
                b.high = b.high.max(point.price);
                b.low = b.low.min(point.price);
                b.close = point.price;
                b.volume += point.volume;
            })
            .or_insert(Bucket {
                open: point.price,
                high: point.price,
                low: point.price,
                close: point.price,
                volume: point.volume,
            });
    }

    let mut candles: Vec<Candle> = Vec::with_capacity(buckets.len());
    for (start, bucket) in buckets {
        if bucket.volume.is_zero() {
            continue;
        }
        let timestamp = Utc
            .timestamp_opt(start, 0)
            .single()
            .ok_or_else(|| TradesError::InvalidData(format!("invalid bucket start: {start}")))?;

        // Each open continues the previous close so dropped buckets leave no gap.
        let open = candles.last().map_or(bucket.open, |prev| prev.close);
        candles.push(Candle {
            timestamp,
            open,
            high: bucket.high.max(open),
            low: bucket.low.min(open),
            close: bucket.close,
            volume: bucket.volume,
        });
    }

    debug!(
        "{}/{}: {} point(s) -> {} candle(s)",
        series.base,
        series.quote,
        series.points.len(),
        candles.len()
    );

    Ok(CandleSeries {
        quote: series.quote.clone(),
        base: series.base.clone(),
        duration_secs: width,
        candles,
    })
}

/// The latest first bucket across all series, i.e. the first time every pair has data.
/// Series without any candle do not constrain the start.
fn common_start(series: &[CandleSeries]) -> Option<DateTime<Utc>> {
    series.iter().filter_map(|s| s.first_timestamp()).max()
}

fn reindex_onto(candles: &[Candle], grid: &BTreeSet<DateTime<Utc>>) -> Vec<Candle> {
    let by_time: BTreeMap<DateTime<Utc>, &Candle> =
        candles.iter().map(|c| (c.timestamp, c)).collect();

    // Seed with the last close before the grid starts, if any.
    let mut last_close = grid
        .first()
        .and_then(|first| by_time.range(..*first).next_back())
        .map(|(_, c)| c.close);

    let mut out = Vec::with_capacity(grid.len());
    for t in grid {
        match by_time.get(t) {
            Some(candle) => {
                last_close = Some(candle.close);
                out.push((*candle).clone());
            }
            None => {
                if let Some(close) = last_close {
                    out.push(Candle::flat(*t, close));
                }
            }
        }
    }
    out
}

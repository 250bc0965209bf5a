//! Candle files for the Curve v2 pool simulator.
//!
//! One file per coin pair, `{base}{quote}-{duration}.json`, holding a JSON
//! array of `[timestamp_ms, open, high, low, close, volume]` rows with every
//! value written as a string.

use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

use chrono::Duration;
use tracing::info;

use crate::candle::{CandleSeries, duration_label};
use crate::error::TradesError;
use crate::series::pair_combinations;

/// Rows in simulator order, all values stringified.
pub fn simulator_rows(series: &CandleSeries) -> Vec<[String; 6]> {
    series
        .candles
        .iter()
        .map(|c| {
            [
                c.timestamp.timestamp_millis().to_string(),
                c.open.to_string(),
                c.high.to_string(),
                c.low.to_string(),
                c.close.to_string(),
                c.volume.to_string(),
            ]
        })
        .collect()
}

/// File name for one pair: base name, then quote name, then the candle width.
pub fn simulator_file_name(quote_name: &str, base_name: &str, duration: Duration) -> String {
    format!("{base_name}{quote_name}-{}.json", duration_label(duration))
}

/// Write one simulator file per series into `dir`.
///
/// `coin_names` are display names in the same order as the coins the series
/// were built from, so the n-th pair combination of names labels the n-th series.
pub fn write_simulator_candles(
    dir: &Path,
    series: &[CandleSeries],
    coin_names: &[String],
) -> Result<Vec<PathBuf>, TradesError> {
    let names = pair_combinations(coin_names);
    if names.len() != series.len() {
        return Err(TradesError::InvalidData(format!(
            "{} coin name(s) give {} pair(s), but there are {} candle series",
            coin_names.len(),
            names.len(),
            series.len()
        )));
    }

    std::fs::create_dir_all(dir)?;

    let mut paths = Vec::with_capacity(series.len());
    for ((quote_name, base_name), pair) in names.into_iter().zip(series) {
        let duration = Duration::seconds(pair.duration_secs);
        let path = dir.join(simulator_file_name(quote_name, base_name, duration));

        let mut writer = BufWriter::new(std::fs::File::create(&path)?);
        serde_json::to_writer(&mut writer, &simulator_rows(pair))?;
        writer.flush()?;
        info!("wrote {} candle(s) to {}", pair.candles.len(), path.display());
        paths.push(path);
    }

    Ok(paths)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::candle::Candle;
    use chrono::{TimeZone, Utc};
    use rust_decimal_macros::dec;

    fn series(base: &str) -> CandleSeries {
        CandleSeries {
            quote: "0xusdc".to_string(),
            base: base.to_string(),
            duration_secs: 60,
            candles: vec![Candle {
                timestamp: Utc.with_ymd_and_hms(2022, 6, 1, 0, 1, 0).unwrap(),
                open: dec!(1800.5),
                high: dec!(1801),
                low: dec!(1799.25),
                close: dec!(1800),
                volume: dec!(0),
            }],
        }
    }

    #[test]
    fn rows_are_stringified_with_millisecond_timestamps() {
        let rows = simulator_rows(&series("0xweth"));
        assert_eq!(
            rows,
            vec![[
                "1654041660000".to_string(),
                "1800.5".to_string(),
                "1801".to_string(),
                "1799.25".to_string(),
                "1800".to_string(),
                "0".to_string(),
            ]]
        );
    }

    #[test]
    fn file_name_puts_base_first() {
        assert_eq!(
            simulator_file_name("USDC", "WETH", Duration::minutes(1)),
            "WETHUSDC-1m.json"
        );
    }

    #[test]
    fn writes_one_file_per_pair() {
        let dir = tempfile::tempdir().unwrap();
        let names = vec!["USDC".to_string(), "WETH".to_string(), "WBTC".to_string()];
        let all = vec![series("0xweth"), series("0xwbtc"), series("0xwbtc")];

        let paths = write_simulator_candles(dir.path(), &all, &names).unwrap();
        let file_names: Vec<String> = paths
            .iter()
            .map(|p| p.file_name().unwrap().to_string_lossy().into_owned())
            .collect();
        assert_eq!(
            file_names,
            vec!["WETHUSDC-1m.json", "WBTCUSDC-1m.json", "WBTCWETH-1m.json"]
        );

        let text = std::fs::read_to_string(&paths[0]).unwrap();
        let parsed: Vec<Vec<String>> = serde_json::from_str(&text).unwrap();
        assert_eq!(parsed[0][0], "1654041660000");
        assert_eq!(parsed[0].len(), 6);
    }

    #[test]
    fn name_count_must_match_series() {
        let dir = tempfile::tempdir().unwrap();
        let names = vec!["USDC".to_string(), "WETH".to_string(), "WBTC".to_string()];
        let result = write_simulator_candles(dir.path(), &[series("0xweth")], &names);
        assert!(matches!(result, Err(TradesError::InvalidData(_))));
    }
}

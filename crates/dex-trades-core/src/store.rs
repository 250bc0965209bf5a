use std::path::{Path, PathBuf};

use chrono::Duration;

use crate::candle::{CandleSeries, duration_label, parse_duration};
use crate::error::TradesError;
use crate::schema;

/// Filesystem-backed store for candle series in Parquet format.
///
/// Directory layout: `{root}/data/{protocol}/{base}-{quote}/{duration}.parquet`
pub struct CandleStore {
    data_dir: PathBuf,
}

/// A stored pair, as found on disk.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredPair {
    pub base: String,
    pub quote: String,
    /// Duration labels (`1m`, `4h`, ...) sorted by bucket width.
    pub durations: Vec<String>,
}

impl CandleStore {
    /// Create a store rooted at the given directory.
    /// The `data/` subdirectory is used automatically.
    pub fn new(root: impl AsRef<Path>) -> Self {
        Self {
            data_dir: root.as_ref().join("data"),
        }
    }

    /// Create a store pointing directly at the data directory (no `data/` suffix).
    pub fn from_data_dir(data_dir: impl AsRef<Path>) -> Self {
        Self {
            data_dir: data_dir.as_ref().to_path_buf(),
        }
    }

    fn pair_dir(&self, protocol: &str, base: &str, quote: &str) -> PathBuf {
        self.data_dir
            .join(protocol.to_lowercase())
            .join(format!("{}-{}", base.to_lowercase(), quote.to_lowercase()))
    }

    /// Path to the Parquet file for a pair at a given candle width.
    pub fn file_path(&self, protocol: &str, base: &str, quote: &str, duration: Duration) -> PathBuf {
        self.pair_dir(protocol, base, quote)
            .join(format!("{}.parquet", duration_label(duration)))
    }

    pub fn has_series(&self, protocol: &str, base: &str, quote: &str, duration: Duration) -> bool {
        self.file_path(protocol, base, quote, duration).exists()
    }

    /// Write a candle series, replacing any stored series for the same pair and width.
    pub fn write_series(&self, protocol: &str, series: &CandleSeries) -> Result<PathBuf, TradesError> {
        let path = self.file_path(
            protocol,
            &series.base,
            &series.quote,
            Duration::seconds(series.duration_secs),
        );
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        schema::write_parquet(&path, &series.candles)?;
        Ok(path)
    }

    pub fn read_series(
        &self,
        protocol: &str,
        base: &str,
        quote: &str,
        duration: Duration,
    ) -> Result<CandleSeries, TradesError> {
        let path = self.file_path(protocol, base, quote, duration);
        if !path.exists() {
            return Err(TradesError::NoData {
                protocol: protocol.to_string(),
                pair: format!("{base}-{quote}"),
                duration: duration_label(duration),
            });
        }

        Ok(CandleSeries {
            quote: quote.to_lowercase(),
            base: base.to_lowercase(),
            duration_secs: duration.num_seconds(),
            candles: schema::read_parquet(&path)?,
        })
    }

    /// List all protocols that have data in the store.
    pub fn list_protocols(&self) -> Result<Vec<String>, TradesError> {
        list_dir_names(&self.data_dir)
    }

    /// List stored pairs for a protocol with the candle widths available for each.
    pub fn list_pairs(&self, protocol: &str) -> Result<Vec<StoredPair>, TradesError> {
        let protocol_dir = self.data_dir.join(protocol.to_lowercase());
        let mut pairs = Vec::new();

        for name in list_dir_names(&protocol_dir)? {
            let Some((base, quote)) = name.split_once('-') else {
                continue;
            };

            let mut durations: Vec<(i64, String)> = Vec::new();
            for entry in std::fs::read_dir(protocol_dir.join(&name))? {
                let file_name = entry?.file_name();
                let file_name = file_name.to_string_lossy();
                if let Some(label) = file_name.strip_suffix(".parquet")
                    && let Ok(duration) = parse_duration(label)
                {
                    durations.push((duration.num_seconds(), label.to_string()));
                }
            }
            durations.sort();

            pairs.push(StoredPair {
                base: base.to_string(),
                quote: quote.to_string(),
                durations: durations.into_iter().map(|(_, label)| label).collect(),
            });
        }

        Ok(pairs)
    }
}

fn list_dir_names(dir: &Path) -> Result<Vec<String>, TradesError> {
    if !dir.exists() {
        return Ok(Vec::new());
    }

    let mut names = Vec::new();
    for entry in std::fs::read_dir(dir)? {
        let entry = entry?;
        if entry.file_type()?.is_dir()
            && let Some(name) = entry.file_name().to_str()
        {
            names.push(name.to_string());
        }
    }
    names.sort();
    Ok(names)
}

use thiserror::Error;

#[derive(Debug, Error)]
pub enum TradesError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Parquet error: {0}")]
    Parquet(#[from] parquet::errors::ParquetError),

    #[error("Arrow error: {0}")]
    Arrow(#[from] arrow::error::ArrowError),

    #[error("Invalid candle duration '{0}'. Expected e.g. 30s, 5min, 1m, 4H, 1D, 1W")]
    InvalidDuration(String),

    #[error("No stored candles for {pair} ({duration}) on {protocol}")]
    NoData {
        protocol: String,
        pair: String,
        duration: String,
    },

    #[error("Invalid data: {0}")]
    InvalidData(String),
}

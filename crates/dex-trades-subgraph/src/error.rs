use dex_trades_core::error::TradesError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum SubgraphError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    /// An expected path such as `data.swaps[0].timestamp` was missing from a
    /// response. Usually means the filter arguments match nothing.
    #[error("Data unavailable: {0}")]
    DataUnavailable(String),

    #[error("Parse error: {0}")]
    Parse(String),

    #[error("API error ({status}): {message}")]
    Api { status: u16, message: String },

    #[error("Giving up after {attempts} attempt(s): {last_error}")]
    RetriesExhausted { attempts: u32, last_error: String },

    #[error("Subgraph configuration error: {0}")]
    Config(String),

    #[error(transparent)]
    Core(#[from] TradesError),
}

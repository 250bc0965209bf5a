pub mod candle;
pub mod error;
pub mod export;
pub mod schema;
pub mod series;
pub mod store;
pub mod trade;

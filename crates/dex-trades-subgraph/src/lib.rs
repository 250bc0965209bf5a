pub mod adapter;
pub mod client;
pub mod config;
pub mod curve;
pub mod error;
pub mod paginator;
pub mod protocol;
pub mod query;
pub mod registry;
pub mod sushiswap;
pub mod transport;
pub mod uniswap;

#[cfg(test)]
mod test_support;

use dex_trades_core::trade::Trade;
use serde::Deserialize;
use serde_json::Value;
use tracing::warn;

use crate::adapter::{ProtocolAdapter, decode, decode_ref, parse_amount};
use crate::error::SubgraphError;
use crate::protocol::Protocol;

/// Uniswap v3 subgraph. Swaps carry signed pool deltas: the negative amount
/// left the pool, so that token was bought.
pub struct UniswapAdapter {
    endpoint: String,
}

impl UniswapAdapter {
    pub fn new(endpoint: impl Into<String>) -> Self {
        Self {
            endpoint: endpoint.into(),
        }
    }
}

#[derive(Debug, Deserialize)]
struct TokenRef {
    id: String,
}

#[derive(Debug, Deserialize)]
struct UniswapSwap {
    token0: TokenRef,
    token1: TokenRef,
    amount0: String,
    amount1: String,
}

#[derive(Debug, Deserialize)]
struct UniswapPool {
    token0: TokenRef,
    token1: TokenRef,
}

impl ProtocolAdapter for UniswapAdapter {
    fn protocol(&self) -> Protocol {
        Protocol::Uniswap
    }

    fn endpoint(&self) -> &str {
        &self.endpoint
    }

    fn trades_object(&self) -> &'static str {
        "swaps"
    }

    fn trade_filters(&self) -> &'static [&'static str] {
        &["pool", "token0", "token1"]
    }

    fn trade_fields(&self) -> &'static [&'static str] {
        &["timestamp", "token0{id}", "token1{id}", "amount0", "amount1"]
    }

    fn normalize(&self, event: Value, timestamp: i64) -> Result<Option<Trade>, SubgraphError> {
        let swap: UniswapSwap = decode(event, "Uniswap swap")?;
        let amount0 = parse_amount(&swap.amount0)?;
        let amount1 = parse_amount(&swap.amount1)?;

        let trade = if amount0.is_sign_negative() && !amount0.is_zero() {
            Trade {
                timestamp,
                token_bought: swap.token0.id,
                token_sold: swap.token1.id,
                amount_bought: amount0.abs(),
                amount_sold: amount1.abs(),
            }
        } else if amount1.is_sign_negative() && !amount1.is_zero() {
            Trade {
                timestamp,
                token_bought: swap.token1.id,
                token_sold: swap.token0.id,
                amount_bought: amount1.abs(),
                amount_sold: amount0.abs(),
            }
        } else {
            warn!("skipping Uniswap swap at {timestamp} with no negative amount ({amount0}, {amount1})");
            return Ok(None);
        };

        Ok(Some(trade))
    }

    fn pools_object(&self) -> &'static str {
        "pools"
    }

    fn pool_filter(&self) -> &'static str {
        "id"
    }

    fn pool_fields(&self) -> &'static str {
        "token0{id} token1{id}"
    }

    fn format_pool_coins(&self, pool: &Value) -> Result<Vec<String>, SubgraphError> {
        let pool: UniswapPool = decode_ref(pool, "Uniswap pool")?;
        Ok(vec![pool.token0.id, pool.token1.id])
    }
}

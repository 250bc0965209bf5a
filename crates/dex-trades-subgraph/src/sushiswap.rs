use dex_trades_core::trade::Trade;
use serde::Deserialize;
use serde_json::Value;

use crate::adapter::{ProtocolAdapter, decode, decode_ref, scale_units};
use crate::error::SubgraphError;
use crate::protocol::Protocol;

/// SushiSwap through the Messari standardized schema. Amounts are integer
/// base units and each token carries its own decimals.
pub struct SushiswapAdapter {
    endpoint: String,
}

impl SushiswapAdapter {
    pub fn new(endpoint: impl Into<String>) -> Self {
        Self {
            endpoint: endpoint.into(),
        }
    }
}

#[derive(Debug, Deserialize)]
struct ScaledToken {
    id: String,
    decimals: u32,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SushiSwap {
    token_in: ScaledToken,
    token_out: ScaledToken,
    amount_in: String,
    amount_out: String,
}

#[derive(Debug, Deserialize)]
struct TokenId {
    id: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct LiquidityPool {
    input_tokens: Vec<TokenId>,
}

impl ProtocolAdapter for SushiswapAdapter {
    fn protocol(&self) -> Protocol {
        Protocol::Sushiswap
    }

    fn endpoint(&self) -> &str {
        &self.endpoint
    }

    fn trades_object(&self) -> &'static str {
        "swaps"
    }

    fn trade_filters(&self) -> &'static [&'static str] {
        &["pool", "tokenIn", "tokenOut"]
    }

    fn trade_fields(&self) -> &'static [&'static str] {
        &[
            "timestamp",
            "tokenIn{id, decimals}",
            "tokenOut{id, decimals}",
            "amountIn",
            "amountOut",
        ]
    }

    fn normalize(&self, event: Value, timestamp: i64) -> Result<Option<Trade>, SubgraphError> {
        let swap: SushiSwap = decode(event, "SushiSwap swap")?;
        Ok(Some(Trade {
            timestamp,
            amount_bought: scale_units(&swap.amount_out, swap.token_out.decimals)?,
            amount_sold: scale_units(&swap.amount_in, swap.token_in.decimals)?,
            token_bought: swap.token_out.id,
            token_sold: swap.token_in.id,
        }))
    }

    fn pools_object(&self) -> &'static str {
        "liquidityPools"
    }

    fn pool_filter(&self) -> &'static str {
        "id"
    }

    fn pool_fields(&self) -> &'static str {
        "inputTokens{id}"
    }

    fn format_pool_coins(&self, pool: &Value) -> Result<Vec<String>, SubgraphError> {
        let pool: LiquidityPool = decode_ref(pool, "SushiSwap liquidity pool")?;
        Ok(pool.input_tokens.into_iter().map(|t| t.id).collect())
    }
}

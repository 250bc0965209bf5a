use dex_trades_core::trade::Trade;
use serde::Deserialize;
use serde_json::Value;

use crate::adapter::{ProtocolAdapter, decode, decode_ref, parse_amount};
use crate::error::SubgraphError;
use crate::protocol::Protocol;

/// Curve volume subgraph. Swap events already name the bought and sold
/// tokens, with amounts in whole-token units.
pub struct CurveAdapter {
    endpoint: String,
}

impl CurveAdapter {
    pub fn new(endpoint: impl Into<String>) -> Self {
        Self {
            endpoint: endpoint.into(),
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct CurveSwapEvent {
    token_sold: String,
    token_bought: String,
    amount_sold: String,
    amount_bought: String,
}

#[derive(Debug, Deserialize)]
struct CurvePool {
    coins: Vec<String>,
}

impl ProtocolAdapter for CurveAdapter {
    fn protocol(&self) -> Protocol {
        Protocol::Curve
    }

    fn endpoint(&self) -> &str {
        &self.endpoint
    }

    fn trades_object(&self) -> &'static str {
        "swapEvents"
    }

    fn trade_filters(&self) -> &'static [&'static str] {
        &["pool", "tokenBought", "tokenSold"]
    }

    fn trade_fields(&self) -> &'static [&'static str] {
        &[
            "timestamp",
            "tokenSold",
            "tokenBought",
            "amountSold",
            "amountBought",
        ]
    }

    fn normalize(&self, event: Value, timestamp: i64) -> Result<Option<Trade>, SubgraphError> {
        let event: CurveSwapEvent = decode(event, "Curve swap event")?;
        Ok(Some(Trade {
            timestamp,
            token_bought: event.token_bought,
            token_sold: event.token_sold,
            amount_bought: parse_amount(&event.amount_bought)?.abs(),
            amount_sold: parse_amount(&event.amount_sold)?.abs(),
        }))
    }

    fn pools_object(&self) -> &'static str {
        "pools"
    }

    fn pool_filter(&self) -> &'static str {
        "address"
    }

    fn pool_fields(&self) -> &'static str {
        "coins"
    }

    fn format_pool_coins(&self, pool: &Value) -> Result<Vec<String>, SubgraphError> {
        let pool: CurvePool = decode_ref(pool, "Curve pool")?;
        Ok(pool.coins)
    }
}

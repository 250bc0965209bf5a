use std::str::FromStr;

use dex_trades_core::trade::Trade;
use rust_decimal::Decimal;
use serde::de::DeserializeOwned;
use serde_json::Value;

use crate::error::SubgraphError;
use crate::protocol::Protocol;
use crate::query::{self, FilterArgs, TradesQuery};

/// Describes one protocol's subgraph schema and turns its events into [`Trade`]s.
pub trait ProtocolAdapter: Send + Sync {
    fn protocol(&self) -> Protocol;

    /// Subgraph URL.
    fn endpoint(&self) -> &str;

    /// Query object holding swap events, e.g. `swaps`.
    fn trades_object(&self) -> &'static str;

    /// Filter fields matched against `[pools, coins, coins]`.
    fn trade_filters(&self) -> &'static [&'static str];

    /// Fields requested for each event. Must include `timestamp`.
    fn trade_fields(&self) -> &'static [&'static str];

    /// Normalize one event whose timestamp has already been read.
    /// `Ok(None)` skips an event that describes no trade.
    fn normalize(&self, event: Value, timestamp: i64) -> Result<Option<Trade>, SubgraphError>;

    /// Query object holding pools, e.g. `liquidityPools`.
    fn pools_object(&self) -> &'static str;

    /// Field matched against a pool address.
    fn pool_filter(&self) -> &'static str;

    /// Selection set requested for a pool.
    fn pool_fields(&self) -> &'static str;

    /// Extract coin addresses from one pool record.
    fn format_pool_coins(&self, pool: &Value) -> Result<Vec<String>, SubgraphError>;

    fn trades_query(&self, args: &FilterArgs) -> TradesQuery {
        TradesQuery::new(
            self.trades_object(),
            self.trade_filters(),
            self.trade_fields(),
            args,
        )
    }

    fn pool_coins_query(&self, pool: &str) -> String {
        query::pool_coins_query(self.pools_object(), self.pool_filter(), self.pool_fields(), pool)
    }

    /// Normalize a page of timestamp-ordered events.
    ///
    /// Stops at the first event later than `end_inclusive`; the rest of the
    /// page is not looked at.
    fn format_trades(&self, events: Vec<Value>, end_inclusive: i64) -> Result<Vec<Trade>, SubgraphError> {
        let mut trades = Vec::with_capacity(events.len());
        for event in events {
            let timestamp = event_timestamp(&event)?;
            if timestamp > end_inclusive {
                break;
            }
            if let Some(trade) = self.normalize(event, timestamp)? {
                trades.push(trade);
            }
        }
        Ok(trades)
    }
}

/// Read an event's `timestamp`, which subgraphs send as a decimal string.
pub fn event_timestamp(event: &Value) -> Result<i64, SubgraphError> {
    match event.get("timestamp") {
        Some(Value::String(text)) => text
            .parse()
            .map_err(|e| SubgraphError::Parse(format!("invalid timestamp '{text}': {e}"))),
        Some(Value::Number(number)) => number
            .as_i64()
            .ok_or_else(|| SubgraphError::Parse(format!("invalid timestamp {number}"))),
        Some(other) => Err(SubgraphError::Parse(format!("invalid timestamp {other}"))),
        None => Err(SubgraphError::Parse("event has no timestamp".into())),
    }
}

/// Parse a decimal amount in plain or scientific notation.
pub fn parse_amount(text: &str) -> Result<Decimal, SubgraphError> {
    let text = text.trim();
    Decimal::from_str(text)
        .or_else(|_| Decimal::from_scientific(text))
        .map_err(|e| SubgraphError::Parse(format!("invalid amount '{text}': {e}")))
}

/// Convert an integer amount in base units to whole tokens, i.e. `raw / 10^decimals`.
///
/// The decimal point is placed in the digit string, so raw amounts wider than
/// a `Decimal` mantissa still convert as long as the whole-token value fits.
pub fn scale_units(raw: &str, decimals: u32) -> Result<Decimal, SubgraphError> {
    let digits = raw.trim();
    if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
        return Err(SubgraphError::Parse(format!(
            "base-unit amount '{raw}' is not a non-negative integer"
        )));
    }

    let decimals = decimals as usize;
    let text = if decimals == 0 {
        digits.to_string()
    } else if digits.len() > decimals {
        let (whole, fraction) = digits.split_at(digits.len() - decimals);
        format!("{whole}.{fraction}")
    } else {
        format!("0.{}{digits}", "0".repeat(decimals - digits.len()))
    };

    Decimal::from_str(&text)
        .map(|amount| amount.normalize())
        .map_err(|e| SubgraphError::Parse(format!("cannot scale '{raw}' by 10^{decimals}: {e}")))
}

/// Deserialize an event into a protocol's typed shape.
pub(crate) fn decode<T: DeserializeOwned>(event: Value, what: &str) -> Result<T, SubgraphError> {
    serde_json::from_value(event)
        .map_err(|e| SubgraphError::Parse(format!("malformed {what}: {e}")))
}

/// Like [`decode`] for borrowed records such as pools.
pub(crate) fn decode_ref<T: DeserializeOwned>(value: &Value, what: &str) -> Result<T, SubgraphError> {
    decode(value.clone(), what)
}

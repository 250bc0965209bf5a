use chrono::{DateTime, TimeZone, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// A single swap, normalized across protocols.
///
/// Amounts are non-negative and already scaled to whole-token units.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Trade {
    /// Unix seconds.
    pub timestamp: i64,
    pub token_bought: String,
    pub token_sold: String,
    pub amount_bought: Decimal,
    pub amount_sold: Decimal,
}

impl Trade {
    /// The trade timestamp as a UTC datetime, or `None` if out of range.
    pub fn datetime(&self) -> Option<DateTime<Utc>> {
        Utc.timestamp_opt(self.timestamp, 0).single()
    }

    /// True if this trade bought `bought` with `sold`. Addresses compare case-insensitively.
    pub fn is_direction(&self, bought: &str, sold: &str) -> bool {
        self.token_bought.eq_ignore_ascii_case(bought) && self.token_sold.eq_ignore_ascii_case(sold)
    }
}

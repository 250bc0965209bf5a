use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::trade::Trade;

/// One price/volume observation for a coin pair.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PricePoint {
    pub timestamp: DateTime<Utc>,
    pub price: Decimal,
    pub volume: Decimal,
}

/// Price and volume history for one unordered coin pair.
///
/// `price` is the amount of `quote` paid per unit of `base`, and `volume` is
/// denominated in `base`, whichever way each trade went.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PairSeries {
    pub quote: String,
    pub base: String,
    /// Sorted by timestamp.
    pub points: Vec<PricePoint>,
}

impl PairSeries {
    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }
}

/// All pairs `(coins[i], coins[j])` with `i < j`, in order.
pub fn pair_combinations(coins: &[String]) -> Vec<(&str, &str)> {
    let mut pairs = Vec::new();
    for (i, a) in coins.iter().enumerate() {
        for b in &coins[i + 1..] {
            pairs.push((a.as_str(), b.as_str()));
        }
    }
    pairs
}

/// Split trades into one price/volume series per coin pair.
///
/// For each pair `(A, B)` with `A` before `B` in `coin_order`, trades buying
/// `B` with `A` and trades buying `A` with `B` are both priced as A per B and
/// merged by timestamp.
pub fn to_pair_series(trades: &[Trade], coin_order: &[String]) -> Vec<PairSeries> {
    pair_combinations(coin_order)
        .into_iter()
        .map(|(quote, base)| pair_series(trades, quote, base))
        .collect()
}

fn pair_series(trades: &[Trade], quote: &str, base: &str) -> PairSeries {
    let mut points = Vec::new();

    for trade in trades {
        // (price, volume) as quote-per-base and base units
        let observation = if trade.is_direction(base, quote) {
            trade
                .amount_sold
                .checked_div(trade.amount_bought)
                .map(|price| (price, trade.amount_bought))
        } else if trade.is_direction(quote, base) {
            trade
                .amount_bought
                .checked_div(trade.amount_sold)
                .map(|price| (price, trade.amount_sold))
        } else {
            continue;
        };

        let Some((price, volume)) = observation else {
            debug!(
                "{base}/{quote}: dropping trade at {} with zero amount",
                trade.timestamp
            );
            continue;
        };

        let Some(timestamp) = trade.datetime() else {
            warn!("{base}/{quote}: dropping trade with invalid timestamp {}", trade.timestamp);
            continue;
        };

        points.push(PricePoint {
            timestamp,
            price,
            volume,
        });
    }

    points.sort_by_key(|p| p.timestamp);

    PairSeries {
        quote: quote.to_string(),
        base: base.to_string(),
        points,
    }
}

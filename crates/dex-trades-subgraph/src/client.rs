use chrono::Duration;
use dex_trades_core::candle::{CandleSeries, to_candles};
use dex_trades_core::series::{PairSeries, to_pair_series};
use dex_trades_core::trade::Trade;
use tracing::{debug, info};

use crate::adapter::ProtocolAdapter;
use crate::config::SubgraphConfig;
use crate::error::SubgraphError;
use crate::paginator::{Paginator, RetryPolicy};
use crate::query::{FilterArgs, PAGE_SIZE};
use crate::registry::ProtocolRegistry;
use crate::transport::{HttpTransport, PathStep, SubgraphTransport, json_path};

/// What to fetch and how to shape it.
#[derive(Debug, Clone, PartialEq)]
pub struct TradeRequest {
    /// Pool addresses to filter on.
    pub pools: Option<Vec<String>>,
    /// Coin addresses to filter on. Their order fixes the pair order of the table.
    pub coins: Option<Vec<String>>,
    /// Inclusive lower bound, epoch seconds.
    pub start: Option<i64>,
    /// Inclusive upper bound, epoch seconds. Defaults to the newest matching event.
    pub end: Option<i64>,
    /// Tabulate into per-pair price series instead of returning raw trades.
    pub as_table: bool,
    /// Aggregate into candles of this width. Implies `as_table`.
    pub candle_duration: Option<Duration>,
    pub reindex: bool,
    pub truncate: bool,
}

impl Default for TradeRequest {
    fn default() -> Self {
        Self {
            pools: None,
            coins: None,
            start: None,
            end: None,
            as_table: true,
            candle_duration: None,
            reindex: true,
            truncate: true,
        }
    }
}

impl TradeRequest {
    pub fn for_pools(pools: Vec<String>) -> Self {
        Self {
            pools: Some(pools),
            ..Self::default()
        }
    }

    pub fn for_coins(coins: Vec<String>) -> Self {
        Self {
            coins: Some(coins),
            ..Self::default()
        }
    }

    fn validate(&self) -> Result<(), SubgraphError> {
        if self.pools.is_none() && self.coins.is_none() {
            return Err(SubgraphError::InvalidArgument(
                "must specify pools, coins or both".into(),
            ));
        }
        if self.pools.as_ref().is_some_and(|pools| pools.is_empty()) {
            return Err(SubgraphError::InvalidArgument("pool list is empty".into()));
        }
        if let Some(coins) = &self.coins
            && coins.len() < 2
        {
            return Err(SubgraphError::InvalidArgument(format!(
                "must specify at least 2 coins, got {}",
                coins.len()
            )));
        }
        if let (Some(start), Some(end)) = (self.start, self.end)
            && start > end
        {
            return Err(SubgraphError::InvalidArgument(format!(
                "start {start} is after end {end}"
            )));
        }
        Ok(())
    }
}

/// Result of [`SubgraphClient::trades`], shaped by the request.
#[derive(Debug, Clone, PartialEq)]
pub enum TradesOutput {
    Raw(Vec<Trade>),
    Series(Vec<PairSeries>),
    Candles(Vec<CandleSeries>),
}

/// Entry point for fetching DEX trades from protocol subgraphs.
pub struct SubgraphClient {
    registry: ProtocolRegistry,
    transport: Box<dyn SubgraphTransport>,
    retry: RetryPolicy,
    page_size: u32,
}

impl SubgraphClient {
    /// Client over HTTP against the configured endpoints.
    pub fn new(config: &SubgraphConfig) -> Result<Self, SubgraphError> {
        Ok(Self::with_transport(
            ProtocolRegistry::new(config),
            Box::new(HttpTransport::new()?),
        ))
    }

    pub fn with_transport(registry: ProtocolRegistry, transport: Box<dyn SubgraphTransport>) -> Self {
        Self {
            registry,
            transport,
            retry: RetryPolicy::default(),
            page_size: PAGE_SIZE,
        }
    }

    pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    pub fn with_page_size(mut self, page_size: u32) -> Self {
        self.page_size = page_size;
        self
    }

    pub fn registry(&self) -> &ProtocolRegistry {
        &self.registry
    }

    /// Fetch trades on `protocol` (any alias) and shape them per the request.
    pub async fn trades(&self, protocol: &str, request: &TradeRequest) -> Result<TradesOutput, SubgraphError> {
        request.validate()?;
        let adapter = self.registry.resolve(protocol)?;

        let coins = request.coins.as_ref().map(|coins| lowercase_all(coins));
        let filters = FilterArgs::new(request.pools.clone(), coins.clone());

        let trades = Paginator::new(self.transport.as_ref(), adapter, self.retry)
            .with_page_size(self.page_size)
            .fetch_all(&filters, request.start, request.end)
            .await?;

        if !request.as_table && request.candle_duration.is_none() {
            return Ok(TradesOutput::Raw(trades));
        }

        let coin_order = match coins {
            Some(coins) => coins,
            None => {
                let pools = request.pools.as_deref().unwrap_or_default();
                lowercase_all(&self.coins_of(adapter, pools).await?)
            }
        };
        let series = to_pair_series(&trades, &coin_order);
        debug!(
            "{}: tabulated {} trades into {} pair series",
            adapter.protocol(),
            trades.len(),
            series.len()
        );

        match request.candle_duration {
            Some(duration) => Ok(TradesOutput::Candles(to_candles(
                &series,
                duration,
                request.reindex,
                request.truncate,
            )?)),
            None => Ok(TradesOutput::Series(series)),
        }
    }

    /// Coin addresses of each pool, concatenated in pool order.
    pub async fn pool_coins(&self, protocol: &str, pools: &[String]) -> Result<Vec<String>, SubgraphError> {
        let adapter = self.registry.resolve(protocol)?;
        self.coins_of(adapter, pools).await
    }

    async fn coins_of(&self, adapter: &dyn ProtocolAdapter, pools: &[String]) -> Result<Vec<String>, SubgraphError> {
        let mut coins = Vec::new();
        for pool in pools {
            let document = adapter.pool_coins_query(pool);
            let response = self.transport.post_query(adapter.endpoint(), &document).await?;
            if !response.is_success() {
                return Err(SubgraphError::Api {
                    status: response.status,
                    message: response.body,
                });
            }

            let body = response.json()?;
            let path = [
                PathStep::Key("data"),
                PathStep::Key(adapter.pools_object()),
                PathStep::Index(0),
            ];
            let record = json_path(&body, &path).ok_or_else(|| {
                SubgraphError::DataUnavailable(format!(
                    "pool {pool} not found in {} {}. Check query parameters",
                    adapter.protocol(),
                    adapter.pools_object()
                ))
            })?;
            coins.extend(adapter.format_pool_coins(record)?);
        }

        info!("{}: {} pool(s) hold {} coin(s)", adapter.protocol(), pools.len(), coins.len());
        Ok(coins)
    }
}

fn lowercase_all(values: &[String]) -> Vec<String> {
    values.iter().map(|v| v.to_lowercase()).collect()
}

use std::time::Duration;

use dex_trades_core::trade::Trade;
use serde_json::Value;
use tracing::{debug, info, warn};

use crate::adapter::{ProtocolAdapter, event_timestamp};
use crate::error::SubgraphError;
use crate::query::{FilterArgs, OrderDirection, PAGE_SIZE, TradesQuery};
use crate::transport::{PathStep, SubgraphTransport, json_path};

/// How a failed page request is retried.
///
/// Every failure to get a usable page (transport error, non-success status,
/// unparsable body, missing `data.<object>`) counts as transient.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Fixed pause between attempts.
    pub delay: Duration,
    /// Total attempts per page; `None` retries forever.
    pub max_attempts: Option<u32>,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            delay: Duration::from_millis(100),
            max_attempts: None,
        }
    }
}

impl RetryPolicy {
    pub fn new(delay: Duration, max_attempts: Option<u32>) -> Self {
        Self { delay, max_attempts }
    }

    /// Default delay, giving up after `max_attempts` tries.
    pub fn bounded(max_attempts: u32) -> Self {
        Self {
            max_attempts: Some(max_attempts.max(1)),
            ..Self::default()
        }
    }

    fn exhausted(&self, attempts: u32) -> bool {
        self.max_attempts.is_some_and(|max| attempts >= max)
    }
}

/// Walks a protocol's trade events in ascending timestamp order, one page
/// at a time, using the last timestamp seen as the cursor.
pub struct Paginator<'a> {
    transport: &'a dyn SubgraphTransport,
    adapter: &'a dyn ProtocolAdapter,
    retry: RetryPolicy,
    page_size: u32,
}

impl<'a> Paginator<'a> {
    pub fn new(
        transport: &'a dyn SubgraphTransport,
        adapter: &'a dyn ProtocolAdapter,
        retry: RetryPolicy,
    ) -> Self {
        Self {
            transport,
            adapter,
            retry,
            page_size: PAGE_SIZE,
        }
    }

    pub fn with_page_size(mut self, page_size: u32) -> Self {
        self.page_size = page_size.max(1);
        self
    }

    /// Fetch every trade matching `filters` with `start <= timestamp <= end`.
    ///
    /// Without `end`, the timestamp of the most recent matching event is used.
    /// Without `start`, the walk begins at the first event.
    pub async fn fetch_all(
        &self,
        filters: &FilterArgs,
        start: Option<i64>,
        end: Option<i64>,
    ) -> Result<Vec<Trade>, SubgraphError> {
        let protocol = self.adapter.protocol();
        let query = self.adapter.trades_query(filters);

        let end = match end {
            Some(end) => end,
            None => self.latest_timestamp(&query).await?,
        };
        let mut cursor = start.map_or(0, |start| start - 1);

        info!("{protocol}: fetching trades after {cursor} up to {end}");

        let mut trades = Vec::new();
        while cursor < end {
            let mut events = self.fetch_page(&query, cursor).await?;
            let Some(last) = events.last() else {
                break;
            };
            let last_ts = event_timestamp(last)?;
            let full_page = events.len() >= self.page_size as usize;

            if full_page {
                // Events sharing the page's last timestamp may continue on the
                // next page; hold them back so they are fetched together.
                let held_from = first_index_at(&events, last_ts)?;
                if held_from > 0 {
                    events.truncate(held_from);
                    cursor = last_ts - 1;
                } else {
                    warn!(
                        "{protocol}: a full page of {} events shares timestamp {last_ts}; \
                         events beyond the page at that timestamp are skipped",
                        events.len()
                    );
                    cursor = last_ts;
                }
            } else {
                cursor = last_ts;
            }

            trades.extend(self.adapter.format_trades(events, end)?);
            debug!("{protocol}: retrieved timestamp {cursor} / {end}");

            if !full_page {
                break;
            }
        }

        info!("{protocol}: fetched {} trades", trades.len());
        Ok(trades)
    }

    /// Timestamp of the most recent event matching the query.
    pub async fn latest_timestamp(&self, query: &TradesQuery) -> Result<i64, SubgraphError> {
        let document = query.render(1, OrderDirection::Desc, 0);
        let unavailable = |reason: String| {
            SubgraphError::DataUnavailable(format!(
                "no latest {} event ({reason}). Check query parameters",
                query.object()
            ))
        };

        let response = self
            .transport
            .post_query(self.adapter.endpoint(), &document)
            .await
            .map_err(|e| unavailable(e.to_string()))?;
        if !response.is_success() {
            return Err(unavailable(format!("HTTP {}", response.status)));
        }
        let body = response.json().map_err(|e| unavailable(e.to_string()))?;

        let path = [
            PathStep::Key("data"),
            PathStep::Key(query.object()),
            PathStep::Index(0),
        ];
        let event = json_path(&body, &path).ok_or_else(|| unavailable("empty result".into()))?;
        event_timestamp(event).map_err(|e| unavailable(e.to_string()))
    }

    /// One page after `cursor`, retried per the policy.
    async fn fetch_page(&self, query: &TradesQuery, cursor: i64) -> Result<Vec<Value>, SubgraphError> {
        let document = query.render(self.page_size, OrderDirection::Asc, cursor);
        let mut attempts = 0;

        loop {
            attempts += 1;
            match self.try_page(query.object(), &document).await {
                Ok(events) => return Ok(events),
                Err(e) if self.retry.exhausted(attempts) => {
                    return Err(SubgraphError::RetriesExhausted {
                        attempts,
                        last_error: e.to_string(),
                    });
                }
                Err(e) => {
                    warn!("page after {cursor} failed (attempt {attempts}): {e}; retrying");
                    tokio::time::sleep(self.retry.delay).await;
                }
            }
        }
    }

    async fn try_page(&self, object: &str, document: &str) -> Result<Vec<Value>, SubgraphError> {
        let response = self
            .transport
            .post_query(self.adapter.endpoint(), document)
            .await?;
        if !response.is_success() {
            return Err(SubgraphError::Api {
                status: response.status,
                message: response.body,
            });
        }

        let mut body = response.json()?;
        match body
            .get_mut("data")
            .and_then(|data| data.get_mut(object))
            .map(Value::take)
        {
            Some(Value::Array(events)) => Ok(events),
            _ => Err(SubgraphError::DataUnavailable(format!(
                "response has no data.{object} list"
            ))),
        }
    }
}

fn first_index_at(events: &[Value], timestamp: i64) -> Result<usize, SubgraphError> {
    for (index, event) in events.iter().enumerate() {
        if event_timestamp(event)? == timestamp {
            return Ok(index);
        }
    }
    Ok(events.len())
}

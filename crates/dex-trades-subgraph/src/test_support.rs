//! In-memory subgraph used by the paginator and client tests.

use std::collections::VecDeque;
use std::sync::Mutex;

use async_trait::async_trait;
use serde_json::{Value, json};

use crate::adapter::event_timestamp;
use crate::error::SubgraphError;
use crate::transport::{GraphqlResponse, SubgraphTransport};

/// A failure served instead of the next answer.
#[derive(Debug, Clone)]
pub(crate) enum Failure {
    Status(u16),
    Body(&'static str),
    Connection,
}

/// Answers trade queries from a fixed, timestamp-ordered event list by
/// reading `first`, `orderDirection` and `timestamp_gt` out of the document.
/// Pool lookups (documents without `orderBy`) get the configured pool record.
pub(crate) struct FakeSubgraph {
    object: String,
    events: Vec<Value>,
    pool: Option<(String, Value)>,
    failures: Mutex<VecDeque<Failure>>,
    requests: Mutex<Vec<String>>,
}

impl FakeSubgraph {
    pub(crate) fn new(object: &str, events: Vec<Value>) -> Self {
        Self {
            object: object.to_string(),
            events,
            pool: None,
            failures: Mutex::new(VecDeque::new()),
            requests: Mutex::new(Vec::new()),
        }
    }

    pub(crate) fn with_pool(mut self, object: &str, pool: Value) -> Self {
        self.pool = Some((object.to_string(), pool));
        self
    }

    /// Queue failures; each one replaces the answer to one request.
    pub(crate) fn fail_next(&self, failures: impl IntoIterator<Item = Failure>) {
        self.failures.lock().unwrap().extend(failures);
    }

    pub(crate) fn requests(&self) -> Vec<String> {
        self.requests.lock().unwrap().clone()
    }

    fn answer(&self, document: &str) -> Value {
        if !document.contains("orderBy") {
            let records = match &self.pool {
                Some((object, pool)) => json!({ object.as_str(): [pool] }),
                None => json!({}),
            };
            return json!({ "data": records });
        }

        let first = number_after(document, "first: ").unwrap_or(100) as usize;
        let after = number_after(document, "timestamp_gt: ").unwrap_or(0);
        let mut matching: Vec<Value> = self
            .events
            .iter()
            .filter(|e| event_timestamp(e).unwrap() > after)
            .cloned()
            .collect();
        if document.contains("orderDirection: desc") {
            matching.reverse();
        }
        matching.truncate(first);

        json!({ "data": { self.object.as_str(): matching } })
    }
}

fn number_after(document: &str, key: &str) -> Option<i64> {
    let start = document.find(key)? + key.len();
    let digits: String = document[start..]
        .chars()
        .take_while(|c| c.is_ascii_digit() || *c == '-')
        .collect();
    digits.parse().ok()
}

#[async_trait]
impl SubgraphTransport for FakeSubgraph {
    async fn post_query(&self, _url: &str, document: &str) -> Result<GraphqlResponse, SubgraphError> {
        self.requests.lock().unwrap().push(document.to_string());

        let failure = self.failures.lock().unwrap().pop_front();
        match failure {
            Some(Failure::Status(status)) => Ok(GraphqlResponse {
                status,
                body: "upstream error".to_string(),
            }),
            Some(Failure::Body(body)) => Ok(GraphqlResponse {
                status: 200,
                body: body.to_string(),
            }),
            Some(Failure::Connection) => Err(SubgraphError::Api {
                status: 0,
                message: "connection reset".to_string(),
            }),
            None => Ok(GraphqlResponse {
                status: 200,
                body: self.answer(document).to_string(),
            }),
        }
    }
}

/// A Curve-shaped swap event at `ts`.
pub(crate) fn curve_event(ts: i64, bought: &str, sold: &str, amount_bought: &str, amount_sold: &str) -> Value {
    json!({
        "timestamp": ts.to_string(),
        "tokenBought": bought,
        "tokenSold": sold,
        "amountBought": amount_bought,
        "amountSold": amount_sold,
    })
}

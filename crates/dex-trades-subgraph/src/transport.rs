use async_trait::async_trait;
use reqwest::Client;
use serde_json::{Value, json};

use crate::error::SubgraphError;

/// Raw HTTP outcome of one GraphQL request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GraphqlResponse {
    pub status: u16,
    pub body: String,
}

impl GraphqlResponse {
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }

    /// Parse the body as JSON.
    pub fn json(&self) -> Result<Value, SubgraphError> {
        serde_json::from_str(&self.body)
            .map_err(|e| SubgraphError::Parse(format!("failed to parse response: {e}")))
    }
}

/// Sends GraphQL documents to a subgraph endpoint.
#[async_trait]
pub trait SubgraphTransport: Send + Sync {
    /// POST `{"query": document}` to `url`. Non-success statuses are returned,
    /// not raised; only failures to get any response are errors.
    async fn post_query(&self, url: &str, document: &str) -> Result<GraphqlResponse, SubgraphError>;
}

/// reqwest-backed transport.
pub struct HttpTransport {
    client: Client,
}

impl HttpTransport {
    pub fn new() -> Result<Self, SubgraphError> {
        let client = Client::builder()
            .user_agent(concat!("dex-trades/", env!("CARGO_PKG_VERSION")))
            .build()?;
        Ok(Self { client })
    }

    pub fn with_client(client: Client) -> Self {
        Self { client }
    }
}

#[async_trait]
impl SubgraphTransport for HttpTransport {
    async fn post_query(&self, url: &str, document: &str) -> Result<GraphqlResponse, SubgraphError> {
        let response = self
            .client
            .post(url)
            .json(&json!({ "query": document }))
            .send()
            .await?;

        let status = response.status().as_u16();
        let body = response.text().await?;
        Ok(GraphqlResponse { status, body })
    }
}

/// Follow a path such as `data.pools[0]` through a JSON response.
pub(crate) fn json_path<'a>(value: &'a Value, path: &[PathStep<'_>]) -> Option<&'a Value> {
    path.iter().try_fold(value, |current, step| match step {
        PathStep::Key(key) => current.get(*key),
        PathStep::Index(index) => current.get(*index),
    })
}

#[derive(Debug, Clone, Copy)]
pub(crate) enum PathStep<'a> {
    Key(&'a str),
    Index(usize),
}

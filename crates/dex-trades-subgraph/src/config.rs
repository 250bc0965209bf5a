use crate::error::SubgraphError;
use crate::protocol::Protocol;

const CURVE_SUBGRAPH_URL: &str =
    "https://api.thegraph.com/subgraphs/name/convex-community/volume-mainnet";
const UNISWAP_SUBGRAPH_URL: &str = "https://api.thegraph.com/subgraphs/name/uniswap/uniswap-v3";
const SUSHI_SUBGRAPH_URL: &str =
    "https://api.thegraph.com/subgraphs/name/messari/sushiswap-ethereum";

/// Subgraph endpoints, one per protocol.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SubgraphConfig {
    pub curve_url: String,
    pub uniswap_url: String,
    pub sushi_url: String,
}

impl Default for SubgraphConfig {
    fn default() -> Self {
        Self {
            curve_url: CURVE_SUBGRAPH_URL.to_string(),
            uniswap_url: UNISWAP_SUBGRAPH_URL.to_string(),
            sushi_url: SUSHI_SUBGRAPH_URL.to_string(),
        }
    }
}

impl SubgraphConfig {
    /// Defaults, overridden by `DEX_TRADES_CURVE_URL`, `DEX_TRADES_UNISWAP_URL`
    /// and `DEX_TRADES_SUSHI_URL` where set.
    pub fn from_env() -> Result<Self, SubgraphError> {
        Self::from_lookup(|var| std::env::var(var).ok())
    }

    /// Like [`from_env`](Self::from_env), reading variables through `lookup`.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, SubgraphError> {
        let mut config = Self::default();
        for protocol in Protocol::ALL {
            let var = Self::env_var(protocol);
            match lookup(var) {
                Some(url) if url.trim().is_empty() => {
                    return Err(SubgraphError::Config(format!("{var} is set but empty")));
                }
                Some(url) => config = config.with_endpoint(protocol, url.trim().to_string()),
                None => {}
            }
        }
        Ok(config)
    }

    /// Name of the environment variable overriding a protocol's endpoint.
    pub fn env_var(protocol: Protocol) -> &'static str {
        match protocol {
            Protocol::Curve => "DEX_TRADES_CURVE_URL",
            Protocol::Uniswap => "DEX_TRADES_UNISWAP_URL",
            Protocol::Sushiswap => "DEX_TRADES_SUSHI_URL",
        }
    }

    /// Replace one endpoint (e.g. a self-hosted graph node, or a test server).
    pub fn with_endpoint(mut self, protocol: Protocol, url: String) -> Self {
        match protocol {
            Protocol::Curve => self.curve_url = url,
            Protocol::Uniswap => self.uniswap_url = url,
            Protocol::Sushiswap => self.sushi_url = url,
        }
        self
    }

    pub fn endpoint(&self, protocol: Protocol) -> &str {
        match protocol {
            Protocol::Curve => &self.curve_url,
            Protocol::Uniswap => &self.uniswap_url,
            Protocol::Sushiswap => &self.sushi_url,
        }
    }
}
